use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use hyper::header::ETAG;
use ottoman_codec::Codec;
use ottoman_response::{Materializer, RawResponse, Response, ViewQueryResponse};
use ottoman_types::{DocumentResponse, RequestInfo, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::*;
use crate::config::OttomanConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("resolving working directory")?;
    let config = OttomanConfig::discover(cli.config.as_deref(), &cwd)?;
    match cli.command {
        Command::Inspect(args) => {
            let report = inspect(&args, config)?;
            print_report(&report, cli.format)
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// A materialized response, flattened for printing.
#[derive(Debug)]
pub struct Report {
    pub summary: String,
    pub success: bool,
    pub fields: Vec<(&'static str, Value)>,
}

impl Report {
    fn new(response: &Response) -> Self {
        let mut fields = vec![("status", Value::from(response.status_code()))];
        if !response.is_success() {
            fields.push(("error", opt(&response.error)));
            fields.push(("reason", opt(&response.reason)));
        }
        Self {
            summary: response.to_string(),
            success: response.is_success(),
            fields,
        }
    }

    fn field(mut self, name: &'static str, value: impl Serialize) -> anyhow::Result<Self> {
        self.fields.push((name, serde_json::to_value(value)?));
        Ok(self)
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("summary".into(), Value::from(self.summary.as_str()));
        map.insert("success".into(), Value::from(self.success));
        for (name, value) in &self.fields {
            map.insert((*name).into(), value.clone());
        }
        Value::Object(map)
    }
}

pub fn inspect(args: &InspectArgs, config: OttomanConfig) -> anyhow::Result<Report> {
    let status = StatusCode::from_u16(args.status).with_context(|| format!("invalid status {}", args.status))?;
    let request = RequestInfo::parse(&args.method, &args.uri)?;
    let mut raw = RawResponse::new(status, request, open_body(&args.body)?);
    if let Some(etag) = &args.etag {
        raw = raw.header(ETAG, etag)?;
    }

    let materializer = Materializer::new(Arc::new(Codec::new(config.codec)), config.materializer);
    tracing::debug!(kind = ?args.kind, ?raw, "inspecting response");

    let report = match args.kind {
        Kind::Database => Report::new(&materializer.database(raw)?),
        Kind::Bulk => {
            let response = materializer.bulk(raw)?;
            Report::new(&response).field("rows", &response.rows)?
        }
        Kind::Copy => document_report(materializer.copy(raw)?)?,
        Kind::Replace => document_report(materializer.replace(raw)?)?,
        Kind::Document => document_report(materializer.document(raw)?)?,
        Kind::ViewText => view_report(materializer.view_query::<String>(raw)?)?,
        Kind::ViewTexts => view_report(materializer.view_query::<Vec<String>>(raw)?)?,
        Kind::ViewJson => view_report(materializer.view_query::<Value>(raw)?)?,
    };
    Ok(report)
}

fn document_report(doc: DocumentResponse) -> anyhow::Result<Report> {
    let report = Report::new(&doc).field("id", &doc.id)?.field("rev", &doc.rev)?;
    match &doc.content {
        Some(content) => report.field("content", content),
        None => Ok(report),
    }
}

fn view_report<V: Serialize>(view: ViewQueryResponse<V>) -> anyhow::Result<Report> {
    Report::new(&view)
        .field("total_rows", view.total_rows)?
        .field("update_seq", view.update_seq)?
        .field("offset", view.offset)?
        .field("rows", &view.rows)
}

fn open_body(path: &Path) -> anyhow::Result<Box<dyn Read + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(std::io::stdin()));
    }
    let file = File::open(path).with_context(|| format!("opening body {}", path.display()))?;
    Ok(Box::new(file))
}

fn opt(value: &Option<String>) -> Value {
    value.as_deref().map_or(Value::Null, Value::from)
}

fn print_report(report: &Report, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        return Ok(());
    }

    let mark = if report.success { "✓".green().bold() } else { "✗".red().bold() };
    println!("{} {}", mark, report.summary.bold());
    for (name, value) in &report.fields {
        match value {
            Value::Array(items) if *name == "rows" => {
                println!("  {}: {}", name.cyan(), items.len());
                for item in items {
                    println!("    {item}");
                }
            }
            Value::Null => println!("  {}: {}", name.cyan(), "(not provided)".dimmed()),
            Value::String(s) => println!("  {}: {}", name.cyan(), s),
            other => println!("  {}: {}", name.cyan(), other),
        }
    }
    Ok(())
}
