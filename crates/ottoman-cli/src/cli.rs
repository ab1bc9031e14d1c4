use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ottoman",
    about = "ottoman: typed responses from a document database's HTTP API",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Config file; defaults to ./ottoman.toml when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Materialize a captured response body and print the result
    Inspect(InspectArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Response category to materialize as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Kind {
    Database,
    Bulk,
    Copy,
    Replace,
    Document,
    /// View rows with scalar values
    ViewText,
    /// View rows with arrays of scalars as values
    ViewTexts,
    /// View rows with arbitrary JSON values
    ViewJson,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Body file, or `-` for stdin
    pub body: PathBuf,
    #[arg(short, long, value_enum)]
    pub kind: Kind,
    #[arg(short, long, default_value = "200")]
    pub status: u16,
    #[arg(short, long, default_value = "GET")]
    pub method: String,
    #[arg(short, long)]
    pub uri: String,
    /// Entity tag header value, quotes included
    #[arg(long)]
    pub etag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inspect() {
        let cli = Cli::try_parse_from(["ottoman", "inspect", "body.json", "--kind", "document", "--uri", "/db/a"]).unwrap();
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.kind, Kind::Document);
            assert_eq!(args.status, 200);
            assert_eq!(args.method, "GET");
            assert_eq!(args.uri, "/db/a");
            assert_eq!(args.body, PathBuf::from("body.json"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_view_kinds() {
        for (flag, kind) in [("view-text", Kind::ViewText), ("view-texts", Kind::ViewTexts), ("view-json", Kind::ViewJson)] {
            let cli = Cli::try_parse_from(["ottoman", "inspect", "-", "-k", flag, "-u", "/db/_all_docs"]).unwrap();
            if let Command::Inspect(args) = cli.command {
                assert_eq!(args.kind, kind);
            } else { panic!("wrong command"); }
        }
    }

    #[test]
    fn parse_inspect_full() {
        let cli = Cli::try_parse_from([
            "ottoman", "inspect", "b.json", "-k", "copy", "-s", "201", "-m", "COPY", "-u", "/db/a", "--etag", "\"1-x\"",
            "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.status, 201);
            assert_eq!(args.etag.as_deref(), Some("\"1-x\""));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_config_with_path() {
        let cli = Cli::try_parse_from(["ottoman", "config", "--config", "custom.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Config));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn inspect_requires_kind_and_uri() {
        assert!(Cli::try_parse_from(["ottoman", "inspect", "b.json", "-u", "/db"]).is_err());
        assert!(Cli::try_parse_from(["ottoman", "inspect", "b.json", "-k", "bulk"]).is_err());
    }
}
