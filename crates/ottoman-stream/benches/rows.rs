//! Benchmarks for streaming view rows and early-stopping property scans.
//!
//! Run with: cargo bench -p ottoman-stream --bench rows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ottoman_codec::Codec;
use ottoman_stream::{scan_texts, Doc, JsonReader, RowStream, Token};
use serde_json::Value;

fn view_body(rows: usize) -> String {
    let mut body = format!(r#"{{"total_rows":{rows},"offset":0,"rows":["#);
    for i in 0..rows {
        if i > 0 {
            body.push(',');
        }
        body.push_str(&format!(
            r#"{{"id":"artist:{i}","key":["genre",{i}],"value":{{"name":"Artist {i}","albumCount":{}}}}}"#,
            i % 17
        ));
    }
    body.push_str("]}");
    body
}

fn tags_body(rows: usize) -> String {
    let mut body = format!(r#"{{"total_rows":{rows},"offset":0,"rows":["#);
    for i in 0..rows {
        if i > 0 {
            body.push(',');
        }
        body.push_str(&format!(
            r#"{{"id":"artist:{i}","key":"{i}","value":["rock","live",{},"tag-{i}"]}}"#,
            i % 5
        ));
    }
    body.push_str("]}");
    body
}

fn at_rows(body: &str) -> JsonReader<&[u8]> {
    let mut reader = JsonReader::new(body.as_bytes());
    while reader.read().expect("valid body") {
        if reader.depth() == 1 && reader.token() == Some(&Token::PropertyName("rows".into())) {
            reader.read().expect("rows value");
            break;
        }
    }
    reader
}

fn bench_rows(c: &mut Criterion) {
    let codec = Codec::default();
    let mut group = c.benchmark_group("view_rows");

    for rows in [10usize, 1_000, 10_000] {
        let body = view_body(rows);
        group.throughput(Throughput::Bytes(body.len() as u64));

        group.bench_with_input(BenchmarkId::new("scalar", rows), &body, |b, body| {
            b.iter(|| {
                let mut reader = at_rows(body);
                let count = RowStream::<_, String>::new(&mut reader, &codec)
                    .filter(Result::is_ok)
                    .count();
                black_box(count)
            })
        });

        group.bench_with_input(BenchmarkId::new("object", rows), &body, |b, body| {
            b.iter(|| {
                let mut reader = at_rows(body);
                let count = RowStream::<_, Doc<Value>>::new(&mut reader, &codec)
                    .filter(Result::is_ok)
                    .count();
                black_box(count)
            })
        });

        let tags = tags_body(rows);
        group.throughput(Throughput::Bytes(tags.len() as u64));
        group.bench_with_input(BenchmarkId::new("scalar_array", rows), &tags, |b, body| {
            b.iter(|| {
                let mut reader = at_rows(body);
                let count = RowStream::<_, Vec<String>>::new(&mut reader, &codec)
                    .filter(Result::is_ok)
                    .count();
                black_box(count)
            })
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("property_scan");
    let body = format!(
        r#"{{"id":"artist:1","rev":"3-abc","payload":"{}"}}"#,
        "x".repeat(1 << 20)
    );

    group.bench_function("id_rev_prefix", |b| {
        b.iter(|| {
            let mut reader = JsonReader::new(body.as_bytes());
            black_box(scan_texts(&mut reader, &["id", "rev"]).expect("scan"))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_rows, bench_scan);
criterion_main!(benches);
