//! 字段路径解析与配置解析性能基准测试

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use random_api::model::{DataSourceConfig, SourceType, extract_url, resolve_field_path};
use serde_json::json;
use std::hint::black_box;

fn bench_resolve_field_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_path/resolve");
    group.throughput(Throughput::Elements(1));

    let flat = json!({ "url": "https://img.example.com/1.jpg" });
    let nested = json!({
        "code": 200,
        "data": {
            "images": [
                { "src": { "original": "https://img.example.com/a.jpg" } },
                { "src": { "original": "https://img.example.com/b.jpg" } }
            ]
        }
    });

    group.bench_function("default_path", |b| {
        b.iter(|| resolve_field_path(black_box(&flat), black_box("")));
    });

    group.bench_function("nested_dotted", |b| {
        b.iter(|| resolve_field_path(black_box(&nested), black_box("data.images.1.src.original")));
    });

    group.bench_function("nested_bracket", |b| {
        b.iter(|| resolve_field_path(black_box(&nested), black_box("data.images[1].src.original")));
    });

    group.bench_function("missing_segment", |b| {
        b.iter(|| resolve_field_path(black_box(&nested), black_box("data.images.9.src")));
    });

    group.finish();
}

fn bench_extract_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_path/extract_url");

    let body = r#"{"status":true,"data":{"url":"https://img.example.com/x.png","width":1920}}"#;
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("parse_and_resolve", |b| {
        b.iter(|| extract_url(black_box(body), black_box("data.url")));
    });

    group.finish();
}

fn bench_config_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("source_config/parse");

    let manual_text = (0..200)
        .map(|i| format!("https://img.example.com/{}.jpg", i))
        .collect::<Vec<_>>()
        .join("\n");
    group.bench_function("manual_text_200", |b| {
        b.iter(|| DataSourceConfig::parse(SourceType::Manual, black_box(&manual_text)));
    });

    let api = r#"{"url":"https://api.example.com/random","headers":{"Accept":"application/json"},"url_field":"data.url"}"#;
    group.bench_function("api_get", |b| {
        b.iter(|| DataSourceConfig::parse(SourceType::ApiGet, black_box(api)));
    });

    let s3 = r#"{"endpoint":"https://s3.example.com","bucket_name":"pics","access_key_id":"k","secret_access_key":"s","folder_path":"cats","file_extensions":["jpg","png"]}"#;
    group.bench_function("s3", |b| {
        b.iter(|| DataSourceConfig::parse(SourceType::S3, black_box(s3)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve_field_path,
    bench_extract_url,
    bench_config_parse
);
criterion_main!(benches);
