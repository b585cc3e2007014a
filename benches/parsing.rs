use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use mboxview::config::ParserConfig;
use mboxview::model::mail::Message;

fn bench_split_mbox(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("simple.mbox");

    c.bench_function("split_simple_mbox", |b| {
        b.iter(|| {
            let parser = mboxview::parser::mbox::MboxParser::new(&fixture_path).unwrap();
            let mut count = 0u64;
            parser
                .parse(&mut |_index, _bytes| {
                    count += 1;
                    true
                })
                .unwrap();
            count
        })
    });
}

fn bench_decode_multipart(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("multipart.mbox");
    let raw = std::fs::read(fixture_path).unwrap();
    let config = ParserConfig::default();

    c.bench_function("decode_multipart_body", |b| {
        b.iter(|| {
            let message = Message::split(&raw);
            mboxview::parser::mime::decode_body(&message.headers(), message.body, &config)
        })
    });
}

criterion_group!(benches, bench_split_mbox, bench_decode_multipart);
criterion_main!(benches);
