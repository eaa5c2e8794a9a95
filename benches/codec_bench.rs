//! Performance benchmarks for the line codec.
//!
//! These benchmarks measure parse and serialize throughput for the
//! control-line paths that sit on every message round trip.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tokio_util::codec::Decoder;

use framecast_protocol::{
    Assignment, ImageBinaryData, LineDecoder, Parser, Serializer, Success,
};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, line) in [
        ("command", "gis"),
        ("inquiry", "fr?"),
        ("assignment_int", "it=5000"),
        ("assignment_double", "fr=12.5"),
        ("assignment_string", "mode={freerun}"),
        ("assignment_indexed", "tap[0][1]=3"),
        ("reject", "42=foo"),
    ] {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(Parser::parse(black_box(line))));
        });
    }

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    group.bench_function("assignment_success", |b| {
        b.iter(|| {
            let assignment = Assignment::new("it", 5000).unwrap();
            black_box(Serializer::serialize(Success::from_assignment(assignment).into()).unwrap())
        });
    });

    for (height, width) in [(480u64, 640u64), (1024, 1280)] {
        let num_bytes = (height * width * 2) as usize;
        group.throughput(Throughput::Bytes(num_bytes as u64));
        group.bench_with_input(
            BenchmarkId::new("image", format!("{height}x{width}")),
            &(height, width),
            |b, &(height, width)| {
                b.iter(|| {
                    let pixels = vec![0u8; (height * width * 2) as usize];
                    let image = ImageBinaryData::new(pixels, [height, width], vec![]).unwrap();
                    black_box(Serializer::serialize(image.into()).unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_line_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_decoder");

    let burst: String = std::iter::repeat("fr=10.0\nisl=4\ngis\n").take(32).collect();
    group.throughput(Throughput::Bytes(burst.len() as u64));
    group.bench_function("burst_96_lines", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new();
            let mut buffer = BytesMut::from(burst.as_bytes());
            while let Ok(Some(line)) = decoder.decode(&mut buffer) {
                black_box(line);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_serialize, bench_line_decoder);
criterion_main!(benches);
