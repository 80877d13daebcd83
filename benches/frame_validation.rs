//! Hot-path benchmarks for the two wire formats:
//! - Frame payload validation (accept and reject paths, padding strip)
//! - Command codec (request encode/split/parse, response encode/decode)
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

use sarathi::command::{
    Command, Response, decode_response, encode_request, encode_response, split_request,
};
use sarathi::video::{is_valid_frame, strip_padding};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Encode a real JPEG at the given resolution
fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        // Gradient fill so the payload compresses like camera output,
        // not like a flat test card
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

/// Same payload with the trailing padding some streamers append
fn padded_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = encoded_jpeg(width, height);
    bytes.extend_from_slice(&[0x00, 0x00, 0x0D, 0x0A]);
    bytes
}

/// A payload of the same size with no JPEG structure at all
fn garbage_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Group 1: Frame Validation
// ============================================================================

fn bench_frame_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_validation");

    // Typical camera resolutions for the stream
    for (width, height) in [(320u32, 240u32), (640, 480)] {
        let label = format!("{}x{}", width, height);
        let valid = encoded_jpeg(width, height);
        let padded = padded_jpeg(width, height);
        let garbage = garbage_payload(valid.len());

        group.throughput(Throughput::Bytes(valid.len() as u64));

        // Fast path: markers match at both ends
        group.bench_with_input(BenchmarkId::new("accept", &label), &valid, |b, buf| {
            b.iter(|| is_valid_frame(black_box(buf)))
        });

        // Padding forces the trailer search past the appended bytes
        group.bench_with_input(BenchmarkId::new("accept_padded", &label), &padded, |b, buf| {
            b.iter(|| is_valid_frame(black_box(buf)))
        });

        // Worst case: no markers anywhere, falls through to a decode attempt
        group.bench_with_input(BenchmarkId::new("reject_garbage", &label), &garbage, |b, buf| {
            b.iter(|| is_valid_frame(black_box(buf)))
        });
    }

    group.finish();
}

// ============================================================================
// Group 2: Padding Strip
// ============================================================================

fn bench_strip_padding(c: &mut Criterion) {
    let mut group = c.benchmark_group("strip_padding");

    let padded = padded_jpeg(320, 240);
    let clean = encoded_jpeg(320, 240);

    group.throughput(Throughput::Bytes(padded.len() as u64));
    group.bench_function("padded", |b| {
        b.iter(|| strip_padding(black_box(&padded)))
    });
    group.bench_function("no_padding", |b| {
        b.iter(|| strip_padding(black_box(&clean)))
    });

    group.finish();
}

// ============================================================================
// Group 3: Command Codec
// ============================================================================

fn bench_command_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_codec");

    let color_args: Vec<String> = ["2", "255", "0", "128"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Request encode with the widest argument list in the protocol
    group.bench_function("encode_request", |b| {
        b.iter(|| encode_request(black_box("SET_LED_COLOR"), black_box(&color_args)))
    });

    // Server-side receive path: split, then parse and validate
    group.bench_function("split_and_parse", |b| {
        let line = "MOVE_FORWARD#150\n";
        b.iter(|| {
            let (name, args) = split_request(black_box(line));
            Command::parse(name, &args)
        })
    });

    // Response encode for the common single-message case
    group.bench_function("encode_response", |b| {
        let response = Response::success("Moving forward at 100%");
        b.iter(|| encode_response(black_box(&response)))
    });

    // Client-side decode of a JSON response line
    group.bench_function("decode_response_json", |b| {
        let line = "{\"status\":\"success\",\"data\":42.7}\n";
        b.iter(|| decode_response(black_box(line)))
    });

    // Client-side decode of a plain-text line (wrap fallback)
    group.bench_function("decode_response_plain", |b| {
        let line = "OK\n";
        b.iter(|| decode_response(black_box(line)))
    });

    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(
    benches,
    bench_frame_validation,
    bench_strip_padding,
    bench_command_codec,
);

criterion_main!(benches);
