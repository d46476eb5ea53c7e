#[macro_use]
extern crate criterion;

use criterion::black_box;
use criterion::Criterion;
use crpc_codec::frame::{CompressType, Frame, MessageType, SerializerType};
use std::io::Cursor;

fn encode_decode(c: &mut Criterion) {
    let body = vec![0u8; 512];

    c.bench_function("frame_encode", move |b| {
        b.iter(|| {
            let frame = Frame::new(
                MessageType::Request,
                SerializerType::Gob,
                CompressType::Gzip,
                1,
                body.clone(),
            );
            let mut buf = Vec::new();
            frame.encode(&mut buf).unwrap();
            black_box(buf);
        })
    });
}

fn decode_only(c: &mut Criterion) {
    let frame = Frame::new(
        MessageType::Request,
        SerializerType::Gob,
        CompressType::Gzip,
        1,
        vec![0u8; 512],
    );
    let mut encoded = Vec::new();
    frame.encode(&mut encoded).unwrap();

    c.bench_function("frame_decode", move |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(encoded.clone());
            black_box(Frame::decode(&mut cursor).unwrap());
        })
    });
}

criterion_group!(benches, encode_decode, decode_only);
criterion_main!(benches);
