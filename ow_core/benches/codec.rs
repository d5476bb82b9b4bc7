use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ow_core::device::DeviceDescriptor;

fn bench_decode(c: &mut Criterion) {
    let desc = DeviceDescriptor::unit_scaled("bench", 4, 10);
    let blocks_per_transfer = 8;
    let usb_in = vec![0u8; ow_core::codec::input_block_len(&desc) * blocks_per_transfer];
    let mut dst = vec![0.0f32; blocks_per_transfer * 7 * desc.outputs];

    c.bench_function("decode_input", |b| {
        b.iter(|| ow_core::codec::decode_input(black_box(&usb_in), black_box(&mut dst), &desc, blocks_per_transfer))
    });
}

fn bench_encode(c: &mut Criterion) {
    let desc = DeviceDescriptor::unit_scaled("bench", 4, 10);
    let blocks_per_transfer = 8;
    let src = vec![0.0f32; blocks_per_transfer * 7 * desc.inputs];
    let mut usb_out = vec![0u8; ow_core::codec::output_block_len(&desc) * blocks_per_transfer];
    ow_core::codec::stamp_headers(&mut usb_out, &desc, blocks_per_transfer);

    c.bench_function("encode_output", |b| {
        b.iter(|| {
            ow_core::codec::encode_output(black_box(&src), black_box(&mut usb_out), &desc, blocks_per_transfer, 0)
        })
    });
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
