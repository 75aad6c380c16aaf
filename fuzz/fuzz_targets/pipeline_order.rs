#![no_main]

use std::io::Cursor;

use blocksig::{Md5Processor, Pipeline, SignatureConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, u8, u8, Vec<u8>)| {
    let (block_size, threads, arena, data) = input;
    if data.is_empty() {
        return;
    }

    let block_size = usize::from(block_size % 64) + 1;
    let threads = usize::from(threads % 4) + 1;
    let arena = usize::from(arena % 4) + 1;

    let config = SignatureConfig::new(block_size, threads)
        .unwrap()
        .with_arena_capacity(arena);
    let pipeline = Pipeline::new(config).unwrap();

    let mut signature = Vec::new();
    let stats = pipeline
        .run(
            &mut Cursor::new(&data),
            data.len() as u64,
            &mut signature,
            Md5Processor,
        )
        .unwrap();

    // Verify: one digest per block, in block order
    let expected: Vec<u8> = data
        .chunks(block_size)
        .flat_map(|block| Md5Processor::digest(block))
        .collect();
    assert_eq!(signature, expected);
    assert_eq!(stats.blocks, data.chunks(block_size).count() as u64);
    assert_eq!(stats.bytes_read, data.len() as u64);
});
