//! End-to-end scenarios exercising the public surface across layers: chunk
//! codec, super-chunk, frame serialization, reorder, and the N-D array.

use b2core::b2nd;
use b2core::chunk;
use b2core::config::{CParams, DParams};
use b2core::constants::{BLOSC_BITSHUFFLE, BLOSC_LZ4};
use b2core::frame;
use b2core::schunk::{Storage, SuperChunk};

#[test]
fn integer_roundtrip_with_bitshuffle_and_lz4() {
    let src: Vec<u8> = (0i32..100_000).flat_map(|i| i.to_le_bytes()).collect();
    let params = CParams::default()
        .with_codec(BLOSC_LZ4)
        .with_typesize(4)
        .with_filter(BLOSC_BITSHUFFLE)
        .with_nthreads(2);

    let chunk = chunk::compress(&params, &src).unwrap();
    assert!(chunk.len() < 4 * 100_000);

    let mut dst = vec![0u8; src.len()];
    let dparams = DParams::default().with_nthreads(2);
    chunk::decompress(&dparams, &chunk, &mut dst).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn special_zeros_fill_leaves_a_short_final_chunk() {
    const CHUNKSIZE: usize = 1000;
    const N: usize = 3;
    let itemsize = 4;
    let full_chunk_bytes = CHUNKSIZE * itemsize;
    let total_items = N * CHUNKSIZE + 1;
    let mut remaining_items = total_items;

    let mut sc = SuperChunk::new(Storage::InMemory, CParams::default().with_typesize(itemsize), DParams::default());
    while remaining_items > 0 {
        let items_this_chunk = remaining_items.min(CHUNKSIZE);
        let nbytes = items_this_chunk * itemsize;
        let cbuf = chunk::chunk_zeros(itemsize, nbytes).unwrap();
        sc.append_chunk(cbuf).unwrap();
        remaining_items -= items_this_chunk;
    }

    assert_eq!(sc.nchunks(), N + 1);
    for i in 0..N {
        let mut out = vec![0xffu8; full_chunk_bytes];
        sc.decompress_chunk(i, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }
    let mut last = vec![0xffu8; itemsize];
    sc.decompress_chunk(N, &mut last).unwrap();
    assert_eq!(last, vec![0u8; itemsize]);
}

#[test]
fn frame_self_compare_across_memory_and_file() {
    const NCHUNKS: usize = 10;
    const ITEMS_PER_CHUNK: usize = 2000;
    let itemsize = 4;

    let mut sc = SuperChunk::new(
        Storage::InMemory,
        CParams::default().with_typesize(itemsize),
        DParams::default(),
    );
    for k in 0..NCHUNKS {
        let data: Vec<u8> = (0..ITEMS_PER_CHUNK as i32)
            .flat_map(|i| (i * k as i32).to_le_bytes())
            .collect();
        sc.append_buffer(&data).unwrap();
    }

    let f1 = frame::to_bytes(&sc).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("self_compare.b2frame");
    frame::to_file(&sc, &path).unwrap();
    let sc3 = frame::open_file(&path).unwrap();
    let f3 = frame::to_bytes(&sc3).unwrap();

    assert_eq!(f1, f3);
}

#[test]
fn reorder_preserves_content() {
    const N: usize = 50;
    let itemsize = 4;
    let mut sc = SuperChunk::new(Storage::InMemory, CParams::default().with_typesize(itemsize), DParams::default());
    for k in 0..N {
        let data: Vec<u8> = (0..16i32).flat_map(|i| (i + k as i32 * 1000).to_le_bytes()).collect();
        sc.append_buffer(&data).unwrap();
    }

    let chunk_content = |sc: &SuperChunk, i: usize| -> Vec<u8> {
        let mut out = vec![0u8; 16 * itemsize];
        sc.decompress_chunk(i, &mut out).unwrap();
        out
    };
    let original_chunk_3 = chunk_content(&sc, 3);
    let original_chunk_6 = chunk_content(&sc, 6);

    let perm: Vec<usize> = (0..N).map(|i| (i + 3) % N).collect();
    sc.reorder_offsets(&perm).unwrap();
    assert_eq!(chunk_content(&sc, 0), original_chunk_3);

    sc.reorder_offsets(&perm).unwrap();
    assert_eq!(chunk_content(&sc, 0), original_chunk_6);
}

#[test]
fn nd_slice_matches_dense_buffer() {
    let shape = vec![10i64, 10, 10];
    let chunkshape = vec![4i64, 4, 4];
    let blockshape = vec![2i64, 2, 2];
    let itemsize = 8;

    let total: i64 = shape.iter().product();
    let src: Vec<u8> = (0..total).flat_map(|i| i.to_le_bytes()).collect();

    let arr = b2nd::from_cbuffer(
        Storage::InMemory,
        CParams::default(),
        DParams::default(),
        shape,
        chunkshape,
        blockshape,
        itemsize,
        0,
        "<i8".to_string(),
        &src,
    )
    .unwrap();

    let mut dense = vec![0u8; src.len()];
    arr.to_cbuffer(&mut dense).unwrap();
    assert_eq!(dense, src);

    let mut got = vec![0u8; itemsize];
    arr.get_slice_cbuffer(&[2, 5, 0], &[3, 6, 1], &mut got).unwrap();
    let value = i64::from_le_bytes(got.try_into().unwrap());
    assert_eq!(value, 2 * 100 + 5 * 10);
}

#[test]
fn concat_fast_path_matches_slow_path() {
    let shape = vec![2i64, 50, 50];
    let chunkshape = shape.clone();
    let blockshape = vec![2i64, 10, 10];
    let itemsize = 2;

    let make = |fill: i64| -> Vec<u8> {
        let total: i64 = shape.iter().product();
        (0..total).flat_map(|i| ((i + fill) as u16).to_le_bytes()).collect()
    };
    let src_a = make(0);
    let src_b = make(100_000);

    let new_pair = || {
        let a = b2nd::from_cbuffer(
            Storage::InMemory,
            CParams::default(),
            DParams::default(),
            shape.clone(),
            chunkshape.clone(),
            blockshape.clone(),
            itemsize,
            0,
            "<u2".to_string(),
            &src_a,
        )
        .unwrap();
        let b = b2nd::from_cbuffer(
            Storage::InMemory,
            CParams::default(),
            DParams::default(),
            shape.clone(),
            chunkshape.clone(),
            blockshape.clone(),
            itemsize,
            0,
            "<u2".to_string(),
            &src_b,
        )
        .unwrap();
        (a, b)
    };

    let (a1, b1) = new_pair();
    let c1 = b2nd::concatenate(a1, b1, 0, false).unwrap();
    assert_eq!(c1.sc.nchunks(), 2);

    let (a2, b2) = new_pair();
    let c2 = b2nd::concatenate(a2, b2, 0, true).unwrap();

    let mut buf1 = vec![0u8; (c1.shape.iter().product::<i64>() as usize) * itemsize];
    let mut buf2 = vec![0u8; buf1.len()];
    c1.to_cbuffer(&mut buf1).unwrap();
    c2.to_cbuffer(&mut buf2).unwrap();
    assert_eq!(buf1, buf2);
}
