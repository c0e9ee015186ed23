use sclp_offload::{ChecksumState, GroTable, OffloadBuilder, SclpHeader, Segment};
use std::time::{Duration, Instant};

fn benchmark_gso(payload_len: usize, mss: u16, iterations: usize, tx_offload: bool) {
    let offload = OffloadBuilder::new()
        .tx_checksum_offload(tx_offload)
        .build()
        .unwrap();
    let payload = vec![0x5au8; payload_len];
    let mut total_time = Duration::ZERO;
    let mut total_segs = 0usize;

    for _ in 0..iterations {
        let seg = Segment::build(&SclpHeader::new(1, 2, 3), &payload);
        let start = Instant::now();
        let segs = offload.segment_outbound(seg, mss).unwrap();
        total_time += start.elapsed();
        total_segs += segs.len();
    }

    let throughput = (iterations * payload_len) as f64 / total_time.as_secs_f64();
    println!(
        "GSO {} bytes @ mss {} ({}):",
        payload_len,
        mss,
        if tx_offload { "delegated csum" } else { "software csum" }
    );
    println!("  Total time: {:?}", total_time);
    println!("  Average time: {:?}", total_time / iterations as u32);
    println!("  Segments: {}", total_segs / iterations);
    println!("  Throughput: {:.2} MB/s", throughput / 1_000_000.0);
}

fn benchmark_gro(payload_len: usize, mss: u16, flows: u16, iterations: usize) {
    let offload = OffloadBuilder::new().build().unwrap();
    let payload = vec![0xa5u8; payload_len];

    let mut wire = Vec::new();
    for flow in 0..flows {
        let seg = Segment::build(&SclpHeader::new(flow, 2, 3), &payload);
        wire.push(offload.segment_outbound(seg, mss).unwrap());
    }
    // Round-robin across flows, the worst case for matching.
    let depth = wire.iter().map(Vec::len).max().unwrap_or(0);
    let mut interleaved = Vec::new();
    for i in 0..depth {
        for segs in &wire {
            if let Some(seg) = segs.get(i) {
                let mut seg = seg.clone();
                seg.csum = ChecksumState::Unchecked;
                interleaved.push(seg);
            }
        }
    }

    let mut table = GroTable::new();
    let mut total_time = Duration::ZERO;
    let mut delivered = 0usize;
    for _ in 0..iterations {
        let batch = interleaved.clone();
        let start = Instant::now();
        delivered += table.receive_batch(&offload, batch).len();
        total_time += start.elapsed();
    }

    let bytes = iterations * payload_len * usize::from(flows);
    println!(
        "GRO {} flows x {} bytes @ mss {}:",
        flows, payload_len, mss
    );
    println!("  Total time: {:?}", total_time);
    println!("  Segments per batch: {}", interleaved.len());
    println!("  Buffers delivered per batch: {}", delivered / iterations);
    println!(
        "  Throughput: {:.2} MB/s",
        bytes as f64 / total_time.as_secs_f64() / 1_000_000.0
    );
}

fn main() {
    let iterations = 10_000;

    println!("=== SCLP GSO Benchmark ===");
    println!("Iterations: {}\n", iterations);
    for payload_len in [4_000, 16_000, 60_000] {
        benchmark_gso(payload_len, 1400, iterations, false);
        benchmark_gso(payload_len, 1400, iterations, true);
        println!();
    }

    println!("=== SCLP GRO Benchmark ===");
    for flows in [1, 4, 8] {
        benchmark_gro(16_000, 1400, flows, iterations / 10);
        println!();
    }
}
