use rand::Rng;
use shaped_bloom::{BloomFilter, BloomHandle};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const FP_RATE: f64 = 0.01;
const QUERY_COUNT: usize = 10_000;

struct Row {
    elements: u32,
    engine_insert_rate: f64,
    engine_query_rate: f64,
    handle_insert_rate: f64,
    false_positives: usize,
    measured_fpr: f64,
}

fn rate(ops: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        ops as f64 / seconds
    } else {
        f64::INFINITY
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Rust Micro Benchmark - engine vs. boundary handle");
    println!("{}", "=".repeat(55));

    let element_counts: Vec<u32> = vec![1_000, 10_000, 100_000];
    println!("Testing element counts: {:?} at fp={}", element_counts, FP_RATE);
    println!();

    let mut rng = rand::thread_rng();
    let mut results = Vec::new();

    for &n_elements in &element_counts {
        println!("Testing {} elements...", n_elements);
        let keys: Vec<u32> = (0..n_elements).collect();

        let mut filter = BloomFilter::with_estimates(u64::from(n_elements), FP_RATE)?;
        let start = Instant::now();
        filter.add_many(&keys);
        let engine_insert_time = start.elapsed().as_secs_f64();

        // Probe keys are drawn above the inserted range, so every hit is a false positive
        let probes: Vec<u32> = (0..QUERY_COUNT)
            .map(|_| rng.gen_range(n_elements..u32::MAX))
            .collect();
        let start = Instant::now();
        let false_positives = filter.test_many(&probes).into_iter().filter(|&hit| hit).count();
        let engine_query_time = start.elapsed().as_secs_f64();

        // The handle re-encodes its buffer on every mutating call; batch once
        let mut handle = BloomHandle::open_with_estimates(u64::from(n_elements), FP_RATE)?;
        let start = Instant::now();
        handle.add_many(&keys);
        let handle_insert_time = start.elapsed().as_secs_f64();

        let row = Row {
            elements: n_elements,
            engine_insert_rate: rate(keys.len(), engine_insert_time),
            engine_query_rate: rate(probes.len(), engine_query_time),
            handle_insert_rate: rate(keys.len(), handle_insert_time),
            false_positives,
            measured_fpr: false_positives as f64 / probes.len() as f64,
        };
        println!(
            "   Done - Insert rate: {:.0} ops/s, Query rate: {:.0} ops/s",
            row.engine_insert_rate, row.engine_query_rate
        );
        println!("   {}", filter.stats().to_string().replace('\n', "\n   "));
        results.push(row);
    }

    println!("\nResults (CSV format):");
    println!("elements,engine_insert_rate,engine_query_rate,handle_insert_rate,false_positives,measured_fpr");
    for row in &results {
        println!(
            "{},{:.0},{:.0},{:.0},{},{:.6}",
            row.elements,
            row.engine_insert_rate,
            row.engine_query_rate,
            row.handle_insert_rate,
            row.false_positives,
            row.measured_fpr
        );
    }

    if let Some(last) = results.last() {
        println!("\nKey Findings (at {} elements):", last.elements);
        println!("   Target false positive rate: {:.4}", FP_RATE);
        println!("   Measured false positive rate: {:.4}", last.measured_fpr);
    }

    Ok(())
}
