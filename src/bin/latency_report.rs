//! Per-operation latency percentiles over a synthetic request stream.
//!
//! Criterion gives throughput numbers; this binary reports the full
//! latency distribution, which is what actually matters at the tail.

use std::time::Instant;

use hdrhistogram::Histogram;
use tickmatch::{runtime, Engine, OrderRequest, Side};

const ITERATIONS: u64 = 1_000_000;
const STREAM_LEN: usize = 10_000;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    println!("preparing latency run...");

    let mut engine = Engine::with_capacity(100_000);
    engine.warm_up();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3).unwrap();

    // Pre-generate the request stream so no RNG or allocation pollutes the
    // measured section. Bids and asks straddle a 100-tick band so a healthy
    // fraction of submissions cross.
    let mut stream = Vec::with_capacity(STREAM_LEN);
    for i in 0..STREAM_LEN as u64 {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        stream.push(OrderRequest::submit(i + 1, 10_000 + i % 100, 10, side));
    }

    // Train the branch predictor and fault in the pool pages before
    // measuring
    println!("warming up ({STREAM_LEN} ops)...");
    for request in &stream {
        std::hint::black_box(runtime::apply(&mut engine, *request));
    }

    println!("running {ITERATIONS} iterations...");

    let mut requests = stream.into_iter().cycle();
    let mut next_id = STREAM_LEN as u64 + 1;
    let mut total = std::time::Duration::ZERO;

    for _ in 0..ITERATIONS {
        let mut request = requests.next().unwrap();
        request.id = next_id;
        next_id += 1;

        let start = Instant::now();
        std::hint::black_box(runtime::apply(&mut engine, request));
        let elapsed = start.elapsed();

        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total += elapsed;
    }

    println!("\n=== Latency Report (ns) ===");
    println!("ops:        {ITERATIONS}");
    println!(
        "throughput: {:.2} M ops/sec",
        ITERATIONS as f64 / total.as_secs_f64() / 1e6
    );
    println!("---------------------------");
    println!("min:    {:6} ns", histogram.min());
    println!("p50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("p90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("p99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("p99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("p99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("max:    {:6} ns", histogram.max());
}
