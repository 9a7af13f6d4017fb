//! Two-thread SPSC demonstration: an ingress thread generates a request
//! stream and the engine thread drains it through the ring buffer.
//!
//! The engine thread owns the book exclusively, so it needs no locks; the
//! ring buffer is the entire concurrency boundary.

use std::thread;
use std::time::Instant;

use tickmatch::{runtime, Engine, OrderRequest, RingBuffer, Side};

const REQUESTS: u64 = 500_000;
const RING_CAPACITY: usize = 1024;
const ENGINE_CAPACITY: u32 = 1_000_000;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let (mut producer, mut consumer) = RingBuffer::with_capacity(RING_CAPACITY);

    let started = Instant::now();

    // Ingress thread: generate requests as fast as possible. On a full
    // ring it spins rather than sleeping; a context switch costs more
    // than the engine needs to drain a slot.
    let ingress = thread::spawn(move || {
        for i in 0..REQUESTS {
            let request = if i % 10 == 9 && i >= 30 {
                // Occasionally cancel an order placed a little earlier;
                // some targets will already be filled, which the engine
                // reports and survives.
                OrderRequest::cancel(i - 21)
            } else {
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                OrderRequest::submit(i, 100 + i % 10, 10, side)
            };

            while !producer.push(request) {
                std::hint::spin_loop();
            }
        }
    });

    // Engine thread: pinned, warmed, drains exactly REQUESTS messages.
    let engine_thread = thread::spawn(move || {
        runtime::pin_current_thread();

        let mut engine = Engine::with_capacity(ENGINE_CAPACITY);
        engine.warm_up();

        let trades = runtime::run(&mut engine, &mut consumer, REQUESTS);
        (engine, trades)
    });

    ingress.join().expect("ingress thread panicked");
    let (engine, trades) = engine_thread.join().expect("engine thread panicked");

    let elapsed = started.elapsed();
    engine.check_invariants();

    println!("--- SIMULATION COMPLETE ---");
    println!("requests:   {REQUESTS}");
    println!("trades:     {trades}");
    println!(
        "throughput: {:.2} M req/s",
        REQUESTS as f64 / elapsed.as_secs_f64() / 1e6
    );
    println!("resting:    {} orders", engine.order_count());
    println!(
        "top of book: bid {:?} / ask {:?}",
        engine.best_bid(),
        engine.best_ask()
    );

    println!("\nbook depth (best 5 per side):");
    for level in engine
        .snapshot()
        .filter(|l| l.side == Side::Buy)
        .take(5)
        .chain(engine.snapshot().filter(|l| l.side == Side::Sell).take(5))
    {
        println!("  {:?} {:>6} | vol {:>8}", level.side, level.price, level.volume);
    }
}
