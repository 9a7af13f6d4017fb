//! Engine-side drive loop: drain requests off the ring and apply them.
//!
//! Per-request failures that the engine reports at its boundary (pool
//! exhaustion, unknown cancel) are logged here and the loop moves on; they
//! must never stall the consumer.

use tracing::{debug, warn};

use crate::engine::Engine;
use crate::request::{Action, OrderRequest};
use crate::spsc::Consumer;

/// Apply one request to the engine, returning the number of trades it
/// produced.
///
/// Boundary failures are logged and swallowed; the request stream keeps
/// flowing. A dropped submission is worth a `warn`; a cancel that lost the
/// race against a fill is routine and only logged at `debug`.
#[inline]
pub fn apply(engine: &mut Engine, request: OrderRequest) -> usize {
    match request.action {
        Action::Submit => match engine.submit(request.id, request.price, request.qty, request.side)
        {
            Ok(trades) => trades.len(),
            Err(error) => {
                warn!(id = request.id, %error, "submission dropped");
                0
            }
        },
        Action::Cancel => match engine.cancel(request.id) {
            Ok(_) => 0,
            Err(error) => {
                debug!(id = request.id, %error, "cancel found nothing");
                0
            }
        },
    }
}

/// Busy-poll the ring until exactly `expected` requests have been applied.
///
/// Returns the total number of trades executed. The loop never suspends;
/// an empty ring is handled with a pause hint, matching the intended
/// deployment of two pinned, busy-looping cores.
pub fn run(engine: &mut Engine, requests: &mut Consumer<OrderRequest>, expected: u64) -> u64 {
    let mut processed = 0u64;
    let mut trades = 0u64;

    while processed < expected {
        match requests.pop() {
            Some(request) => {
                trades += apply(engine, request) as u64;
                processed += 1;
            }
            None => std::hint::spin_loop(),
        }
    }

    trades
}

/// Pin the current thread to the last available core.
///
/// The last core is the one most often isolated from OS interrupts.
/// Returns `false` when core enumeration is unavailable.
pub fn pin_current_thread() -> bool {
    core_affinity::get_core_ids()
        .and_then(|cores| cores.last().copied())
        .map(core_affinity::set_for_current)
        .unwrap_or(false)
}
