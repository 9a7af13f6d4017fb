//! Randomized workloads cross-checked against a naive reference book.
//!
//! The reference is slow but obviously correct: plain BTreeMaps of Vecs,
//! matching by scanning. The engine must agree with it on best prices,
//! order counts and traded volume at every step, and its internal
//! invariants must hold throughout.

use std::collections::{BTreeMap, HashMap};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tickmatch::{Engine, OrderRequest, Side};

/// Obviously-correct reference book: price -> FIFO of (id, qty)
struct ReferenceBook {
    bids: BTreeMap<u64, Vec<(u64, u64)>>,
    asks: BTreeMap<u64, Vec<(u64, u64)>>,
    orders: HashMap<u64, (Side, u64)>,
}

impl ReferenceBook {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
        }
    }

    fn best_bid(&self) -> Option<u64> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }

    fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Place and match; returns the total quantity traded
    fn place(&mut self, id: u64, side: Side, price: u64, mut qty: u64) -> u64 {
        if self.orders.contains_key(&id) {
            return 0;
        }

        let mut traded = 0u64;

        match side {
            Side::Buy => {
                let mut drained = Vec::new();
                for (&ask_price, queue) in self.asks.iter_mut() {
                    if ask_price > price || qty == 0 {
                        break;
                    }
                    while !queue.is_empty() && qty > 0 {
                        let fill = queue[0].1.min(qty);
                        queue[0].1 -= fill;
                        qty -= fill;
                        traded += fill;
                        if queue[0].1 == 0 {
                            let (maker, _) = queue.remove(0);
                            self.orders.remove(&maker);
                        }
                    }
                    if queue.is_empty() {
                        drained.push(ask_price);
                    }
                }
                for p in drained {
                    self.asks.remove(&p);
                }
                if qty > 0 {
                    self.bids.entry(price).or_default().push((id, qty));
                    self.orders.insert(id, (Side::Buy, price));
                }
            }
            Side::Sell => {
                let mut drained = Vec::new();
                let prices: Vec<u64> = self.bids.keys().rev().copied().collect();
                for bid_price in prices {
                    if bid_price < price || qty == 0 {
                        break;
                    }
                    let queue = self.bids.get_mut(&bid_price).unwrap();
                    while !queue.is_empty() && qty > 0 {
                        let fill = queue[0].1.min(qty);
                        queue[0].1 -= fill;
                        qty -= fill;
                        traded += fill;
                        if queue[0].1 == 0 {
                            let (maker, _) = queue.remove(0);
                            self.orders.remove(&maker);
                        }
                    }
                    if queue.is_empty() {
                        drained.push(bid_price);
                    }
                }
                for p in drained {
                    self.bids.remove(&p);
                }
                if qty > 0 {
                    self.asks.entry(price).or_default().push((id, qty));
                    self.orders.insert(id, (Side::Sell, price));
                }
            }
        }

        traded
    }

    fn cancel(&mut self, id: u64) -> bool {
        if let Some((side, price)) = self.orders.remove(&id) {
            let book = match side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            if let Some(queue) = book.get_mut(&price) {
                queue.retain(|(other, _)| *other != id);
                if queue.is_empty() {
                    book.remove(&price);
                }
            }
            true
        } else {
            false
        }
    }
}

fn random_submit(rng: &mut ChaCha8Rng, id: u64) -> OrderRequest {
    OrderRequest::submit(
        id,
        rng.gen_range(9_800..10_200) * 100,
        rng.gen_range(1..200),
        if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
    )
}

#[test]
fn test_fuzz_best_prices_match_reference() {
    const SEED: u64 = 0xFEEDFACE;
    const OPS: usize = 10_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut engine = Engine::with_capacity(100_000);
    let mut reference = ReferenceBook::new();

    let mut next_id = 1u64;
    let mut active: Vec<u64> = Vec::new();

    for op in 0..OPS {
        if active.is_empty() || rng.gen_bool(0.7) {
            let request = random_submit(&mut rng, next_id);
            next_id += 1;

            engine
                .submit(request.id, request.price, request.qty, request.side)
                .unwrap();
            reference.place(request.id, request.side, request.price, request.qty);
            active.push(request.id);
        } else {
            let idx = rng.gen_range(0..active.len());
            let id = active.swap_remove(idx);

            let engine_found = engine.cancel(id).is_ok();
            let reference_found = reference.cancel(id);
            assert_eq!(engine_found, reference_found, "cancel disagreement at op {op}");
        }

        assert_eq!(
            engine.best_bid(),
            reference.best_bid(),
            "best bid mismatch at op {op}"
        );
        assert_eq!(
            engine.best_ask(),
            reference.best_ask(),
            "best ask mismatch at op {op}"
        );

        if op % 50 == 0 {
            engine.check_invariants();
        }
    }

    engine.check_invariants();
    assert_eq!(engine.order_count(), reference.order_count());
}

#[test]
fn test_fuzz_order_counts_match_reference() {
    const SEED: u64 = 0xBADC0DE;
    const OPS: usize = 5_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut engine = Engine::with_capacity(100_000);
    let mut reference = ReferenceBook::new();

    let mut next_id = 1u64;
    let mut active: Vec<u64> = Vec::new();

    for op in 0..OPS {
        if active.is_empty() || rng.gen_bool(0.6) {
            let request = random_submit(&mut rng, next_id);
            next_id += 1;

            engine
                .submit(request.id, request.price, request.qty, request.side)
                .unwrap();
            reference.place(request.id, request.side, request.price, request.qty);

            // Only track ids that are actually resting
            if engine.contains(request.id) {
                active.push(request.id);
            }
        } else {
            let idx = rng.gen_range(0..active.len());
            let id = active.swap_remove(idx);
            let _ = engine.cancel(id);
            reference.cancel(id);
        }

        if op % 100 == 0 {
            assert_eq!(
                engine.order_count(),
                reference.order_count(),
                "order count mismatch at op {op}"
            );
        }
    }

    assert_eq!(engine.order_count(), reference.order_count());
}

#[test]
fn test_fuzz_traded_volume_matches_reference() {
    const SEED: u64 = 0x12345678;
    const OPS: u64 = 5_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut engine = Engine::with_capacity(100_000);
    let mut reference = ReferenceBook::new();

    let mut engine_traded = 0u64;
    let mut reference_traded = 0u64;

    for id in 1..=OPS {
        let request = random_submit(&mut rng, id);

        let trades = engine
            .submit(request.id, request.price, request.qty, request.side)
            .unwrap();
        engine_traded += trades.iter().map(|t| t.qty).sum::<u64>();
        reference_traded += reference.place(request.id, request.side, request.price, request.qty);
    }

    assert_eq!(
        engine_traded, reference_traded,
        "total traded volume diverged"
    );
    engine.check_invariants();
}
