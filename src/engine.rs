//! Matching engine - owns the pool, both side books and the identifier
//! index, and applies submissions and cancellations under strict
//! price-time priority.
//!
//! A submission first rests at the tail of its price level, then the cross
//! loop trades the best bid against the best ask for as long as the spread
//! is inverted. The execution price is always the passive side's price,
//! which in this loop is the ask-side price.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::book::Book;
use crate::pool::{Pool, SlotIndex, NULL_SLOT};
use crate::price_level::PriceLevel;
use crate::request::{EngineError, LevelSnapshot, OrderId, Price, Qty, Side, TradeEvent};

/// Single-threaded matching core.
///
/// All state is exclusively owned; exactly one thread may drive an engine.
/// Cross-thread ingress goes through the [`spsc`](crate::spsc) ring buffer,
/// never through shared access to the engine itself.
pub struct Engine {
    pool: Pool,
    book: Book,
    /// Trades produced by the most recent submit. Reserved up front so the
    /// cross loop never reallocates: one submission can fill at most every
    /// resting order plus itself.
    trades: Vec<TradeEvent>,
}

impl Engine {
    /// Create an engine able to hold `capacity` resting orders.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            book: Book::with_capacity(capacity as usize),
            trades: Vec::with_capacity(capacity as usize + 1),
        }
    }

    /// Submit a limit order.
    ///
    /// Returns the trades executed by this submission, in execution order;
    /// the slice is empty when the order rested without crossing. A
    /// duplicate identifier is a silent no-op (`Ok` with no trades, no book
    /// mutation). Pool exhaustion drops the submission whole and reports
    /// [`EngineError::PoolExhausted`].
    ///
    /// # Panics
    /// `qty` must be strictly positive; a zero-quantity submission is a
    /// caller bug and aborts.
    pub fn submit(
        &mut self,
        id: OrderId,
        price: Price,
        qty: Qty,
        side: Side,
    ) -> Result<&[TradeEvent], EngineError> {
        assert!(qty > 0, "submission quantity must be positive (order {id})");

        self.trades.clear();

        // Idempotency guard: a retried submission must not create a
        // phantom order.
        if self.book.contains(id) {
            return Ok(&self.trades);
        }

        let slot = self
            .pool
            .acquire(id, price, qty, side)
            .ok_or(EngineError::PoolExhausted { id })?;

        self.book.insert(id, slot);
        self.book
            .level_or_insert(side, price)
            .append(&mut self.pool, slot);

        self.cross();

        Ok(&self.trades)
    }

    /// Cancel a resting order, returning its remaining quantity.
    ///
    /// An identifier not present in the book reports
    /// [`EngineError::UnknownOrder`] and changes nothing.
    pub fn cancel(&mut self, id: OrderId) -> Result<Qty, EngineError> {
        let slot = self
            .book
            .lookup(id)
            .ok_or(EngineError::UnknownOrder { id })?;

        let order = *self.pool.get(slot);
        if order.id != id {
            panic!("index maps order {id} to a record holding order {}", order.id);
        }

        let level = self
            .book
            .level_mut(order.side, order.price)
            .unwrap_or_else(|| {
                panic!(
                    "indexed order {id} has no {:?} level at price {}",
                    order.side, order.price
                )
            });

        level.remove(&mut self.pool, slot);
        if level.is_empty() {
            self.book.remove_level(order.side, order.price);
        }
        self.book.remove_id(id);
        self.pool.release(slot);

        Ok(order.qty)
    }

    /// Cross the spread until it is no longer inverted.
    ///
    /// Each iteration fills min(head bid remaining, head ask remaining) and
    /// retires whichever head(s) reach zero, so every iteration makes
    /// progress and the loop terminates.
    fn cross(&mut self) {
        loop {
            let (bid_price, ask_price) = match (self.book.best_bid(), self.book.best_ask()) {
                (Some(bid), Some(ask)) if bid >= ask => (bid, ask),
                _ => break,
            };

            let (bid_level, ask_level) = self
                .book
                .best_levels_mut()
                .expect("both sides non-empty inside the cross loop");

            let bid_slot = bid_level.head();
            let ask_slot = ask_level.head();
            debug_assert!(bid_slot != NULL_SLOT && ask_slot != NULL_SLOT);

            let (bid_id, bid_qty) = {
                let order = self.pool.get(bid_slot);
                (order.id, order.qty)
            };
            let (ask_id, ask_qty) = {
                let order = self.pool.get(ask_slot);
                (order.id, order.qty)
            };

            let fill = bid_qty.min(ask_qty);

            bid_level.reduce(fill);
            ask_level.reduce(fill);
            self.pool.get_mut(bid_slot).qty -= fill;
            self.pool.get_mut(ask_slot).qty -= fill;

            // Passive side sets the execution price
            self.trades.push(TradeEvent {
                price: ask_price,
                qty: fill,
                buy_order_id: bid_id,
                sell_order_id: ask_id,
            });

            if bid_qty == fill {
                self.retire(Side::Buy, bid_price, bid_slot, bid_id);
            }
            if ask_qty == fill {
                self.retire(Side::Sell, ask_price, ask_slot, ask_id);
            }
        }
    }

    /// Unlink a fully filled order, erase it from the index and release its
    /// slot; drops the level if it drained empty.
    fn retire(&mut self, side: Side, price: Price, slot: SlotIndex, id: OrderId) {
        let level = self.book.level_mut(side, price).unwrap_or_else(|| {
            panic!("fully filled order {id} has no {side:?} level at price {price}")
        });

        level.remove(&mut self.pool, slot);
        if level.is_empty() {
            self.book.remove_level(side, price);
        }

        if self.book.remove_id(id) != Some(slot) {
            panic!("index entry for filled order {id} is missing or inconsistent");
        }
        self.pool.release(slot);
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    /// Highest resting bid price
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    /// Lowest resting ask price
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    /// Best ask minus best bid, when both sides rest
    #[inline]
    pub fn spread(&self) -> Option<Price> {
        self.book.spread()
    }

    /// Number of orders resting in the book
    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    /// True when `id` currently rests in the book
    #[inline]
    pub fn contains(&self, id: OrderId) -> bool {
        self.book.contains(id)
    }

    /// Pool slots currently in use
    #[inline]
    pub fn live_orders(&self) -> u32 {
        self.pool.live()
    }

    /// Pool capacity this engine was constructed with
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.pool.capacity()
    }

    /// Aggregate volume resting at (side, price)
    #[inline]
    pub fn volume_at(&self, side: Side, price: Price) -> Qty {
        self.book.volume_at(side, price)
    }

    /// Walk the live book: bid levels in descending price order, then ask
    /// levels in ascending price order.
    ///
    /// This is the read surface dashboards consume; it allocates nothing.
    pub fn snapshot(&self) -> impl Iterator<Item = LevelSnapshot> + '_ {
        let bids = self.book.bids_descending().map(|level| LevelSnapshot {
            side: Side::Buy,
            price: level.price(),
            volume: level.volume(),
        });
        let asks = self.book.asks_ascending().map(|level| LevelSnapshot {
            side: Side::Sell,
            price: level.price(),
            volume: level.volume(),
        });
        bids.chain(asks)
    }

    /// Pre-fault the pool's backing pages before the first order arrives.
    pub fn warm_up(&mut self) {
        self.pool.warm_up();
    }

    /// Fingerprint of the live book state, for determinism testing.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for level in self.snapshot() {
            level.side.hash(&mut hasher);
            level.price.hash(&mut hasher);
            level.volume.hash(&mut hasher);
        }
        self.book.order_count().hash(&mut hasher);
        self.pool.live().hash(&mut hasher);
        hasher.finish()
    }

    /// Exhaustive consistency walk over every engine structure.
    ///
    /// Verifies the index mirrors the linked records, chains are
    /// well-formed, cached volumes match, level prices are strictly
    /// monotonic per side, the spread is not inverted, and the pool's live
    /// and free slots partition its capacity. Panics on any violation.
    /// O(orders) - intended for tests and debugging, never the hot path.
    pub fn check_invariants(&self) {
        let mut linked = vec![false; self.pool.capacity() as usize];
        let mut total = 0usize;

        let mut prev_price: Option<Price> = None;
        for level in self.book.bids_descending() {
            if let Some(prev) = prev_price {
                assert!(level.price() < prev, "bid levels not strictly descending");
            }
            prev_price = Some(level.price());
            total += self.check_level(level, Side::Buy, &mut linked);
        }

        prev_price = None;
        for level in self.book.asks_ascending() {
            if let Some(prev) = prev_price {
                assert!(level.price() > prev, "ask levels not strictly ascending");
            }
            prev_price = Some(level.price());
            total += self.check_level(level, Side::Sell, &mut linked);
        }

        if let (Some(bid), Some(ask)) = (self.book.best_bid(), self.book.best_ask()) {
            assert!(bid < ask, "book left crossed: best bid {bid} >= best ask {ask}");
        }

        assert_eq!(total, self.book.order_count(), "index size != linked records");
        assert_eq!(total as u32, self.pool.live(), "pool live count != linked records");

        let mut free = 0u32;
        for slot in self.pool.free_indices() {
            assert!(
                !linked[slot as usize],
                "slot {slot} is both linked and on the free stack"
            );
            // Reuse the marker array to catch a slot freed twice
            linked[slot as usize] = true;
            free += 1;
        }
        assert_eq!(
            total as u32 + free,
            self.pool.capacity(),
            "live and free slots do not partition the pool"
        );
    }

    fn check_level(&self, level: &PriceLevel, side: Side, linked: &mut [bool]) -> usize {
        assert!(!level.is_empty(), "empty level retained in {side:?} book");

        let mut slot = level.head();
        let mut prev = NULL_SLOT;
        let mut volume: Qty = 0;
        let mut count = 0usize;

        while slot != NULL_SLOT {
            let order = self.pool.get(slot);
            assert_eq!(order.prev, prev, "broken back-link at slot {slot}");
            assert_eq!(order.side, side, "record on the wrong side at slot {slot}");
            assert_eq!(order.price, level.price(), "record price != level price");
            assert!(order.qty > 0, "zero-quantity record linked (order {})", order.id);
            assert_eq!(
                self.book.lookup(order.id),
                Some(slot),
                "linked order {} missing from the index",
                order.id
            );
            assert!(!linked[slot as usize], "slot {slot} linked twice");
            linked[slot as usize] = true;

            volume += order.qty;
            count += 1;
            prev = slot;
            slot = order.next;
        }

        assert_eq!(level.volume(), volume, "cached volume out of sync at {}", level.price());
        count
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_capacity(1_000_000)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("book", &self.book)
            .field("pool", &self.pool)
            .finish()
    }
}
