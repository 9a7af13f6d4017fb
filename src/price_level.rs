//! Price level - the FIFO queue of all orders resting at a single price.
//!
//! The queue is an intrusive doubly-linked list threaded through the
//! `prev`/`next` slot indices of the order records themselves, so append
//! and unlink-by-reference are O(1) with no per-node allocation.

use crate::pool::{Pool, SlotIndex, NULL_SLOT};
use crate::request::{Price, Qty};

/// A FIFO of orders at one price.
///
/// Head is the earliest-arrived unfilled order (first to match), tail the
/// latest. `volume` caches the sum of remaining quantities of the linked
/// chain; the cross loop keeps it synchronized by calling
/// [`reduce`](PriceLevel::reduce) for each fill, and
/// [`remove`](PriceLevel::remove) settles the rest by subtracting the
/// record's current remaining quantity at unlink time.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    price: Price,
    volume: Qty,
    head: SlotIndex,
    tail: SlotIndex,
}

impl PriceLevel {
    /// Create an empty level at `price`
    #[inline]
    pub const fn new(price: Price) -> Self {
        Self {
            price,
            volume: 0,
            head: NULL_SLOT,
            tail: NULL_SLOT,
        }
    }

    /// True when no order is linked at this level.
    ///
    /// The book removes empty levels immediately, so a stored level only
    /// reads as empty mid-operation.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.head == NULL_SLOT
    }

    /// The price this level represents
    #[inline]
    pub const fn price(&self) -> Price {
        self.price
    }

    /// Cached aggregate volume of the linked chain
    #[inline]
    pub const fn volume(&self) -> Qty {
        self.volume
    }

    /// Slot of the earliest-arrived order, [`NULL_SLOT`] when empty.
    ///
    /// The engine only consults the head of non-empty levels.
    #[inline]
    pub const fn head(&self) -> SlotIndex {
        self.head
    }

    /// Link a record at the tail (latest time priority).
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn append(&mut self, pool: &mut Pool, slot: SlotIndex) {
        debug_assert_eq!(pool.get(slot).price, self.price, "record price mismatch");

        if self.head == NULL_SLOT {
            debug_assert!(self.tail == NULL_SLOT);
            self.head = slot;
            self.tail = slot;
            let order = pool.get_mut(slot);
            order.prev = NULL_SLOT;
            order.next = NULL_SLOT;
        } else {
            pool.get_mut(self.tail).next = slot;
            let order = pool.get_mut(slot);
            order.prev = self.tail;
            order.next = NULL_SLOT;
            self.tail = slot;
        }

        self.volume += pool.get(slot).qty;
    }

    /// Unlink a record from anywhere in the queue.
    ///
    /// Subtracts the record's *current* remaining quantity from the cached
    /// volume and clears its linkage. The record is not released to the
    /// pool; that is the caller's job. The record must currently be linked
    /// in this level.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn remove(&mut self, pool: &mut Pool, slot: SlotIndex) {
        let (prev, next, qty) = {
            let order = pool.get(slot);
            (order.prev, order.next, order.qty)
        };

        if prev != NULL_SLOT {
            pool.get_mut(prev).next = next;
        } else {
            debug_assert_eq!(self.head, slot, "unlinking a record that is not the head");
            self.head = next;
        }

        if next != NULL_SLOT {
            pool.get_mut(next).prev = prev;
        } else {
            debug_assert_eq!(self.tail, slot, "unlinking a record that is not the tail");
            self.tail = prev;
        }

        let order = pool.get_mut(slot);
        order.prev = NULL_SLOT;
        order.next = NULL_SLOT;

        debug_assert!(self.volume >= qty, "volume underflow");
        self.volume -= qty;
    }

    /// Synchronize the cached volume after an in-place partial fill.
    #[inline]
    pub fn reduce(&mut self, qty: Qty) {
        debug_assert!(self.volume >= qty, "volume underflow");
        self.volume -= qty;
    }
}
