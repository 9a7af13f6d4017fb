//! Object pool - fixed-capacity slab of order records with O(1)
//! acquire/release.
//!
//! The backing array is allocated exactly once at construction; after that
//! the pool performs no heap traffic. Free slots are kept on a LIFO stack so
//! the most recently released record, the one most likely to still be warm
//! in L1/L2, is the first to be reused.

use std::fmt;

use crate::request::{OrderId, Price, Qty, Side};

/// Sentinel value representing a null/invalid slot (like nullptr)
pub const NULL_SLOT: u32 = u32::MAX;

/// Type alias for pool slot indices - our "compressed pointers".
/// A u32 index is half the size of a native pointer, which doubles how much
/// linkage metadata fits in a cache line.
pub type SlotIndex = u32;

/// A single order record - exactly 64 bytes (one cache line).
///
/// # Memory Layout
///
/// | Field  | Type | Offset | Size |
/// |--------|------|--------|------|
/// | price  | u64  | 0      | 8    |
/// | qty    | u64  | 8      | 8    |
/// | id     | u64  | 16     | 8    |
/// | next   | u32  | 24     | 4    |
/// | prev   | u32  | 28     | 4    |
/// | side   | u8   | 32     | 1    |
/// | (pad)  | -    | 33     | 31   |
///
/// `prev`/`next` are the intrusive FIFO linkage within a [`PriceLevel`]
/// (crate::PriceLevel); both are [`NULL_SLOT`] whenever the record is not
/// linked into a level.
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct Order {
    /// Limit price in integral ticks
    pub price: Price,

    /// Remaining (unfilled) quantity; strictly positive while linked
    pub qty: Qty,

    /// External order identifier
    pub id: OrderId,

    /// Slot of the next order at the same price level (later arrival)
    pub next: SlotIndex,

    /// Slot of the previous order at the same price level (earlier arrival)
    pub prev: SlotIndex,

    /// Buy or Sell
    pub side: Side,
}

// Compile-time assertion: Order must occupy exactly one cache line
const _: () = assert!(
    std::mem::size_of::<Order>() == 64,
    "Order must be exactly 64 bytes (one cache line)"
);

const _: () = assert!(
    std::mem::align_of::<Order>() == 64,
    "Order must be 64-byte aligned"
);

impl Order {
    /// Create a fresh, unlinked order record
    #[inline]
    pub const fn new(id: OrderId, price: Price, qty: Qty, side: Side) -> Self {
        Self {
            price,
            qty,
            id,
            next: NULL_SLOT,
            prev: NULL_SLOT,
            side,
        }
    }

    /// Placeholder value for slots that have never been acquired
    #[inline]
    const fn vacant() -> Self {
        Self::new(0, 0, 0, Side::Buy)
    }
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("id", &self.id)
            .field("price", &self.price)
            .field("qty", &self.qty)
            .field("side", &self.side)
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}

/// Pre-allocated record pool with O(1) acquire and release.
///
/// The free list is a stack of slot indices: release pushes, acquire pops.
/// No system calls or locks anywhere past construction.
pub struct Pool {
    /// Contiguous backing array of record slots
    slots: Vec<Order>,

    /// Indices of slots not currently held by the book (top = most
    /// recently released)
    free: Vec<SlotIndex>,

    /// Total capacity
    capacity: u32,
}

impl Pool {
    /// Create a pool holding up to `capacity` live orders.
    ///
    /// # Panics
    /// Panics if capacity is not below `u32::MAX` (reserved for [`NULL_SLOT`]).
    pub fn with_capacity(capacity: u32) -> Self {
        assert!(capacity < NULL_SLOT, "capacity must be below NULL_SLOT");

        let slots = vec![Order::vacant(); capacity as usize];
        let free: Vec<SlotIndex> = (0..capacity).collect();

        Self {
            slots,
            free,
            capacity,
        }
    }

    /// Acquire a slot and construct a fresh record in place.
    ///
    /// Returns `None` when the pool is exhausted; the caller decides how to
    /// surface that.
    ///
    /// # Complexity
    /// O(1) - pops the top of the free stack
    #[inline]
    pub fn acquire(
        &mut self,
        id: OrderId,
        price: Price,
        qty: Qty,
        side: Side,
    ) -> Option<SlotIndex> {
        let slot = self.free.pop()?;
        self.slots[slot as usize] = Order::new(id, price, qty, side);
        Some(slot)
    }

    /// Return a slot to the free stack.
    ///
    /// The caller must guarantee the slot was acquired from this pool and is
    /// not released twice; the engine upholds both by construction.
    ///
    /// # Complexity
    /// O(1) - pushes onto the free stack
    #[inline]
    pub fn release(&mut self, slot: SlotIndex) {
        debug_assert!(slot < self.capacity, "slot out of bounds");
        debug_assert!(
            (self.free.len() as u32) < self.capacity,
            "release with no outstanding acquisitions"
        );
        debug_assert!(
            self.slots[slot as usize].prev == NULL_SLOT
                && self.slots[slot as usize].next == NULL_SLOT,
            "released record is still linked"
        );
        self.free.push(slot);
    }

    /// Immutable access to a record.
    #[inline]
    pub fn get(&self, slot: SlotIndex) -> &Order {
        debug_assert!(slot < self.capacity, "slot out of bounds");
        &self.slots[slot as usize]
    }

    /// Mutable access to a record.
    #[inline]
    pub fn get_mut(&mut self, slot: SlotIndex) -> &mut Order {
        debug_assert!(slot < self.capacity, "slot out of bounds");
        &mut self.slots[slot as usize]
    }

    /// Number of records currently held by the book.
    #[inline]
    pub fn live(&self) -> u32 {
        self.capacity - self.free.len() as u32
    }

    /// Number of slots still available.
    #[inline]
    pub fn available(&self) -> u32 {
        self.free.len() as u32
    }

    /// Total capacity of the pool.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// True when no free slot remains.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }

    /// Iterate the indices currently on the free stack.
    ///
    /// Diagnostic surface for conservation checks; not used on the hot path.
    pub fn free_indices(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.free.iter().copied()
    }

    /// Pre-fault all backing pages (warm-up routine).
    ///
    /// Walks every slot so the OS maps virtual pages to physical RAM before
    /// the first real order arrives.
    pub fn warm_up(&mut self) {
        for order in &mut self.slots {
            unsafe {
                std::ptr::write_volatile(&mut order.qty, 0);
            }
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity)
            .field("live", &self.live())
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_record_size() {
        assert_eq!(std::mem::size_of::<Order>(), 64);
        assert_eq!(std::mem::align_of::<Order>(), 64);
    }

    #[test]
    fn test_pool_creation() {
        let pool = Pool::with_capacity(100);
        assert_eq!(pool.capacity(), 100);
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.available(), 100);
        assert!(!pool.is_exhausted());
    }

    #[test]
    fn test_acquire_until_exhausted() {
        let mut pool = Pool::with_capacity(3);

        let a = pool.acquire(1, 100, 10, Side::Buy).expect("slot");
        let b = pool.acquire(2, 101, 10, Side::Sell).expect("slot");
        let c = pool.acquire(3, 102, 10, Side::Buy).expect("slot");

        assert_eq!(pool.live(), 3);
        assert!(pool.is_exhausted());
        assert!(pool.acquire(4, 103, 10, Side::Buy).is_none());

        pool.release(b);
        assert_eq!(pool.live(), 2);
        assert!(!pool.is_exhausted());

        // LIFO reuse: the slot just released comes back first
        let d = pool.acquire(5, 104, 10, Side::Sell).expect("slot");
        assert_eq!(d, b);

        pool.release(a);
        pool.release(c);
        pool.release(d);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn test_acquire_constructs_in_place() {
        let mut pool = Pool::with_capacity(10);
        let slot = pool.acquire(12345, 10_050, 500, Side::Sell).unwrap();

        let order = pool.get(slot);
        assert_eq!(order.id, 12345);
        assert_eq!(order.price, 10_050);
        assert_eq!(order.qty, 500);
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.prev, NULL_SLOT);
        assert_eq!(order.next, NULL_SLOT);
    }

    #[test]
    fn test_reacquired_slot_is_reinitialized() {
        let mut pool = Pool::with_capacity(4);
        let slot = pool.acquire(1, 100, 10, Side::Buy).unwrap();
        pool.get_mut(slot).qty = 3;
        pool.release(slot);

        let again = pool.acquire(2, 200, 20, Side::Sell).unwrap();
        assert_eq!(again, slot);
        let order = pool.get(again);
        assert_eq!(order.id, 2);
        assert_eq!(order.price, 200);
        assert_eq!(order.qty, 20);
        assert_eq!(order.side, Side::Sell);
    }

    #[test]
    fn test_conservation() {
        let mut pool = Pool::with_capacity(50);
        let mut held = Vec::new();
        for i in 0..30 {
            held.push(pool.acquire(i, 100, 1, Side::Buy).unwrap());
        }
        assert_eq!(pool.live() + pool.available(), pool.capacity());

        for slot in held.drain(10..) {
            pool.release(slot);
        }
        assert_eq!(pool.live(), 10);
        assert_eq!(pool.live() + pool.available(), pool.capacity());

        // No index appears twice across free stack and held set
        let mut seen = vec![false; 50];
        for idx in pool.free_indices() {
            assert!(!seen[idx as usize], "duplicate free index {idx}");
            seen[idx as usize] = true;
        }
        for &idx in &held {
            assert!(!seen[idx as usize], "held slot {idx} also on free stack");
        }
    }

    #[test]
    fn test_warm_up() {
        let mut pool = Pool::with_capacity(1000);
        pool.warm_up();
        assert_eq!(pool.available(), 1000);
    }
}
