//! Lock-free single-producer single-consumer ring buffer.
//!
//! Bridges the ingress thread and the engine thread without mutexes. The
//! producer owns the write tail, the consumer owns the read head, and the
//! two synchronize purely through acquire/release ordering: the producer's
//! release-store of the tail makes the slot write visible before the slot
//! is exposed as readable, and symmetrically the consumer's release-store
//! of the head frees the slot before the producer can observe it as
//! writable. Each thread loads its own index relaxed because nobody else
//! writes it.
//!
//! The buffer never blocks; callers spin on full/empty at their own
//! discretion.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

struct Shared<T> {
    /// capacity + 1 slots; the sentinel slot disambiguates full from empty
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,

    /// Read index, written only by the consumer.
    /// CachePadded keeps the two indices on separate cache lines so the
    /// producer and consumer never false-share.
    head: CachePadded<AtomicUsize>,

    /// Write index, written only by the producer
    tail: CachePadded<AtomicUsize>,
}

// The protocol partitions every slot in time: the producer writes a slot
// strictly before publishing it, the consumer reads it strictly before
// freeing it. T: Copy keeps slot transfer a plain memcpy with no drops.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

/// Factory for the ring's two endpoints.
pub struct RingBuffer;

impl RingBuffer {
    /// Build a ring able to hold `capacity` in-flight requests and return
    /// its two endpoints. Each endpoint is `Send` but not `Clone`: exactly
    /// one thread produces and exactly one consumes.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity<T: Copy + Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
        assert!(capacity > 0, "ring buffer capacity must be positive");

        let slots = capacity + 1;
        let buffer: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..slots)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        let shared = Arc::new(Shared {
            buffer,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        });

        (
            Producer {
                shared: Arc::clone(&shared),
            },
            Consumer { shared },
        )
    }
}

/// Write endpoint; owned by exactly one thread.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy + Send> Producer<T> {
    /// Push an item, returning `false` when the ring is full.
    ///
    /// Never blocks; a full ring leaves the item with the caller.
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        let shared = &*self.shared;

        // Relaxed: we are the only thread writing the tail
        let tail = shared.tail.load(Ordering::Relaxed);
        let next_tail = (tail + 1) % shared.buffer.len();

        // Acquire: see the consumer's latest head so we never overwrite an
        // unread slot
        if next_tail == shared.head.load(Ordering::Acquire) {
            return false;
        }

        unsafe {
            (*shared.buffer[tail].get()).write(item);
        }

        // Release: publish the slot write before the new tail is visible
        shared.tail.store(next_tail, Ordering::Release);
        true
    }
}

/// Read endpoint; owned by exactly one thread.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy + Send> Consumer<T> {
    /// Pop the oldest item, or `None` when the ring is empty.
    ///
    /// Never blocks.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let shared = &*self.shared;

        // Relaxed: we are the only thread writing the head
        let head = shared.head.load(Ordering::Relaxed);

        // Acquire: synchronize with the producer's release-store so the
        // slot contents are visible once the tail is
        if head == shared.tail.load(Ordering::Acquire) {
            return None;
        }

        let item = unsafe { (*shared.buffer[head].get()).assume_init() };

        // Release: hand the slot back to the producer
        shared
            .head
            .store((head + 1) % shared.buffer.len(), Ordering::Release);
        Some(item)
    }
}
