//! Coarse serialization wrapper for multi-producer deployments.
//!
//! The preferred deployment keeps the engine on a single thread behind the
//! SPSC ring. When several threads must drive one engine directly, this
//! wrapper funnels every book operation through an acquire/release spin
//! lock; the side books themselves are never touched concurrently.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::Engine;
use crate::request::{EngineError, OrderId, Price, Qty, Side};

/// An [`Engine`] behind a spin lock, shareable across threads.
///
/// Latency guarantees degrade under contention; this is a convenience mode,
/// not the hot path.
pub struct SharedEngine {
    locked: AtomicBool,
    engine: UnsafeCell<Engine>,
}

// Exclusive access to the inner engine is enforced by the spin lock
unsafe impl Send for SharedEngine {}
unsafe impl Sync for SharedEngine {}

impl SharedEngine {
    /// Wrap a fresh engine able to hold `capacity` resting orders.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            locked: AtomicBool::new(false),
            engine: UnsafeCell::new(Engine::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> Guard<'_> {
        // Test-and-set until the flag is ours; acquire pairs with the
        // release in Guard::drop
        while self.locked.swap(true, Ordering::Acquire) {
            std::hint::spin_loop();
        }
        Guard { owner: self }
    }

    /// Serialized [`Engine::submit`]; returns the number of trades executed.
    pub fn submit(
        &self,
        id: OrderId,
        price: Price,
        qty: Qty,
        side: Side,
    ) -> Result<usize, EngineError> {
        let mut engine = self.lock();
        engine.submit(id, price, qty, side).map(|trades| trades.len())
    }

    /// Serialized [`Engine::cancel`].
    pub fn cancel(&self, id: OrderId) -> Result<Qty, EngineError> {
        let mut engine = self.lock();
        engine.cancel(id)
    }

    /// Run `f` with exclusive access to the engine, for reads such as
    /// [`Engine::snapshot`] that need more than one call under a single
    /// critical section.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.lock();
        f(&mut engine)
    }
}

struct Guard<'a> {
    owner: &'a SharedEngine,
}

impl Deref for Guard<'_> {
    type Target = Engine;

    fn deref(&self) -> &Engine {
        unsafe { &*self.owner.engine.get() }
    }
}

impl DerefMut for Guard<'_> {
    fn deref_mut(&mut self) -> &mut Engine {
        unsafe { &mut *self.owner.engine.get() }
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        self.owner.locked.store(false, Ordering::Release);
    }
}
