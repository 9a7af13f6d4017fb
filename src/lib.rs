//! # tickmatch
//!
//! A single-symbol price-time-priority limit order book matching engine.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively (no locks)
//! - **O(1) Operations**: submit, cancel and per-fill matching run in
//!   constant time; level insert/erase is O(log P) in live price levels
//! - **Zero Hot-Path Allocation**: order records come from a fixed pool
//!   sized at startup
//! - **Cache-Sympathetic**: 64-byte order records, 32-bit slot indices,
//!   LIFO slot reuse
//!
//! ## Architecture
//!
//! ```text
//! [Ingress Thread] --> [SPSC Ring Buffer] --> [Engine Thread (Pinned)]
//!                                                     |
//!                                              [Trade Events]
//! ```
//!
//! The engine applies requests strictly in the order the producer pushed
//! them; given the same request stream it always produces the same trade
//! stream and final book.

pub mod book;
pub mod engine;
pub mod locked;
pub mod pool;
pub mod price_level;
pub mod request;
pub mod runtime;
pub mod spsc;

// Re-exports for convenience
pub use book::Book;
pub use engine::Engine;
pub use locked::SharedEngine;
pub use pool::{Order, Pool, SlotIndex, NULL_SLOT};
pub use price_level::PriceLevel;
pub use request::{
    Action, EngineError, LevelSnapshot, OrderId, OrderRequest, Price, Qty, Side, TradeEvent,
};
pub use spsc::{Consumer, Producer, RingBuffer};
