//! kvstash core: the guarded in-memory map and the error surface shared by the
//! server and its tooling.
//!
//! This crate intentionally carries no transport or runtime dependencies so the
//! store can be embedded, tested, and instantiated independently of HTTP.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Store operations are infallible; everything else surfaces as
//! `KvError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod store;

/// Shared result type.
pub use error::{KvError, Result};
pub use store::GuardedMap;
