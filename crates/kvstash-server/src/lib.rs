//! kvstash server library entry.
//!
//! Wires the guarded store, HTTP handlers, metrics registry, and the key-count
//! refresher into a runnable server. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod kv;
pub mod obs;
pub mod ops;
pub mod router;
pub mod tasks;
