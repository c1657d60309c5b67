//! Top-level facade crate for kvstash.
//!
//! Re-exports the store core and the HTTP server library so users can depend on a single crate.

pub mod core {
    pub use kvstash_core::*;
}

pub mod server {
    pub use kvstash_server::*;
}
