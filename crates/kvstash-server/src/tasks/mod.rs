//! Background tasks owned by the server lifecycle.

pub mod key_count;

pub use key_count::{spawn_key_count_refresher, KeyCountRefresher};
