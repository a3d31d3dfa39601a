//! Per-user session storage
//!
//! Sessions live in memory only. A restart forgets every pending flow,
//! which is the same outcome as letting them expire.

pub mod sessions;

pub use sessions::{SessionGuard, SessionStore};
