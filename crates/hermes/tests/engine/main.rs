//! Engine integration tests over the in-memory store.
//!
//! HTTP executors talk to a local axum endpoint; no database is needed.

mod executors;
mod pool;
