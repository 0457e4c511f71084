//! Shared helpers for database-backed integration tests.

pub mod db;
