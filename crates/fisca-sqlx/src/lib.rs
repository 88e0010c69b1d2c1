//! # fisca-sqlx
//!
//! SQL persistence for fisca on `sqlx::Any`: one store type serving both
//! SQLite and Postgres, covering entitlements, monthly usage counters,
//! and conversation history.

pub mod store;

pub use store::SqlxStore;
