//! # fisca-stripe
//!
//! Stripe integration for fisca: the REST billing processor and the
//! webhook verification/decoding pipeline.
//!
//! The client implements the engine's `BillingProcessor` contract; the
//! webhook module turns a signed payload into a `BillingEvent` for the
//! synchronizer.

pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use config::StripeConfig;
pub use error::StripeError;
