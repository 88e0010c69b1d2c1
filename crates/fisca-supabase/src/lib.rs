//! # fisca-supabase
//!
//! Supabase-backed identity provider. Wraps the GoTrue `/auth/v1` REST
//! API behind the engine's `IdentityProvider` contract.

pub mod config;
pub mod identity;

pub use config::{sanitize_url, SupabaseConfig};
pub use identity::SupabaseIdentity;
