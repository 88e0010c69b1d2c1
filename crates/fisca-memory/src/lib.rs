// fisca-memory — In-memory entitlement and conversation store.
//
// HashMap-backed, ephemeral. The reference implementation of the store
// traits: quota-engine and HTTP-surface tests run against it without a
// database.

pub mod store;

pub use store::MemoryStore;
