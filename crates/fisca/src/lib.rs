// fisca — engine crate
//
// Plan-aware monthly quota enforcement, billing-event synchronization,
// conversation history, and the framework-agnostic route handlers the
// HTTP layer delegates to.

pub mod billing;
pub mod context;
pub mod conversation;
pub mod quota;
pub mod routes;

pub use billing::{BillingSynchronizer, SyncError, SyncOutcome};
pub use context::{AppContext, Dependencies, Stores};
pub use conversation::{ConversationLog, RECENT_MESSAGES};
pub use quota::{QuotaEngine, QuotaError};
