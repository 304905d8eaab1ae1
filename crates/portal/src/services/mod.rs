//! Business logic services for the portal.
//!
//! # Services
//!
//! - `entitlement` - Payment events to subscriber role reconciliation
//! - `pending` - Payments received before signup
//! - `chat` - Shared live-room chat log
//! - `journal` - Per-user trade journals and daily statistics
//! - `live` - Current live video id
//! - `locks` - Striped mutexes serializing blob rewrites

pub mod chat;
pub mod entitlement;
pub mod journal;
pub mod live;
pub mod locks;
pub mod pending;

pub use chat::{ChatService, ChatServiceError};
pub use entitlement::{EntitlementError, EntitlementService, ReconcileOutcome, SignupEntitlement};
pub use journal::{JournalError, JournalService};
pub use live::LiveService;
pub use locks::StripedLocks;
pub use pending::PendingPayments;
