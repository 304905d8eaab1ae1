//! Core types for BookVision.
//!
//! This module provides type-safe wrappers for the portal's domain concepts.

pub mod chat;
pub mod email;
pub mod id;
pub mod live;
pub mod pending;
pub mod role;
pub mod status;
pub mod trade;

pub use chat::{ANONYMOUS_AUTHOR, CHAT_HISTORY_LIMIT, ChatError, ChatLog, ChatMessage, author_name};
pub use email::{Email, EmailError};
pub use id::*;
pub use live::{LiveVideoId, LiveVideoIdError};
pub use pending::PendingPayment;
pub use role::{RoleSet, SUBSCRIBER_ROLE};
pub use status::{EntitlementChange, PagBankStatus, SubscriptionStatus};
pub use trade::{
    DailyStats, MAX_TRADE_VALUE, NewTrade, TRADE_JOURNAL_LIMIT, Trade, TradeError, TradeJournal,
    TradeKind, TradeResult,
};
