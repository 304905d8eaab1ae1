//! JSON API used by the portal pages.

pub mod chat;
pub mod live;
pub mod me;
pub mod portal_config;
pub mod signup;
pub mod storage;
pub mod trades;
