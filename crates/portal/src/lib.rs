//! BookVision portal library.
//!
//! Payment webhooks that keep the identity service's `Assinante` role in
//! step with Stripe and PagBank, plus the JSON API behind the subscriber
//! portal pages. Built as a library so the integration tests can run the
//! real router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod pagbank;
pub mod routes;
pub mod services;
pub mod signature;
pub mod state;
pub mod storage;
pub mod stripe;
