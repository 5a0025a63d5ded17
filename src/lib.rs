//! vitrine: a portfolio and blog content back end.
//!
//! The interesting part lives between the HTTP layer and the data store:
//! read-through caching with deterministic keys, fixed-window request quotas
//! on the public write endpoints, race-safe view counters, and a synchronous
//! image derivative pipeline. Everything else is a thin content API over
//! Postgres.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod rate_limit;
