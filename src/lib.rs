//! # Authgate (user accounts with pluggable authentication)
//!
//! `authgate` is a small HTTP API for user account management. Every request
//! under `/api/v1` passes through a request gate that consults the process-wide
//! authentication strategy chosen at startup.
//!
//! ## Strategies
//!
//! - **`default`:** the base strategy. Auth is configured but never resolves a
//!   principal, so every protected route fails closed.
//! - **`basic_auth`:** `Authorization: Basic <base64(email:password)>` checked
//!   against the stored argon2 hash.
//! - **`session_auth`:** server-side sessions kept in memory, carried by a cookie
//!   named after `SESSION_NAME` (default `session_id`).
//! - **`session_exp_auth`:** in-memory sessions that expire `SESSION_DURATION`
//!   seconds after creation. Expiry is checked on read and nothing is swept.
//! - **`session_db_auth`:** like `session_exp_auth`, with sessions persisted in
//!   the database so they survive a restart.
//! - **`none`:** no strategy; the gate lets everything through.
//!
//! ## Failure Classes
//!
//! A missing credential yields `401`, a credential that does not resolve to a
//! user yields `403`. Unknown and expired sessions are indistinguishable to the
//! caller. Storage failures are reported as `500` and never downgraded to an
//! authentication failure.

pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
