//! Keeps a Gmail inbox clear of unread mail.
//!
//! A daemon archives every unread message once per interval and on demand,
//! recording what it touched in a local key/value store. Gmail is reached
//! through the `http::HttpClient` seam so the same workflow runs against the
//! real API or against canned fixtures.

pub mod app;
pub mod archive;
pub mod auth;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod gmail;
pub mod http;
pub mod ipc;
pub mod logging;
pub mod store;
