//! # Coterie
//!
//! A multi-tenant workspace server, usable both as a standalone binary and
//! as a library: accounts with email activation, companies with admin and
//! member roles, bulk email invitations, and a post feed with scheduled
//! publishing.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! coterie = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coterie::mail::MailLog;
//! use coterie::server::{AppState, create_router};
//! use coterie::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/coterie.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), Arc::new(MailLog), None));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod invite;
pub mod mail;
pub mod policy;
pub mod posts;
pub mod server;
pub mod store;
pub mod types;
