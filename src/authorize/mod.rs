//! # Authorization of Reporting Servers
//!
//! This module decides whether the server behind a snapshot may have its
//! round committed automatically. Servers are identified by their
//! authId/ip/port triple; unknown servers are handled per the configured
//! [`UnknownServerPolicy`](crate::config::UnknownServerPolicy), and the
//! administrative override flag bypasses the check entirely for
//! operator-approved manual imports.
//!
//! ## Submodules
//!
//! - **resolver**: The server-id resolution logic.

mod resolver;

pub use resolver::resolve_server;
