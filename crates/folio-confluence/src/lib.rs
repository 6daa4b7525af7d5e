//! Confluence REST client for Folio.
//!
//! [`ConfluenceClient`] talks to Confluence Server/Data Center over the
//! REST API and implements [`folio_sync::ContentService`], so it can be
//! handed straight to a [`folio_sync::Publisher`].
//!
//! Two authentication schemes are supported:
//!
//! - OAuth 1.0 with RSA-SHA1 signatures ([`ConfluenceClient::with_oauth`])
//! - Personal access tokens ([`ConfluenceClient::with_bearer`])

mod client;
mod error;
mod oauth;
mod service;
mod types;

pub use client::{ConfluenceClient, EditorVersion};
pub use error::{ConfluenceError, RsaKeyError};
