//! Scraping client for the iVAS SMS web portal.
//!
//! The portal has no API: sessions are cookie based, every form carries an
//! anti-forgery token, and an expired session is only visible as a redirect
//! back to the login page.

pub mod client;
pub mod parse;
pub mod transport;
pub mod types;

pub use client::PortalSession;
pub use transport::{HttpResponse, PortalTransport, TransportFactory};
pub use types::{NumberRecord, SmsMessage};

#[cfg(test)]
pub(crate) mod fake;
