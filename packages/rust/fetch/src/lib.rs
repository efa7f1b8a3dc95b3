//! Page retrieval, text extraction, and local-address policy checks.
//!
//! This crate provides:
//! - [`PageFetcher`] / [`HttpPageFetcher`] — link in, readable text out
//! - [`extract`] — HTML-to-text conversion used by the HTTP fetcher
//! - [`LocalAddressCheck`] / [`DnsLocalCheck`] — private-network detection for supplied links

pub mod extract;
pub mod fetcher;
pub mod local;

pub use extract::html_to_text;
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use local::{DnsLocalCheck, LocalAddressCheck, is_link_local, is_private_ip};
