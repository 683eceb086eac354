//! Client side of the remote authorization authority
//!
//! [`Authority`] is the protocol seam, [`HttpAuthority`] speaks the
//! authority's HTTP API and [`AuthorizationClient`] keeps this service's
//! application credential in a [`permcache_cache::KeyValueCache`].

pub mod authority;
pub mod client;
pub mod http;
pub mod redirect;
pub mod testing;
pub mod transport;

pub use authority::Authority;
pub use client::AuthorizationClient;
pub use http::HttpAuthority;
pub use redirect::{ForwardHeaders, HeaderSelection, RedirectPolicy};
pub use transport::{OutboundRequest, RedirectingTransport};
