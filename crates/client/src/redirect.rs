//! Redirect policy for authority requests
//!
//! Automatic redirects are disabled on the underlying HTTP client because
//! they drop the `Authorization` header. The transport follows redirects
//! itself and asks a [`RedirectPolicy`] which headers of the original request
//! travel to each hop.

use reqwest::header::{HeaderMap, HeaderName};
use std::fmt;

/// Decides how far and with which headers a redirect chain is followed
pub trait RedirectPolicy: Send + Sync + fmt::Debug {
    /// Maximum number of hops before the request fails
    fn max_redirects(&self) -> usize;

    /// Copy headers of the original request onto the next hop's headers
    fn carry_forward(&self, original: &HeaderMap, next: &mut HeaderMap);
}

/// Which headers a [`ForwardHeaders`] policy copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSelection {
    /// Every header of the original request
    All,
    /// Only the named headers
    Only(Vec<HeaderName>),
}

/// Policy that replays a selection of the original request's headers
#[derive(Debug, Clone)]
pub struct ForwardHeaders {
    selection: HeaderSelection,
    max_redirects: usize,
}

impl ForwardHeaders {
    /// Forward every original header, `Authorization` included
    pub fn all(max_redirects: usize) -> Self {
        Self {
            selection: HeaderSelection::All,
            max_redirects,
        }
    }

    /// Forward only the named headers
    pub fn only(names: impl IntoIterator<Item = HeaderName>, max_redirects: usize) -> Self {
        Self {
            selection: HeaderSelection::Only(names.into_iter().collect()),
            max_redirects,
        }
    }

    pub fn selection(&self) -> &HeaderSelection {
        &self.selection
    }
}

impl RedirectPolicy for ForwardHeaders {
    fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    fn carry_forward(&self, original: &HeaderMap, next: &mut HeaderMap) {
        match &self.selection {
            HeaderSelection::All => {
                for (name, value) in original {
                    next.append(name.clone(), value.clone());
                }
            }
            HeaderSelection::Only(names) => {
                for name in names {
                    for value in original.get_all(name) {
                        next.append(name.clone(), value.clone());
                    }
                }
            }
        }
    }
}
