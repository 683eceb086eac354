//! HTTP transport that follows redirects under a [`RedirectPolicy`]

use crate::redirect::RedirectPolicy;
use permcache_core::{Error, Result};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A request as handed to the transport
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Sends requests and walks redirect chains itself
#[derive(Debug, Clone)]
pub struct RedirectingTransport {
    client: reqwest::Client,
    policy: Arc<dyn RedirectPolicy>,
}

impl RedirectingTransport {
    /// Build a transport whose client never follows redirects on its own
    pub fn new(
        request_timeout: Duration,
        connect_timeout: Duration,
        policy: Arc<dyn RedirectPolicy>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &Arc<dyn RedirectPolicy> {
        &self.policy
    }

    /// Send `request`, following redirects until a non-redirect response
    pub async fn send(&self, request: OutboundRequest) -> Result<reqwest::Response> {
        let origin = request.url.clone();
        let original_headers = request.headers.clone();

        let OutboundRequest {
            mut method,
            mut url,
            mut headers,
            mut body,
        } = request;
        let mut hops = 0;

        loop {
            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| Error::transport(url.as_str(), e))?;

            let status = response.status();
            if !is_followed_redirect(status) {
                return Ok(response);
            }

            if hops >= self.policy.max_redirects() {
                return Err(Error::RedirectLimit {
                    endpoint: origin.to_string(),
                    limit: self.policy.max_redirects(),
                });
            }

            let next = redirect_target(&url, response.headers())?;

            // 301/302/303 turn anything but GET/HEAD into a body-less GET
            if matches!(
                status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            ) && method != Method::GET
                && method != Method::HEAD
            {
                method = Method::GET;
                body = None;
            }

            let next_headers =
                next_hop_headers(self.policy.as_ref(), &original_headers, body.is_some());

            hops += 1;
            debug!(
                status = status.as_u16(),
                hop = hops,
                from = url.path(),
                to = next.path(),
                "following authority redirect"
            );

            url = next;
            headers = next_headers;
        }
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Headers for the next hop. A kept body keeps the headers that describe it.
fn next_hop_headers(
    policy: &dyn RedirectPolicy,
    original: &HeaderMap,
    has_body: bool,
) -> HeaderMap {
    let mut next = HeaderMap::new();
    policy.carry_forward(original, &mut next);

    for name in [CONTENT_TYPE, CONTENT_LENGTH] {
        match original.get(&name) {
            Some(value) if has_body => {
                next.insert(name, value.clone());
            }
            _ => {
                next.remove(name);
            }
        }
    }
    next
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Result<Url> {
    let location = headers
        .get(LOCATION)
        .ok_or_else(|| Error::malformed_response(current.as_str(), "redirect without Location"))?
        .to_str()
        .map_err(|_| Error::malformed_response(current.as_str(), "Location is not valid text"))?;

    let next = current.join(location).map_err(|e| {
        Error::malformed_response(
            current.as_str(),
            format!("invalid redirect target '{location}': {e}"),
        )
    })?;

    match next.scheme() {
        "http" | "https" => Ok(next),
        scheme => Err(Error::malformed_response(
            current.as_str(),
            format!("redirect to unsupported scheme '{scheme}'"),
        )),
    }
}
