//! Authority client speaking the authority's JSON-over-HTTP protocol
//!
//! - login: `POST {endpoint}/public/logins` with `{"userId", "password"}`,
//!   answered by a user document whose `authToken` is the credential
//! - check: `POST {endpoint}/secure/authz-checks` with
//!   `{"bearerToken", "permission"}`, authenticated with
//!   `Authorization: Bearer <credential>`, answered by a bare JSON boolean

use crate::authority::Authority;
use crate::redirect::{ForwardHeaders, RedirectPolicy};
use crate::transport::{OutboundRequest, RedirectingTransport};
use async_trait::async_trait;
use permcache_config::AuthorityConfig;
use permcache_core::{
    ApplicationCredential, Error, PermissionName, Result, SubjectToken, AUTHZ_CHECK_PATH,
    LOGIN_PATH,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    auth_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest<'a> {
    bearer_token: &'a str,
    permission: &'a str,
}

/// HTTP implementation of [`Authority`]
pub struct HttpAuthority {
    login_url: Url,
    check_url: Url,
    user_id: String,
    password: String,
    transport: RedirectingTransport,
}

impl fmt::Debug for HttpAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuthority")
            .field("login_url", &self.login_url.as_str())
            .field("check_url", &self.check_url.as_str())
            .field("user_id", &self.user_id)
            .field("password", &"[REDACTED]")
            .field("redirect_policy", self.transport.policy())
            .finish()
    }
}

impl HttpAuthority {
    /// Create a client that forwards every original header across redirects
    pub fn new(config: &AuthorityConfig) -> Result<Self> {
        Self::with_redirect_policy(config, Arc::new(ForwardHeaders::all(config.max_redirects)))
    }

    /// Create a client with an explicit redirect policy
    pub fn with_redirect_policy(
        config: &AuthorityConfig,
        policy: Arc<dyn RedirectPolicy>,
    ) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            Error::configuration(format!(
                "invalid authority endpoint '{}': {e}",
                config.endpoint
            ))
        })?;

        Ok(Self {
            login_url: route(&endpoint, LOGIN_PATH)?,
            check_url: route(&endpoint, AUTHZ_CHECK_PATH)?,
            user_id: config.user_id.clone(),
            password: config.password.clone(),
            transport: RedirectingTransport::new(
                config.request_timeout,
                config.connect_timeout,
                policy,
            )?,
        })
    }

    async fn post_json<T: Serialize>(
        &self,
        url: &Url,
        payload: &T,
        mut headers: HeaderMap,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let body = encode_body(url, payload)?;

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self
            .transport
            .send(OutboundRequest {
                method: Method::POST,
                url: url.clone(),
                headers,
                body: Some(body),
            })
            .await?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;
        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn login(&self) -> Result<ApplicationCredential> {
        let request = LoginRequest {
            user_id: &self.user_id,
            password: &self.password,
        };
        let (status, body) = self
            .post_json(&self.login_url, &request, HeaderMap::new())
            .await?;

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::authentication_failed(
                    self.login_url.as_str(),
                    format!("service identity rejected with {status}"),
                ));
            }
            status if !status.is_success() => {
                return Err(Error::unexpected_status(
                    self.login_url.as_str(),
                    status.as_u16(),
                ));
            }
            _ => {}
        }

        decode_credential(self.login_url.as_str(), &body)
    }

    async fn check_permission(
        &self,
        subject: &SubjectToken,
        permission: &PermissionName,
        credential: &ApplicationCredential,
    ) -> Result<bool> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|_| {
                Error::invalid_input(
                    "credential",
                    "application credential is not a valid header value",
                )
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let request = CheckRequest {
            bearer_token: subject.as_str(),
            permission: permission.as_str(),
        };
        let (status, body) = self.post_json(&self.check_url, &request, headers).await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::authentication_failed(
                self.check_url.as_str(),
                "application credential rejected",
            ));
        }
        if !status.is_success() {
            return Err(Error::unexpected_status(
                self.check_url.as_str(),
                status.as_u16(),
            ));
        }

        let allowed = decode_verdict(self.check_url.as_str(), &body)?;
        debug!(
            subject = %subject.fingerprint(),
            permission = %permission,
            allowed,
            "authority answered permission check"
        );
        Ok(allowed)
    }
}

/// Append a relative route to the authority base URL
fn route(endpoint: &Url, path: &str) -> Result<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| {
            Error::configuration(format!(
                "authority endpoint '{endpoint}' cannot be used as a base URL"
            ))
        })?
        .pop_if_empty()
        .extend(path.split('/'));
    Ok(url)
}

fn decode_credential(endpoint: &str, body: &[u8]) -> Result<ApplicationCredential> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::malformed_response(endpoint, "zero-length login response"));
    }

    let response: LoginResponse = serde_json::from_slice(body)
        .map_err(|e| Error::malformed_response(endpoint, format!("login response: {e}")))?;

    let token = response
        .auth_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::malformed_response(endpoint, "login response has no authToken"))?;

    ApplicationCredential::new(token)
}

/// Strictly decode a permission verdict: a single JSON boolean, nothing else
fn decode_verdict(endpoint: &str, body: &[u8]) -> Result<bool> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::malformed_response(endpoint, "empty permission verdict"));
    }

    serde_json::from_slice::<bool>(body).map_err(|e| {
        Error::malformed_response(endpoint, format!("permission verdict is not a boolean: {e}"))
    })
}

/// Fails before anything reaches the wire
fn encode_body<T: Serialize>(url: &Url, payload: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| Error::transport(url.as_str(), e))
}
