/// Result type alias for permcache operations
pub type Result<T> = std::result::Result<T, Error>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for permcache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache store could not be reached or answered with a failure
    #[error("cache {operation} failed for key '{key}': {message}")]
    Cache {
        operation: &'static str,
        key: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The authority could not be reached
    #[error("request to '{endpoint}' failed: {message}")]
    Transport {
        endpoint: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The authority answered with a body that violates its contract
    #[error("malformed response from '{endpoint}': {message}")]
    MalformedResponse { endpoint: String, message: String },

    /// The authority answered with a status this client does not handle
    #[error("unexpected status {status} from '{endpoint}'")]
    UnexpectedStatus { endpoint: String, status: u16 },

    /// The authority kept redirecting past the configured limit
    #[error("redirect chain starting at '{endpoint}' exceeded {limit} hops")]
    RedirectLimit { endpoint: String, limit: usize },

    /// The authority rejected this service's own identity or credential
    #[error("authentication failure against '{endpoint}': {message}")]
    AuthenticationFailed { endpoint: String, message: String },

    /// Caller supplied an unusable token or permission
    #[error("invalid {field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

/// Coarse classification callers map onto their own protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Cache or authority unreachable
    Transport,
    /// Authority violated its response contract
    Protocol,
    /// This service could not authenticate itself to the authority
    Authentication,
    /// Bad caller input
    InvalidInput,
    /// Bad or missing configuration
    Configuration,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Cache { .. } | Error::Transport { .. } => ErrorKind::Transport,
            Error::MalformedResponse { .. }
            | Error::UnexpectedStatus { .. }
            | Error::RedirectLimit { .. } => ErrorKind::Protocol,
            Error::AuthenticationFailed { .. } => ErrorKind::Authentication,
            Error::InvalidInput { .. } => ErrorKind::InvalidInput,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }

    /// Create a cache error
    #[must_use]
    pub fn cache(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Cache {
            operation,
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a cache error with a source error
    #[must_use]
    pub fn cache_with_source(
        operation: &'static str,
        key: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        let source = source.into();
        Error::Cache {
            operation,
            key: key.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a transport error with a source error
    #[must_use]
    pub fn transport(endpoint: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        let source = source.into();
        Error::Transport {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a malformed response error
    #[must_use]
    pub fn malformed_response(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected status error
    #[must_use]
    pub fn unexpected_status(endpoint: impl Into<String>, status: u16) -> Self {
        Error::UnexpectedStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Create an authentication failure
    #[must_use]
    pub fn authentication_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::AuthenticationFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}

/// Input validation helpers
pub struct Validate;

impl Validate {
    /// Validate that a string is not empty
    pub fn not_empty(value: &str, field: &'static str) -> Result<()> {
        if value.is_empty() {
            Err(Error::invalid_input(field, "cannot be empty"))
        } else {
            Ok(())
        }
    }

    /// Validate that a string does not contain a reserved character
    pub fn excludes(value: &str, reserved: char, field: &'static str) -> Result<()> {
        if value.contains(reserved) {
            Err(Error::invalid_input(
                field,
                format!("must not contain '{reserved}'"),
            ))
        } else {
            Ok(())
        }
    }
}
