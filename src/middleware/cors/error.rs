use std::fmt;

/// Rejected CORS configuration, returned by [`CorsMiddlewareBuilder::build`](super::CorsMiddlewareBuilder::build)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// `*` combined with `allow_credentials(true)`; browsers refuse that pair
    WildcardWithCredentials,
    /// Origin is not `scheme://host[:port]`
    InvalidOriginFormat { origin: String },
    /// An origin regex failed to compile
    InvalidOriginPattern { pattern: String, reason: String },
    /// Credentials enabled while no origin is allowed at all
    EmptyOriginsWithCredentials,
}

impl fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsConfigError::WildcardWithCredentials => f.write_str(
                "invalid CORS config: a wildcard origin cannot be combined with credentials; list the allowed origins explicitly",
            ),
            CorsConfigError::InvalidOriginFormat { origin } => write!(
                f,
                "invalid CORS config: origin '{}' is not of the form scheme://host[:port]",
                origin
            ),
            CorsConfigError::InvalidOriginPattern { pattern, reason } => write!(
                f,
                "invalid CORS config: origin pattern '{}' does not compile: {}",
                pattern, reason
            ),
            CorsConfigError::EmptyOriginsWithCredentials => f.write_str(
                "invalid CORS config: credentials are enabled but no origin is allowed",
            ),
        }
    }
}

impl std::error::Error for CorsConfigError {}
