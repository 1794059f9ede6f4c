#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} request failed with status {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("rate limited")]
    RateLimited,

    #[error("malformed response from {provider}: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: &'static str },
}

impl LlmError {
    /// The service could not be reached or answered with a non-success status.
    ///
    /// Transport failures may succeed when retried; everything else is final.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::RateLimited)
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    pub(crate) fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_transport() {
        let err = LlmError::Status {
            provider: "openai",
            status: 503,
        };
        assert!(err.is_transport());
        assert!(!err.is_malformed());
        assert_eq!(err.to_string(), "openai request failed with status 503");
    }

    #[test]
    fn rate_limited_is_transport() {
        assert!(LlmError::RateLimited.is_transport());
    }

    #[test]
    fn malformed_is_not_transport() {
        let err = LlmError::malformed("openai", "missing choices");
        assert!(err.is_malformed());
        assert!(!err.is_transport());
        assert!(err.to_string().contains("missing choices"));
    }
}
