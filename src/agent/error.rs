//! Agent invocation error types

use thiserror::Error;

/// Agent invocation error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvokeError {
    pub kind: InvokeErrorKind,
    pub message: String,
}

impl InvokeError {
    pub fn new(kind: InvokeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn service(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Service(kind), message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Unknown, message)
    }

    /// Classify an error from its rendered text.
    ///
    /// Service exceptions are recognised by name anywhere in the text, the
    /// same way they show up in a stringified SDK error. Anything else gets
    /// `fallback`.
    pub fn from_text(message: impl Into<String>, fallback: InvokeErrorKind) -> Self {
        let message = message.into();
        match ServiceErrorKind::detect(&message) {
            Some(kind) => Self::service(kind, message),
            None => Self::new(fallback, message),
        }
    }

    /// Classify a non-success gateway response
    pub fn classify(status: u16, body: &str) -> Self {
        if let Some(kind) = ServiceErrorKind::detect(body) {
            return Self::service(kind, format!("HTTP {status}: {body}"));
        }
        let kind = match status {
            400 => ServiceErrorKind::Validation,
            404 => ServiceErrorKind::ResourceNotFound,
            424 => ServiceErrorKind::DependencyFailed,
            429 => ServiceErrorKind::Throttling,
            500..=599 => ServiceErrorKind::InternalServer,
            _ => return Self::unknown(format!("HTTP {status}: {body}")),
        };
        Self::service(kind, format!("HTTP {status}: {body}"))
    }

    /// The enumerated service kind, if this error has one
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self.kind {
            InvokeErrorKind::Service(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeErrorKind {
    /// One of the exceptions the agent runtime documents
    Service(ServiceErrorKind),
    /// Connection failures, timeouts, broken streams
    Network,
    /// Anything else; propagated to the caller untouched
    Unknown,
}

/// Exceptions raised by the agent runtime that have a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    DependencyFailed,
    Throttling,
    Validation,
    ResourceNotFound,
    InternalServer,
    ServiceQuotaExceeded,
}

impl ServiceErrorKind {
    pub const ALL: [ServiceErrorKind; 6] = [
        ServiceErrorKind::DependencyFailed,
        ServiceErrorKind::Throttling,
        ServiceErrorKind::Validation,
        ServiceErrorKind::ResourceNotFound,
        ServiceErrorKind::InternalServer,
        ServiceErrorKind::ServiceQuotaExceeded,
    ];

    /// Exception name as it appears on the wire
    pub fn exception_name(self) -> &'static str {
        match self {
            ServiceErrorKind::DependencyFailed => "dependencyFailedException",
            ServiceErrorKind::Throttling => "throttlingException",
            ServiceErrorKind::Validation => "validationException",
            ServiceErrorKind::ResourceNotFound => "resourceNotFoundException",
            ServiceErrorKind::InternalServer => "internalServerException",
            ServiceErrorKind::ServiceQuotaExceeded => "serviceQuotaExceededException",
        }
    }

    /// Exact (case-insensitive) match on an exception name
    pub fn from_exception_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.exception_name().eq_ignore_ascii_case(name))
    }

    /// Find the first exception name mentioned anywhere in `text`
    pub fn detect(text: &str) -> Option<Self> {
        let haystack = text.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| haystack.contains(&kind.exception_name().to_ascii_lowercase()))
    }

    /// Stable key the UI uses to look up a localized message
    pub fn message_key(self) -> &'static str {
        match self {
            ServiceErrorKind::DependencyFailed => "error.dependency_failed",
            ServiceErrorKind::Throttling => "error.throttling",
            ServiceErrorKind::Validation => "error.validation",
            ServiceErrorKind::ResourceNotFound => "error.resource_not_found",
            ServiceErrorKind::InternalServer => "error.internal_server",
            ServiceErrorKind::ServiceQuotaExceeded => "error.quota_exceeded",
        }
    }

    /// Default English message shown to the user
    pub fn user_message(self) -> &'static str {
        match self {
            ServiceErrorKind::DependencyFailed => {
                "The knowledge base's backing data store appears to be asleep. Wait a few seconds and try again."
            }
            ServiceErrorKind::Throttling => {
                "The model is under heavy load and the request was rate limited. Wait a minute and try again, or switch models or request a quota increase."
            }
            ServiceErrorKind::Validation => {
                "The request was rejected as malformed. Check the agent configuration."
            }
            ServiceErrorKind::ResourceNotFound => {
                "The agent, alias or knowledge base ID could not be found. Check the configured IDs."
            }
            ServiceErrorKind::InternalServer => {
                "The agent service hit a temporary internal error. Try again."
            }
            ServiceErrorKind::ServiceQuotaExceeded => {
                "A hard service quota has been reached. Request a limit increase before retrying."
            }
        }
    }

    /// Name of the telemetry span recorded when this error ends a turn
    pub fn span_name(self) -> &'static str {
        match self {
            ServiceErrorKind::DependencyFailed => "dependency_failed",
            ServiceErrorKind::Throttling => "throttling",
            ServiceErrorKind::Validation => "validation_failed",
            ServiceErrorKind::ResourceNotFound => "resource_not_found",
            ServiceErrorKind::InternalServer => "internal_server_error",
            ServiceErrorKind::ServiceQuotaExceeded => "quota_exceeded",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::DependencyFailed | Self::Throttling | Self::InternalServer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_detect_from_stringified_error() {
        let text = "An error occurred (throttlingException) when calling the InvokeAgent operation: Rate exceeded";
        assert_eq!(
            ServiceErrorKind::detect(text),
            Some(ServiceErrorKind::Throttling)
        );
        assert_eq!(ServiceErrorKind::detect("connection reset by peer"), None);
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        assert_eq!(
            ServiceErrorKind::detect("DependencyFailedException: Aurora is paused"),
            Some(ServiceErrorKind::DependencyFailed)
        );
    }

    #[test]
    fn test_from_exception_name_round_trips_every_kind() {
        for kind in ServiceErrorKind::ALL {
            assert_eq!(
                ServiceErrorKind::from_exception_name(kind.exception_name()),
                Some(kind)
            );
        }
        assert_eq!(ServiceErrorKind::from_exception_name("accessDeniedException"), None);
    }

    #[test]
    fn test_message_keys_are_distinct() {
        let keys: HashSet<_> = ServiceErrorKind::ALL
            .into_iter()
            .map(ServiceErrorKind::message_key)
            .collect();
        assert_eq!(keys.len(), ServiceErrorKind::ALL.len());
    }

    #[test]
    fn test_classify_prefers_exception_name_over_status() {
        let err = InvokeError::classify(400, r#"{"__type":"serviceQuotaExceededException"}"#);
        assert_eq!(
            err.service_kind(),
            Some(ServiceErrorKind::ServiceQuotaExceeded)
        );
    }

    #[test]
    fn test_classify_falls_back_to_status() {
        assert_eq!(
            InvokeError::classify(429, "slow down").service_kind(),
            Some(ServiceErrorKind::Throttling)
        );
        assert_eq!(
            InvokeError::classify(503, "").service_kind(),
            Some(ServiceErrorKind::InternalServer)
        );
        let err = InvokeError::classify(403, "forbidden");
        assert_eq!(err.kind, InvokeErrorKind::Unknown);
    }

    #[test]
    fn test_from_text_uses_fallback_for_unknown_names() {
        let err = InvokeError::from_text("accessDeniedException: nope", InvokeErrorKind::Unknown);
        assert_eq!(err.kind, InvokeErrorKind::Unknown);
        assert_eq!(err.to_string(), "accessDeniedException: nope");

        let err = InvokeError::from_text("stream reset: throttlingException", InvokeErrorKind::Network);
        assert_eq!(err.service_kind(), Some(ServiceErrorKind::Throttling));
        let err = InvokeError::from_text("connection reset", InvokeErrorKind::Network);
        assert_eq!(err.kind, InvokeErrorKind::Network);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ServiceErrorKind::Throttling.is_retryable());
        assert!(!ServiceErrorKind::Validation.is_retryable());
        assert!(!ServiceErrorKind::ServiceQuotaExceeded.is_retryable());
    }
}
