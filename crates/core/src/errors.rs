use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("no non-empty text part found in message parts")]
    NoTextPart,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{gateway} gateway unavailable: {message}")]
    Unavailable { gateway: &'static str, message: String },
    #[error("{gateway} gateway returned an invalid response: {message}")]
    InvalidResponse { gateway: &'static str, message: String },
    #[error("{gateway} gateway did not respond within {deadline_ms}ms")]
    Timeout { gateway: &'static str, deadline_ms: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("peer `{address}` is unreachable: {message}")]
    PeerUnreachable { address: String, message: String },
    #[error("peer `{address}` served an invalid capability descriptor: {message}")]
    InvalidDescriptor { address: String, message: String },
    #[error("relay transport failure: {0}")]
    Transport(String),
    #[error("relay response not received within {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("cancel not supported")]
    CancelUnsupported,
}

impl CodecError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoTextPart => "no_text_part",
            Self::MalformedPayload(_) => "malformed_payload",
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        "gateway_failure"
    }
}

impl RelayError {
    /// Stable category name used in log fields and JSON-RPC error data.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PeerUnreachable { .. } => "peer_unreachable",
            Self::InvalidDescriptor { .. } => "invalid_descriptor",
            Self::Transport(_) => "relay_transport_error",
            Self::Timeout { .. } => "relay_timeout",
            Self::Codec(error) => error.kind(),
            Self::Gateway(error) => error.kind(),
            Self::CancelUnsupported => "cancel_unsupported",
        }
    }

    /// Faults that happen before any application payload is exchanged.
    pub fn is_hard_fault(&self) -> bool {
        !matches!(self, Self::Codec(_) | Self::Gateway(_))
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{CodecError, GatewayError, RelayError};

    #[test]
    fn codec_errors_keep_their_kind_when_wrapped() {
        let error = RelayError::from(CodecError::NoTextPart);

        assert_eq!(error.kind(), "no_text_part");
        assert!(!error.is_hard_fault());
    }

    #[test]
    fn gateway_errors_render_gateway_name() {
        let error = GatewayError::Timeout { gateway: "catalog", deadline_ms: 250 };

        assert_eq!(error.to_string(), "catalog gateway did not respond within 250ms");
        assert_eq!(RelayError::from(error).kind(), "gateway_failure");
    }

    #[test]
    fn cancel_unsupported_is_a_hard_fault() {
        let error = RelayError::CancelUnsupported;

        assert!(error.is_hard_fault());
        assert_eq!(error.kind(), "cancel_unsupported");
        assert_eq!(error.to_string(), "cancel not supported");
    }

    #[test]
    fn discovery_errors_name_the_peer() {
        let error = RelayError::PeerUnreachable {
            address: "http://peer:9000".to_string(),
            message: "connection refused".to_string(),
        };

        assert!(error.to_string().contains("http://peer:9000"));
        assert_eq!(error.kind(), "peer_unreachable");
    }
}
