//! Error taxonomy for code translation, controller dispatch and transport.

use thiserror::Error;

use crate::controllers::{ControllerKind, Encoding};

/// Failure from the pure translation functions in [`crate::codec`].
///
/// Translation never retries and never touches the network; a malformed
/// code always surfaces to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The Pronto payload is structurally invalid: undecodable hex, a
    /// nonzero first word (raw carrier format), or a preamble whose
    /// declared sequence lengths do not match the remaining words.
    #[error("malformed code: {0}")]
    MalformedCode(String),
}

/// Failure raised by a [`crate::sink::DispatchSink`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid dispatch url: {0}")]
    Url(#[from] url::ParseError),

    /// The backend answered but refused the action.
    #[error("backend {backend} rejected {action}: status {status}")]
    Rejected {
        backend: String,
        action: String,
        status: u16,
    },
}

/// Failure from controller construction, `send` or `learn`.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Raised at construction when the encoding is outside the kind's
    /// supported set.
    #[error("the {encoding} encoding is not supported by the {kind} controller")]
    UnsupportedEncoding {
        kind: ControllerKind,
        encoding: Encoding,
    },

    /// Raised by the factory for a kind string outside the registry.
    #[error("the controller {0:?} is not supported")]
    UnsupportedControllerKind(String),

    /// Raised for an encoding string that names no known encoding.
    #[error("unknown encoding {0:?}")]
    UnknownEncoding(String),

    /// A translation step failed while preparing a command for dispatch;
    /// the command was not dispatched.
    #[error("error while converting {encoding} command for dispatch")]
    EncodingConversionFailed {
        encoding: Encoding,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The dispatch sink reported a transport failure. Propagated
    /// unchanged; controllers perform no retries.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device rejected the enter-learn-mode command; the learn
    /// session aborted before polling began.
    #[error("failed to enter learn mode: {0}")]
    LearnStartFailed(#[source] TransportError),

    /// `learn()` was called on a backend without learn support.
    #[error("the {0} controller does not support learning")]
    LearnUnsupported(ControllerKind),
}

impl ControllerError {
    /// Wrap a translation failure encountered mid-`send`.
    pub(crate) fn conversion<E>(encoding: Encoding, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::EncodingConversionFailed {
            encoding,
            source: Box::new(source),
        }
    }
}
