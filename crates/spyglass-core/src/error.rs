//! Error taxonomy for decoding, registration, and chain execution.
//!
//! Every chain failure is terminal and carries the 0-indexed step at which it
//! occurred; nothing propagates past the `run_chain` / `decode_arguments`
//! boundary.

use thiserror::Error;

use crate::types::schema::TypeKey;

// ─── Decode ───────────────────────────────────────────────────────────────────

/// A single token could not be converted to its target type.
/// Always attributable to exactly one (type, token) pair.
#[derive(Debug, Clone, Error)]
#[error("cannot decode `{token}` as `{target}`: {reason}")]
pub struct DecodeError {
    pub target: TypeKey,
    pub token: String,
    pub reason: String,
    /// Innermost cause only — see [`DecodeError::with_cause`].
    #[source]
    pub cause: Option<Box<DecodeError>>,
}

impl DecodeError {
    pub fn new(target: TypeKey, token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { target, token: token.into(), reason: reason.into(), cause: None }
    }

    /// Attach a cause. Re-wrapping is suppressed: if `cause` itself carries a
    /// cause, the innermost one is kept instead of nesting the whole chain.
    pub fn with_cause(mut self, cause: DecodeError) -> Self {
        self.cause = Some(Box::new(cause.into_root()));
        self
    }

    /// Unwrap to the innermost error.
    pub fn into_root(mut self) -> DecodeError {
        match self.cause.take() {
            Some(inner) => inner.into_root(),
            None => self,
        }
    }
}

// ─── Registration ─────────────────────────────────────────────────────────────

/// Bootstrap-time registration failures. Fatal to startup, never recoverable
/// at runtime.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("a decoder for `{0}` is already registered")]
    DuplicateDecoder(TypeKey),
    #[error("an encoder for `{0}` is already registered")]
    DuplicateEncoder(TypeKey),
    #[error("type `{0}` is already registered")]
    DuplicateType(TypeKey),
}

// ─── Invocation ───────────────────────────────────────────────────────────────

/// A host method implementation rejected the call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InvokeError {
    pub message: String,
    /// True when the receiver was not of the declaring type. The executor
    /// surfaces this as [`ChainErrorKind::ReceiverTypeMismatch`] instead of a
    /// plain invocation failure.
    pub wrong_receiver: bool,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), wrong_receiver: false }
    }

    pub fn wrong_receiver(message: impl Into<String>) -> Self {
        Self { message: message.into(), wrong_receiver: true }
    }
}

// ─── Chain ────────────────────────────────────────────────────────────────────

/// Terminal failure of a chain execution, positioned at the step that failed.
#[derive(Debug, Clone, Error)]
#[error("step {step}: {kind}")]
pub struct ChainError {
    /// 0-indexed step at which execution stopped.
    pub step: usize,
    pub kind: ChainErrorKind,
}

#[derive(Debug, Clone, Error)]
pub enum ChainErrorKind {
    #[error("`{receiver}` has no operation `{name}`; available: {}", .available.join(", "))]
    UnknownOperation {
        receiver: TypeKey,
        name: String,
        available: Vec<String>,
    },

    #[error("`{name}` has no overload taking {supplied} argument token(s)")]
    ArityMismatch { name: String, supplied: usize },

    #[error("no overload of `{name}` accepts the given arguments: {cause}")]
    OverloadResolution {
        name: String,
        /// The last attempted overload's decode failure — the most specific
        /// diagnostic available.
        #[source]
        cause: DecodeError,
    },

    #[error("`{name}` is declared on `{expected}` and not invokable on `{actual}`")]
    ReceiverTypeMismatch {
        name: String,
        expected: TypeKey,
        actual: TypeKey,
    },

    #[error("nothing to continue the chain from (previous result was null)")]
    TerminatedEarly,

    #[error("`{name}` failed: {cause}")]
    Invoke {
        name: String,
        #[source]
        cause: InvokeError,
    },
}
