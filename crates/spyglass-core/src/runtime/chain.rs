//! Chain executor — parses a flat token stream into operation steps, resolves
//! each against the receiver's method index, and threads results forward.
//!
//! Splitting the stream is heuristic by design: overloads that would consume
//! every remaining token are tried first, then shorter ones, in index order,
//! accepting the first whose parameters all decode. Same-arity overloads that
//! both accept the same tokens resolve to the earlier declaration.

use tracing::trace;

use crate::error::{ChainError, ChainErrorKind, DecodeError};
use crate::runtime::index::{IndexCache, Overload};
use crate::runtime::value::{Caller, Value};
use crate::types::registry::CodecRegistry;
use crate::types::schema::{SchemaRegistry, TypeKey};

// ─── Frames ───────────────────────────────────────────────────────────────────

/// The record of one executed step: what ran, against what, with what result.
#[derive(Debug, Clone)]
pub struct Frame {
    pub operation: String,
    pub arg_tokens: Vec<String>,
    /// Parameter types of the overload that was selected.
    pub params: Vec<TypeKey>,
    pub receiver: Value,
    pub result: Value,
}

/// A finished chain: the final value, its rendered form, and every step taken
/// to reach it.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub value: Value,
    pub rendered: String,
    pub frames: Vec<Frame>,
}

// ─── Executor ─────────────────────────────────────────────────────────────────

pub(crate) struct ChainExecutor<'a> {
    pub schemas: &'a SchemaRegistry,
    pub codecs: &'a CodecRegistry,
    pub cache: &'a IndexCache,
    pub caller: Option<&'a dyn Caller>,
}

impl ChainExecutor<'_> {
    pub fn run(&self, tokens: &[&str], receiver: Value) -> Result<ChainOutcome, ChainError> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut receiver = receiver;
        let mut cursor = 0;

        while cursor < tokens.len() {
            let step = frames.len();
            if receiver.is_null() {
                return Err(ChainError { step, kind: ChainErrorKind::TerminatedEarly });
            }

            let name = tokens[cursor];
            cursor += 1;
            let rest = &tokens[cursor..];

            let index = self.cache.index_of(self.schemas, receiver.type_key());
            let Some(overloads) = index.get(name) else {
                return Err(ChainError {
                    step,
                    kind: ChainErrorKind::UnknownOperation {
                        receiver: receiver.type_key(),
                        name: name.to_string(),
                        available: index.operation_names(),
                    },
                });
            };

            let (overload, args) = self
                .select_overload(name, overloads, rest)
                .map_err(|kind| ChainError { step, kind })?;
            let arity = overload.params.len();

            trace!(op = name, arity, step, "invoking chain step");
            let result = (overload.call)(&receiver, &args).map_err(|cause| {
                let kind = if cause.wrong_receiver {
                    ChainErrorKind::ReceiverTypeMismatch {
                        name: name.to_string(),
                        expected: overload.owner,
                        actual: receiver.type_key(),
                    }
                } else {
                    ChainErrorKind::Invoke { name: name.to_string(), cause }
                };
                ChainError { step, kind }
            })?;

            frames.push(Frame {
                operation: name.to_string(),
                arg_tokens: rest[..arity].iter().map(|t| t.to_string()).collect(),
                params: overload.params,
                receiver: receiver.clone(),
                result: result.clone(),
            });
            cursor += arity;
            receiver = result;
        }

        let rendered = self.codecs.encode(self.schemas, &receiver);
        Ok(ChainOutcome { value: receiver, rendered, frames })
    }

    /// Arity-based trial selection. First pass: overloads consuming every
    /// remaining token, in index order, first full decode wins. Second pass:
    /// overloads consuming fewer tokens, leaving the rest for the next step.
    fn select_overload(
        &self,
        name: &str,
        overloads: &[Overload],
        rest: &[&str],
    ) -> Result<(Overload, Vec<Value>), ChainErrorKind> {
        let mut last_decode_err: Option<DecodeError> = None;
        let mut any_fit = false;

        for pass in 0..2 {
            for overload in overloads {
                let arity = overload.params.len();
                let fits = if pass == 0 { arity == rest.len() } else { arity < rest.len() };
                if !fits {
                    continue;
                }
                any_fit = true;
                match self.codecs.decode_args(self.schemas, &overload.params, &rest[..arity], self.caller)
                {
                    Ok(args) => return Ok((overload.clone(), args)),
                    Err(e) => last_decode_err = Some(e),
                }
            }
        }

        match last_decode_err {
            Some(cause) => {
                Err(ChainErrorKind::OverloadResolution { name: name.to_string(), cause })
            }
            None if !any_fit => {
                Err(ChainErrorKind::ArityMismatch { name: name.to_string(), supplied: rest.len() })
            }
            None => unreachable!("a fitting overload either decodes or records an error"),
        }
    }
}
