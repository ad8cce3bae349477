//! Codec registry — decoders (token → value) and encoders (value → text),
//! keyed by type and resolved through an ordered polymorphic fallback search.
//!
//! Consumed by:
//!   • The chain executor — argument decoding and final-result rendering
//!   • The container codecs — per-element recursion back into the registry
//!
//! Adding a new scalar codec automatically improves array and collection
//! display; those handlers re-enter the registry per element.

use std::collections::HashMap;

use crate::error::{DecodeError, RegistryError};
use crate::runtime::value::{Caller, Value};
use crate::types::schema::{SchemaRegistry, TypeKey, TypeShape, keys};

/// Rendered form of an absent value.
pub const NULL_TEXT: &str = "null";

// ─── Handler traits ───────────────────────────────────────────────────────────

/// Converts one string token into a value of the relevant type.
///
/// `target` is the key the caller asked for, which may be a subtype of
/// [`Decode::relevant_type`] when the handler was found through the fallback
/// search — polymorphic handlers dispatch on it internally. Sub-tokenization
/// (e.g. comma-separated components) is the decoder's own responsibility.
pub trait Decode: Send + Sync {
    fn relevant_type(&self) -> TypeKey;

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError>;
}

/// Converts one value into a display string. `None` means the value has no
/// useful representation; the registry then falls back to a default form.
pub trait Encode: Send + Sync {
    fn relevant_type(&self) -> TypeKey;

    fn encode(&self, value: &Value, ctx: &CodecCtx<'_>) -> Option<String>;
}

/// Borrowed registry handles passed to every handler, so container codecs can
/// recurse per element and caller-aware decoders can see the principal.
pub struct CodecCtx<'a> {
    pub schemas: &'a SchemaRegistry,
    pub caller: Option<&'a dyn Caller>,
    codecs: &'a CodecRegistry,
}

impl CodecCtx<'_> {
    pub fn decode(&self, target: TypeKey, token: &str) -> Result<Value, DecodeError> {
        self.codecs.decode_one(self.schemas, target, token, self.caller)
    }

    pub fn encode(&self, value: &Value) -> String {
        self.codecs.encode(self.schemas, value)
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct CodecRegistry {
    decoders: HashMap<TypeKey, Box<dyn Decode>>,
    encoders: HashMap<TypeKey, Box<dyn Encode>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self { decoders: HashMap::new(), encoders: HashMap::new() }
    }

    /// Register a decoder under its relevant type. A second decoder for the
    /// same exact key is a bootstrap error, never a silent override.
    pub fn register_decoder(&mut self, handler: Box<dyn Decode>) -> Result<(), RegistryError> {
        let key = handler.relevant_type();
        if self.decoders.contains_key(&key) {
            return Err(RegistryError::DuplicateDecoder(key));
        }
        self.decoders.insert(key, handler);
        Ok(())
    }

    /// Register an encoder under its relevant type. The encoder table is
    /// independent of the decoder table — a type may have both.
    pub fn register_encoder(&mut self, handler: Box<dyn Encode>) -> Result<(), RegistryError> {
        let key = handler.relevant_type();
        if self.encoders.contains_key(&key) {
            return Err(RegistryError::DuplicateEncoder(key));
        }
        self.encoders.insert(key, handler);
        Ok(())
    }

    /// Snapshot of the keys with a registered decoder, sorted.
    pub fn decoder_types(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.decoders.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Snapshot of the keys with a registered encoder, sorted.
    pub fn encoder_types(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.encoders.keys().copied().collect();
        keys.sort();
        keys
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    /// The ordered fallback search: exact key → superclass chain → interface
    /// closure → array-of-applicable-element → collection. Precedence is the
    /// walk itself, so exact and specific registrations always beat the
    /// polymorphic built-ins regardless of registration order.
    fn find_decoder(&self, schemas: &SchemaRegistry, target: TypeKey) -> Option<&dyn Decode> {
        for key in schemas.ancestors(target) {
            if let Some(handler) = self.decoders.get(&key) {
                return Some(handler.as_ref());
            }
        }
        for key in schemas.interface_closure(target) {
            if let Some(handler) = self.decoders.get(&key) {
                return Some(handler.as_ref());
            }
        }
        if let Some(schema) = schemas.get(target) {
            if let TypeShape::Array { elem } = &schema.shape {
                if self.find_decoder(schemas, *elem).is_some() {
                    if let Some(handler) = self.decoders.get(&keys::ARRAY) {
                        return Some(handler.as_ref());
                    }
                }
            }
        }
        if schemas.is_assignable(target, keys::COLLECTION) {
            if let Some(handler) = self.decoders.get(&keys::COLLECTION) {
                return Some(handler.as_ref());
            }
        }
        None
    }

    /// Same walk as [`Self::find_decoder`], over the encoder table.
    fn find_encoder(&self, schemas: &SchemaRegistry, target: TypeKey) -> Option<&dyn Encode> {
        for key in schemas.ancestors(target) {
            if let Some(handler) = self.encoders.get(&key) {
                return Some(handler.as_ref());
            }
        }
        for key in schemas.interface_closure(target) {
            if let Some(handler) = self.encoders.get(&key) {
                return Some(handler.as_ref());
            }
        }
        if let Some(schema) = schemas.get(target) {
            if let TypeShape::Array { elem } = &schema.shape {
                if self.find_encoder(schemas, *elem).is_some() {
                    if let Some(handler) = self.encoders.get(&keys::ARRAY) {
                        return Some(handler.as_ref());
                    }
                }
            }
        }
        if schemas.is_assignable(target, keys::COLLECTION) {
            if let Some(handler) = self.encoders.get(&keys::COLLECTION) {
                return Some(handler.as_ref());
            }
        }
        None
    }

    // ── Decode ────────────────────────────────────────────────────────────────

    pub fn decode_one(
        &self,
        schemas: &SchemaRegistry,
        target: TypeKey,
        token: &str,
        caller: Option<&dyn Caller>,
    ) -> Result<Value, DecodeError> {
        let Some(decoder) = self.find_decoder(schemas, target) else {
            return Err(DecodeError::new(target, token, "no decoder registered for this type"));
        };
        let ctx = CodecCtx { schemas, caller, codecs: self };
        decoder.decode(target, token, &ctx)
    }

    /// Positional batch decode. Fails on the first token that cannot be
    /// decoded; no partial results.
    pub fn decode_args(
        &self,
        schemas: &SchemaRegistry,
        targets: &[TypeKey],
        tokens: &[&str],
        caller: Option<&dyn Caller>,
    ) -> Result<Vec<Value>, DecodeError> {
        if targets.len() != tokens.len() {
            return Err(DecodeError::new(
                targets.last().copied().unwrap_or(keys::NULL),
                tokens.last().copied().unwrap_or(""),
                format!("expected {} argument token(s), got {}", targets.len(), tokens.len()),
            ));
        }
        targets
            .iter()
            .zip(tokens)
            .map(|(target, token)| self.decode_one(schemas, *target, token, caller))
            .collect()
    }

    // ── Encode ────────────────────────────────────────────────────────────────

    /// Encoding never fails — it degrades to a default string form when the
    /// search is exhausted or the encoder declines the value.
    pub fn encode(&self, schemas: &SchemaRegistry, value: &Value) -> String {
        if value.is_null() {
            return NULL_TEXT.to_string();
        }
        if let Some(encoder) = self.find_encoder(schemas, value.type_key()) {
            let ctx = CodecCtx { schemas, caller: None, codecs: self };
            if let Some(text) = encoder.encode(value, &ctx) {
                return text;
            }
        }
        fallback_text(value)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback_text(value: &Value) -> String {
    match value {
        Value::Object(o) => o.display_name(),
        other => other.type_key().to_string(),
    }
}
