//! spyglass — a runtime object-inspection engine.
//!
//! Given a live value and a textual command stream ("call `getWorld` with
//! `overworld`, then `getTime` on the result, …"), the engine decodes string
//! tokens into typed arguments, resolves overloads against a cached per-type
//! method index, threads each result into the next call, and renders the
//! final value as text.
//!
//! Hosts declare their types once ([`TypeSchema`]) and may register domain
//! codecs; primitives, enums, arrays and collections come built in.

pub mod error;
pub mod runtime;
pub mod types;

pub use error::{ChainError, ChainErrorKind, DecodeError, InvokeError, RegistryError};
pub use runtime::chain::{ChainOutcome, Frame};
pub use runtime::index::{IndexCache, MethodIndex, Overload};
pub use runtime::value::{Caller, HostObject, Value};
pub use types::registry::{CodecCtx, CodecRegistry, Decode, Encode, NULL_TEXT};
pub use types::schema::{
    MethodDesc, MethodFn, SchemaRegistry, TypeKey, TypeSchema, TypeShape, keys,
};

use std::sync::Arc;

use runtime::chain::ChainExecutor;

// ─── Engine ───────────────────────────────────────────────────────────────────

/// An explicitly owned inspection engine: schema registry, codec registry and
/// method index cache, with no global state. Registration takes `&mut self`
/// and belongs to single-threaded bootstrap; execution takes `&self` and is
/// safe from any number of threads.
pub struct Engine {
    schemas: SchemaRegistry,
    codecs: CodecRegistry,
    cache: IndexCache,
}

impl Engine {
    /// An engine with the built-in schemas and codecs installed.
    pub fn new() -> Self {
        let mut schemas = SchemaRegistry::new();
        let mut codecs = CodecRegistry::new();
        // Fresh registries; the built-in keys are distinct by construction.
        let Ok(()) = types::builtin::install(&mut schemas, &mut codecs) else {
            unreachable!("built-in registration collided")
        };
        Self { schemas, codecs, cache: IndexCache::new() }
    }

    // ── Bootstrap ─────────────────────────────────────────────────────────────

    pub fn register_type(&mut self, schema: TypeSchema) -> Result<(), RegistryError> {
        self.schemas.register(schema)
    }

    pub fn register_decoder(&mut self, handler: Box<dyn Decode>) -> Result<(), RegistryError> {
        self.codecs.register_decoder(handler)
    }

    pub fn register_encoder(&mut self, handler: Box<dyn Encode>) -> Result<(), RegistryError> {
        self.codecs.register_encoder(handler)
    }

    // ── Call surfaces ─────────────────────────────────────────────────────────

    /// Decode `tokens` positionally against `targets`. Fails on the first
    /// token that cannot be decoded; no partial results.
    pub fn decode_arguments(
        &self,
        targets: &[TypeKey],
        tokens: &[&str],
        caller: Option<&dyn Caller>,
    ) -> Result<Vec<Value>, DecodeError> {
        self.codecs.decode_args(&self.schemas, targets, tokens, caller)
    }

    /// Execute an operation chain against `receiver`.
    ///
    /// Token grouping is heuristic: each step's overload is picked by trial
    /// decoding, preferring overloads that consume every remaining token and
    /// falling back to shorter ones in declaration order. When same-arity
    /// overloads both accept the same tokens, the earlier declaration wins —
    /// including a zero-arity overload shadowing a longer same-name one
    /// mid-chain.
    pub fn run_chain(
        &self,
        tokens: &[&str],
        receiver: Value,
        caller: Option<&dyn Caller>,
    ) -> Result<ChainOutcome, ChainError> {
        let executor = ChainExecutor {
            schemas: &self.schemas,
            codecs: &self.codecs,
            cache: &self.cache,
            caller,
        };
        executor.run(tokens, receiver)
    }

    /// Render a value as text. Never fails; values with no registered encoder
    /// degrade to a default form.
    pub fn encode(&self, value: &Value) -> String {
        self.codecs.encode(&self.schemas, value)
    }

    /// Cached method index for `key`, building it on first access.
    pub fn index_of(&self, key: TypeKey) -> Arc<MethodIndex> {
        self.cache.index_of(&self.schemas, key)
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    /// Drop every cached method index (reload path); rebuilt on next access.
    pub fn clear_cache(&self) {
        self.cache.clear()
    }

    /// Snapshot of the keys with a cached index.
    pub fn cached_types(&self) -> Vec<TypeKey> {
        self.cache.cached_types()
    }

    /// Snapshot of every cached index.
    pub fn indices(&self) -> Vec<(TypeKey, Arc<MethodIndex>)> {
        self.cache.indices()
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
