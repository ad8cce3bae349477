//! Method index — per-type catalogue of invokable operations, grouped by
//! name, built lazily from the schema graph and cached for the process
//! lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::types::schema::{MethodFn, SchemaRegistry, TypeKey};

// ─── Overload ─────────────────────────────────────────────────────────────────

/// One resolved overload: its parameter list, the type that declared it, and
/// the implementation.
#[derive(Clone)]
pub struct Overload {
    pub name: &'static str,
    pub params: Vec<TypeKey>,
    /// The declaring type.
    pub owner: TypeKey,
    pub call: MethodFn,
}

// ─── Index ────────────────────────────────────────────────────────────────────

/// Immutable name → overload list for one type. Overloads keep schema
/// declaration order, most-derived type first; an overridden operation (same
/// name and parameter list further up the graph) counts once.
pub struct MethodIndex {
    by_name: HashMap<&'static str, Vec<Overload>>,
}

impl MethodIndex {
    fn build(schemas: &SchemaRegistry, key: TypeKey) -> Self {
        let mut by_name: HashMap<&'static str, Vec<Overload>> = HashMap::new();
        for owner in schemas.linearize(key) {
            let Some(schema) = schemas.get(owner) else {
                // Undeclared ancestors degrade to a partial index.
                debug!(%owner, "skipping undeclared type while indexing");
                continue;
            };
            for method in &schema.methods {
                let overloads = by_name.entry(method.name).or_default();
                if overloads.iter().any(|o| o.params == method.params) {
                    continue; // overridden further down the walk
                }
                overloads.push(Overload {
                    name: method.name,
                    params: method.params.clone(),
                    owner,
                    call: method.call,
                });
            }
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&[Overload]> {
        self.by_name.get(name).map(|v| v.as_slice())
    }

    /// Operation names, sorted — used for unknown-operation diagnostics.
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().map(|s| s.to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ─── Cache ────────────────────────────────────────────────────────────────────

/// Process-wide map from type key to its method index. Reads are concurrent;
/// a first-populate race builds outside the lock and keeps whichever insert
/// lands first (the results are identical).
pub struct IndexCache {
    indices: RwLock<HashMap<TypeKey, Arc<MethodIndex>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self { indices: RwLock::new(HashMap::new()) }
    }

    /// Cached index for `key`, building it on first access. Idempotent.
    pub fn index_of(&self, schemas: &SchemaRegistry, key: TypeKey) -> Arc<MethodIndex> {
        if let Some(index) = self.indices.read().get(&key) {
            return index.clone();
        }
        let built = Arc::new(MethodIndex::build(schemas, key));
        debug!(ty = %key, operations = built.len(), "built method index");
        let mut map = self.indices.write();
        map.entry(key).or_insert(built).clone()
    }

    /// Drop every cached index; subsequent lookups rebuild.
    pub fn clear(&self) {
        let dropped = {
            let mut map = self.indices.write();
            let n = map.len();
            map.clear();
            n
        };
        debug!(dropped, "cleared method index cache");
    }

    /// Snapshot of the cached keys, sorted.
    pub fn cached_types(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.indices.read().keys().copied().collect();
        keys.sort();
        keys
    }

    /// Snapshot of the cached indices.
    pub fn indices(&self) -> Vec<(TypeKey, Arc<MethodIndex>)> {
        let mut all: Vec<(TypeKey, Arc<MethodIndex>)> =
            self.indices.read().iter().map(|(k, v)| (*k, v.clone())).collect();
        all.sort_by_key(|(k, _)| *k);
        all
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}
