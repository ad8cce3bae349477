//! Runtime type descriptors — the declared reflection surface of the host.
//!
//! Rust has no ambient reflection, so every inspectable type is declared up
//! front: identity key, supertype, interfaces, structural shape, and the
//! invokable methods with their parameter types. The method index and the
//! codec fallback search both walk this graph.

use std::collections::HashMap;
use std::fmt;

use crate::error::{InvokeError, RegistryError};
use crate::runtime::value::Value;

// ─── Type identity ────────────────────────────────────────────────────────────

/// Identity handle for a runtime type. Stable equality and hashing — the key
/// for the codec tables and the method index cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub &'static str);

impl TypeKey {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Built-in type keys. The pseudo-types (`primitive`, `enum`, `array`,
/// `collection`) exist so the fallback search has a place to find the shared
/// polymorphic codecs.
pub mod keys {
    use super::TypeKey;

    pub const PRIMITIVE: TypeKey = TypeKey("primitive");
    pub const ENUM: TypeKey = TypeKey("enum");
    pub const ARRAY: TypeKey = TypeKey("array");
    pub const COLLECTION: TypeKey = TypeKey("collection");

    pub const NULL: TypeKey = TypeKey("null");
    pub const BOOL: TypeKey = TypeKey("bool");
    pub const CHAR: TypeKey = TypeKey("char");
    pub const I8: TypeKey = TypeKey("i8");
    pub const I16: TypeKey = TypeKey("i16");
    pub const I32: TypeKey = TypeKey("i32");
    pub const I64: TypeKey = TypeKey("i64");
    pub const F32: TypeKey = TypeKey("f32");
    pub const F64: TypeKey = TypeKey("f64");
    pub const STRING: TypeKey = TypeKey("string");
    pub const SEQ: TypeKey = TypeKey("seq");

    pub const BOOL_ARRAY: TypeKey = TypeKey("bool[]");
    pub const CHAR_ARRAY: TypeKey = TypeKey("char[]");
    pub const I8_ARRAY: TypeKey = TypeKey("i8[]");
    pub const I16_ARRAY: TypeKey = TypeKey("i16[]");
    pub const I32_ARRAY: TypeKey = TypeKey("i32[]");
    pub const I64_ARRAY: TypeKey = TypeKey("i64[]");
    pub const F32_ARRAY: TypeKey = TypeKey("f32[]");
    pub const F64_ARRAY: TypeKey = TypeKey("f64[]");
    pub const STRING_ARRAY: TypeKey = TypeKey("string[]");
}

// ─── Function pointer alias ───────────────────────────────────────────────────

/// Invoke an operation on a receiver with pre-decoded args.
pub type MethodFn = fn(&Value, &[Value]) -> Result<Value, InvokeError>;

// ─── Descriptors ──────────────────────────────────────────────────────────────

/// One invokable operation. Several descriptors sharing a name form an
/// overload set; their declaration order is the overload resolution order.
pub struct MethodDesc {
    pub name: &'static str,
    /// Parameter types, decoded positionally from argument tokens.
    pub params: Vec<TypeKey>,
    pub call: MethodFn,
}

/// Structural category of a type, used by the codec fallback search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Scalar,
    /// Named variants, resolved by the generic enum codec.
    Enum { variants: Vec<&'static str> },
    /// Fixed element type; one token holds comma-separated element literals.
    Array { elem: TypeKey },
    Collection,
}

/// The full declared surface of one type.
pub struct TypeSchema {
    pub key: TypeKey,
    /// Direct supertype, walked most-specific-first by the fallback search.
    pub parent: Option<TypeKey>,
    /// Declared order is the search order when several interfaces apply.
    pub interfaces: Vec<TypeKey>,
    pub shape: TypeShape,
    pub methods: Vec<MethodDesc>,
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct SchemaRegistry {
    types: HashMap<TypeKey, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self { types: HashMap::new() }
    }

    pub fn register(&mut self, schema: TypeSchema) -> Result<(), RegistryError> {
        if self.types.contains_key(&schema.key) {
            return Err(RegistryError::DuplicateType(schema.key));
        }
        self.types.insert(schema.key, schema);
        Ok(())
    }

    pub fn get(&self, key: TypeKey) -> Option<&TypeSchema> {
        self.types.get(&key)
    }

    /// Snapshot of the registered type keys, sorted.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.types.keys().copied().collect();
        keys.sort();
        keys
    }

    /// The superclass chain from `key` upward, `key` itself first. Undeclared
    /// links still appear once; repeated links (a cycle) end the walk.
    pub fn ancestors(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut out = vec![key];
        let mut cur = key;
        while let Some(schema) = self.types.get(&cur) {
            let Some(parent) = schema.parent else { break };
            if out.contains(&parent) {
                break;
            }
            out.push(parent);
            cur = parent;
        }
        out
    }

    /// All interfaces reachable from `key`: its own first (declared order),
    /// then its ancestors', then interfaces of interfaces, breadth-first,
    /// de-duplicated.
    pub fn interface_closure(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut queue: Vec<TypeKey> = Vec::new();
        for k in self.ancestors(key) {
            if let Some(schema) = self.types.get(&k) {
                queue.extend(schema.interfaces.iter().copied());
            }
        }
        let mut out: Vec<TypeKey> = Vec::new();
        let mut i = 0;
        while i < queue.len() {
            let k = queue[i];
            i += 1;
            if out.contains(&k) {
                continue;
            }
            out.push(k);
            if let Some(schema) = self.types.get(&k) {
                queue.extend(schema.interfaces.iter().copied());
            }
        }
        out
    }

    /// Whether a value of type `actual` can stand where `expected` is
    /// declared.
    pub fn is_assignable(&self, actual: TypeKey, expected: TypeKey) -> bool {
        if actual == expected {
            return true;
        }
        self.ancestors(actual).contains(&expected)
            || self.interface_closure(actual).contains(&expected)
    }

    /// Walk order for method collection: the type, its superclass chain, then
    /// the interface closure. Undeclared keys are skipped by the index
    /// builder.
    pub fn linearize(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut out = self.ancestors(key);
        for k in self.interface_closure(key) {
            if !out.contains(&k) {
                out.push(k);
            }
        }
        out
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
