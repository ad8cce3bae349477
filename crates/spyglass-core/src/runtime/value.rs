//! Dynamic value model threaded through decode, invocation, and encode.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::InvokeError;
use crate::types::schema::{TypeKey, keys};

// ─── Host traits ──────────────────────────────────────────────────────────────

/// A live host object made inspectable. Implementations are registered with a
/// matching `TypeSchema` under the same key.
pub trait HostObject: Send + Sync {
    fn type_key(&self) -> TypeKey;

    /// Downcast hook for method implementations.
    fn as_any(&self) -> &dyn Any;

    /// Shown when no encoder is registered for this type.
    fn display_name(&self) -> String {
        self.type_key().to_string()
    }
}

/// The principal a chain runs on behalf of. Passed through to decoders that
/// resolve caller-relative tokens; never stored.
pub trait Caller: Send + Sync {
    fn name(&self) -> &str;
}

// ─── Value ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Enum { ty: TypeKey, variant: &'static str },
    Array { ty: TypeKey, items: Vec<Value> },
    Seq(Vec<Value>),
    Object(Arc<dyn HostObject>),
}

impl Value {
    /// Map a value to its schema key. `Null` has no operations; the executor
    /// treats it as chain termination.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::Null => keys::NULL,
            Value::Bool(_) => keys::BOOL,
            Value::Char(_) => keys::CHAR,
            Value::I8(_) => keys::I8,
            Value::I16(_) => keys::I16,
            Value::I32(_) => keys::I32,
            Value::I64(_) => keys::I64,
            Value::F32(_) => keys::F32,
            Value::F64(_) => keys::F64,
            Value::Str(_) => keys::STRING,
            Value::Enum { ty, .. } => *ty,
            Value::Array { ty, .. } => *ty,
            Value::Seq(_) => keys::SEQ,
            Value::Object(o) => o.type_key(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn object(obj: impl HostObject + 'static) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Borrow the concrete host object behind `Object`, if it is a `T`.
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Object(o) => o.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Borrow the live object behind this value as a `T`, or report a
    /// receiver-type mismatch for the executor to surface.
    pub fn receiver<T: 'static>(&self, expected: &str) -> Result<&T, InvokeError> {
        self.downcast::<T>()
            .ok_or_else(|| InvokeError::wrong_receiver(format!("receiver is not a `{expected}`")))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Char(v) => write!(f, "Char({v:?})"),
            Value::I8(v) => write!(f, "I8({v})"),
            Value::I16(v) => write!(f, "I16({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::F32(v) => write!(f, "F32({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Enum { ty, variant } => write!(f, "Enum({ty}::{variant})"),
            Value::Array { ty, items } => write!(f, "Array({ty}, {items:?})"),
            Value::Seq(items) => write!(f, "Seq({items:?})"),
            Value::Object(o) => write!(f, "Object({})", o.type_key()),
        }
    }
}

/// Structural equality for everything except host objects, which compare by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (
                Value::Enum { ty: at, variant: av },
                Value::Enum { ty: bt, variant: bv },
            ) => at == bt && av == bv,
            (
                Value::Array { ty: at, items: ai },
                Value::Array { ty: bt, items: bi },
            ) => at == bt && ai == bi,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
