//! Built-in schemas and codecs: the primitive scalars and their arrays, the
//! generic enum codec, and the container codecs that recurse back into the
//! registry per element.
//!
//! The scalars all declare `primitive` as their parent, so one shared codec
//! pair serves the whole family through the superclass step of the fallback
//! search; enums work the same way through their `enum` pseudo-parent.

use crate::error::{DecodeError, RegistryError};
use crate::runtime::value::Value;
use crate::types::registry::{CodecCtx, CodecRegistry, Decode, Encode};
use crate::types::schema::{SchemaRegistry, TypeKey, TypeSchema, TypeShape, keys};

/// All scalar keys served by the shared primitive codec.
pub const PRIMITIVES: &[TypeKey] = &[
    keys::BOOL,
    keys::CHAR,
    keys::I8,
    keys::I16,
    keys::I32,
    keys::I64,
    keys::F32,
    keys::F64,
];

// ─── Bootstrap ────────────────────────────────────────────────────────────────

pub(crate) fn install(
    schemas: &mut SchemaRegistry,
    codecs: &mut CodecRegistry,
) -> Result<(), RegistryError> {
    // Pseudo-supertypes the fallback search lands on.
    schemas.register(scalar(keys::PRIMITIVE, None))?;
    schemas.register(scalar(keys::ENUM, None))?;
    schemas.register(scalar(keys::COLLECTION, None))?;

    for &key in PRIMITIVES {
        schemas.register(scalar(key, Some(keys::PRIMITIVE)))?;
    }
    schemas.register(scalar(keys::STRING, None))?;

    schemas.register(array_of(keys::BOOL_ARRAY, keys::BOOL))?;
    schemas.register(array_of(keys::CHAR_ARRAY, keys::CHAR))?;
    schemas.register(array_of(keys::I8_ARRAY, keys::I8))?;
    schemas.register(array_of(keys::I16_ARRAY, keys::I16))?;
    schemas.register(array_of(keys::I32_ARRAY, keys::I32))?;
    schemas.register(array_of(keys::I64_ARRAY, keys::I64))?;
    schemas.register(array_of(keys::F32_ARRAY, keys::F32))?;
    schemas.register(array_of(keys::F64_ARRAY, keys::F64))?;
    schemas.register(array_of(keys::STRING_ARRAY, keys::STRING))?;

    // The generic sequence value type.
    schemas.register(TypeSchema {
        key: keys::SEQ,
        parent: None,
        interfaces: vec![keys::COLLECTION],
        shape: TypeShape::Collection,
        methods: vec![],
    })?;

    codecs.register_decoder(Box::new(PrimitiveDecoder))?;
    codecs.register_decoder(Box::new(StringDecoder))?;
    codecs.register_decoder(Box::new(EnumDecoder))?;
    codecs.register_decoder(Box::new(ArrayDecoder))?;

    codecs.register_encoder(Box::new(PrimitiveEncoder))?;
    codecs.register_encoder(Box::new(StringEncoder))?;
    codecs.register_encoder(Box::new(EnumEncoder))?;
    codecs.register_encoder(Box::new(ArrayEncoder))?;
    codecs.register_encoder(Box::new(SeqEncoder))?;

    Ok(())
}

fn scalar(key: TypeKey, parent: Option<TypeKey>) -> TypeSchema {
    TypeSchema { key, parent, interfaces: vec![], shape: TypeShape::Scalar, methods: vec![] }
}

fn array_of(key: TypeKey, elem: TypeKey) -> TypeSchema {
    TypeSchema {
        key,
        parent: None,
        interfaces: vec![],
        shape: TypeShape::Array { elem },
        methods: vec![],
    }
}

// ─── Decoders ─────────────────────────────────────────────────────────────────

/// One decoder for the whole numeric/bool/char family, found through the
/// scalars' `primitive` parent and dispatched on the requested key.
struct PrimitiveDecoder;

impl Decode for PrimitiveDecoder {
    fn relevant_type(&self) -> TypeKey {
        keys::PRIMITIVE
    }

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        _ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        fn num<T: std::str::FromStr>(target: TypeKey, token: &str) -> Result<T, DecodeError> {
            token
                .parse::<T>()
                .map_err(|_| DecodeError::new(target, token, "malformed numeral"))
        }
        match target {
            keys::BOOL => match token {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(DecodeError::new(target, token, "expected `true` or `false`")),
            },
            keys::CHAR => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(DecodeError::new(target, token, "expected a single character")),
                }
            }
            keys::I8 => num::<i8>(target, token).map(Value::I8),
            keys::I16 => num::<i16>(target, token).map(Value::I16),
            keys::I32 => num::<i32>(target, token).map(Value::I32),
            keys::I64 => num::<i64>(target, token).map(Value::I64),
            keys::F32 => num::<f32>(target, token).map(Value::F32),
            keys::F64 => num::<f64>(target, token).map(Value::F64),
            _ => Err(DecodeError::new(target, token, "not a primitive type")),
        }
    }
}

struct StringDecoder;

impl Decode for StringDecoder {
    fn relevant_type(&self) -> TypeKey {
        keys::STRING
    }

    fn decode(
        &self,
        _target: TypeKey,
        token: &str,
        _ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        Ok(Value::Str(token.to_string()))
    }
}

/// Resolves a variant name against the requested enum's declared variants.
/// Matching ignores ASCII case; the canonical variant name is stored.
struct EnumDecoder;

impl Decode for EnumDecoder {
    fn relevant_type(&self) -> TypeKey {
        keys::ENUM
    }

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        let Some(schema) = ctx.schemas.get(target) else {
            return Err(DecodeError::new(target, token, "unknown enum type"));
        };
        let TypeShape::Enum { variants } = &schema.shape else {
            return Err(DecodeError::new(target, token, "not an enum type"));
        };
        variants
            .iter()
            .copied()
            .find(|v| v.eq_ignore_ascii_case(token))
            .map(|variant| Value::Enum { ty: target, variant })
            .ok_or_else(|| {
                DecodeError::new(
                    target,
                    token,
                    format!("unknown variant (expected one of: {})", variants.join(", ")),
                )
            })
    }
}

/// Splits its single token on commas and decodes each piece as the element
/// type. An empty token decodes to an empty array.
struct ArrayDecoder;

impl Decode for ArrayDecoder {
    fn relevant_type(&self) -> TypeKey {
        keys::ARRAY
    }

    fn decode(
        &self,
        target: TypeKey,
        token: &str,
        ctx: &CodecCtx<'_>,
    ) -> Result<Value, DecodeError> {
        let Some(schema) = ctx.schemas.get(target) else {
            return Err(DecodeError::new(target, token, "unknown array type"));
        };
        let TypeShape::Array { elem } = &schema.shape else {
            return Err(DecodeError::new(target, token, "not an array type"));
        };
        if token.is_empty() {
            return Ok(Value::Array { ty: target, items: Vec::new() });
        }
        let items = token
            .split(',')
            .map(|piece| ctx.decode(*elem, piece.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DecodeError::new(target, token, "array element rejected").with_cause(e))?;
        Ok(Value::Array { ty: target, items })
    }
}

// ─── Encoders ─────────────────────────────────────────────────────────────────

struct PrimitiveEncoder;

impl Encode for PrimitiveEncoder {
    fn relevant_type(&self) -> TypeKey {
        keys::PRIMITIVE
    }

    fn encode(&self, value: &Value, _ctx: &CodecCtx<'_>) -> Option<String> {
        match value {
            Value::Bool(v) => Some(v.to_string()),
            Value::Char(v) => Some(v.to_string()),
            Value::I8(v) => Some(v.to_string()),
            Value::I16(v) => Some(v.to_string()),
            Value::I32(v) => Some(v.to_string()),
            Value::I64(v) => Some(v.to_string()),
            Value::F32(v) => Some(v.to_string()),
            Value::F64(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

struct StringEncoder;

impl Encode for StringEncoder {
    fn relevant_type(&self) -> TypeKey {
        keys::STRING
    }

    fn encode(&self, value: &Value, _ctx: &CodecCtx<'_>) -> Option<String> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

struct EnumEncoder;

impl Encode for EnumEncoder {
    fn relevant_type(&self) -> TypeKey {
        keys::ENUM
    }

    fn encode(&self, value: &Value, _ctx: &CodecCtx<'_>) -> Option<String> {
        match value {
            Value::Enum { variant, .. } => Some((*variant).to_string()),
            _ => None,
        }
    }
}

/// Joins encoded elements with `", "` inside brackets. Every element goes
/// back through the registry, so scalar encoders improve array display
/// without touching this handler.
struct ArrayEncoder;

impl Encode for ArrayEncoder {
    fn relevant_type(&self) -> TypeKey {
        keys::ARRAY
    }

    fn encode(&self, value: &Value, ctx: &CodecCtx<'_>) -> Option<String> {
        let Value::Array { items, .. } = value else { return None };
        let parts: Vec<String> = items.iter().map(|v| ctx.encode(v)).collect();
        Some(format!("[{}]", parts.join(", ")))
    }
}

/// Brace-wrapped rendition for generic sequences, recursing like the array
/// encoder.
struct SeqEncoder;

impl Encode for SeqEncoder {
    fn relevant_type(&self) -> TypeKey {
        keys::COLLECTION
    }

    fn encode(&self, value: &Value, ctx: &CodecCtx<'_>) -> Option<String> {
        let Value::Seq(items) = value else { return None };
        let parts: Vec<String> = items.iter().map(|v| ctx.encode(v)).collect();
        Some(format!("{{{}}}", parts.join(", ")))
    }
}
