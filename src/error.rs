//! Error taxonomy.
//!
//! Three families, all fatal to the call that raised them:
//! - [`GenerationError`]: the type description cannot become a schema.
//! - [`WireFormatError`]: the bytes handed to `decode` are malformed.
//! - [`EncodeError`]: the caller broke an encoding precondition.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("duplicate number {number} in `{scope}`")]
    DuplicateNumber { scope: String, number: i64 },

    #[error("duplicate name `{name}` in `{scope}`")]
    DuplicateName { scope: String, name: String },

    #[error("type name `{name}` is already registered with a different shape")]
    NameConflict { name: String },

    #[error("a {shape} cannot be the root of a schema; wrap it in a record")]
    UnsupportedRoot { shape: &'static str },

    #[error("enum `{name}` has no value numbered 0 (mark one value as default or number it 0)")]
    MissingZeroValue { name: String },

    #[error("field number {number} in `{scope}` is outside 1..=536870911 or inside 19000..=19999")]
    InvalidFieldNumber { scope: String, number: i64 },

    #[error("number {number} in `{scope}` falls in a reserved range")]
    ReservedNumber { scope: String, number: i64 },

    #[error("name `{name}` in `{scope}` is reserved")]
    ReservedName { scope: String, name: String },

    #[error("no field numbers left to assign in `{scope}`")]
    NumbersExhausted { scope: String },

    #[error("unknown type reference `{name}`")]
    UnknownType { name: String },

    #[error("`{name}` is not a valid protobuf identifier")]
    InvalidIdentifier { name: String },

    #[error("integer encoding `{encoding}` does not apply to `{primitive}`")]
    InvalidIntEncoding { primitive: &'static str, encoding: &'static str },

    #[error("field `{field}` in `{scope}` cannot be packed")]
    NotPackable { scope: String, field: String },

    #[error("union `{name}` declares no variants")]
    EmptyUnion { name: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireFormatError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("varint longer than 10 bytes")]
    VarintOverflow,

    #[error("invalid tag {0:#x}")]
    InvalidTag(u64),

    #[error("unsupported wire type {0}")]
    InvalidWireType(u8),

    #[error("cannot decode {scalar} from a {found} wire value")]
    WireTypeMismatch { scalar: &'static str, found: &'static str },

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    #[error("field number {number} is not a variant of union `{union}`")]
    UnknownVariant { union: String, number: u32 },

    #[error("union `{union}` carries no variant")]
    MissingVariant { union: String },

    #[error("number {number} is not a value of enum `{name}`")]
    UnknownEnumNumber { name: String, number: i32 },

    #[error("message nesting exceeds {0} levels")]
    RecursionLimit(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("required field `{field}` of `{message}` is missing")]
    MissingField { message: String, field: String },

    #[error("`{message}` has no field named `{field}`")]
    UnknownField { message: String, field: String },

    #[error("`{union}` has no variant named `{variant}`")]
    UnknownVariant { union: String, variant: String },

    #[error("`{value}` is not a value of enum `{name}`")]
    UnknownEnumValue { name: String, value: String },

    #[error("map value written before its key")]
    MapValueWithoutKey,

    #[error("`{name}` is an enum; only messages can be encoded at the top level")]
    RootNotMessage { name: String },

    #[error("type ref #{index} does not belong to this schema")]
    UnknownTypeRef { index: usize },
}

/// Umbrella error for callers that drive generation and coding together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    WireFormat(#[from] WireFormatError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
