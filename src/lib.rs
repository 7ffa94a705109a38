//! Proto3 schema inference and wire codec.
//!
//! Hand a [`SchemaGenerator`] a type description ([`TypeDesc`]) and it
//! registers a proto3 message or enum for every type reachable from it:
//! records, unions (`oneof`), enums, lists, maps and nullable values, with
//! synthetic wrapper and map-entry messages where proto3 needs them. The
//! resulting [`Schema`] then encodes and decodes [`Value`]s to and from
//! bit-exact protobuf bytes.
//!
//! ```
//! use proto_osi::{Catalog, RecordDecl, SchemaGenerator, TypeDesc, Value};
//!
//! let root = RecordDecl::new("Point")
//!     .field("x", TypeDesc::int32())
//!     .field("y", TypeDesc::int32())
//!     .into_desc();
//! let mut generator = SchemaGenerator::new();
//! let point = generator.generate(&Catalog::new(), &root).unwrap();
//! let schema = generator.finish();
//!
//! let value = Value::record([("x", Value::I32(1)), ("y", Value::I32(0))]);
//! let bytes = schema.encode(point, &value).unwrap();
//! assert_eq!(bytes, vec![0x08, 0x01]);
//! assert_eq!(schema.decode(point, &bytes).unwrap(), value);
//! ```
pub mod buffer;
pub mod codec;
pub mod desc;
pub mod error;
pub mod generator;
pub mod numbering;
pub mod path_de;
pub mod registry;
pub mod scalar;
pub mod schema;
pub mod value;
pub mod wire;

pub use codec::{EncodeOptions, MAX_DEPTH};
pub use desc::{Catalog, EnumDecl, FieldDecl, IntEncoding, Primitive, RecordDecl, TypeDesc, TypeLookup, UnionDecl};
pub use error::{EncodeError, Error, GenerationError, WireFormatError};
pub use generator::{schema_for, SchemaGenerator};
pub use scalar::ScalarKind;
pub use schema::{Field, FieldEncoding, FieldShape, MessageKind, MessageType, Rule, Schema, TypeNode, TypeRef};
pub use value::Value;

pub type Result<T> = std::result::Result<T, Error>;
