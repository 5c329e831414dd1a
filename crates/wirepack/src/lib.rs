//! Schema-matching object-graph serialiser over a seekable binary buffer.
//!
//! wirepack reconciles a type's registered field schema against the field
//! records found in a binary stream and transfers values through
//! type-specific handlers. The matching is deliberately tolerant: wire
//! fields the schema does not know are dropped, schema fields the wire does
//! not carry keep their current value, and nested records decode by
//! recursion without needing a handler of their own. This lets peers with
//! older or newer versions of a type exchange streams safely.
//!
//! Types are registered explicitly: each one supplies its field list,
//! accessors, and allocator as plain closures (no runtime reflection, no
//! derive). See [`FieldSchema`] for the builder helpers.
//!
//! # Example
//!
//! ```
//! use wirepack::{FieldSchema, ObjectSerialiser};
//! use wirepack_buffers::{Reader, Writer};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//!     label: String,
//! }
//!
//! let schema = FieldSchema::record(
//!     "Point",
//!     vec![
//!         FieldSchema::scalar("x", |p: &Point| p.x, |p: &mut Point, v| p.x = v),
//!         FieldSchema::scalar("y", |p: &Point| p.y, |p: &mut Point, v| p.y = v),
//!         FieldSchema::scalar(
//!             "label",
//!             |p: &Point| p.label.clone(),
//!             |p: &mut Point, v| p.label = v,
//!         ),
//!     ],
//! );
//!
//! let mut serialiser = ObjectSerialiser::new();
//! serialiser.register_type::<Point>(schema);
//!
//! let original = Point { x: 1.0, y: -2.0, label: "origin".into() };
//! let mut writer = Writer::new();
//! serialiser.serialise_object(&mut writer, &original).unwrap();
//! let bytes = writer.flush();
//!
//! let mut decoded = Point::default();
//! serialiser
//!     .deserialise_object(&mut Reader::new(&bytes), &mut decoded)
//!     .unwrap();
//! assert_eq!(decoded, original);
//! ```

mod cache;
mod constants;
mod error;
mod handlers;
mod scalar;

pub mod dataset;
pub mod registry;
pub mod schema;
pub mod serialiser;
pub mod wire;

pub use cache::MatchCache;
pub use constants::{WireTag, OBJ_ROOT_END};
pub use dataset::DataSet;
pub use error::WireError;
pub use registry::{DecodeFn, EncodeFn, FieldHandler, HandlerRegistry, TypeMatcher};
pub use scalar::{Scalar, ScalarKind, ScalarValue};
pub use schema::{Capability, FieldSchema, SchemaRegistry, TypeRef};
pub use serialiser::ObjectSerialiser;
pub use wire::{parse_io_stream, WireField};
