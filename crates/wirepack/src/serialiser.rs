//! The orchestrator: schema-matching object (de)serialisation over a
//! seekable buffer.
//!
//! Decoding is a two-phase pass. `parse_io_stream` first indexes the whole
//! stream into a [`WireField`] tree without touching any values; the
//! recursive matcher then walks that tree against the target type's
//! [`FieldSchema`], seeks to each matched leaf's payload, and lets the
//! resolved handler transfer the value. Fields present on only one side are
//! tolerated: unknown wire fields are dropped and unmatched schema fields
//! keep their current value, which is what makes streams written by newer
//! or older peers decodable.

use std::any::Any;

use log::{trace, warn};
use wirepack_buffers::{Reader, Writer};

use crate::cache::MatchCache;
use crate::constants::OBJ_ROOT_END;
use crate::error::WireError;
use crate::handlers;
use crate::registry::{DecodeFn, EncodeFn, HandlerRegistry, TypeMatcher};
use crate::schema::{FieldSchema, SchemaRegistry};
use crate::wire::{self, WireField};

/// Streams registered object types to and from a binary buffer.
///
/// Owns the handler registry, the schema catalog, and the match cache. One
/// call runs to completion or fails; a failed decode may leave the target
/// partially mutated (no rollback).
pub struct ObjectSerialiser {
    registry: HandlerRegistry,
    schemas: SchemaRegistry,
    cache: MatchCache,
}

impl Default for ObjectSerialiser {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSerialiser {
    /// Creates a serialiser with the built-in handler set registered.
    pub fn new() -> Self {
        let mut registry = HandlerRegistry::new();
        handlers::register_builtins(&mut registry);
        Self {
            registry,
            schemas: SchemaRegistry::new(),
            cache: MatchCache::new(),
        }
    }

    /// Registers the field schema for a concrete type.
    pub fn register_type<T: Any>(&mut self, schema: FieldSchema) {
        self.schemas.register::<T>(schema);
    }

    /// Registers an additional handler. Built-in entries take precedence
    /// for the capabilities they already cover.
    pub fn register_handler(&mut self, matcher: TypeMatcher, decode: DecodeFn, encode: EncodeFn) {
        self.registry.register(matcher, decode, encode);
    }

    /// Decodes the stream at the reader's current position into `obj`,
    /// mutating it in place.
    ///
    /// The target's type must have been registered via
    /// [`register_type`](Self::register_type); anything else is a caller
    /// contract violation reported before any buffer access.
    pub fn deserialise_object(
        &mut self,
        reader: &mut Reader<'_>,
        obj: &mut dyn Any,
    ) -> Result<(), WireError> {
        let schema = self
            .schemas
            .describe((*obj).type_id())
            .ok_or(WireError::UnregisteredType)?;
        let wire_root = wire::parse_io_stream(reader)?;
        for child in &wire_root.children {
            self.decode_field(reader, obj, child, &schema, 0)?;
        }
        Ok(())
    }

    /// Encodes `obj` as a complete framed stream.
    pub fn serialise_object(&mut self, writer: &mut Writer, obj: &dyn Any) -> Result<(), WireError> {
        let schema = self
            .schemas
            .describe((*obj).type_id())
            .ok_or(WireError::UnregisteredType)?;
        wire::put_header_info(writer);
        wire::put_start_marker(writer, schema.name());
        self.encode_fields(writer, obj, &schema)?;
        wire::put_end_marker(writer, schema.name());
        wire::put_end_marker(writer, OBJ_ROOT_END);
        Ok(())
    }

    /// The recursive matcher. `wire_field` and `schema` may or may not be
    /// aligned; all tolerance rules live here.
    fn decode_field(
        &mut self,
        reader: &mut Reader<'_>,
        obj: &mut dyn Any,
        wire_field: &WireField,
        schema: &FieldSchema,
        depth: usize,
    ) -> Result<(), WireError> {
        if wire_field.name != schema.name() {
            // not aligned at this node: treat the wire field as a
            // pass-through container and match its children by name
            if wire_field.children.is_empty() {
                trace!("dropping wire field `{}`: no schema counterpart", wire_field.name);
                return Ok(());
            }
            for child in &wire_field.children {
                match self.cache.find_child(schema, depth, &child.name) {
                    Some(sub_schema) => {
                        self.decode_field(reader, obj, child, sub_schema, depth + 1)?
                    }
                    None => trace!(
                        "dropping wire field `{}`: no schema counterpart",
                        child.name
                    ),
                }
            }
            return Ok(());
        }

        if !schema.is_mutable() && schema.type_ref().capability().is_none() {
            warn!("cannot update immutable field `{}`", schema.name());
            return Ok(());
        }

        if let Some(handler) = self.registry.resolve(schema.type_ref()) {
            reader.set_position(wire_field.payload_offset)?;
            return (handler.decode)(reader, obj, schema);
        }

        // no handler: composite field, recurse into the nested instance,
        // reusing it when present and allocating it otherwise
        let target: &mut dyn Any = if schema.nested_present(&*obj)? {
            schema.nested_mut(obj)?
        } else {
            schema.nested_alloc(obj)?
        };
        for child in &wire_field.children {
            match self.cache.find_child(schema, depth, &child.name) {
                Some(sub_schema) => {
                    self.decode_field(reader, &mut *target, child, sub_schema, depth + 1)?
                }
                None => trace!(
                    "dropping wire field `{}`: no schema counterpart",
                    child.name
                ),
            }
        }
        Ok(())
    }

    /// The write-path walk: handlers encode leaves, composites recurse
    /// between start/end markers. Absent optional composites are omitted.
    fn encode_fields(
        &self,
        writer: &mut Writer,
        obj: &dyn Any,
        schema: &FieldSchema,
    ) -> Result<(), WireError> {
        for child in schema.children() {
            match self.registry.resolve(child.type_ref()) {
                Some(handler) => (handler.encode)(writer, obj, child)?,
                None => {
                    if let Some(nested) = child.nested_ref(obj)? {
                        wire::put_start_marker(writer, child.name());
                        self.encode_fields(writer, nested, child)?;
                        wire::put_end_marker(writer, child.name());
                    }
                }
            }
        }
        Ok(())
    }

    /// Read-only view of the match cache, mainly for instrumentation.
    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    /// Drops all memoized schema lookups.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
