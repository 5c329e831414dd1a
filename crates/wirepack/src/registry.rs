//! Type-handler registry: exact-type and capability dispatch for paired
//! encode/decode handlers.

use std::any::Any;

use wirepack_buffers::{Reader, Writer};

use crate::error::WireError;
use crate::schema::{Capability, FieldSchema, TypeRef};

/// Decodes one field payload. The reader is positioned at the field's tag
/// byte; the handler consumes the payload and writes the value back through
/// the schema accessors of the owner instance.
pub type DecodeFn =
    Box<dyn Fn(&mut Reader<'_>, &mut dyn Any, &FieldSchema) -> Result<(), WireError> + Send + Sync>;

/// Encodes one field as a complete wire record (name, tag, payload).
pub type EncodeFn =
    Box<dyn Fn(&mut Writer, &dyn Any, &FieldSchema) -> Result<(), WireError> + Send + Sync>;

/// What a handler entry matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatcher {
    /// Matches one declared type exactly.
    Exact(TypeRef),
    /// Matches every type exhibiting the capability.
    Capability(Capability),
}

/// A paired decode/encode handler.
pub struct FieldHandler {
    pub(crate) decode: DecodeFn,
    pub(crate) encode: EncodeFn,
}

/// Ordered handler table. Resolution prefers exact matches; capability
/// matches are tried in registration order, so earlier registrations win.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<(TypeMatcher, FieldHandler)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler entry. Entries are never replaced; a later exact
    /// entry for an already-covered type is simply shadowed.
    pub fn register(&mut self, matcher: TypeMatcher, decode: DecodeFn, encode: EncodeFn) {
        self.entries.push((matcher, FieldHandler { decode, encode }));
    }

    /// Finds the handler for a declared type, or `None` when the type has
    /// no handler and must be decoded as a composite.
    pub fn resolve(&self, type_ref: TypeRef) -> Option<&FieldHandler> {
        for (matcher, handler) in &self.entries {
            if matches!(matcher, TypeMatcher::Exact(t) if *t == type_ref) {
                return Some(handler);
            }
        }
        let capability = type_ref.capability()?;
        for (matcher, handler) in &self.entries {
            if matches!(matcher, TypeMatcher::Capability(c) if *c == capability) {
                return Some(handler);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKind;

    fn noop_handler() -> (DecodeFn, EncodeFn) {
        (
            Box::new(|_, _, _| Ok(())),
            Box::new(|_, _, _| Ok(())),
        )
    }

    #[test]
    fn exact_match_beats_capability() {
        let mut reg = HandlerRegistry::new();
        let (d, e) = noop_handler();
        reg.register(TypeMatcher::Capability(Capability::SequenceLike), d, e);
        let (d, e) = noop_handler();
        reg.register(TypeMatcher::Exact(TypeRef::Sequence(ScalarKind::I32)), d, e);

        // entry 1 is the exact one even though it was registered later
        let resolved = reg.resolve(TypeRef::Sequence(ScalarKind::I32)).unwrap();
        let expected = &reg.entries[1].1;
        assert!(std::ptr::eq(resolved, expected));
    }

    #[test]
    fn capability_resolution_follows_registration_order() {
        let mut reg = HandlerRegistry::new();
        let (d, e) = noop_handler();
        reg.register(TypeMatcher::Capability(Capability::SequenceLike), d, e);
        let (d, e) = noop_handler();
        reg.register(TypeMatcher::Capability(Capability::SequenceLike), d, e);

        let resolved = reg.resolve(TypeRef::Sequence(ScalarKind::Str)).unwrap();
        assert!(std::ptr::eq(resolved, &reg.entries[0].1));
    }

    #[test]
    fn composite_types_resolve_to_none() {
        let mut reg = HandlerRegistry::new();
        let (d, e) = noop_handler();
        reg.register(TypeMatcher::Capability(Capability::MapLike), d, e);
        assert!(reg.resolve(TypeRef::Composite).is_none());
        assert!(reg.resolve(TypeRef::Scalar(ScalarKind::Bool)).is_none());
    }
}
