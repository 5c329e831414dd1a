//! Schema descriptors and the explicit field-registration API.
//!
//! A [`FieldSchema`] tree mirrors a type's declared fields. There is no
//! runtime reflection: each registered type supplies its field list,
//! accessors, and allocator as ordinary closures over `dyn Any`. Trees are
//! built once per concrete type and shared read-only behind an `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dataset::DataSet;
use crate::error::WireError;
use crate::scalar::{Scalar, ScalarKind, ScalarValue};

/// Closed classification of a field's declared type, fixed at schema build
/// time. Container element kinds are part of the classification, so handler
/// resolution never inspects live values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(ScalarKind),
    /// Nullable scalar (`Option<T>` of a scalar kind).
    Nullable(ScalarKind),
    /// Bulk scalar array (`Vec<T>` of a scalar kind).
    Array(ScalarKind),
    /// Ordered sequence container (list, deque).
    Sequence(ScalarKind),
    /// Set container.
    Set(ScalarKind),
    /// Associative map.
    Map(ScalarKind, ScalarKind),
    /// Enumeration, transferred by variant name.
    Enum,
    /// Tabular dataset composite.
    DataSet,
    /// Nested record with no dedicated handler; decoded by recursion.
    Composite,
}

/// Abstract capabilities a declared type may exhibit. Handlers can be
/// registered against a capability instead of an exact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SequenceLike,
    SetLike,
    MapLike,
    EnumLike,
}

impl TypeRef {
    pub fn capability(self) -> Option<Capability> {
        match self {
            TypeRef::Sequence(_) => Some(Capability::SequenceLike),
            TypeRef::Set(_) => Some(Capability::SetLike),
            TypeRef::Map(_, _) => Some(Capability::MapLike),
            TypeRef::Enum => Some(Capability::EnumLike),
            _ => None,
        }
    }

    /// Element kind of array/sequence/set types.
    pub fn element_kind(self) -> Option<ScalarKind> {
        match self {
            TypeRef::Array(k) | TypeRef::Sequence(k) | TypeRef::Set(k) => Some(k),
            _ => None,
        }
    }

    /// Key and value kinds of map types.
    pub fn map_kinds(self) -> Option<(ScalarKind, ScalarKind)> {
        match self {
            TypeRef::Map(k, v) => Some((k, v)),
            _ => None,
        }
    }
}

type ReadFn = Box<dyn Fn(&dyn Any) -> Result<Box<dyn Any>, WireError> + Send + Sync>;
type WriteFn = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), WireError> + Send + Sync>;
type GetRefFn =
    Box<dyn for<'a> Fn(&'a dyn Any) -> Result<Option<&'a dyn Any>, WireError> + Send + Sync>;
type GetMutFn = Box<
    dyn for<'a> Fn(&'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, WireError> + Send + Sync,
>;
type AllocFn =
    Box<dyn for<'a> Fn(&'a mut dyn Any) -> Result<&'a mut dyn Any, WireError> + Send + Sync>;

enum FieldAccess {
    /// Leaf field: value crosses the boundary in its canonical owned form.
    Value { read: ReadFn, write: WriteFn },
    /// Composite field: the matcher recurses into the nested instance.
    Nested {
        get_ref: GetRefFn,
        get_mut: GetMutFn,
        alloc: AllocFn,
    },
}

static SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

fn next_schema_id() -> u64 {
    SCHEMA_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn access_err(field: &str, reason: &'static str) -> WireError {
    WireError::Access {
        field: field.to_owned(),
        reason,
    }
}

fn owner_ref<'a, O: Any>(field: &str, obj: &'a dyn Any) -> Result<&'a O, WireError> {
    obj.downcast_ref::<O>()
        .ok_or_else(|| access_err(field, "owner type mismatch"))
}

fn owner_mut<'a, O: Any>(field: &str, obj: &'a mut dyn Any) -> Result<&'a mut O, WireError> {
    obj.downcast_mut::<O>()
        .ok_or_else(|| access_err(field, "owner type mismatch"))
}

/// Unboxes a canonical value produced by [`FieldSchema::read_value`] or fed
/// to [`FieldSchema::write_value`].
pub(crate) fn take_value<T: 'static>(field: &str, value: Box<dyn Any>) -> Result<T, WireError> {
    value
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| access_err(field, "value type mismatch"))
}

/// One node of a type's field schema.
pub struct FieldSchema {
    id: u64,
    name: String,
    type_ref: TypeRef,
    is_mutable: bool,
    children: Vec<FieldSchema>,
    access: Option<FieldAccess>,
}

impl FieldSchema {
    fn new(
        name: &str,
        type_ref: TypeRef,
        children: Vec<FieldSchema>,
        access: Option<FieldAccess>,
    ) -> Self {
        Self {
            id: next_schema_id(),
            name: name.to_owned(),
            type_ref,
            is_mutable: true,
            children,
            access,
        }
    }

    /// Root descriptor of a type: a composite with no accessors, since the
    /// target instance itself is the value.
    pub fn record(name: &str, children: Vec<FieldSchema>) -> Self {
        Self::new(name, TypeRef::Composite, children, None)
    }

    /// Marks the field as not assignable; the decoder will skip it with a
    /// diagnostic unless its type is capability-matched.
    pub fn immutable(mut self) -> Self {
        self.is_mutable = false;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    pub fn children(&self) -> &[FieldSchema] {
        &self.children
    }

    /// Reads the field's current value in canonical owned form.
    pub fn read_value(&self, obj: &dyn Any) -> Result<Box<dyn Any>, WireError> {
        match &self.access {
            Some(FieldAccess::Value { read, .. }) => read(obj),
            _ => Err(access_err(&self.name, "field has no value accessor")),
        }
    }

    /// Writes a canonical owned value back into the field.
    pub fn write_value(&self, obj: &mut dyn Any, value: Box<dyn Any>) -> Result<(), WireError> {
        match &self.access {
            Some(FieldAccess::Value { write, .. }) => write(obj, value),
            _ => Err(access_err(&self.name, "field has no value accessor")),
        }
    }

    /// Whether the nested instance currently exists. The root descriptor is
    /// always present (the instance itself).
    pub(crate) fn nested_present(&self, obj: &dyn Any) -> Result<bool, WireError> {
        match &self.access {
            None => Ok(true),
            Some(FieldAccess::Nested { get_ref, .. }) => Ok(get_ref(obj)?.is_some()),
            Some(FieldAccess::Value { .. }) => {
                Err(access_err(&self.name, "not a composite field"))
            }
        }
    }

    /// Borrows the nested instance for the write-path walk; `None` when the
    /// field is currently absent.
    pub(crate) fn nested_ref<'a>(&self, obj: &'a dyn Any) -> Result<Option<&'a dyn Any>, WireError> {
        match &self.access {
            None => Ok(Some(obj)),
            Some(FieldAccess::Nested { get_ref, .. }) => get_ref(obj),
            Some(FieldAccess::Value { .. }) => {
                Err(access_err(&self.name, "not a composite field"))
            }
        }
    }

    /// Mutably borrows the nested instance, which must be present.
    pub(crate) fn nested_mut<'a>(
        &self,
        obj: &'a mut dyn Any,
    ) -> Result<&'a mut dyn Any, WireError> {
        match &self.access {
            None => Ok(obj),
            Some(FieldAccess::Nested { get_mut, .. }) => {
                get_mut(obj)?.ok_or_else(|| access_err(&self.name, "nested value is absent"))
            }
            Some(FieldAccess::Value { .. }) => {
                Err(access_err(&self.name, "not a composite field"))
            }
        }
    }

    /// Allocates the nested instance when absent, otherwise returns the
    /// existing one.
    pub(crate) fn nested_alloc<'a>(
        &self,
        obj: &'a mut dyn Any,
    ) -> Result<&'a mut dyn Any, WireError> {
        match &self.access {
            None => Ok(obj),
            Some(FieldAccess::Nested { alloc, .. }) => alloc(obj),
            Some(FieldAccess::Value { .. }) => {
                Err(access_err(&self.name, "not a composite field"))
            }
        }
    }

    fn value_field<O, V, G, S>(name: &str, type_ref: TypeRef, get: G, set: S) -> Self
    where
        O: Any,
        V: Any,
        G: Fn(&O) -> V + Send + Sync + 'static,
        S: Fn(&mut O, V) + Send + Sync + 'static,
    {
        let read_name = name.to_owned();
        let write_name = name.to_owned();
        let read: ReadFn = Box::new(move |obj| {
            let owner = owner_ref::<O>(&read_name, obj)?;
            Ok(Box::new(get(owner)) as Box<dyn Any>)
        });
        let write: WriteFn = Box::new(move |obj, value| {
            let value = take_value::<V>(&write_name, value)?;
            let owner = owner_mut::<O>(&write_name, obj)?;
            set(owner, value);
            Ok(())
        });
        Self::new(
            name,
            type_ref,
            Vec::new(),
            Some(FieldAccess::Value { read, write }),
        )
    }

    /// A scalar field (`bool`, integers, floats, `String`).
    pub fn scalar<O, T, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        T: Scalar,
        G: Fn(&O) -> T + Send + Sync + 'static,
        S: Fn(&mut O, T) + Send + Sync + 'static,
    {
        Self::value_field(name, TypeRef::Scalar(T::KIND), get, set)
    }

    /// A nullable scalar field (`Option<T>` of a scalar type). Absence is
    /// part of the value: decoding a null overwrites a present target.
    pub fn nullable<O, T, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        T: Scalar,
        G: Fn(&O) -> Option<T> + Send + Sync + 'static,
        S: Fn(&mut O, Option<T>) + Send + Sync + 'static,
    {
        Self::value_field(name, TypeRef::Nullable(T::KIND), get, set)
    }

    /// A bulk scalar array field (`Vec<T>`).
    pub fn array<O, T, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        T: Scalar,
        G: Fn(&O) -> Vec<T> + Send + Sync + 'static,
        S: Fn(&mut O, Vec<T>) + Send + Sync + 'static,
    {
        Self::value_field(name, TypeRef::Array(T::KIND), get, set)
    }

    /// A sequence-like container field (ordered list, deque).
    pub fn sequence<O, T, C, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        T: Scalar,
        C: IntoIterator<Item = T> + FromIterator<T> + 'static,
        G: Fn(&O) -> C + Send + Sync + 'static,
        S: Fn(&mut O, C) + Send + Sync + 'static,
    {
        Self::scalar_container(name, TypeRef::Sequence(T::KIND), get, set)
    }

    /// A set-like container field.
    pub fn set<O, T, C, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        T: Scalar,
        C: IntoIterator<Item = T> + FromIterator<T> + 'static,
        G: Fn(&O) -> C + Send + Sync + 'static,
        S: Fn(&mut O, C) + Send + Sync + 'static,
    {
        Self::scalar_container(name, TypeRef::Set(T::KIND), get, set)
    }

    fn scalar_container<O, T, C, G, S>(name: &str, type_ref: TypeRef, get: G, set: S) -> Self
    where
        O: Any,
        T: Scalar,
        C: IntoIterator<Item = T> + FromIterator<T> + 'static,
        G: Fn(&O) -> C + Send + Sync + 'static,
        S: Fn(&mut O, C) + Send + Sync + 'static,
    {
        Self::value_field(
            name,
            type_ref,
            move |owner: &O| -> Vec<ScalarValue> {
                get(owner).into_iter().map(Scalar::into_value).collect()
            },
            move |owner: &mut O, values: Vec<ScalarValue>| {
                // kind mismatches were rejected by the handler before the
                // write, so dropping unconvertible elements cannot happen
                let collected: C = values.into_iter().filter_map(T::from_value).collect();
                set(owner, collected);
            },
        )
    }

    /// An associative map field.
    pub fn map<O, K, V, M, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        K: Scalar,
        V: Scalar,
        M: IntoIterator<Item = (K, V)> + FromIterator<(K, V)> + 'static,
        G: Fn(&O) -> M + Send + Sync + 'static,
        S: Fn(&mut O, M) + Send + Sync + 'static,
    {
        Self::value_field(
            name,
            TypeRef::Map(K::KIND, V::KIND),
            move |owner: &O| -> Vec<(ScalarValue, ScalarValue)> {
                get(owner)
                    .into_iter()
                    .map(|(k, v)| (k.into_value(), v.into_value()))
                    .collect()
            },
            move |owner: &mut O, pairs: Vec<(ScalarValue, ScalarValue)>| {
                let collected: M = pairs
                    .into_iter()
                    .filter_map(|(k, v)| Some((K::from_value(k)?, V::from_value(v)?)))
                    .collect();
                set(owner, collected);
            },
        )
    }

    /// An enumeration field, transferred by variant name. `variant_name`
    /// and `parse` must be inverse to one another for every variant.
    pub fn enumeration<O, E, G, S>(
        name: &str,
        variant_name: fn(&E) -> &'static str,
        parse: fn(&str) -> Option<E>,
        get: G,
        set: S,
    ) -> Self
    where
        O: Any,
        E: 'static,
        G: Fn(&O) -> E + Send + Sync + 'static,
        S: Fn(&mut O, E) + Send + Sync + 'static,
    {
        let field = name.to_owned();
        let read_name = name.to_owned();
        let write_name = name.to_owned();
        let read: ReadFn = Box::new(move |obj| {
            let owner = owner_ref::<O>(&read_name, obj)?;
            Ok(Box::new(variant_name(&get(owner)).to_owned()) as Box<dyn Any>)
        });
        let write: WriteFn = Box::new(move |obj, value| {
            let symbol = take_value::<String>(&write_name, value)?;
            let owner = owner_mut::<O>(&write_name, obj)?;
            match parse(&symbol) {
                Some(variant) => {
                    set(owner, variant);
                    Ok(())
                }
                None => Err(WireError::UnknownVariant {
                    field: field.clone(),
                    name: symbol,
                }),
            }
        });
        Self::new(
            name,
            TypeRef::Enum,
            Vec::new(),
            Some(FieldAccess::Value { read, write }),
        )
    }

    /// A dataset field with the dedicated bulk payload.
    pub fn data_set<O, G, S>(name: &str, get: G, set: S) -> Self
    where
        O: Any,
        G: Fn(&O) -> DataSet + Send + Sync + 'static,
        S: Fn(&mut O, DataSet) + Send + Sync + 'static,
    {
        Self::value_field(name, TypeRef::DataSet, get, set)
    }

    /// A nested record field that is always present on the owner.
    pub fn nested<O, N, GR, GM>(
        name: &str,
        children: Vec<FieldSchema>,
        get_ref: GR,
        get_mut: GM,
    ) -> Self
    where
        O: Any,
        N: Any,
        GR: Fn(&O) -> &N + Send + Sync + 'static,
        GM: Fn(&mut O) -> &mut N + Send + Sync + 'static,
    {
        let get_mut = Arc::new(get_mut);
        let alloc_fn = Arc::clone(&get_mut);
        let ref_name = name.to_owned();
        let mut_name = name.to_owned();
        let alloc_name = name.to_owned();
        let get_ref: GetRefFn = Box::new(move |obj| {
            let owner = owner_ref::<O>(&ref_name, obj)?;
            Ok(Some(get_ref(owner) as &dyn Any))
        });
        let get_mut: GetMutFn = Box::new(move |obj| {
            let owner = owner_mut::<O>(&mut_name, obj)?;
            Ok(Some((*get_mut)(owner) as &mut dyn Any))
        });
        let alloc: AllocFn = Box::new(move |obj| {
            let owner = owner_mut::<O>(&alloc_name, obj)?;
            Ok((*alloc_fn)(owner) as &mut dyn Any)
        });
        Self::new(
            name,
            TypeRef::Composite,
            children,
            Some(FieldAccess::Nested {
                get_ref,
                get_mut,
                alloc,
            }),
        )
    }

    /// An optional nested record field (`Option<N>`), lazily allocated with
    /// `N::default()` on first decode.
    pub fn optional<O, N, GR, SL>(
        name: &str,
        children: Vec<FieldSchema>,
        get_ref: GR,
        slot: SL,
    ) -> Self
    where
        O: Any,
        N: Any + Default,
        GR: Fn(&O) -> Option<&N> + Send + Sync + 'static,
        SL: Fn(&mut O) -> &mut Option<N> + Send + Sync + 'static,
    {
        let slot = Arc::new(slot);
        let alloc_slot = Arc::clone(&slot);
        let ref_name = name.to_owned();
        let mut_name = name.to_owned();
        let alloc_name = name.to_owned();
        let get_ref: GetRefFn = Box::new(move |obj| {
            let owner = owner_ref::<O>(&ref_name, obj)?;
            Ok(get_ref(owner).map(|n| n as &dyn Any))
        });
        let get_mut: GetMutFn = Box::new(move |obj| {
            let owner = owner_mut::<O>(&mut_name, obj)?;
            Ok((*slot)(owner).as_mut().map(|n| n as &mut dyn Any))
        });
        let alloc: AllocFn = Box::new(move |obj| {
            let owner = owner_mut::<O>(&alloc_name, obj)?;
            Ok((*alloc_slot)(owner).get_or_insert_with(N::default) as &mut dyn Any)
        });
        Self::new(
            name,
            TypeRef::Composite,
            children,
            Some(FieldAccess::Nested {
                get_ref,
                get_mut,
                alloc,
            }),
        )
    }
}

/// Per-type schema catalog; the descriptor provider of the serialiser.
#[derive(Default)]
pub struct SchemaRegistry {
    by_type: HashMap<TypeId, Arc<FieldSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the schema root for `T`, replacing any previous one.
    pub fn register<T: Any>(&mut self, root: FieldSchema) {
        self.by_type.insert(TypeId::of::<T>(), Arc::new(root));
    }

    /// Looks up the memoized descriptor for a concrete type.
    pub fn describe(&self, type_id: TypeId) -> Option<Arc<FieldSchema>> {
        self.by_type.get(&type_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sensor {
        id: i32,
        inner: Option<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        x: f64,
    }

    #[test]
    fn scalar_accessors_round_trip_through_any() {
        let field = FieldSchema::scalar("id", |p: &Sensor| p.id, |p: &mut Sensor, v| p.id = v);
        let mut sensor = Sensor::default();
        field
            .write_value(&mut sensor, Box::new(42i32))
            .unwrap();
        assert_eq!(sensor.id, 42);
        let value = field.read_value(&sensor).unwrap();
        assert_eq!(take_value::<i32>("id", value).unwrap(), 42);
    }

    #[test]
    fn wrong_owner_type_is_an_access_error() {
        let field = FieldSchema::scalar("id", |p: &Sensor| p.id, |p: &mut Sensor, v| p.id = v);
        let mut other = Inner::default();
        let err = field.write_value(&mut other, Box::new(1i32)).unwrap_err();
        assert!(matches!(err, WireError::Access { .. }));
    }

    #[test]
    fn optional_alloc_reuses_existing_instance() {
        let field = FieldSchema::optional(
            "inner",
            vec![],
            |p: &Sensor| p.inner.as_ref(),
            |p: &mut Sensor| &mut p.inner,
        );
        let mut sensor = Sensor::default();
        assert!(!field.nested_present(&sensor).unwrap());
        {
            let inner = field.nested_alloc(&mut sensor).unwrap();
            inner.downcast_mut::<Inner>().unwrap().x = 1.5;
        }
        assert!(field.nested_present(&sensor).unwrap());
        let again = field.nested_alloc(&mut sensor).unwrap();
        assert_eq!(again.downcast_ref::<Inner>().unwrap().x, 1.5);
    }

    #[test]
    fn immutable_builder_flag() {
        let field = FieldSchema::scalar("id", |p: &Sensor| p.id, |p: &mut Sensor, v| p.id = v)
            .immutable();
        assert!(!field.is_mutable());
    }

    #[test]
    fn schema_ids_are_unique() {
        let a = FieldSchema::record("A", vec![]);
        let b = FieldSchema::record("B", vec![]);
        assert_ne!(a.id(), b.id());
    }
}
