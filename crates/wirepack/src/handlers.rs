//! Built-in handler set registered at orchestrator construction.
//!
//! Covers all scalar kinds, bulk scalar arrays, sequence-like and set-like
//! containers, enumerations, associative maps, and the dataset composite.
//! Container decode always replaces the target wholesale; pre-existing
//! elements never survive a decode.

use wirepack_buffers::Reader;

use crate::constants::WireTag;
use crate::error::WireError;
use crate::registry::{DecodeFn, EncodeFn, HandlerRegistry, TypeMatcher};
use crate::scalar::{Scalar, ScalarKind, ScalarValue};
use crate::schema::{access_err, take_value, Capability, FieldSchema, TypeRef};
use crate::wire;
use crate::DataSet;

pub(crate) fn register_builtins(reg: &mut HandlerRegistry) {
    register_scalars(reg);
    register_nullable_scalars(reg);
    register_scalar_arrays(reg);
    register_container(reg, Capability::SequenceLike);
    register_container(reg, Capability::SetLike);
    register_enums(reg);
    register_maps(reg);
    register_data_sets(reg);
}

fn register_scalars(reg: &mut HandlerRegistry) {
    register_scalar::<bool>(reg);
    register_scalar::<i8>(reg);
    register_scalar::<i16>(reg);
    register_scalar::<i32>(reg);
    register_scalar::<i64>(reg);
    register_scalar::<f32>(reg);
    register_scalar::<f64>(reg);
    register_scalar::<String>(reg);
}

fn register_nullable_scalars(reg: &mut HandlerRegistry) {
    register_nullable_scalar::<bool>(reg);
    register_nullable_scalar::<i8>(reg);
    register_nullable_scalar::<i16>(reg);
    register_nullable_scalar::<i32>(reg);
    register_nullable_scalar::<i64>(reg);
    register_nullable_scalar::<f32>(reg);
    register_nullable_scalar::<f64>(reg);
    register_nullable_scalar::<String>(reg);
}

fn register_scalar_arrays(reg: &mut HandlerRegistry) {
    register_scalar_array::<bool>(reg);
    register_scalar_array::<i8>(reg);
    register_scalar_array::<i16>(reg);
    register_scalar_array::<i32>(reg);
    register_scalar_array::<i64>(reg);
    register_scalar_array::<f32>(reg);
    register_scalar_array::<f64>(reg);
    register_scalar_array::<String>(reg);
}

fn register_scalar<T: Scalar>(reg: &mut HandlerRegistry) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, T::KIND.tag(), schema.name())?;
        let value = T::read(r)?;
        schema.write_value(obj, Box::new(value))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let value = take_value::<T>(schema.name(), schema.read_value(obj)?)?;
        wire::put_field_name(w, schema.name());
        w.u8(T::KIND.tag().byte());
        value.write(w);
        Ok(())
    });
    reg.register(TypeMatcher::Exact(TypeRef::Scalar(T::KIND)), decode, encode);
}

/// Nullable scalars carry a presence byte so a wire null overwrites a
/// present target, unlike an absent field which leaves it untouched.
fn register_nullable_scalar<T: Scalar>(reg: &mut HandlerRegistry) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, WireTag::Maybe, schema.name())?;
        expect_elem_kind(r, T::KIND, schema.name())?;
        let value = match r.u8()? {
            0 => None,
            _ => Some(T::read(r)?),
        };
        schema.write_value(obj, Box::new(value))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let value = take_value::<Option<T>>(schema.name(), schema.read_value(obj)?)?;
        wire::put_field_name(w, schema.name());
        w.u8(WireTag::Maybe.byte());
        w.u8(T::KIND.tag().byte());
        match &value {
            Some(v) => {
                w.u8(1);
                v.write(w);
            }
            None => w.u8(0),
        }
        Ok(())
    });
    reg.register(TypeMatcher::Exact(TypeRef::Nullable(T::KIND)), decode, encode);
}

fn register_scalar_array<T: Scalar>(reg: &mut HandlerRegistry) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, WireTag::Array, schema.name())?;
        expect_elem_kind(r, T::KIND, schema.name())?;
        let count = r.u32()? as usize;
        // the count is wire-supplied; each element needs at least one byte
        let mut values: Vec<T> = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            values.push(T::read(r)?);
        }
        schema.write_value(obj, Box::new(values))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let values = take_value::<Vec<T>>(schema.name(), schema.read_value(obj)?)?;
        wire::put_field_name(w, schema.name());
        w.u8(WireTag::Array.byte());
        w.u8(T::KIND.tag().byte());
        w.u32(values.len() as u32);
        for value in &values {
            value.write(w);
        }
        Ok(())
    });
    reg.register(TypeMatcher::Exact(TypeRef::Array(T::KIND)), decode, encode);
}

/// One handler serves every sequence-like or set-like container: elements
/// cross the accessor boundary as canonical scalar values and the field's
/// own accessor rebuilds the concrete container type.
fn register_container(reg: &mut HandlerRegistry, capability: Capability) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, WireTag::Seq, schema.name())?;
        let kind = expect_declared_elem_kind(r, schema)?;
        let count = r.u32()? as usize;
        let mut values = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            values.push(ScalarValue::read(kind, r)?);
        }
        schema.write_value(obj, Box::new(values))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let values =
            take_value::<Vec<ScalarValue>>(schema.name(), schema.read_value(obj)?)?;
        let kind = declared_elem_kind(schema)?;
        wire::put_field_name(w, schema.name());
        w.u8(WireTag::Seq.byte());
        w.u8(kind.tag().byte());
        w.u32(values.len() as u32);
        for value in &values {
            value.write(w);
        }
        Ok(())
    });
    reg.register(TypeMatcher::Capability(capability), decode, encode);
}

fn register_enums(reg: &mut HandlerRegistry) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, WireTag::Enum, schema.name())?;
        let symbol = wire::get_str(r)?;
        // the accessor performs the variant-name lookup on the target type
        schema.write_value(obj, Box::new(symbol))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let symbol = take_value::<String>(schema.name(), schema.read_value(obj)?)?;
        wire::put_field_name(w, schema.name());
        w.u8(WireTag::Enum.byte());
        wire::put_str(w, &symbol);
        Ok(())
    });
    reg.register(
        TypeMatcher::Capability(Capability::EnumLike),
        decode,
        encode,
    );
}

fn register_maps(reg: &mut HandlerRegistry) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, WireTag::Map, schema.name())?;
        let (key_kind, val_kind) = declared_map_kinds(schema)?;
        expect_elem_kind(r, key_kind, schema.name())?;
        expect_elem_kind(r, val_kind, schema.name())?;
        let count = r.u32()? as usize;
        let mut pairs = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            let key = ScalarValue::read(key_kind, r)?;
            let value = ScalarValue::read(val_kind, r)?;
            pairs.push((key, value));
        }
        schema.write_value(obj, Box::new(pairs))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let pairs = take_value::<Vec<(ScalarValue, ScalarValue)>>(
            schema.name(),
            schema.read_value(obj)?,
        )?;
        let (key_kind, val_kind) = declared_map_kinds(schema)?;
        wire::put_field_name(w, schema.name());
        w.u8(WireTag::Map.byte());
        w.u8(key_kind.tag().byte());
        w.u8(val_kind.tag().byte());
        w.u32(pairs.len() as u32);
        for (key, value) in &pairs {
            key.write(w);
            value.write(w);
        }
        Ok(())
    });
    reg.register(TypeMatcher::Capability(Capability::MapLike), decode, encode);
}

fn register_data_sets(reg: &mut HandlerRegistry) {
    let decode: DecodeFn = Box::new(|r, obj, schema| {
        wire::expect_tag(r, WireTag::Data, schema.name())?;
        let data_set = DataSet::read_payload(r)?;
        schema.write_value(obj, Box::new(data_set))
    });
    let encode: EncodeFn = Box::new(|w, obj, schema| {
        let data_set = take_value::<DataSet>(schema.name(), schema.read_value(obj)?)?;
        wire::put_field_name(w, schema.name());
        w.u8(WireTag::Data.byte());
        data_set.write_payload(w);
        Ok(())
    });
    reg.register(TypeMatcher::Exact(TypeRef::DataSet), decode, encode);
}

/// Consumes an element-kind tag byte, requiring the given kind.
fn expect_elem_kind(
    r: &mut Reader<'_>,
    want: ScalarKind,
    field: &str,
) -> Result<(), WireError> {
    let found = r.u8()?;
    if found != want.tag().byte() {
        return Err(WireError::TagMismatch {
            field: field.to_owned(),
            found,
        });
    }
    Ok(())
}

/// Consumes the element-kind tag and checks it against the schema's
/// declared element kind, so accessors only ever see matching values.
fn expect_declared_elem_kind(
    r: &mut Reader<'_>,
    schema: &FieldSchema,
) -> Result<ScalarKind, WireError> {
    let kind = declared_elem_kind(schema)?;
    expect_elem_kind(r, kind, schema.name())?;
    Ok(kind)
}

fn declared_elem_kind(schema: &FieldSchema) -> Result<ScalarKind, WireError> {
    schema
        .type_ref()
        .element_kind()
        .ok_or_else(|| access_err(schema.name(), "container schema has no element kind"))
}

fn declared_map_kinds(schema: &FieldSchema) -> Result<(ScalarKind, ScalarKind), WireError> {
    schema
        .type_ref()
        .map_kinds()
        .ok_or_else(|| access_err(schema.name(), "map schema has no key/value kinds"))
}
