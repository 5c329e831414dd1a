//! Scalar kinds, their wire forms, and the dynamic scalar value used as
//! container interchange.

use wirepack_buffers::{Reader, Writer};

use crate::constants::WireTag;
use crate::error::WireError;
use crate::wire;

/// The closed set of scalar kinds the wire format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Str,
}

impl ScalarKind {
    pub fn tag(self) -> WireTag {
        match self {
            ScalarKind::Bool => WireTag::Bool,
            ScalarKind::I8 => WireTag::I8,
            ScalarKind::I16 => WireTag::I16,
            ScalarKind::I32 => WireTag::I32,
            ScalarKind::I64 => WireTag::I64,
            ScalarKind::F32 => WireTag::F32,
            ScalarKind::F64 => WireTag::F64,
            ScalarKind::Str => WireTag::Str,
        }
    }

    pub fn from_tag(tag: WireTag) -> Option<ScalarKind> {
        Some(match tag {
            WireTag::Bool => ScalarKind::Bool,
            WireTag::I8 => ScalarKind::I8,
            WireTag::I16 => ScalarKind::I16,
            WireTag::I32 => ScalarKind::I32,
            WireTag::I64 => ScalarKind::I64,
            WireTag::F32 => ScalarKind::F32,
            WireTag::F64 => ScalarKind::F64,
            WireTag::Str => ScalarKind::Str,
            _ => return None,
        })
    }
}

/// A dynamically typed scalar, used as the canonical element form when
/// container contents cross the accessor boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::I8(_) => ScalarKind::I8,
            ScalarValue::I16(_) => ScalarKind::I16,
            ScalarValue::I32(_) => ScalarKind::I32,
            ScalarValue::I64(_) => ScalarKind::I64,
            ScalarValue::F32(_) => ScalarKind::F32,
            ScalarValue::F64(_) => ScalarKind::F64,
            ScalarValue::Str(_) => ScalarKind::Str,
        }
    }

    /// Reads one scalar payload of the given kind.
    pub(crate) fn read(kind: ScalarKind, r: &mut Reader<'_>) -> Result<ScalarValue, WireError> {
        Ok(match kind {
            ScalarKind::Bool => ScalarValue::Bool(r.u8()? != 0),
            ScalarKind::I8 => ScalarValue::I8(r.i8()?),
            ScalarKind::I16 => ScalarValue::I16(r.i16()?),
            ScalarKind::I32 => ScalarValue::I32(r.i32()?),
            ScalarKind::I64 => ScalarValue::I64(r.i64()?),
            ScalarKind::F32 => ScalarValue::F32(r.f32()?),
            ScalarKind::F64 => ScalarValue::F64(r.f64()?),
            ScalarKind::Str => ScalarValue::Str(wire::get_str(r)?),
        })
    }

    /// Writes this scalar's payload (no tag byte).
    pub(crate) fn write(&self, w: &mut Writer) {
        match self {
            ScalarValue::Bool(v) => w.u8(u8::from(*v)),
            ScalarValue::I8(v) => w.i8(*v),
            ScalarValue::I16(v) => w.i16(*v),
            ScalarValue::I32(v) => w.i32(*v),
            ScalarValue::I64(v) => w.i64(*v),
            ScalarValue::F32(v) => w.f32(*v),
            ScalarValue::F64(v) => w.f64(*v),
            ScalarValue::Str(v) => wire::put_str(w, v),
        }
    }
}

/// Rust types that map onto a wire scalar kind.
///
/// Implemented for the primitive scalars and `String`; schema builder
/// helpers are generic over this trait so each registered field gets a
/// monomorphic accessor pair.
pub trait Scalar: Sized + Clone + Send + Sync + 'static {
    const KIND: ScalarKind;

    fn read(r: &mut Reader<'_>) -> Result<Self, WireError>;
    fn write(&self, w: &mut Writer);
    fn into_value(self) -> ScalarValue;
    fn from_value(value: ScalarValue) -> Option<Self>;
}

macro_rules! impl_numeric_scalar {
    ($ty:ty, $kind:ident, $method:ident) => {
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn read(r: &mut Reader<'_>) -> Result<Self, WireError> {
                Ok(r.$method()?)
            }

            fn write(&self, w: &mut Writer) {
                w.$method(*self);
            }

            fn into_value(self) -> ScalarValue {
                ScalarValue::$kind(self)
            }

            fn from_value(value: ScalarValue) -> Option<Self> {
                match value {
                    ScalarValue::$kind(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_numeric_scalar!(i8, I8, i8);
impl_numeric_scalar!(i16, I16, i16);
impl_numeric_scalar!(i32, I32, i32);
impl_numeric_scalar!(i64, I64, i64);
impl_numeric_scalar!(f32, F32, f32);
impl_numeric_scalar!(f64, F64, f64);

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn read(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(r.u8()? != 0)
    }

    fn write(&self, w: &mut Writer) {
        w.u8(u8::from(*self));
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Bool(self)
    }

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::Str;

    fn read(r: &mut Reader<'_>) -> Result<Self, WireError> {
        wire::get_str(r)
    }

    fn write(&self, w: &mut Writer) {
        wire::put_str(w, self);
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Str(self)
    }

    fn from_value(value: ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_value_round_trip_per_kind() {
        let values = vec![
            ScalarValue::Bool(true),
            ScalarValue::I8(-8),
            ScalarValue::I16(-16),
            ScalarValue::I32(-32),
            ScalarValue::I64(-64),
            ScalarValue::F32(0.5),
            ScalarValue::F64(-0.25),
            ScalarValue::Str("abc".into()),
        ];
        for value in values {
            let mut w = Writer::new();
            value.write(&mut w);
            let data = w.flush();
            let mut r = Reader::new(&data);
            let back = ScalarValue::read(value.kind(), &mut r).unwrap();
            assert_eq!(back, value);
            assert!(r.is_at_end());
        }
    }

    #[test]
    fn kind_tag_mapping_is_bijective() {
        let kinds = [
            ScalarKind::Bool,
            ScalarKind::I8,
            ScalarKind::I16,
            ScalarKind::I32,
            ScalarKind::I64,
            ScalarKind::F32,
            ScalarKind::F64,
            ScalarKind::Str,
        ];
        for kind in kinds {
            assert_eq!(ScalarKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ScalarKind::from_tag(WireTag::Start), None);
    }
}
