//! Tabular dataset record with a dedicated handler payload form.

use wirepack_buffers::{Reader, Writer};

use crate::error::WireError;
use crate::wire;

/// A named series of x/y columns.
///
/// This is the domain composite the built-in handler set ships with: it is
/// transferred as one opaque payload instead of being matched field by
/// field, so bulk numeric data avoids the per-field record overhead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl DataSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    /// Number of points in the series.
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn write_payload(&self, w: &mut Writer) {
        wire::put_str(w, &self.name);
        wire::put_f64s(w, &self.x);
        wire::put_f64s(w, &self.y);
    }

    pub(crate) fn read_payload(r: &mut Reader<'_>) -> Result<Self, WireError> {
        let name = wire::get_str(r)?;
        let x = wire::get_f64s(r)?;
        let y = wire::get_f64s(r)?;
        Ok(Self { name, x, y })
    }
}
