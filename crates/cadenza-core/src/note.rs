//! Note views: lightweight accessors over one row of a note table

use serde::{Deserialize, Serialize};

use crate::error::{CadenzaError, Result};
use crate::schema::{AttrCast, AttrSchema};

/// Read-only view of one note: a row slice plus the schema that names its
/// columns. Owns no data; two views over the same row read identically.
#[derive(Debug, Clone, Copy)]
pub struct Note<'a> {
    row: &'a [f64],
    schema: &'a AttrSchema,
}

impl<'a> Note<'a> {
    pub(crate) fn new(row: &'a [f64], schema: &'a AttrSchema) -> Self {
        Self { row, schema }
    }

    /// Read an attribute by any registered name, applying the schema's read
    /// cast (`Int` columns come back truncated).
    pub fn get(&self, name: &str) -> Result<f64> {
        let value = self.row[self.schema.resolve(name)?];
        Ok(match self.schema.cast(name) {
            AttrCast::Float => value,
            AttrCast::Int => value.trunc(),
        })
    }

    /// Read an attribute as an integer regardless of its cast.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        Ok(self.row[self.schema.resolve(name)?] as i64)
    }

    pub fn schema(&self) -> &AttrSchema {
        self.schema
    }

    /// Raw row values in column order.
    pub fn values(&self) -> &[f64] {
        self.row
    }

    /// Detach an owned copy of this note.
    pub fn to_buffer(&self) -> NoteBuffer {
        NoteBuffer {
            schema: self.schema.clone(),
            values: self.row.to_vec(),
        }
    }
}

// Equality is attribute-wise over the canonical columns; aliases and anything
// decorative a backend layers on top play no part.
impl PartialEq for Note<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row
    }
}

/// Mutable view of one note. Writes land directly in the shared table row;
/// there is no private copy or buffering.
#[derive(Debug)]
pub struct NoteMut<'a> {
    row: &'a mut [f64],
    schema: &'a AttrSchema,
}

impl<'a> NoteMut<'a> {
    pub(crate) fn new(row: &'a mut [f64], schema: &'a AttrSchema) -> Self {
        Self { row, schema }
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Note::new(self.row, self.schema).get(name)
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        Note::new(self.row, self.schema).get_int(name)
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        self.row[self.schema.resolve(name)?] = value;
        Ok(())
    }

    pub fn values(&self) -> &[f64] {
        self.row
    }

    pub fn as_note(&self) -> Note<'_> {
        Note::new(self.row, self.schema)
    }

    pub fn to_buffer(&self) -> NoteBuffer {
        self.as_note().to_buffer()
    }
}

/// An owned, detached note: one row of values plus its schema. This is the
/// explicit `copy()` escape hatch from the shared-storage model, and the
/// argument type for the Measure placement APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteBuffer {
    schema: AttrSchema,
    values: Vec<f64>,
}

impl NoteBuffer {
    /// Zero-filled note for the given schema.
    pub fn new(schema: &AttrSchema) -> Self {
        Self {
            schema: schema.clone(),
            values: vec![0.0; schema.len()],
        }
    }

    pub fn with_values(schema: &AttrSchema, values: &[f64]) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(CadenzaError::SchemaMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            schema: schema.clone(),
            values: values.to_vec(),
        })
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Note::new(&self.values, &self.schema).get(name)
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        self.values[self.schema.resolve(name)?] = value;
        Ok(())
    }

    pub fn schema(&self) -> &AttrSchema {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn num_attrs(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AttrSchema {
        AttrSchema::base()
    }

    #[test]
    fn views_over_same_row_read_identically() {
        let schema = schema();
        let row = vec![1.0, 0.5, 0.25, 0.9, 4.01];
        let a = Note::new(&row, &schema);
        let b = Note::new(&row, &schema);
        assert_eq!(a, b);
        assert_eq!(a.get("pitch").unwrap(), b.get("pitch").unwrap());
    }

    #[test]
    fn mutation_is_visible_through_reads() {
        let schema = schema();
        let mut row = vec![0.0; 5];
        let mut view = NoteMut::new(&mut row, &schema);
        view.set("start", 0.25).unwrap();
        assert_eq!(view.get("start").unwrap(), 0.25);
        assert_eq!(row[AttrSchema::START], 0.25);
    }

    #[test]
    fn int_cast_truncates_on_read() {
        let mut schema = schema();
        schema.set_cast("instrument", AttrCast::Int).unwrap();
        let row = vec![3.7, 0.0, 0.0, 0.0, 0.0];
        let view = Note::new(&row, &schema);
        assert_eq!(view.get("instrument").unwrap(), 3.0);
        assert_eq!(view.get_int("instrument").unwrap(), 3);
    }

    #[test]
    fn alias_reads_the_same_cell() {
        let mut schema = schema();
        schema.register_alias("dur", AttrSchema::DURATION).unwrap();
        let row = vec![0.0, 0.0, 0.5, 0.0, 0.0];
        let view = Note::new(&row, &schema);
        assert_eq!(view.get("dur").unwrap(), view.get("duration").unwrap());
    }

    #[test]
    fn buffer_rejects_wrong_width() {
        let schema = schema();
        assert!(matches!(
            NoteBuffer::with_values(&schema, &[1.0, 2.0]),
            Err(CadenzaError::SchemaMismatch {
                expected: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn buffer_is_detached_from_views() {
        let schema = schema();
        let mut row = vec![0.0; 5];
        row[AttrSchema::PITCH] = 4.01;
        let copy = Note::new(&row, &schema).to_buffer();
        row[AttrSchema::PITCH] = 5.01;
        assert_eq!(copy.get("pitch").unwrap(), 4.01);
    }
}
