//! Attribute schema: maps note attribute names (and aliases) to table columns

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CadenzaError, Result};

/// How a view should present a column's value on read. Storage is always f64;
/// backends that traffic in integers (MIDI programs, velocities) mark their
/// attributes `Int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttrCast {
    #[default]
    Float,
    Int,
}

/// Ordered mapping from attribute names to column indices in a note table.
///
/// Canonical names get contiguous columns starting at 0; any number of alias
/// names may point at an existing column. Every column is reachable by at
/// least its canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrSchema {
    /// Canonical name per column, in column order.
    canonical: Vec<String>,
    /// Every registered name (canonical and alias) to its column.
    index_map: HashMap<String, usize>,
    /// Per-name read casts; absent means `Float`.
    casts: HashMap<String, AttrCast>,
}

impl AttrSchema {
    pub const INSTRUMENT: usize = 0;
    pub const START: usize = 1;
    pub const DURATION: usize = 2;
    pub const AMPLITUDE: usize = 3;
    pub const PITCH: usize = 4;

    /// The five-slot base layout every backend shares:
    /// instrument, start, duration, amplitude, pitch.
    pub const BASE_ATTR_NAMES: [&'static str; 5] =
        ["instrument", "start", "duration", "amplitude", "pitch"];

    pub fn new(names: &[&str]) -> Result<Self> {
        let mut schema = Self {
            canonical: Vec::with_capacity(names.len()),
            index_map: HashMap::new(),
            casts: HashMap::new(),
        };
        for name in names {
            schema.push_attr(name)?;
        }
        Ok(schema)
    }

    /// Schema with just the canonical base attributes.
    pub fn base() -> Self {
        Self::new(&Self::BASE_ATTR_NAMES).expect("base attribute names are distinct")
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Canonical name per column, in column order.
    pub fn canonical_names(&self) -> &[String] {
        &self.canonical
    }

    /// Resolve any registered name to its column index. Fails closed on
    /// unknown names.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.index_map
            .get(name)
            .copied()
            .ok_or_else(|| CadenzaError::UnknownAttribute(name.to_string()))
    }

    /// Bind an alias name to an existing column. Idempotent for the same
    /// (name, index) pair; re-binding a name to a different column is an
    /// error.
    pub fn register_alias(&mut self, name: &str, index: usize) -> Result<()> {
        if index >= self.canonical.len() {
            return Err(CadenzaError::IndexOutOfRange {
                index,
                len: self.canonical.len(),
            });
        }
        if let Some(&bound) = self.index_map.get(name) {
            if bound != index {
                return Err(CadenzaError::ConflictingAlias {
                    name: name.to_string(),
                    bound,
                    requested: index,
                });
            }
            return Ok(());
        }
        self.index_map.insert(name.to_string(), index);
        Ok(())
    }

    /// Set the read cast for one registered name.
    pub fn set_cast(&mut self, name: &str, cast: AttrCast) -> Result<()> {
        self.resolve(name)?;
        self.casts.insert(name.to_string(), cast);
        Ok(())
    }

    pub fn cast(&self, name: &str) -> AttrCast {
        self.casts.get(name).copied().unwrap_or_default()
    }

    /// Append a brand-new canonical attribute and return its column index.
    ///
    /// Only `NoteSequence::add_attribute` may call this: growing the schema
    /// and growing every table built from it have to happen together.
    pub(crate) fn push_attr(&mut self, name: &str) -> Result<usize> {
        if let Some(&bound) = self.index_map.get(name) {
            return Err(CadenzaError::ConflictingAlias {
                name: name.to_string(),
                bound,
                requested: self.canonical.len(),
            });
        }
        let index = self.canonical.len();
        self.canonical.push(name.to_string());
        self.index_map.insert(name.to_string(), index);
        Ok(index)
    }
}

impl Default for AttrSchema {
    fn default() -> Self {
        Self::base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_layout_is_contiguous() {
        let schema = AttrSchema::base();
        assert_eq!(schema.len(), 5);
        assert_eq!(schema.resolve("instrument"), Ok(AttrSchema::INSTRUMENT));
        assert_eq!(schema.resolve("start"), Ok(AttrSchema::START));
        assert_eq!(schema.resolve("duration"), Ok(AttrSchema::DURATION));
        assert_eq!(schema.resolve("amplitude"), Ok(AttrSchema::AMPLITUDE));
        assert_eq!(schema.resolve("pitch"), Ok(AttrSchema::PITCH));
    }

    #[test]
    fn unknown_name_fails_closed() {
        let schema = AttrSchema::base();
        assert_eq!(
            schema.resolve("velocity"),
            Err(CadenzaError::UnknownAttribute("velocity".to_string()))
        );
    }

    #[test]
    fn alias_resolves_to_same_column() {
        let mut schema = AttrSchema::base();
        schema.register_alias("dur", AttrSchema::DURATION).unwrap();
        assert_eq!(schema.resolve("dur"), schema.resolve("duration"));
    }

    #[test]
    fn alias_registration_is_idempotent() {
        let mut schema = AttrSchema::base();
        schema.register_alias("amp", AttrSchema::AMPLITUDE).unwrap();
        assert!(schema.register_alias("amp", AttrSchema::AMPLITUDE).is_ok());
    }

    #[test]
    fn conflicting_alias_is_rejected() {
        let mut schema = AttrSchema::base();
        schema.register_alias("amp", AttrSchema::AMPLITUDE).unwrap();
        let err = schema.register_alias("amp", AttrSchema::PITCH).unwrap_err();
        assert_eq!(
            err,
            CadenzaError::ConflictingAlias {
                name: "amp".to_string(),
                bound: AttrSchema::AMPLITUDE,
                requested: AttrSchema::PITCH,
            }
        );
    }

    #[test]
    fn alias_to_missing_column_is_rejected() {
        let mut schema = AttrSchema::base();
        assert!(matches!(
            schema.register_alias("x", 9),
            Err(CadenzaError::IndexOutOfRange { index: 9, len: 5 })
        ));
    }

    #[test]
    fn casts_default_to_float() {
        let mut schema = AttrSchema::base();
        assert_eq!(schema.cast("pitch"), AttrCast::Float);
        schema.set_cast("instrument", AttrCast::Int).unwrap();
        assert_eq!(schema.cast("instrument"), AttrCast::Int);
    }
}
