//! Note sequence: columnar note storage with nested child sequences
//!
//! A sequence owns a row-major `f64` table (rows = notes, columns = the
//! schema's attributes) plus zero or more child sequences. Own rows and all
//! descendant rows are addressed through one flattened index space: own rows
//! first, then each child's flattened rows depth-first in registration order.
//!
//! The table and the flattened-index cache are mutable shared state with no
//! locking. Concurrent mutation from multiple threads is the caller's problem;
//! wrap the sequence in external synchronization if you need that.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{CadenzaError, Result};
use crate::note::{Note, NoteBuffer, NoteMut};
use crate::schema::AttrSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSequence {
    schema: AttrSchema,
    /// Row-major grid of the sequence's own notes.
    cells: Vec<f64>,
    children: Vec<NoteSequence>,
    /// Flattened length of each child, in registration order. Derived; rebuilt
    /// on every structural change.
    spans: Vec<usize>,
    /// Own rows plus all descendant rows. Derived; rebuilt with `spans`.
    flat_len: usize,
}

impl NoteSequence {
    /// A sequence of `num_notes` zero-filled notes. The notes exist as rows
    /// from construction; no per-note allocation ever happens.
    pub fn new(schema: &AttrSchema, num_notes: usize) -> Self {
        let mut seq = Self {
            schema: schema.clone(),
            cells: vec![0.0; num_notes * schema.len()],
            children: Vec::new(),
            spans: Vec::new(),
            flat_len: 0,
        };
        seq.refresh_index();
        seq
    }

    pub fn schema(&self) -> &AttrSchema {
        &self.schema
    }

    /// Columns per row.
    pub fn num_attrs(&self) -> usize {
        self.schema.len()
    }

    /// Rows owned directly by this sequence, excluding children.
    pub fn own_len(&self) -> usize {
        if self.schema.is_empty() {
            0
        } else {
            self.cells.len() / self.schema.len()
        }
    }

    /// Total flattened note count including all descendants.
    pub fn len(&self) -> usize {
        self.flat_len
    }

    pub fn is_empty(&self) -> bool {
        self.flat_len == 0
    }

    pub fn children(&self) -> &[NoteSequence] {
        &self.children
    }

    /// Rebuild the memoized flattened-index map. Every structural mutator
    /// ends with this; a stale map is a correctness bug, not an allowed
    /// optimization.
    fn refresh_index(&mut self) {
        self.spans = self.children.iter().map(|c| c.len()).collect();
        self.flat_len = self.own_len() + self.spans.iter().sum::<usize>();
        trace!(own = self.own_len(), flat = self.flat_len, "rebuilt flattened index");
    }

    fn row(&self, row: usize) -> &[f64] {
        let w = self.schema.len();
        &self.cells[row * w..(row + 1) * w]
    }

    /// Resolve a flattened index to a read view. Own rows come first, then
    /// children depth-first.
    pub fn note(&self, index: usize) -> Result<Note<'_>> {
        if index >= self.flat_len {
            return Err(CadenzaError::IndexOutOfRange {
                index,
                len: self.flat_len,
            });
        }
        if index < self.own_len() {
            return Ok(Note::new(self.row(index), &self.schema));
        }
        let mut offset = self.own_len();
        for (child, span) in self.children.iter().zip(&self.spans) {
            if index < offset + span {
                return child.note(index - offset);
            }
            offset += span;
        }
        // flat_len guarantees one of the branches above hits.
        Err(CadenzaError::IndexOutOfRange {
            index,
            len: self.flat_len,
        })
    }

    /// Resolve a flattened index to a write view. Writes go straight into the
    /// owning table.
    pub fn note_mut(&mut self, index: usize) -> Result<NoteMut<'_>> {
        if index >= self.flat_len {
            return Err(CadenzaError::IndexOutOfRange {
                index,
                len: self.flat_len,
            });
        }
        if index < self.own_len() {
            let w = self.schema.len();
            let row = &mut self.cells[index * w..(index + 1) * w];
            return Ok(NoteMut::new(row, &self.schema));
        }
        let mut offset = self.own_len();
        let spans = self.spans.clone();
        for (child, span) in self.children.iter_mut().zip(spans) {
            if index < offset + span {
                return child.note_mut(index - offset);
            }
            offset += span;
        }
        Err(CadenzaError::IndexOutOfRange {
            index,
            len: self.flat_len,
        })
    }

    /// Lazy iteration over all flattened notes in index order. Each call
    /// returns a fresh iterator with its own cursor, so exhausting one and
    /// calling `iter()` again restarts at 0, and concurrent iterations do not
    /// interfere.
    pub fn iter(&self) -> Notes<'_> {
        Notes {
            seq: self,
            index: 0,
        }
    }

    fn check_width(&self, actual: usize) -> Result<()> {
        if actual != self.schema.len() {
            return Err(CadenzaError::SchemaMismatch {
                expected: self.schema.len(),
                actual,
            });
        }
        Ok(())
    }

    /// Append one note, copying its attribute values into a new last row.
    pub fn append(&mut self, note: &NoteBuffer) -> Result<()> {
        self.check_width(note.num_attrs())?;
        self.cells.extend_from_slice(note.values());
        self.refresh_index();
        Ok(())
    }

    /// Append every flattened note of `other`, row-wise.
    pub fn extend(&mut self, other: &NoteSequence) -> Result<()> {
        self.check_width(other.num_attrs())?;
        for note in other.iter() {
            self.cells.extend_from_slice(note.values());
        }
        self.refresh_index();
        Ok(())
    }

    /// Insert one note at `index` in the owning table, shifting rows at and
    /// after it to higher indices. `index == own_len` appends.
    ///
    /// Insertion addresses the owning table only: child rows cannot be
    /// displaced, so `index` ranges over `0..=own_len`, not the flattened
    /// space, and the out-of-range error reports the own row count.
    pub fn insert(&mut self, index: usize, note: &NoteBuffer) -> Result<()> {
        self.check_width(note.num_attrs())?;
        if index > self.own_len() {
            return Err(CadenzaError::IndexOutOfRange {
                index,
                len: self.own_len(),
            });
        }
        let at = index * self.schema.len();
        self.cells.splice(at..at, note.values().iter().copied());
        self.refresh_index();
        Ok(())
    }

    /// Insert every flattened note of `other` at `index` in the owning
    /// table. `index` ranges over `0..=own_len`, as with [`Self::insert`].
    pub fn insert_seq(&mut self, index: usize, other: &NoteSequence) -> Result<()> {
        self.check_width(other.num_attrs())?;
        if index > self.own_len() {
            return Err(CadenzaError::IndexOutOfRange {
                index,
                len: self.own_len(),
            });
        }
        let rows: Vec<f64> = other.iter().flat_map(|n| n.values().to_vec()).collect();
        let at = index * self.schema.len();
        self.cells.splice(at..at, rows);
        self.refresh_index();
        Ok(())
    }

    /// Delete a contiguous range of rows from the owning table. The range
    /// must lie entirely within this table's own rows.
    pub fn remove(&mut self, range: core::ops::Range<usize>) -> Result<()> {
        if range.start > range.end || range.end > self.own_len() {
            return Err(CadenzaError::NotFound);
        }
        let w = self.schema.len();
        self.cells.drain(range.start * w..range.end * w);
        self.refresh_index();
        Ok(())
    }

    /// Register a child sequence. Its flattened rows follow this sequence's
    /// own rows (and any earlier children's rows) in the global index space.
    pub fn add_child(&mut self, child: NoteSequence) -> Result<()> {
        self.check_width(child.num_attrs())?;
        self.children.push(child);
        self.refresh_index();
        Ok(())
    }

    /// Mutate the child at `child_index` and rebuild the flattened index
    /// afterwards. Direct `&mut` access to a child is not offered because the
    /// parent's index cache could not be kept honest across it.
    pub fn with_child_mut<R>(
        &mut self,
        child_index: usize,
        f: impl FnOnce(&mut NoteSequence) -> R,
    ) -> Result<R> {
        let len = self.children.len();
        let child = self
            .children
            .get_mut(child_index)
            .ok_or(CadenzaError::IndexOutOfRange {
                index: child_index,
                len,
            })?;
        let out = f(child);
        self.refresh_index();
        Ok(out)
    }

    /// Values of one attribute for every flattened note, in index order.
    pub fn get_attr(&self, name: &str) -> Result<Vec<f64>> {
        self.iter().map(|note| note.get(name)).collect()
    }

    /// Set one attribute to the same value on every flattened note.
    pub fn set_attr(&mut self, name: &str, value: f64) -> Result<()> {
        let col = self.schema.resolve(name)?;
        let w = self.schema.len();
        for row in 0..self.own_len() {
            self.cells[row * w + col] = value;
        }
        for child in &mut self.children {
            child.set_attr(name, value)?;
        }
        Ok(())
    }

    /// Assign one pitch per flattened note, in index order. The pitch list is
    /// the output of an external harmonic computation; its length must equal
    /// the note count exactly.
    pub fn assign_pitches(&mut self, pitches: &[f64]) -> Result<()> {
        if pitches.len() != self.flat_len {
            return Err(CadenzaError::PitchCountMismatch {
                pitches: pitches.len(),
                notes: self.flat_len,
            });
        }
        for (i, pitch) in pitches.iter().enumerate() {
            self.note_mut(i)?.set("pitch", *pitch)?;
        }
        Ok(())
    }

    /// Sort the owning table's rows ascending by start time. Children sort
    /// their own tables.
    pub fn sort_by_start(&mut self) {
        let w = self.schema.len();
        if w == 0 {
            return;
        }
        let mut rows: Vec<&[f64]> = self.cells.chunks(w).collect();
        rows.sort_by(|a, b| a[AttrSchema::START].total_cmp(&b[AttrSchema::START]));
        let sorted: Vec<f64> = rows.into_iter().flatten().copied().collect();
        self.cells = sorted;
        for child in &mut self.children {
            child.sort_by_start();
        }
    }

    /// Add a brand-new attribute column, extending the schema and the table
    /// in one step (and every child's, recursively) so the two can never
    /// drift apart. Returns the new column index.
    pub fn add_attribute(&mut self, name: &str, default: f64) -> Result<usize> {
        // Validate against every level before touching any of them.
        self.check_new_attribute(name)?;
        Ok(self.push_attribute(name, default))
    }

    fn check_new_attribute(&self, name: &str) -> Result<()> {
        if let Ok(bound) = self.schema.resolve(name) {
            return Err(CadenzaError::ConflictingAlias {
                name: name.to_string(),
                bound,
                requested: self.schema.len(),
            });
        }
        for child in &self.children {
            child.check_new_attribute(name)?;
        }
        Ok(())
    }

    fn push_attribute(&mut self, name: &str, default: f64) -> usize {
        let index = self
            .schema
            .push_attr(name)
            .expect("attribute name checked against every level");
        let old_w = index;
        if old_w > 0 {
            let rows = self.cells.len() / old_w;
            let mut cells = Vec::with_capacity(rows * (old_w + 1));
            for row in self.cells.chunks(old_w) {
                cells.extend_from_slice(row);
                cells.push(default);
            }
            self.cells = cells;
        }
        for child in &mut self.children {
            child.push_attribute(name, default);
        }
        index
    }
}

/// Lazy iterator over a sequence's flattened notes. Holds its own cursor.
pub struct Notes<'a> {
    seq: &'a NoteSequence,
    index: usize,
}

impl<'a> Iterator for Notes<'a> {
    type Item = Note<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.seq.len() {
            return None;
        }
        let note = self.seq.note(self.index).ok();
        self.index += 1;
        note
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.seq.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a NoteSequence {
    type Item = Note<'a>;
    type IntoIter = Notes<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
