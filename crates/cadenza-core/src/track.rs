//! Track: a named run of sections bound to one instrument

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::measure::Measure;
use crate::section::Section;
use crate::swing::Swing;

/// A named, ordered collection of [`Section`]s. Assigning an instrument
/// applies it to every note in the track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    instrument: f64,
    sections: Vec<Section>,
}

impl Track {
    pub fn new(name: impl Into<String>, instrument: u32) -> Self {
        Self {
            name: name.into(),
            instrument: instrument as f64,
            sections: Vec::new(),
        }
    }

    pub fn instrument(&self) -> u32 {
        self.instrument as u32
    }

    /// Assign the track instrument and stamp it onto every note.
    pub fn set_instrument(&mut self, instrument: u32) -> Result<()> {
        self.instrument = instrument as f64;
        for section in &mut self.sections {
            section.set_attr("instrument", self.instrument)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut [Section] {
        &mut self.sections
    }

    /// Append a section, stamping the track instrument onto its notes.
    pub fn append(&mut self, mut section: Section) -> Result<()> {
        section.set_attr("instrument", self.instrument)?;
        self.sections.push(section);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, mut section: Section) -> Result<()> {
        section.set_attr("instrument", self.instrument)?;
        self.sections.insert(index.min(self.sections.len()), section);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<Section> {
        if index < self.sections.len() {
            return Some(self.sections.remove(index));
        }
        None
    }

    /// Every measure of every section, in track order.
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.sections.iter().flat_map(|s| s.measures().iter())
    }

    pub fn num_notes(&self) -> usize {
        self.sections.iter().map(Section::num_notes).sum()
    }

    pub fn set_swing(&mut self, swing: Swing) {
        for section in &mut self.sections {
            section.set_swing(swing);
        }
    }

    pub fn quantize(&mut self) -> Result<()> {
        for section in &mut self.sections {
            section.quantize()?;
        }
        Ok(())
    }

    pub fn quantize_to_beat(&mut self) -> Result<()> {
        for section in &mut self.sections {
            section.quantize_to_beat()?;
        }
        Ok(())
    }

    pub fn apply_swing(&mut self) -> Result<()> {
        for section in &mut self.sections {
            section.apply_swing()?;
        }
        Ok(())
    }

    pub fn apply_phrasing(&mut self) -> Result<()> {
        for section in &mut self.sections {
            section.apply_phrasing()?;
        }
        Ok(())
    }

    pub fn get_attr(&self, name: &str) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.num_notes());
        for section in &self.sections {
            values.extend(section.get_attr(name)?);
        }
        Ok(values)
    }

    pub fn set_attr(&mut self, name: &str, value: f64) -> Result<()> {
        for section in &mut self.sections {
            section.set_attr(name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteBuffer;
    use crate::schema::AttrSchema;

    fn section_with_notes(count: usize) -> Section {
        let mut measure = Measure::default();
        for i in 0..count {
            let mut note = NoteBuffer::new(&AttrSchema::base());
            note.set("start", i as f64 * 0.25).unwrap();
            measure.append(&note).unwrap();
        }
        Section::new("s", vec![measure])
    }

    #[test]
    fn appending_stamps_track_instrument() {
        let mut track = Track::new("lead", 7);
        track.append(section_with_notes(3)).unwrap();
        assert_eq!(track.get_attr("instrument").unwrap(), vec![7.0; 3]);
    }

    #[test]
    fn set_instrument_restamps_existing_notes() {
        let mut track = Track::new("lead", 7);
        track.append(section_with_notes(2)).unwrap();
        track.set_instrument(12).unwrap();
        assert_eq!(track.instrument(), 12);
        assert_eq!(track.get_attr("instrument").unwrap(), vec![12.0; 2]);
    }

    #[test]
    fn measures_flattens_sections_in_order() {
        let mut track = Track::new("t", 1);
        track.append(section_with_notes(1)).unwrap();
        track.append(section_with_notes(2)).unwrap();
        assert_eq!(track.measures().count(), 2);
        assert_eq!(track.num_notes(), 3);
    }
}
