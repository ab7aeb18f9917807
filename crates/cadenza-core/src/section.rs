//! Section: an ordered run of measures sharing meter and swing settings

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::measure::Measure;
use crate::meter::Meter;
use crate::swing::Swing;

/// A container of [`Measure`]s. Assigning a meter or swing here pushes it
/// down to every measure, and the quantize/swing operations broadcast over
/// all of them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    measures: Vec<Measure>,
    meter: Option<Meter>,
    swing: Option<Swing>,
}

impl Section {
    pub fn new(name: impl Into<String>, measures: Vec<Measure>) -> Self {
        Self {
            name: name.into(),
            measures,
            meter: None,
            swing: None,
        }
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// Total note count across all measures.
    pub fn num_notes(&self) -> usize {
        self.measures.iter().map(Measure::len).sum()
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn measures_mut(&mut self) -> &mut [Measure] {
        &mut self.measures
    }

    pub fn append(&mut self, measure: Measure) -> &mut Self {
        self.measures.push(measure);
        self
    }

    pub fn insert(&mut self, index: usize, measure: Measure) {
        self.measures.insert(index.min(self.measures.len()), measure);
    }

    pub fn remove(&mut self, index: usize) -> Option<Measure> {
        if index < self.measures.len() {
            return Some(self.measures.remove(index));
        }
        None
    }

    pub fn meter(&self) -> Option<&Meter> {
        self.meter.as_ref()
    }

    /// Assign one meter to the section and every measure in it.
    pub fn set_meter(&mut self, meter: Meter) {
        debug!(section = %self.name, meter = %meter, "applying meter to section");
        for measure in &mut self.measures {
            measure.set_meter(meter.clone());
        }
        self.meter = Some(meter);
    }

    pub fn swing(&self) -> Option<&Swing> {
        self.swing.as_ref()
    }

    /// Assign one swing to the section and every measure in it.
    pub fn set_swing(&mut self, swing: Swing) {
        for measure in &mut self.measures {
            measure.set_swing(swing);
        }
        self.swing = Some(swing);
    }

    pub fn quantizing_on(&mut self) {
        for measure in &mut self.measures {
            measure.quantizing_on();
        }
    }

    pub fn quantizing_off(&mut self) {
        for measure in &mut self.measures {
            measure.quantizing_off();
        }
    }

    pub fn quantize(&mut self) -> Result<()> {
        for measure in &mut self.measures {
            measure.quantize()?;
        }
        Ok(())
    }

    pub fn quantize_to_beat(&mut self) -> Result<()> {
        for measure in &mut self.measures {
            measure.quantize_to_beat()?;
        }
        Ok(())
    }

    pub fn swing_on(&mut self) -> Result<()> {
        for measure in &mut self.measures {
            measure.swing_on()?;
        }
        Ok(())
    }

    pub fn swing_off(&mut self) -> Result<()> {
        for measure in &mut self.measures {
            measure.swing_off()?;
        }
        Ok(())
    }

    pub fn apply_swing(&mut self) -> Result<()> {
        for measure in &mut self.measures {
            measure.apply_swing()?;
        }
        Ok(())
    }

    pub fn apply_phrasing(&mut self) -> Result<()> {
        for measure in &mut self.measures {
            measure.apply_phrasing()?;
        }
        Ok(())
    }

    /// One attribute's values for every note in every measure, flattened in
    /// measure order.
    pub fn get_attr(&self, name: &str) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.num_notes());
        for measure in &self.measures {
            values.extend(measure.get_attr(name)?);
        }
        Ok(values)
    }

    /// Set one attribute on every note in every measure.
    pub fn set_attr(&mut self, name: &str, value: f64) -> Result<()> {
        for measure in &mut self.measures {
            measure.set_attr(name, value)?;
        }
        Ok(())
    }
}
