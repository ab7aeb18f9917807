//! Swing: deliberate timing perturbation for non-mechanical rhythm

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sequence::NoteSequence;

/// Which way note starts move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SwingDirection {
    Forward,
    Reverse,
    /// Fair coin per note.
    #[default]
    Both,
}

/// How the per-note adjustment magnitude is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SwingJitter {
    /// Always exactly the configured magnitude.
    #[default]
    Fixed,
    /// Uniform in `[0, magnitude]` per note.
    Random,
}

/// Swing configuration and application.
///
/// Applying swing is a one-time edit of note start times, not a toggleable
/// lens: turning swing off afterwards does not roll back offsets already
/// applied. Callers gate with [`Swing::is_swing_on`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    swing_on: bool,
    magnitude: f64,
    direction: SwingDirection,
    jitter: SwingJitter,
}

impl Swing {
    pub const DEFAULT_MAGNITUDE: f64 = 0.01;

    pub fn new(
        swing_on: bool,
        magnitude: f64,
        direction: SwingDirection,
        jitter: SwingJitter,
    ) -> Self {
        Self {
            swing_on,
            magnitude,
            direction,
            jitter,
        }
    }

    pub fn is_swing_on(&self) -> bool {
        self.swing_on
    }

    pub fn swing_on(&mut self) -> &mut Self {
        self.swing_on = true;
        self
    }

    pub fn swing_off(&mut self) -> &mut Self {
        self.swing_on = false;
        self
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn direction(&self) -> SwingDirection {
        self.direction
    }

    pub fn jitter(&self) -> SwingJitter {
        self.jitter
    }

    /// Perturb every note start in `sequence` using the configured direction
    /// and jitter. Entirely a no-op while swing is off.
    pub fn apply(&self, sequence: &mut NoteSequence) -> Result<()> {
        self.apply_with(sequence, self.direction, self.jitter)
    }

    /// [`Self::apply`] with the direction and jitter overridden for this call.
    pub fn apply_with(
        &self,
        sequence: &mut NoteSequence,
        direction: SwingDirection,
        jitter: SwingJitter,
    ) -> Result<()> {
        if !self.swing_on {
            return Ok(());
        }
        for i in 0..sequence.len() {
            let adj = self.adjustment_with(direction, jitter);
            let mut note = sequence.note_mut(i)?;
            let start = note.get("start")?;
            note.set("start", start + adj)?;
        }
        Ok(())
    }

    /// The signed adjustment for one note under the configured jitter,
    /// without applying it. Used by phrasing.
    pub fn adjustment(&self, direction: SwingDirection) -> f64 {
        self.adjustment_with(direction, self.jitter)
    }

    pub fn adjustment_with(&self, direction: SwingDirection, jitter: SwingJitter) -> f64 {
        let adj = match jitter {
            SwingJitter::Fixed => self.magnitude,
            SwingJitter::Random => fastrand::f64() * self.magnitude,
        };
        match direction {
            SwingDirection::Forward => adj,
            SwingDirection::Reverse => -adj,
            SwingDirection::Both => {
                if fastrand::bool() {
                    adj
                } else {
                    -adj
                }
            }
        }
    }
}

impl Default for Swing {
    fn default() -> Self {
        Self {
            swing_on: false,
            magnitude: Self::DEFAULT_MAGNITUDE,
            direction: SwingDirection::default(),
            jitter: SwingJitter::default(),
        }
    }
}
