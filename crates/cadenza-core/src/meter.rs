//! Meter: time signature + tempo, beat boundaries, quantization

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CadenzaError, Result};
use crate::sequence::NoteSequence;

/// Tolerance for "durations already fill the measure" comparisons.
const EPSILON: f64 = 1e-9;

/// Note durations as power-of-two fractions of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteDur {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl NoteDur {
    /// Fraction of a whole note.
    pub fn fraction(&self) -> f64 {
        match self {
            Self::Whole => 1.0,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
            Self::Eighth => 0.125,
            Self::Sixteenth => 0.0625,
            Self::ThirtySecond => 0.031_25,
            Self::SixtyFourth => 0.015_625,
        }
    }

    /// Time-signature denominator for this duration (quarter note = 4).
    pub fn denominator(&self) -> u32 {
        (1.0 / self.fraction()) as u32
    }
}

/// Time signature and tempo for one measure.
///
/// Derived timing quantities are computed once at construction; only the
/// quantizing flag is mutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    beats_per_measure: u32,
    beat_note_dur: NoteDur,
    tempo_qpm: f64,
    quantizing: bool,
    quarter_note_dur_secs: f64,
    beat_note_dur_secs: f64,
    measure_dur_secs: f64,
    beat_start_times_secs: Vec<f64>,
}

impl Meter {
    pub const SECS_PER_MINUTE: f64 = 60.0;
    pub const QUARTER_NOTE_DUR: f64 = 0.25;

    pub const DEFAULT_BEATS_PER_MEASURE: u32 = 4;
    pub const DEFAULT_BEAT_NOTE_DUR: NoteDur = NoteDur::Quarter;
    pub const DEFAULT_TEMPO_QPM: f64 = 240.0;

    pub fn new(
        beats_per_measure: u32,
        beat_note_dur: NoteDur,
        tempo_qpm: f64,
        quantizing: bool,
    ) -> Result<Self> {
        if beats_per_measure == 0 {
            return Err(CadenzaError::InvalidMeter(
                "beats_per_measure must be a positive integer".to_string(),
            ));
        }
        if !tempo_qpm.is_finite() || tempo_qpm <= 0.0 {
            return Err(CadenzaError::InvalidMeter(format!(
                "tempo_qpm must be positive and finite, got {tempo_qpm}"
            )));
        }
        let quarter_note_dur_secs = Self::SECS_PER_MINUTE / tempo_qpm;
        let quarter_notes_per_beat_note = beat_note_dur.fraction() / Self::QUARTER_NOTE_DUR;
        let beat_note_dur_secs = quarter_notes_per_beat_note * quarter_note_dur_secs;
        let measure_dur_secs = beats_per_measure as f64 * beat_note_dur_secs;
        let beat_start_times_secs = (0..beats_per_measure)
            .map(|i| i as f64 * beat_note_dur_secs)
            .collect();
        Ok(Self {
            beats_per_measure,
            beat_note_dur,
            tempo_qpm,
            quantizing,
            quarter_note_dur_secs,
            beat_note_dur_secs,
            measure_dur_secs,
            beat_start_times_secs,
        })
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    pub fn beat_note_dur(&self) -> NoteDur {
        self.beat_note_dur
    }

    pub fn tempo_qpm(&self) -> f64 {
        self.tempo_qpm
    }

    /// `(numerator, denominator)` in traditional notation, e.g. `(4, 4)`.
    pub fn meter_notation(&self) -> (u32, u32) {
        (self.beats_per_measure, self.beat_note_dur.denominator())
    }

    pub fn quarter_note_dur_secs(&self) -> f64 {
        self.quarter_note_dur_secs
    }

    pub fn beat_note_dur_secs(&self) -> f64 {
        self.beat_note_dur_secs
    }

    pub fn measure_dur_secs(&self) -> f64 {
        self.measure_dur_secs
    }

    /// Beat start times within one measure, ascending from 0.0.
    pub fn beat_start_times_secs(&self) -> &[f64] {
        &self.beat_start_times_secs
    }

    pub fn is_quantizing(&self) -> bool {
        self.quantizing
    }

    pub fn quantizing_on(&mut self) {
        self.quantizing = true;
    }

    pub fn quantizing_off(&mut self) {
        self.quantizing = false;
    }

    /// Quantize a copy of `sequence` to exactly fill one measure, leaving the
    /// input untouched.
    pub fn quantize(&self, sequence: &NoteSequence) -> Result<NoteSequence> {
        let mut copy = sequence.clone();
        self.quantize_in_place(&mut copy)?;
        Ok(copy)
    }

    /// In-place variant of [`Self::quantize`], used by Measure.
    ///
    /// No-op when quantizing is disabled or the notes' durations already sum
    /// to the measure duration. Otherwise every duration is scaled by
    /// `1 + measure_dur - span` (span = the furthest note end), and each note
    /// whose start is > 0 shifts by its own duration delta. Note 0 stays
    /// pinned at its start; later notes absorb the drift. The asymmetry is
    /// deliberate and externally observable.
    pub fn quantize_in_place(&self, sequence: &mut NoteSequence) -> Result<()> {
        if !self.quantizing {
            return Ok(());
        }
        let durs = sequence.get_attr("duration")?;
        let starts = sequence.get_attr("start")?;
        let durs_sum: f64 = durs.iter().sum();
        if (durs_sum - self.measure_dur_secs).abs() < EPSILON {
            return Ok(());
        }
        let span = starts
            .iter()
            .zip(&durs)
            .map(|(s, d)| s + d)
            .fold(0.0_f64, f64::max);
        let factor = 1.0 + self.measure_dur_secs - span;
        debug!(span, factor, "quantizing sequence to measure");
        for i in 0..sequence.len() {
            let mut note = sequence.note_mut(i)?;
            let dur = note.get("duration")?;
            let start = note.get("start")?;
            let new_dur = dur * factor;
            if start > 0.0 {
                note.set("start", start + (new_dur - dur))?;
            }
            note.set("duration", new_dur)?;
        }
        Ok(())
    }

    /// Snap each note's start in a copy of `sequence` to the nearest beat
    /// start time, leaving the input untouched.
    pub fn quantize_to_beat(&self, sequence: &NoteSequence) -> Result<NoteSequence> {
        let mut copy = sequence.clone();
        self.quantize_to_beat_in_place(&mut copy)?;
        Ok(copy)
    }

    /// In-place variant of [`Self::quantize_to_beat`]. Ties between two beats
    /// favor the earlier one.
    pub fn quantize_to_beat_in_place(&self, sequence: &mut NoteSequence) -> Result<()> {
        if !self.quantizing {
            return Ok(());
        }
        for i in 0..sequence.len() {
            let mut note = sequence.note_mut(i)?;
            let start = note.get("start")?;
            note.set("start", self.nearest_beat_start(start))?;
        }
        Ok(())
    }

    fn nearest_beat_start(&self, start: f64) -> f64 {
        let starts = &self.beat_start_times_secs;
        // First beat at or after `start`; the list is sorted ascending.
        let i = starts.partition_point(|&b| b < start);
        if i == 0 {
            return starts[0];
        }
        if i == starts.len() {
            return starts[starts.len() - 1];
        }
        let prev = starts[i - 1];
        let next = starts[i];
        if start - prev <= next - start {
            prev
        } else {
            next
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_BEATS_PER_MEASURE,
            Self::DEFAULT_BEAT_NOTE_DUR,
            Self::DEFAULT_TEMPO_QPM,
            true,
        )
        .expect("default meter parameters are valid")
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (num, denom) = self.meter_notation();
        write!(f, "{num}/{denom} at {} QPM", self.tempo_qpm)
    }
}
