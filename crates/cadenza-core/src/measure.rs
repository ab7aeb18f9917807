//! Measure: a note sequence governed by a meter and optional swing

use serde::{Deserialize, Serialize};

use crate::error::{CadenzaError, Result};
use crate::meter::Meter;
use crate::note::{Note, NoteBuffer, NoteMut};
use crate::schema::AttrSchema;
use crate::sequence::{NoteSequence, Notes};
use crate::swing::{Swing, SwingDirection};

/// A bounded container of notes in one musical measure.
///
/// Composes a child-less [`NoteSequence`] with a [`Meter`], an optional
/// [`Swing`], a beat cursor and a next-note-start cursor. Every structural
/// mutation leaves the notes sorted ascending by start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    sequence: NoteSequence,
    meter: Meter,
    swing: Option<Swing>,
    /// Current beat, `0..=beats_per_measure`.
    beat: u32,
    /// Where the next note placed on-start begins.
    next_note_start: f64,
    /// Duration budget in whole-note units: beats × beat note fraction.
    max_duration: f64,
}

impl Measure {
    pub fn new(schema: &AttrSchema, num_notes: usize, meter: Meter, swing: Option<Swing>) -> Self {
        Self::from_sequence(NoteSequence::new(schema, num_notes), meter, swing)
    }

    /// Wrap an existing sequence. Child sequences are flattened into own
    /// rows first; the sorted-by-start invariant is over the flattened order,
    /// and only a single table can uphold it. Notes are sorted immediately.
    pub fn from_sequence(mut sequence: NoteSequence, meter: Meter, swing: Option<Swing>) -> Self {
        if !sequence.children().is_empty() {
            let mut flat = NoteSequence::new(sequence.schema(), 0);
            flat.extend(&sequence)
                .expect("flattening keeps the schema width");
            sequence = flat;
        }
        sequence.sort_by_start();
        let max_duration =
            meter.beats_per_measure() as f64 * meter.beat_note_dur().fraction();
        Self {
            sequence,
            meter,
            swing,
            beat: 0,
            next_note_start: 0.0,
            max_duration,
        }
    }

    pub fn sequence(&self) -> &NoteSequence {
        &self.sequence
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    pub fn set_meter(&mut self, meter: Meter) {
        self.max_duration =
            meter.beats_per_measure() as f64 * meter.beat_note_dur().fraction();
        self.meter = meter;
    }

    pub fn swing(&self) -> Option<&Swing> {
        self.swing.as_ref()
    }

    pub fn set_swing(&mut self, swing: Swing) {
        self.swing = Some(swing);
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    pub fn next_note_start(&self) -> f64 {
        self.next_note_start
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn note(&self, index: usize) -> Result<Note<'_>> {
        self.sequence.note(index)
    }

    pub fn note_mut(&mut self, index: usize) -> Result<NoteMut<'_>> {
        self.sequence.note_mut(index)
    }

    pub fn iter(&self) -> Notes<'_> {
        self.sequence.iter()
    }

    // Beat cursor management. Both directions saturate; neither ever fails.

    pub fn reset_beat(&mut self) {
        self.beat = 0;
    }

    pub fn increment_beat(&mut self) {
        self.beat = (self.beat + 1).min(self.meter.beats_per_measure());
    }

    pub fn decrement_beat(&mut self) {
        self.beat = self.beat.saturating_sub(1);
    }

    /// Place a note on the current beat and append it. With `increment_beat`
    /// the cursor advances afterwards, so repeated calls walk the beats.
    pub fn add_note_on_beat(&mut self, note: &NoteBuffer, increment_beat: bool) -> Result<()> {
        let beats = self.meter.beat_start_times_secs();
        // The cursor may sit one past the last beat; placement clamps.
        let slot = (self.beat as usize).min(beats.len() - 1);
        let mut placed = note.clone();
        placed.set("start", beats[slot])?;
        self.sequence.append(&placed)?;
        self.sequence.sort_by_start();
        if increment_beat {
            self.increment_beat();
        }
        Ok(())
    }

    /// Replace this measure's notes with `to_add`, each placed on the next
    /// beat slot in order. Fails, without mutating, when `to_add` holds more
    /// notes than there are beats.
    pub fn add_notes_on_beat(&mut self, to_add: &NoteSequence) -> Result<()> {
        let beats = self.meter.beats_per_measure();
        if to_add.len() > beats as usize {
            return Err(CadenzaError::BeatCapacity {
                notes: to_add.len(),
                beats,
            });
        }
        let mut replacement = NoteSequence::new(self.sequence.schema(), 0);
        replacement.extend(to_add)?;
        for (i, beat_start) in self
            .meter
            .beat_start_times_secs()
            .iter()
            .copied()
            .enumerate()
        {
            if i == replacement.len() {
                break;
            }
            replacement.note_mut(i)?.set("start", beat_start)?;
        }
        self.sequence = replacement;
        self.sequence.sort_by_start();
        Ok(())
    }

    /// Place a note at the next-note-start cursor and append it. Fails,
    /// without mutating, when the note's duration would overflow the
    /// measure's duration budget.
    pub fn add_note_on_start(&mut self, note: &NoteBuffer, increment_start: bool) -> Result<()> {
        let duration = note.get("duration")?;
        if self.next_note_start + duration > self.max_duration {
            return Err(CadenzaError::MeasureFull {
                next_start: self.next_note_start,
                duration,
                max_duration: self.max_duration,
            });
        }
        let mut placed = note.clone();
        placed.set("start", self.next_note_start)?;
        self.sequence.append(&placed)?;
        self.sequence.sort_by_start();
        if increment_start {
            self.next_note_start += duration;
        }
        Ok(())
    }

    /// Append every note of `to_add` back to back from the cursor, advancing
    /// it after each. Fails, without mutating, when the summed durations
    /// would overflow the duration budget.
    pub fn add_notes_on_start(&mut self, to_add: &NoteSequence) -> Result<()> {
        let durations = to_add.get_attr("duration")?;
        let sum: f64 = durations.iter().sum();
        if self.next_note_start + sum > self.max_duration {
            return Err(CadenzaError::MeasureFull {
                next_start: self.next_note_start,
                duration: sum,
                max_duration: self.max_duration,
            });
        }
        for (note, duration) in to_add.iter().zip(durations) {
            let mut placed = note.to_buffer();
            placed.set("start", self.next_note_start)?;
            self.sequence.append(&placed)?;
            self.next_note_start += duration;
        }
        self.sequence.sort_by_start();
        Ok(())
    }

    // Quantizing. Disabled quantizing silently no-ops; these mutate in place.

    pub fn is_quantizing(&self) -> bool {
        self.meter.is_quantizing()
    }

    pub fn quantizing_on(&mut self) {
        self.meter.quantizing_on();
    }

    pub fn quantizing_off(&mut self) {
        self.meter.quantizing_off();
    }

    pub fn quantize(&mut self) -> Result<()> {
        self.meter.quantize_in_place(&mut self.sequence)
    }

    pub fn quantize_to_beat(&mut self) -> Result<()> {
        self.meter.quantize_to_beat_in_place(&mut self.sequence)
    }

    // Swing. Everything here needs a swing attached; that is a remediable
    // condition (attach one), distinct from validation failures.

    fn swing_mut(&mut self) -> Result<&mut Swing> {
        self.swing.as_mut().ok_or(CadenzaError::SwingNotEnabled)
    }

    pub fn is_swing_on(&self) -> Result<bool> {
        self.swing
            .as_ref()
            .map(Swing::is_swing_on)
            .ok_or(CadenzaError::SwingNotEnabled)
    }

    pub fn swing_on(&mut self) -> Result<()> {
        self.swing_mut()?.swing_on();
        Ok(())
    }

    pub fn swing_off(&mut self) -> Result<()> {
        self.swing_mut()?.swing_off();
        Ok(())
    }

    /// Apply the attached swing to every note.
    pub fn apply_swing(&mut self) -> Result<()> {
        let swing = self.swing.ok_or(CadenzaError::SwingNotEnabled)?;
        swing.apply(&mut self.sequence)
    }

    /// Accentuate the measure's phrasing: the first note moves forward and
    /// the last note moves back by the swing adjustment. No-op with fewer
    /// than two notes.
    pub fn apply_phrasing(&mut self) -> Result<()> {
        let swing = self.swing.ok_or(CadenzaError::SwingNotEnabled)?;
        if self.sequence.len() < 2 {
            return Ok(());
        }
        let forward = swing.adjustment(SwingDirection::Forward);
        let reverse = swing.adjustment(SwingDirection::Reverse);
        let last = self.sequence.len() - 1;
        {
            let mut first_note = self.sequence.note_mut(0)?;
            let start = first_note.get("start")?;
            first_note.set("start", start + forward)?;
        }
        let mut last_note = self.sequence.note_mut(last)?;
        let start = last_note.get("start")?;
        last_note.set("start", start + reverse)?;
        Ok(())
    }

    // Sequence management. Each wrapper restores the sorted-by-start
    // invariant as its closing step.

    pub fn append(&mut self, note: &NoteBuffer) -> Result<()> {
        self.sequence.append(note)?;
        self.sequence.sort_by_start();
        Ok(())
    }

    pub fn extend(&mut self, other: &NoteSequence) -> Result<()> {
        self.sequence.extend(other)?;
        self.sequence.sort_by_start();
        Ok(())
    }

    pub fn insert(&mut self, index: usize, note: &NoteBuffer) -> Result<()> {
        self.sequence.insert(index, note)?;
        self.sequence.sort_by_start();
        Ok(())
    }

    pub fn remove(&mut self, range: core::ops::Range<usize>) -> Result<()> {
        self.sequence.remove(range)?;
        self.sequence.sort_by_start();
        Ok(())
    }

    pub fn get_attr(&self, name: &str) -> Result<Vec<f64>> {
        self.sequence.get_attr(name)
    }

    pub fn set_attr(&mut self, name: &str, value: f64) -> Result<()> {
        self.sequence.set_attr(name, value)
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::new(&AttrSchema::base(), 0, Meter::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swing::SwingJitter;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn measure() -> Measure {
        Measure::new(
            &AttrSchema::base(),
            0,
            Meter::new(4, crate::meter::NoteDur::Quarter, 240.0, true).unwrap(),
            None,
        )
    }

    fn swung_measure(magnitude: f64) -> Measure {
        let mut m = measure();
        m.set_swing(Swing::new(
            true,
            magnitude,
            SwingDirection::Both,
            SwingJitter::Fixed,
        ));
        m
    }

    fn note(start: f64, duration: f64) -> NoteBuffer {
        let mut n = NoteBuffer::new(&AttrSchema::base());
        n.set("start", start).unwrap();
        n.set("duration", duration).unwrap();
        n
    }

    fn assert_sorted(m: &Measure) {
        let starts = m.get_attr("start").unwrap();
        for pair in starts.windows(2) {
            assert!(pair[0] <= pair[1], "not sorted: {starts:?}");
        }
    }

    #[test]
    fn mutators_keep_notes_sorted_by_start() {
        let mut m = measure();
        m.append(&note(0.75, 0.25)).unwrap();
        assert_sorted(&m);
        m.append(&note(0.25, 0.25)).unwrap();
        assert_sorted(&m);
        m.insert(0, &note(0.5, 0.25)).unwrap();
        assert_sorted(&m);
        m.append(&note(0.0, 0.25)).unwrap();
        assert_sorted(&m);
        assert_eq!(m.get_attr("start").unwrap(), vec![0.0, 0.25, 0.5, 0.75]);
        m.remove(1..2).unwrap();
        assert_sorted(&m);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn from_sequence_flattens_children_into_one_table() {
        let mut nested = NoteSequence::new(&AttrSchema::base(), 0);
        nested.append(&note(0.5, 0.25)).unwrap();
        let mut child = NoteSequence::new(&AttrSchema::base(), 0);
        child.append(&note(0.1, 0.25)).unwrap();
        nested.add_child(child).unwrap();

        let mut m = Measure::from_sequence(nested, Meter::default(), None);
        assert!(m.sequence().children().is_empty());
        assert_eq!(m.get_attr("start").unwrap(), vec![0.1, 0.5]);

        // Mutators keep the flattened order sorted now that one table owns
        // every row.
        m.append(&note(0.3, 0.25)).unwrap();
        assert_eq!(m.get_attr("start").unwrap(), vec![0.1, 0.3, 0.5]);
        assert_sorted(&m);
    }

    #[test]
    fn add_note_on_beat_places_on_cursor_beat() {
        let mut m = measure();
        for _ in 0..4 {
            m.add_note_on_beat(&note(0.0, 0.25), true).unwrap();
        }
        assert_eq!(m.get_attr("start").unwrap(), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(m.beat(), 4);
        // Cursor saturates; one more lands on the last beat.
        m.add_note_on_beat(&note(0.0, 0.25), true).unwrap();
        approx(m.get_attr("start").unwrap()[4], 0.75);
    }

    #[test]
    fn add_notes_on_beat_replaces_contents() {
        let mut m = measure();
        m.append(&note(0.9, 0.1)).unwrap();

        let mut incoming = NoteSequence::new(&AttrSchema::base(), 3);
        incoming.set_attr("duration", 0.25).unwrap();
        m.add_notes_on_beat(&incoming).unwrap();

        assert_eq!(m.len(), 3);
        assert_eq!(m.get_attr("start").unwrap(), vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn add_notes_on_beat_rejects_more_notes_than_beats() {
        let mut m = measure();
        m.append(&note(0.1, 0.1)).unwrap();
        let incoming = NoteSequence::new(&AttrSchema::base(), 5);
        assert_eq!(
            m.add_notes_on_beat(&incoming),
            Err(CadenzaError::BeatCapacity { notes: 5, beats: 4 })
        );
        // Failed call left the measure untouched.
        assert_eq!(m.len(), 1);
        approx(m.get_attr("start").unwrap()[0], 0.1);
    }

    #[test]
    fn add_note_on_start_advances_cursor() {
        let mut m = measure();
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.add_note_on_start(&note(0.0, 0.5), true).unwrap();
        approx(m.next_note_start(), 0.75);
        assert_eq!(m.get_attr("start").unwrap(), vec![0.0, 0.25]);
    }

    #[test]
    fn add_note_on_start_rejects_overflow_without_mutating() {
        let mut m = measure();
        m.add_note_on_start(&note(0.0, 0.75), true).unwrap();
        let err = m.add_note_on_start(&note(0.0, 0.5), true).unwrap_err();
        assert!(matches!(err, CadenzaError::MeasureFull { .. }));
        assert_eq!(m.len(), 1);
        approx(m.next_note_start(), 0.75);
    }

    #[test]
    fn add_notes_on_start_checks_summed_durations_up_front() {
        let mut m = measure();
        let mut incoming = NoteSequence::new(&AttrSchema::base(), 3);
        incoming.set_attr("duration", 0.5).unwrap();
        assert!(matches!(
            m.add_notes_on_start(&incoming),
            Err(CadenzaError::MeasureFull { .. })
        ));
        assert!(m.is_empty());

        let mut fits = NoteSequence::new(&AttrSchema::base(), 4);
        fits.set_attr("duration", 0.25).unwrap();
        m.add_notes_on_start(&fits).unwrap();
        assert_eq!(m.get_attr("start").unwrap(), vec![0.0, 0.25, 0.5, 0.75]);
        approx(m.next_note_start(), 1.0);
    }

    #[test]
    fn beat_cursor_saturates_both_ways() {
        let mut m = measure();
        for _ in 0..10 {
            m.increment_beat();
        }
        assert_eq!(m.beat(), 4);
        for _ in 0..10 {
            m.decrement_beat();
        }
        assert_eq!(m.beat(), 0);
        m.increment_beat();
        m.reset_beat();
        assert_eq!(m.beat(), 0);
    }

    #[test]
    fn swing_operations_require_attached_swing() {
        let mut m = measure();
        assert_eq!(m.apply_swing(), Err(CadenzaError::SwingNotEnabled));
        assert_eq!(m.apply_phrasing(), Err(CadenzaError::SwingNotEnabled));
        assert_eq!(m.swing_on(), Err(CadenzaError::SwingNotEnabled));
        assert_eq!(m.swing_off(), Err(CadenzaError::SwingNotEnabled));
        assert_eq!(m.is_swing_on(), Err(CadenzaError::SwingNotEnabled));
    }

    #[test]
    fn apply_phrasing_moves_first_forward_and_last_back() {
        let mut m = swung_measure(0.1);
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.apply_phrasing().unwrap();
        let starts = m.get_attr("start").unwrap();
        approx(starts[0], 0.1);
        approx(starts[1], 0.25);
        approx(starts[2], 0.4);
    }

    #[test]
    fn apply_phrasing_is_noop_below_two_notes() {
        let mut m = swung_measure(0.1);
        m.apply_phrasing().unwrap();
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.apply_phrasing().unwrap();
        approx(m.get_attr("start").unwrap()[0], 0.0);
    }

    #[test]
    fn apply_swing_moves_every_note() {
        let mut m = measure();
        m.set_swing(Swing::new(
            true,
            0.1,
            SwingDirection::Forward,
            SwingJitter::Fixed,
        ));
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.add_note_on_start(&note(0.0, 0.25), true).unwrap();
        m.apply_swing().unwrap();
        let starts = m.get_attr("start").unwrap();
        approx(starts[0], 0.1);
        approx(starts[1], 0.35);
    }

    #[test]
    fn quantize_respects_meter_flag() {
        let mut m = measure();
        for _ in 0..4 {
            m.append(&note(0.0, 0.5)).unwrap();
        }
        m.quantizing_off();
        m.quantize().unwrap();
        assert_eq!(m.get_attr("duration").unwrap(), vec![0.5; 4]);
        m.quantizing_on();
        m.quantize().unwrap();
        assert!(m.get_attr("duration").unwrap().iter().all(|&d| d != 0.5));
    }
}
