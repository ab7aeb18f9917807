//! Csound backend: score-line rendering and octave.pitch-class pitch math
//!
//! Csound overloads float syntax to express 12-tone scale values: the integer
//! part is the octave and the two fractional digits are the pitch class in
//! `1..=12`, so middle C is `4.01`. Pitch precision is configurable because
//! the same column sometimes carries raw Hz values instead.

use cadenza_core::{AttrCast, AttrSchema, Note, NoteBuffer, NoteSequence};
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::key::{Key, MajorKey, MinorKey, STEPS_IN_OCTAVE};

pub const MIN_OCTAVE: i32 = 1;
pub const MAX_OCTAVE: i32 = 12;

/// Two fractional digits, the scale-pitch convention.
pub const SCALE_PITCH_PRECISION: usize = 2;
pub const REST_AMP: f64 = 0.0;

/// The base layout plus the short aliases Csound scores are written in.
/// Instrument reads back as an integer, matching the `i` statement field.
pub fn schema() -> AttrSchema {
    let mut schema = AttrSchema::base();
    let aliases = [
        ("i", AttrSchema::INSTRUMENT),
        ("s", AttrSchema::START),
        ("d", AttrSchema::DURATION),
        ("dur", AttrSchema::DURATION),
        ("a", AttrSchema::AMPLITUDE),
        ("amp", AttrSchema::AMPLITUDE),
        ("p", AttrSchema::PITCH),
    ];
    for (alias, column) in aliases {
        schema
            .register_alias(alias, column)
            .expect("base columns exist");
    }
    schema
        .set_cast("instrument", AttrCast::Int)
        .expect("instrument is a base attribute");
    schema
}

/// One score line: `i <instr> <start:.5> <dur:.5> <amp> <pitch>`, with pitch
/// at [`SCALE_PITCH_PRECISION`].
pub fn render(note: Note<'_>) -> Result<String> {
    render_with_precision(note, SCALE_PITCH_PRECISION)
}

/// [`render`] with the pitch precision overridden, for Hz-valued pitch
/// columns.
pub fn render_with_precision(note: Note<'_>, pitch_precision: usize) -> Result<String> {
    let instrument = note.get_int("instrument")?;
    let start = note.get("start")?;
    let duration = note.get("duration")?;
    let amplitude = note.get("amplitude")?;
    let pitch = note.get("pitch")?;
    Ok(format!(
        "i {instrument} {start:.5} {duration:.5} {amplitude} {pitch:.pitch_precision$}"
    ))
}

/// Render a whole flattened sequence as score lines in flattened order.
pub fn render_score(sequence: &NoteSequence) -> Result<String> {
    debug!(notes = sequence.len(), "rendering csound score");
    let mut lines = Vec::with_capacity(sequence.len());
    for note in sequence {
        lines.push(render(note)?);
    }
    Ok(lines.join("\n"))
}

/// A silent note: zero amplitude, everything else zeroed for the caller to
/// fill in.
pub fn rest(schema: &AttrSchema) -> NoteBuffer {
    let mut note = NoteBuffer::new(schema);
    note.set("amplitude", REST_AMP)
        .expect("amplitude is a base attribute");
    note
}

fn pitch_class(key: Key) -> f64 {
    match key {
        Key::Major(key) => match key {
            MajorKey::C => 1.01,
            MajorKey::Cs | MajorKey::Df => 1.02,
            MajorKey::D => 1.03,
            MajorKey::Ds | MajorKey::Ef => 1.04,
            MajorKey::E => 1.05,
            MajorKey::F => 1.06,
            MajorKey::Fs | MajorKey::Gf => 1.07,
            MajorKey::G => 1.08,
            MajorKey::Gs | MajorKey::Af => 1.09,
            MajorKey::A => 1.10,
            MajorKey::As | MajorKey::Bf => 1.11,
            MajorKey::B | MajorKey::Cf => 1.12,
        },
        Key::Minor(key) => match key {
            MinorKey::C => 1.01,
            MinorKey::Cs => 1.02,
            MinorKey::D => 1.03,
            MinorKey::Ds | MinorKey::Ef => 1.04,
            MinorKey::E => 1.05,
            MinorKey::Es | MinorKey::F => 1.06,
            MinorKey::Fs => 1.07,
            MinorKey::G => 1.08,
            MinorKey::Af => 1.09,
            MinorKey::A => 1.10,
            MinorKey::As | MinorKey::Bf => 1.11,
            MinorKey::B => 1.12,
        },
    }
}

/// The octave.pitch-class float for a key in an octave, e.g. middle C is
/// `4.01`.
pub fn pitch_for_key(key: impl Into<Key>, octave: i32) -> Result<f64> {
    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        return Err(BackendError::OctaveOutOfRange {
            octave,
            min: MIN_OCTAVE,
            max: MAX_OCTAVE,
        });
    }
    Ok(pitch_class(key.into()) + (f64::from(octave) - 1.0))
}

/// Shift a pitch by `interval` semitones in octave.pitch-class syntax,
/// carrying across octave boundaries in either direction.
pub fn transpose(pitch: f64, interval: i32) -> f64 {
    let octave = pitch.trunc() as i32;
    let pc = ((pitch - pitch.trunc()) * 100.0).round() as i32;
    let shifted = pc - 1 + interval;
    let new_octave = octave + shifted.div_euclid(STEPS_IN_OCTAVE);
    let new_pc = shifted.rem_euclid(STEPS_IN_OCTAVE) + 1;
    f64::from(new_octave) + f64::from(new_pc) / 100.0
}
