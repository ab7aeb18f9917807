//! Error types for cadenza

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CadenzaError {
    #[error("Unknown note attribute: {0}")]
    UnknownAttribute(String),
    #[error("Attribute name `{name}` already bound to column {bound}, cannot alias to {requested}")]
    ConflictingAlias {
        name: String,
        bound: usize,
        requested: usize,
    },
    #[error("Schema mismatch: expected {expected} attributes, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Notes not found in this sequence")]
    NotFound,
    #[error("Invalid meter: {0}")]
    InvalidMeter(String),
    #[error("Sequence of {notes} notes does not fit {beats} beats per measure")]
    BeatCapacity { notes: usize, beats: u32 },
    #[error("Measure full: next start {next_start} + duration {duration} > max {max_duration}")]
    MeasureFull {
        next_start: f64,
        duration: f64,
        max_duration: f64,
    },
    #[error("Swing not attached to this measure")]
    SwingNotEnabled,
    #[error("Pitch count {pitches} does not match note count {notes}")]
    PitchCountMismatch { pitches: usize, notes: usize },
}

pub type Result<T> = std::result::Result<T, CadenzaError>;
