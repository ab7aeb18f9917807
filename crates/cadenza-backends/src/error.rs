//! Backend error type

use cadenza_core::CadenzaError;
use thiserror::Error;

use crate::key::Key;

#[derive(Debug, Error, PartialEq)]
pub enum BackendError {
    #[error("octave {octave} out of range {min}..={max}")]
    OctaveOutOfRange { octave: i32, min: i32, max: i32 },

    #[error("key {key:?} is not playable in octave {octave}")]
    KeyNotInOctave { key: Key, octave: i32 },

    #[error("pitch {pitch} outside the playable range {min}..={max}")]
    PitchOutOfRange { pitch: i64, min: i64, max: i64 },

    #[error(transparent)]
    Core(#[from] CadenzaError),
}

pub type Result<T> = std::result::Result<T, BackendError>;
