//! Pitch-class names for major and minor keys
//!
//! These are the opaque identifiers a music-theory collaborator hands to the
//! backends. The pitch lookup tables themselves live with each backend, since
//! the same key name maps to a different value per output format.

use serde::{Deserialize, Serialize};

/// Semitones per octave.
pub const STEPS_IN_OCTAVE: i32 = 12;

/// Pitch-class names in the major keys, enharmonic spellings included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorKey {
    C,
    Cs,
    Df,
    D,
    Ds,
    Ef,
    E,
    F,
    Fs,
    Gf,
    G,
    Gs,
    Af,
    A,
    As,
    Bf,
    B,
    Cf,
}

/// Pitch-class names in the minor keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinorKey {
    C,
    Cs,
    D,
    Ds,
    Ef,
    E,
    Es,
    F,
    Fs,
    G,
    Af,
    A,
    As,
    Bf,
    B,
}

/// Either kind of key, for APIs that accept both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Major(MajorKey),
    Minor(MinorKey),
}

impl From<MajorKey> for Key {
    fn from(key: MajorKey) -> Self {
        Key::Major(key)
    }
}

impl From<MinorKey> for Key {
    fn from(key: MinorKey) -> Self {
        Key::Minor(key)
    }
}
