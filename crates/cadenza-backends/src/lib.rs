//! cadenza-backends: Output-format collaborators for cadenza-core
//!
//! Each backend contributes a schema naming the note columns the way its
//! format does, pitch math over the shared key names, and rendering into
//! the format's event shape.

pub mod csound;
mod error;
pub mod key;
pub mod midi;

pub use error::{BackendError, Result};
pub use key::{Key, MajorKey, MinorKey};
pub use midi::{MidiInstrument, MidiPercussion, NoteEvent};
