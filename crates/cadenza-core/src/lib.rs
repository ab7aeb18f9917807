//! cadenza-core: Columnar note storage and timing transforms for composition

mod error;
mod measure;
mod meter;
mod note;
mod schema;
mod section;
mod sequence;
mod swing;
mod track;

pub use error::{CadenzaError, Result};
pub use measure::Measure;
pub use meter::{Meter, NoteDur};
pub use note::{Note, NoteBuffer, NoteMut};
pub use schema::{AttrCast, AttrSchema};
pub use section::Section;
pub use sequence::{NoteSequence, Notes};
pub use swing::{Swing, SwingDirection, SwingJitter};
pub use track::Track;
