//! MIDI backend: event extraction, General MIDI programs, integer pitch math

use cadenza_core::{AttrCast, AttrSchema, NoteSequence};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::key::{Key, MajorKey, MinorKey, STEPS_IN_OCTAVE};

/// MIDI pitches run from 21 (A0) to 108 (C8); `PITCH_MAP`-style octave math
/// is anchored at C1 = 24.
pub const MIN_PITCH: i64 = 21;
pub const MAX_PITCH: i64 = 108;
pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 7;
pub const DEFAULT_CHANNEL: u8 = 1;

/// The base layout under the names MIDI trafficks in: `time` aliases the
/// start column and `velocity` aliases amplitude. Program, velocity and
/// pitch read back as integers.
pub fn schema() -> AttrSchema {
    let mut schema = AttrSchema::base();
    schema
        .register_alias("time", AttrSchema::START)
        .expect("base columns exist");
    schema
        .register_alias("velocity", AttrSchema::AMPLITUDE)
        .expect("base columns exist");
    for name in ["instrument", "velocity", "pitch"] {
        schema
            .set_cast(name, AttrCast::Int)
            .expect("name is registered");
    }
    schema
}

/// General MIDI program numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MidiInstrument {
    AcousticGrandPiano = 0,
    BrightAcousticPiano = 1,
    ElectricGrandPiano = 2,
    HonkyTonkPiano = 3,
    ElectricPiano1 = 4,
    ElectricPiano2 = 5,
    Harpsichord = 6,
    Clavi = 7,
    Celesta = 8,
    Glockenspiel = 9,
    MusicBox = 10,
    Vibraphone = 11,
    Marimba = 12,
    Xylophone = 13,
    TubularBells = 14,
    Dulcimer = 15,
    DrawbarOrgan = 16,
    PercussiveOrgan = 17,
    RockOrgan = 18,
    ChurchOrgan = 19,
    ReedOrgan = 20,
    Accordion = 21,
    Harmonica = 22,
    TangoAccordion = 23,
    AcousticGuitarNylon = 24,
    AcousticGuitarSteel = 25,
    ElectricGuitarJazz = 26,
    ElectricGuitarClean = 27,
    ElectricGuitarMuted = 28,
    OverdrivenGuitar = 29,
    DistortionGuitar = 30,
    GuitarHarmonics = 31,
    AcousticBass = 32,
    ElectricBassFinger = 33,
    ElectricBassPick = 34,
    FretlessBass = 35,
    SlapBass1 = 36,
    SlapBass2 = 37,
    SynthBass1 = 38,
    SynthBass2 = 39,
    Violin = 40,
    Viola = 41,
    Cello = 42,
    Contrabass = 43,
    TremoloStrings = 44,
    PizzicatoStrings = 45,
    OrchestralHarp = 46,
    Timpani = 47,
    StringEnsemble1 = 48,
    StringEnsemble2 = 49,
    SynthStrings1 = 50,
    SynthStrings2 = 51,
    ChoirAahs = 52,
    VoiceOohs = 53,
    SynthVoice = 54,
    OrchestraHit = 55,
    Trumpet = 56,
    Trombone = 57,
    Tuba = 58,
    MutedTrumpet = 59,
    FrenchHorn = 60,
    BrassSection = 61,
    SynthBrass1 = 62,
    SynthBrass2 = 63,
    SopranoSax = 64,
    AltoSax = 65,
    TenorSax = 66,
    BaritoneSax = 67,
    Oboe = 68,
    EnglishHorn = 69,
    Bassoon = 70,
    Clarinet = 71,
    Piccolo = 72,
    Flute = 73,
    Recorder = 74,
    PanFlute = 75,
    BlownBottle = 76,
    Shakuhachi = 77,
    Whistle = 78,
    Ocarina = 79,
    Lead1Square = 80,
    Lead2Sawtooth = 81,
    Lead3Calliope = 82,
    Lead4Chiff = 83,
    Lead5Charang = 84,
    Lead6Voice = 85,
    Lead7Fifths = 86,
    Lead8BassPlusLead = 87,
    Pad1NewAge = 88,
    Pad2Warm = 89,
    Pad3Polysynth = 90,
    Pad4Choir = 91,
    Pad5Bowed = 92,
    Pad6Metallic = 93,
    Pad7Halo = 94,
    Pad8Sweep = 95,
    Fx1Rain = 96,
    Fx2Soundtrack = 97,
    Fx3Crystal = 98,
    Fx4Atmosphere = 99,
    Fx5Brightness = 100,
    Fx6Goblins = 101,
    Fx7Echoes = 102,
    Fx8SciFi = 103,
    Sitar = 104,
    Banjo = 105,
    Shamisen = 106,
    Koto = 107,
    Kalimba = 108,
    BagPipe = 109,
    Fiddle = 110,
    Shanai = 111,
    TinkleBell = 112,
    Agogo = 113,
    SteelDrums = 114,
    Woodblock = 115,
    TaikoDrum = 116,
    MelodicTom = 117,
    SynthDrum = 118,
    ReverseCymbal = 119,
    GuitarFretNoise = 120,
    BreathNoise = 121,
    Seashore = 122,
    BirdTweet = 123,
    TelephoneRing = 124,
    Helicopter = 125,
    Applause = 126,
    Gunshot = 127,
}

impl MidiInstrument {
    pub fn program(self) -> u8 {
        self as u8
    }
}

/// Channel-10 percussion note numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MidiPercussion {
    AcousticBassDrum = 35,
    BassDrum1 = 36,
    SideStick = 37,
    AcousticSnare = 38,
    HandClap = 39,
    ElectricSnare = 40,
    LowFloorTom = 41,
    ClosedHiHat = 42,
    HighFloorTom = 43,
    PedalHiHat = 44,
    LowTom = 45,
    OpenHiHat = 46,
    LowMidTom = 47,
    HiMidTom = 48,
    CrashCymbal1 = 49,
    HighTom = 50,
    RideCymbal1 = 51,
    ChineseCymbal = 52,
    RideBell = 53,
    Tambourine = 54,
    SplashCymbal = 55,
    Cowbell = 56,
    CrashCymbal2 = 57,
    Vibraslap = 58,
    RideCymbal2 = 59,
    HiBongo = 60,
    LowBongo = 61,
    MuteHiConga = 62,
    OpenHiConga = 63,
    LowConga = 64,
    HighTimbale = 65,
    LowTimbale = 66,
    HighAgogo = 67,
    LowAgogo = 68,
    Cabasa = 69,
    Maracas = 70,
    ShortWhistle = 71,
    LongWhistle = 72,
    ShortGuiro = 73,
    LongGuiro = 74,
    Claves = 75,
    HiWoodBlock = 76,
    LowWoodBlock = 77,
    MuteCuica = 78,
    OpenCuica = 79,
    MuteTriangle = 80,
    OpenTriangle = 81,
}

impl MidiPercussion {
    pub fn note_number(self) -> u8 {
        self as u8
    }
}

/// One note ready for a MIDI emitter: integer program, velocity and pitch,
/// float time and duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub instrument: u8,
    pub time: f64,
    pub duration: f64,
    pub velocity: u8,
    pub pitch: u8,
    pub channel: u8,
}

/// Flatten a sequence into emitter-ready events on [`DEFAULT_CHANNEL`], in
/// flattened order.
pub fn events(sequence: &NoteSequence) -> Result<Vec<NoteEvent>> {
    events_on_channel(sequence, DEFAULT_CHANNEL)
}

pub fn events_on_channel(sequence: &NoteSequence, channel: u8) -> Result<Vec<NoteEvent>> {
    debug!(notes = sequence.len(), channel, "extracting midi events");
    let mut out = Vec::with_capacity(sequence.len());
    for note in sequence {
        let pitch = note.get_int("pitch")?;
        if !(MIN_PITCH..=MAX_PITCH).contains(&pitch) {
            return Err(BackendError::PitchOutOfRange {
                pitch,
                min: MIN_PITCH,
                max: MAX_PITCH,
            });
        }
        out.push(NoteEvent {
            instrument: note.get_int("instrument")? as u8,
            time: note.get("start")?,
            duration: note.get("duration")?,
            velocity: note.get_int("amplitude")? as u8,
            pitch: pitch as u8,
            channel,
        });
    }
    Ok(out)
}

/// C1-anchored pitch classes; octave 0 reaches back below the map to the
/// three lowest playable notes.
fn pitch_class(key: Key) -> i64 {
    match key {
        Key::Major(key) => match key {
            MajorKey::C => 24,
            MajorKey::Cs | MajorKey::Df => 25,
            MajorKey::D => 26,
            MajorKey::Ds | MajorKey::Ef => 27,
            MajorKey::E => 28,
            MajorKey::F => 29,
            MajorKey::Fs | MajorKey::Gf => 30,
            MajorKey::G => 31,
            MajorKey::Gs | MajorKey::Af => 32,
            MajorKey::A => 33,
            MajorKey::As | MajorKey::Bf => 34,
            MajorKey::B | MajorKey::Cf => 35,
        },
        Key::Minor(key) => match key {
            MinorKey::C => 24,
            MinorKey::Cs => 25,
            MinorKey::D => 26,
            MinorKey::Ds | MinorKey::Ef => 27,
            MinorKey::E => 28,
            MinorKey::Es | MinorKey::F => 29,
            MinorKey::Fs => 30,
            MinorKey::G => 31,
            MinorKey::Af => 32,
            MinorKey::A => 33,
            MinorKey::As | MinorKey::Bf => 34,
            MinorKey::B => 35,
        },
    }
}

fn in_min_octave(key: Key) -> bool {
    matches!(
        key,
        Key::Major(MajorKey::A | MajorKey::Bf | MajorKey::B)
            | Key::Minor(MinorKey::A | MinorKey::Bf | MinorKey::B)
    )
}

/// The MIDI pitch number for a key in an octave. Octave 0 holds only the
/// three notes below C1 (A0, Bb0, B0).
pub fn pitch_for_key(key: impl Into<Key>, octave: i32) -> Result<u8> {
    let key = key.into();
    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        return Err(BackendError::OctaveOutOfRange {
            octave,
            min: MIN_OCTAVE,
            max: MAX_OCTAVE,
        });
    }
    if octave == MIN_OCTAVE {
        if !in_min_octave(key) {
            return Err(BackendError::KeyNotInOctave { key, octave });
        }
        return Ok((pitch_class(key) - i64::from(STEPS_IN_OCTAVE)) as u8);
    }
    let offset = i64::from(octave - 1) * i64::from(STEPS_IN_OCTAVE);
    Ok((pitch_class(key) + offset) as u8)
}

/// Shift a pitch by `interval` semitones, erroring when the result leaves
/// the playable range.
pub fn transpose(pitch: u8, interval: i32) -> Result<u8> {
    let new_pitch = i64::from(pitch) + i64::from(interval);
    if !(MIN_PITCH..=MAX_PITCH).contains(&new_pitch) {
        return Err(BackendError::PitchOutOfRange {
            pitch: new_pitch,
            min: MIN_PITCH,
            max: MAX_PITCH,
        });
    }
    Ok(new_pitch as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::NoteBuffer;

    #[test]
    fn schema_reads_integers_through_midi_names() {
        let schema = schema();
        assert_eq!(schema.resolve("time"), schema.resolve("start"));
        assert_eq!(schema.resolve("velocity"), schema.resolve("amplitude"));
        let mut seq = NoteSequence::new(&schema, 1);
        seq.set_attr("velocity", 100.7).unwrap();
        assert_eq!(seq.note(0).unwrap().get("velocity").unwrap(), 100.0);
        // the canonical name keeps its float presentation
        assert_eq!(seq.note(0).unwrap().get("amplitude").unwrap(), 100.7);
    }

    #[test]
    fn program_numbers_match_general_midi() {
        assert_eq!(MidiInstrument::AcousticGrandPiano.program(), 0);
        assert_eq!(MidiInstrument::Vibraphone.program(), 11);
        assert_eq!(MidiInstrument::Violin.program(), 40);
        assert_eq!(MidiInstrument::Gunshot.program(), 127);
        assert_eq!(MidiPercussion::ClosedHiHat.note_number(), 42);
    }

    #[test]
    fn pitch_map_spot_values() {
        assert_eq!(pitch_for_key(MajorKey::C, 1).unwrap(), 24);
        assert_eq!(pitch_for_key(MajorKey::C, 4).unwrap(), 60);
        assert_eq!(pitch_for_key(MinorKey::B, 7).unwrap(), 107);
        assert_eq!(pitch_for_key(MajorKey::Cs, 2).unwrap(), 37);
    }

    #[test]
    fn bottom_octave_truncates_to_three_notes() {
        assert_eq!(pitch_for_key(MajorKey::A, 0).unwrap(), 21);
        assert_eq!(pitch_for_key(MajorKey::Bf, 0).unwrap(), 22);
        assert_eq!(pitch_for_key(MajorKey::B, 0).unwrap(), 23);
        assert_eq!(
            pitch_for_key(MajorKey::C, 0),
            Err(BackendError::KeyNotInOctave {
                key: Key::Major(MajorKey::C),
                octave: 0
            })
        );
    }

    #[test]
    fn octave_is_validated() {
        assert!(pitch_for_key(MajorKey::C, -1).is_err());
        assert!(pitch_for_key(MajorKey::C, 8).is_err());
    }

    #[test]
    fn transpose_stays_in_playable_range() {
        assert_eq!(transpose(60, 12).unwrap(), 72);
        assert_eq!(transpose(60, -12).unwrap(), 48);
        assert_eq!(
            transpose(108, 1),
            Err(BackendError::PitchOutOfRange {
                pitch: 109,
                min: MIN_PITCH,
                max: MAX_PITCH
            })
        );
    }

    #[test]
    fn events_carry_integer_fields() {
        let schema = schema();
        let mut seq = NoteSequence::new(&schema, 0);
        let mut note = NoteBuffer::new(&schema);
        note.set("instrument", MidiInstrument::Violin.program() as f64)
            .unwrap();
        note.set("time", 0.5).unwrap();
        note.set("duration", 0.25).unwrap();
        note.set("velocity", 100.0).unwrap();
        note.set("pitch", 60.0).unwrap();
        seq.append(&note).unwrap();
        let events = events(&seq).unwrap();
        assert_eq!(
            events,
            vec![NoteEvent {
                instrument: 40,
                time: 0.5,
                duration: 0.25,
                velocity: 100,
                pitch: 60,
                channel: DEFAULT_CHANNEL,
            }]
        );
    }

    #[test]
    fn events_reject_out_of_range_pitch() {
        let schema = schema();
        let mut seq = NoteSequence::new(&schema, 1);
        seq.set_attr("pitch", 5.0).unwrap();
        assert!(matches!(
            events(&seq),
            Err(BackendError::PitchOutOfRange { pitch: 5, .. })
        ));
    }
}
