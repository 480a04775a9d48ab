//! Pitch classes, MIDI numbers and note names

use std::fmt;

/// Reference frequency for A4 (MIDI 69)
pub const A4_FREQ: f64 = 440.0;
/// MIDI number of A4
pub const A4_MIDI: i32 = 69;

/// The twelve equal-tempered pitch classes, indexed from C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for an index, wrapping modulo 12
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Position within the octave, C = 0
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named note: pitch class plus octave, e.g. `A4`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
    pub midi: i32,
}

impl Note {
    pub fn from_midi(midi: i32) -> Self {
        Self {
            pitch_class: PitchClass::from_index(midi),
            octave: midi.div_euclid(12) - 1,
            midi,
        }
    }

    /// Nearest note to a frequency; `None` for frequencies that are not
    /// strictly positive and finite
    pub fn from_frequency(frequency: f64) -> Option<Self> {
        midi_from_frequency(frequency).map(Self::from_midi)
    }

    /// Equal-tempered frequency of the note
    pub fn frequency(&self) -> f64 {
        midi_to_frequency(self.midi as f64)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

/// Fractional MIDI number: `69 + 12 * log2(f / 440)`
pub fn frequency_to_midi(frequency: f64) -> f64 {
    A4_MIDI as f64 + 12.0 * (frequency / A4_FREQ).log2()
}

/// Rounded MIDI number, `None` unless the frequency is positive and finite
pub fn midi_from_frequency(frequency: f64) -> Option<i32> {
    if !(frequency > 0.0) || !frequency.is_finite() {
        return None;
    }
    Some(frequency_to_midi(frequency).round() as i32)
}

/// `440 * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: f64) -> f64 {
    A4_FREQ * 2f64.powf((midi - A4_MIDI as f64) / 12.0)
}
