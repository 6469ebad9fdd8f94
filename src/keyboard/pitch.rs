/// Position of a note inside its octave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
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
    pub fn of(note: u8) -> Self {
        match note % 12 {
            0 => Self::C,
            1 => Self::CSharp,
            2 => Self::D,
            3 => Self::DSharp,
            4 => Self::E,
            5 => Self::F,
            6 => Self::FSharp,
            7 => Self::G,
            8 => Self::GSharp,
            9 => Self::A,
            10 => Self::ASharp,
            _ => Self::B,
        }
    }

    pub fn is_white(self) -> bool {
        !matches!(
            self,
            Self::CSharp | Self::DSharp | Self::FSharp | Self::GSharp | Self::ASharp
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::CSharp => "C#",
            Self::D => "D",
            Self::DSharp => "D#",
            Self::E => "E",
            Self::F => "F",
            Self::FSharp => "F#",
            Self::G => "G",
            Self::GSharp => "G#",
            Self::A => "A",
            Self::ASharp => "A#",
            Self::B => "B",
        }
    }
}

pub fn is_white_key(note: u8) -> bool {
    PitchClass::of(note).is_white()
}

/// White keys in the inclusive span `from..=to`; zero when `to < from`.
pub fn count_white_keys(from: u8, to: u8) -> usize {
    if to < from {
        return 0;
    }
    (from..=to).filter(|&n| is_white_key(n)).count()
}

/// Scientific pitch name, e.g. `60 -> "C4"`, used in diagnostics.
pub fn note_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 1;
    format!("{}{}", PitchClass::of(note).name(), octave)
}
