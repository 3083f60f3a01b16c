// Button combination -> direction code
//
// Each button owns one bit of a 4-bit press mask; the mask is the code.
// Adjacent pairs give diagonals, opposing pairs and 3+ buttons are contradictory.

use std::fmt;

use crate::messages::ButtonState;

/// Bit weights of the press mask
pub const FORWARD_BIT: u8 = 1;
pub const RIGHT_BIT: u8 = 2;
pub const REVERSE_BIT: u8 = 4;
pub const LEFT_BIT: u8 = 8;

const CODE_MASK: u8 = FORWARD_BIT | RIGHT_BIT | REVERSE_BIT | LEFT_BIT;

/// Press mask of one cycle, always in 0..=15
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirectionCode(u8);

impl DirectionCode {
    pub const STOP: Self = Self(0);

    /// Build from a raw value; bits above the four button bits are discarded
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & CODE_MASK)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Classify the code into a drive state
    pub fn direction(self) -> Direction {
        match self.0 {
            0 => Direction::Stop,
            1 => Direction::Forward,
            2 => Direction::Right,
            3 => Direction::ForwardRight,
            4 => Direction::Back,
            6 => Direction::BackRight,
            8 => Direction::Left,
            9 => Direction::ForwardLeft,
            12 => Direction::BackLeft,
            _ => Direction::Contradictory,
        }
    }

    /// All sixteen possible codes, in ascending order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=CODE_MASK).map(Self)
    }
}

impl fmt::Display for DirectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drive state selected by a direction code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Stop,
    Forward,
    Right,
    ForwardRight,
    Back,
    BackRight,
    Left,
    ForwardLeft,
    BackLeft,
    /// Opposing buttons or more than two buttons held; drives like `Stop`
    Contradictory,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Stop => "Stop",
            Direction::Forward => "Forward",
            Direction::Right => "Right",
            Direction::ForwardRight => "Forward Right",
            Direction::Back => "Back",
            Direction::BackRight => "Back Right",
            Direction::Left => "Left",
            Direction::ForwardLeft => "Forward Left",
            Direction::BackLeft => "Back Left",
            Direction::Contradictory => "Contradictory",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve the buttons held this cycle into a direction code
pub fn resolve(buttons: ButtonState) -> DirectionCode {
    let mut bits = 0;
    if buttons.forward {
        bits |= FORWARD_BIT;
    }
    if buttons.right {
        bits |= RIGHT_BIT;
    }
    if buttons.reverse {
        bits |= REVERSE_BIT;
    }
    if buttons.left {
        bits |= LEFT_BIT;
    }
    DirectionCode(bits)
}
