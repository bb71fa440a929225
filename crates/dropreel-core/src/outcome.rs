//! Result of a settled run.

use serde::{Deserialize, Serialize};

/// Who won the wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    SideA,
    SideB,
    Tie,
}

impl Outcome {
    /// Side with more balls in its bucket wins.
    pub fn from_counts(side_a: u32, side_b: u32) -> Self {
        match side_a.cmp(&side_b) {
            std::cmp::Ordering::Greater => Self::SideA,
            std::cmp::Ordering::Less => Self::SideB,
            std::cmp::Ordering::Equal => Self::Tie,
        }
    }

    /// Voice line revealing the answer. A win by side A reveals answer B and
    /// the reverse; a tie has no line.
    pub fn voice_line(self) -> Option<&'static str> {
        match self {
            Self::SideA => Some("reponse_b"),
            Self::SideB => Some("reponse_a"),
            Self::Tie => None,
        }
    }

    /// Whether `self` is the other side's win. A tie contradicts nothing.
    pub fn contradicts(self, expected: Outcome) -> bool {
        matches!(
            (self, expected),
            (Self::SideA, Self::SideB) | (Self::SideB, Self::SideA)
        )
    }
}
