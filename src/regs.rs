//! # Register-Set Model
//!
//! Registers are identified by the number in their `R<digits>` spelling.
//! Register sets are ordered, so snapshots list registers numerically.

use std::{collections::BTreeSet, fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use thiserror::Error;

/// The number of slots in a [RegVector].
pub const REG_VECTOR_WIDTH: usize = 64;

/// A general purpose register, e.g. `R12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(u32);

impl Reg {
    pub const fn new(num: u32) -> Self { Self(num) }

    pub const fn num(&self) -> u32 { self.0 }

    /// Extract every register token in `text`.
    ///
    /// A token is `R` followed by digits, delimited on both sides by a
    /// non-word character, so `RZ`, `UR4` and `SR_TID` are not registers.
    /// Tokens whose number does not fit a `u32` are returned as errors.
    pub fn scan(text: &str) -> impl Iterator<Item = Result<Reg, ParseRegError>> + '_ {
        reg_regex()
            .captures_iter(text)
            .map(|caps| caps[0].parse::<Reg>())
    }
}

fn reg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bR[0-9]+\b").expect("register pattern is valid"))
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "R{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid register name `{0}`")]
pub struct ParseRegError(pub String);

impl FromStr for Reg {
    type Err = ParseRegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('R')
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .map(Reg)
            .ok_or_else(|| ParseRegError(s.to_string()))
    }
}

/// An ordered set of registers.
pub type RegSet = BTreeSet<Reg>;

/// The union of two register sets.
pub fn union(a: &RegSet, b: &RegSet) -> RegSet { a.union(b).copied().collect() }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("register {reg} does not fit in a {width}-slot register vector")]
pub struct RegIndexOutOfRange {
    pub reg: Reg,
    pub width: usize,
}

/// A fixed-width register membership vector, bit `i` is set iff `R<i>` is a
/// member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegVector(u64);

impl RegVector {
    /// Build the vector from a register set.
    ///
    /// Registers numbered [REG_VECTOR_WIDTH] or above are rejected rather than
    /// wrapped or dropped.
    pub fn from_set(set: &RegSet) -> Result<Self, RegIndexOutOfRange> {
        let mut bits = 0u64;
        for reg in set {
            let index = reg.num() as usize;
            if index >= REG_VECTOR_WIDTH {
                return Err(RegIndexOutOfRange {
                    reg: *reg,
                    width: REG_VECTOR_WIDTH,
                });
            }
            bits |= 1 << index;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, reg: Reg) -> bool {
        (reg.num() as usize) < REG_VECTOR_WIDTH && self.0 & (1 << reg.num()) != 0
    }

    pub fn len(&self) -> usize { self.0.count_ones() as usize }

    pub fn is_empty(&self) -> bool { self.0 == 0 }

    pub fn bits(&self) -> u64 { self.0 }
}

/// Render a register set as `{R0 R1 }`, the format used by the snapshots.
pub fn display_set(set: &RegSet) -> String {
    let mut s = String::from("{");
    for reg in set {
        s.push_str(&format!("{} ", reg));
    }
    s.push('}');
    s
}
