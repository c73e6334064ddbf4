//! GHM and GHS grouping codes

use crate::error::CodeError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// GHM root: CMD, type letter and sequence number (e.g. `04M05`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GhmRootCode {
    /// Major diagnostic category
    pub cmd: i8,
    /// Type letter (C, K, M, Z...)
    pub kind: u8,
    /// Sequence number within the CMD
    pub seq: i8,
}

impl Display for GhmRootCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{}{:02}", self.cmd, char::from(self.kind), self.seq)
    }
}

/// Full GHM code: root plus an optional severity/mode character
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GhmCode {
    /// Root part
    pub root: GhmRootCode,
    /// Mode character, `None` when blank
    pub mode: Option<u8>,
}

impl GhmCode {
    /// Parse a 5 or 6 byte GHM field
    #[must_use]
    pub fn parse(frag: &[u8]) -> Option<Self> {
        let valid = (5..7).contains(&frag.len())
            && frag[0].is_ascii_digit()
            && frag[1].is_ascii_digit()
            && frag[2].is_ascii_alphabetic()
            && frag[3].is_ascii_digit()
            && frag[4].is_ascii_digit()
            && (frag.len() == 5 || frag[5] == b' ' || frag[5].is_ascii_alphanumeric());
        if !valid {
            return None;
        }

        let two_digits = |i: usize| ((frag[i] - b'0') * 10 + (frag[i + 1] - b'0')) as i8;
        let mode = frag
            .get(5)
            .filter(|c| **c != b' ')
            .map(u8::to_ascii_uppercase);

        Some(Self {
            root: GhmRootCode {
                cmd: two_digits(0),
                kind: frag[2].to_ascii_uppercase(),
                seq: two_digits(3),
            },
            mode,
        })
    }

    /// Root part of this GHM
    #[inline]
    #[must_use]
    pub const fn root(&self) -> GhmRootCode {
        self.root
    }

    /// Error GHMs all live in CMD 90
    #[inline]
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.root.cmd == 90
    }

    /// Severity level (0 to 3) derived from the mode character
    #[must_use]
    pub fn severity(&self) -> i32 {
        match self.mode {
            Some(c @ b'1'..=b'4') => i32::from(c - b'1'),
            Some(c @ b'A'..=b'D') => i32::from(c - b'A'),
            _ => 0,
        }
    }
}

impl Display for GhmCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        if let Some(mode) = self.mode {
            write!(f, "{}", char::from(mode))?;
        }
        Ok(())
    }
}

impl FromStr for GhmCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes()).ok_or_else(|| CodeError::MalformedGhm(s.to_string()))
    }
}

impl Serialize for GhmCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GhmCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// GHS tariff group number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GhsCode(pub i16);

impl GhsCode {
    /// Valid GHS numbers are strictly positive
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl Display for GhsCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
