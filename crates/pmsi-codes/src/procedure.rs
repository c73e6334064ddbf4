//! CCAM procedure codes

use crate::error::CodeError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// CCAM procedure code: four letters followed by three digits
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureCode([u8; 7]);

impl ProcedureCode {
    /// Parse a 7-byte procedure field
    #[must_use]
    pub fn parse(frag: &[u8]) -> Option<Self> {
        let frag: &[u8; 7] = frag.try_into().ok()?;

        let mut code = [0u8; 7];
        for (dst, src) in code.iter_mut().zip(frag) {
            *dst = src.to_ascii_uppercase();
        }

        let valid = code[..4].iter().all(u8::is_ascii_alphabetic)
            && code[4..].iter().all(u8::is_ascii_digit);
        valid.then_some(Self(code))
    }

    /// Code as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Display for ProcedureCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ProcedureCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ProcedureCode({})", self.as_str())
    }
}

impl FromStr for ProcedureCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes()).ok_or_else(|| CodeError::MalformedProcedure(s.to_string()))
    }
}

impl serde::Serialize for ProcedureCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ProcedureCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
