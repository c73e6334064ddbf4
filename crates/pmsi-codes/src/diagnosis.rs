//! ICD-10 diagnosis codes

use crate::error::CodeError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const MAX_LEN: usize = 6;

/// ICD-10 diagnosis code, at most 6 significant characters
///
/// Stored inline, uppercased, with trailing `+` padding removed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosisCode {
    buf: [u8; MAX_LEN],
    len: u8,
}

impl DiagnosisCode {
    /// Parse a fixed-width diagnosis field
    ///
    /// The code ends at the first space. Fields of 7 bytes or more must have
    /// a space right after the code.
    #[must_use]
    pub fn parse(frag: &[u8]) -> Option<Self> {
        let mut buf = [0u8; MAX_LEN];
        let mut end = 0;

        let copy_len = frag.len().min(MAX_LEN);
        while end < copy_len && frag[end] != b' ' {
            buf[end] = frag[end].to_ascii_uppercase();
            end += 1;
        }

        let terminated = frag.len() < 7 || frag.get(end) == Some(&b' ');
        if frag.len() < 3
            || !terminated
            || !buf[0].is_ascii_alphabetic()
            || !buf[1].is_ascii_digit()
            || !buf[2].is_ascii_digit()
        {
            return None;
        }

        for (i, &c) in buf.iter().enumerate().take(end).skip(3) {
            if !(c.is_ascii_digit() || (i < 5 && c == b'+')) {
                return None;
            }
        }
        while end > 3 && buf[end - 1] == b'+' {
            end -= 1;
            buf[end] = 0;
        }

        Some(Self {
            buf,
            len: end as u8,
        })
    }

    /// Code as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..usize::from(self.len)]).unwrap_or_default()
    }

    /// Check whether this code starts with `prefix`
    #[inline]
    #[must_use]
    pub fn matches(&self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix)
    }
}

impl Display for DiagnosisCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for DiagnosisCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DiagnosisCode({})", self.as_str())
    }
}

impl FromStr for DiagnosisCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes()).ok_or_else(|| CodeError::MalformedDiagnosis(s.to_string()))
    }
}

impl serde::Serialize for DiagnosisCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for DiagnosisCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_padded_field() {
        let code = DiagnosisCode::parse(b"I10     ").unwrap();
        assert_eq!(code.as_str(), "I10");

        let code = DiagnosisCode::parse(b"s7200   ").unwrap();
        assert_eq!(code.as_str(), "S7200");
    }

    #[test]
    fn parse_strips_trailing_plus() {
        let code = DiagnosisCode::parse(b"Z51+1   ").unwrap();
        assert_eq!(code.as_str(), "Z51+1");

        let code = DiagnosisCode::parse(b"E11++   ").unwrap();
        assert_eq!(code.as_str(), "E11");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert!(DiagnosisCode::parse(b"1A0     ").is_none());
        assert!(DiagnosisCode::parse(b"AA0     ").is_none());
        assert!(DiagnosisCode::parse(b"I1      ").is_none());
        assert!(DiagnosisCode::parse(b"I10X    ").is_none());
        assert!(DiagnosisCode::parse(b"I1000+  ").is_none());
    }

    #[test]
    fn parse_requires_terminator_in_wide_fields() {
        assert!(DiagnosisCode::parse(b"I100000 ").is_none());
        assert!(DiagnosisCode::parse(b"I10000  ").is_some());
    }

    #[test]
    fn parse_short_fields() {
        assert_eq!(DiagnosisCode::parse(b"K359  ").unwrap().as_str(), "K359");
        assert_eq!(DiagnosisCode::parse(b"K35").unwrap().as_str(), "K35");
    }

    #[test]
    fn matches_prefix() {
        let code: DiagnosisCode = "O800".parse().unwrap();
        assert!(code.matches("O80"));
        assert!(!code.matches("O81"));
    }
}
