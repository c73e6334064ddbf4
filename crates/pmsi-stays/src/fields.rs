//! Fixed-width PMSI field readers
//!
//! Every reader treats a field starting with a space as absent: the target
//! is left untouched and the read succeeds. Readers return `false` only for
//! malformed content, leaving the caller to pick the matching error flag.

use crate::stay::{StayError, StayErrors, StayFlag, StayFlags};
use pmsi_codes::{DiagnosisCode, PmsiDate};
use std::str::FromStr;

/// Marker for a field that is present but malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed;

/// Parse a single-character field
///
/// # Errors
/// Returns [`Malformed`] for control or non-ASCII bytes.
pub fn parse_char(c: u8) -> Result<Option<char>, Malformed> {
    match c {
        b' ' => Ok(None),
        c if c.is_ascii_control() || !c.is_ascii() => Err(Malformed),
        c => Ok(Some(char::from(c))),
    }
}

/// Parse the leading digit run of a numeric field
///
/// Trailing bytes after the digits are ignored.
///
/// # Errors
/// Returns [`Malformed`] when the field starts with something other than a
/// digit or a space, or when the value overflows `T`.
pub fn parse_int<T: FromStr>(frag: &[u8]) -> Result<Option<T>, Malformed> {
    match frag.first() {
        None | Some(b' ') => return Ok(None),
        Some(c) if !c.is_ascii_digit() => return Err(Malformed),
        Some(_) => {}
    }

    let digits = frag.iter().take_while(|c| c.is_ascii_digit()).count();
    std::str::from_utf8(&frag[..digits])
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Some)
        .ok_or(Malformed)
}

/// Parse a `DDMMYYYY` date field
///
/// # Errors
/// Returns [`Malformed`] unless the field is blank-led or 8 digits.
pub fn parse_date(frag: &[u8]) -> Result<Option<PmsiDate>, Malformed> {
    match frag.first() {
        None | Some(b' ') => Ok(None),
        Some(_) => PmsiDate::parse_ddmmyyyy(frag).map(Some).ok_or(Malformed),
    }
}

/// Store a character field into `target`
pub fn read_char(c: u8, target: &mut Option<char>) -> bool {
    store(parse_char(c), target, Some)
}

/// Store a numeric field into `target`
pub fn read_int<T: FromStr>(frag: &[u8], target: &mut T) -> bool {
    match parse_int(frag) {
        Ok(Some(value)) => {
            *target = value;
            true
        }
        Ok(None) => true,
        Err(Malformed) => false,
    }
}

/// Store a date field into `target`
pub fn read_date(frag: &[u8], target: &mut Option<PmsiDate>) -> bool {
    store(parse_date(frag), target, Some)
}

/// Store a diagnosis field into `target`
pub fn read_diagnosis(frag: &[u8], target: &mut Option<DiagnosisCode>) -> bool {
    match frag.first() {
        None | Some(b' ') => true,
        Some(_) => match DiagnosisCode::parse(frag) {
            Some(code) => {
                *target = Some(code);
                true
            }
            None => false,
        },
    }
}

/// Interpret a `1`/`2`/blank flag field
///
/// `'1'` yields `on1`, `'2'` yields `on2`, blank yields nothing.
///
/// # Errors
/// Returns [`Malformed`] for any other byte.
pub fn parse_flag<F: Copy>(c: u8, on1: Option<F>, on2: Option<F>) -> Result<Option<F>, Malformed> {
    match c {
        b'1' => Ok(on1),
        b'2' => Ok(on2),
        b' ' => Ok(None),
        _ => Err(Malformed),
    }
}

/// Decode a flag byte into `flags`, recording `malformed` on failure
pub(crate) fn read_flag(
    cur: &mut FieldCursor<'_>,
    flags: &mut StayFlags,
    errors: &mut StayErrors,
    on1: StayFlag,
    on2: Option<StayFlag>,
    malformed: StayError,
) {
    match parse_flag(cur.next_byte(), Some(on1), on2) {
        Ok(Some(flag)) => flags.insert(flag),
        Ok(None) => {}
        Err(Malformed) => errors.insert(malformed),
    }
}

fn store<T, U>(parsed: Result<Option<T>, Malformed>, target: &mut U, wrap: impl FnOnce(T) -> U) -> bool {
    match parsed {
        Ok(Some(value)) => {
            *target = wrap(value);
            true
        }
        Ok(None) => true,
        Err(Malformed) => false,
    }
}

/// Forward-only cursor over a record line
///
/// Reads past the end yield empty fragments (or spaces for single bytes),
/// so callers validate the line length up front and never panic on
/// short input. The position always advances by the requested length, even
/// past the end, so `pos()` reports where the layout says the next field is.
#[derive(Debug, Clone)]
pub struct FieldCursor<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// Cursor positioned at `pos`
    #[inline]
    #[must_use]
    pub fn new(line: &'a [u8], pos: usize) -> Self {
        Self { line, pos }
    }

    /// Current offset
    #[inline]
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Read the next `len` bytes and advance
    pub fn take(&mut self, len: usize) -> &'a [u8] {
        let frag = self.slice(self.pos, len);
        self.pos += len;
        frag
    }

    /// Advance without reading
    #[inline]
    pub fn skip(&mut self, len: usize) {
        self.pos += len;
    }

    /// Byte at the cursor, without advancing
    #[inline]
    #[must_use]
    pub fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    /// Byte `delta` bytes past the cursor, without advancing
    #[inline]
    #[must_use]
    pub fn peek_at(&self, delta: usize) -> u8 {
        self.line.get(self.pos + delta).copied().unwrap_or(b' ')
    }

    /// Read one byte and advance
    #[inline]
    pub fn next_byte(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn slice(&self, start: usize, len: usize) -> &'a [u8] {
        let end = start.saturating_add(len).min(self.line.len());
        self.line.get(start..end).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_int_blank_is_absent() {
        assert_eq!(parse_int::<i32>(b"   "), Ok(None));
        assert_eq!(parse_int::<i32>(b""), Ok(None));
    }

    #[test]
    fn parse_int_reads_leading_digits() {
        assert_eq!(parse_int::<i32>(b"0042"), Ok(Some(42)));
        assert_eq!(parse_int::<i32>(b"12  "), Ok(Some(12)));
        assert_eq!(parse_int::<i32>(b"12a "), Ok(Some(12)));
    }

    #[test]
    fn parse_int_rejects_garbage_and_overflow() {
        assert_eq!(parse_int::<i32>(b"x12"), Err(Malformed));
        assert_eq!(parse_int::<i32>(b"-12"), Err(Malformed));
        assert_eq!(parse_int::<i8>(b"999"), Err(Malformed));
    }

    #[test]
    fn parse_char_rules() {
        assert_eq!(parse_char(b' '), Ok(None));
        assert_eq!(parse_char(b'8'), Ok(Some('8')));
        assert_eq!(parse_char(b'\t'), Err(Malformed));
        assert_eq!(parse_char(0xE9), Err(Malformed));
    }

    #[test]
    fn parse_date_rules() {
        assert_eq!(parse_date(b"        "), Ok(None));
        assert_eq!(parse_date(b"01022020"), Ok(Some(PmsiDate::new(2020, 2, 1))));
        assert_eq!(parse_date(b"0102202 "), Err(Malformed));
    }

    #[test]
    fn parse_flag_rules() {
        assert_eq!(parse_flag(b'1', Some('a'), Some('b')), Ok(Some('a')));
        assert_eq!(parse_flag(b'2', Some('a'), None), Ok(None));
        assert_eq!(parse_flag(b' ', Some('a'), Some('b')), Ok(None));
        assert_eq!(parse_flag(b'3', Some('a'), Some('b')), Err(Malformed));
    }

    #[test]
    fn read_int_leaves_target_on_blank() {
        let mut value = 7i16;
        assert!(read_int(b"  ", &mut value));
        assert_eq!(value, 7);
        assert!(read_int(b"03", &mut value));
        assert_eq!(value, 3);
        assert!(!read_int(b"A3", &mut value));
        assert_eq!(value, 3);
    }

    #[test]
    fn read_diagnosis_blank_and_invalid() {
        let mut target = None;
        assert!(read_diagnosis(b"        ", &mut target));
        assert!(target.is_none());
        assert!(!read_diagnosis(b"123     ", &mut target));
        assert!(read_diagnosis(b"J189    ", &mut target));
        assert_eq!(target.unwrap().as_str(), "J189");
    }

    #[test]
    fn cursor_walks_and_clamps() {
        let mut cur = FieldCursor::new(b"abcdef", 1);
        assert_eq!(cur.take(2), b"bc");
        assert_eq!(cur.next_byte(), b'd');
        assert_eq!(cur.peek(), b'e');
        cur.skip(1);
        assert_eq!(cur.take(10), b"f");
        assert_eq!(cur.take(3), b"");
        assert_eq!(cur.next_byte(), b' ');
        assert_eq!(cur.pos(), 19);
    }

    proptest! {
        #[test]
        fn prop_readers_never_panic(frag in proptest::collection::vec(any::<u8>(), 0..16)) {
            let _ = parse_int::<i32>(&frag);
            let _ = parse_date(&frag);
            let mut cur = FieldCursor::new(&frag, 3);
            let _ = cur.take(8);
            let _ = cur.next_byte();
        }

        #[test]
        fn prop_parse_int_matches_std(value in 0u32..1_000_000) {
            let text = format!("{value:<10}");
            prop_assert_eq!(parse_int::<u32>(text.as_bytes()), Ok(Some(value)));
        }
    }
}
