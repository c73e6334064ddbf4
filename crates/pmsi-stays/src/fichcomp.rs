//! FICHCOMP complementary records
//!
//! Only two record families matter for stays: expensive drugs (UCD), which
//! flag the stay, and peritoneal dialysis (DIP), which carries a session
//! count. Other known types are skipped.

use crate::error::{LineError, RecordKind};
use crate::fields;
use pmsi_codes::PmsiDate;
use serde::{Deserialize, Serialize};

const MIN_LINE_LEN: usize = 92;
const DIP_MARKER: &[u8] = b"            DIP";

/// Kind of complementary record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FichCompKind {
    /// Expensive drug
    Ucd,
    /// Peritoneal dialysis sessions
    Dip,
}

impl FichCompKind {
    fn label(self) -> &'static str {
        match self {
            Self::Ucd => "UCD",
            Self::Dip => "DIP",
        }
    }
}

/// Decoded complementary record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FichComp {
    /// Record family
    pub kind: FichCompKind,
    /// Administrative id of the stay it belongs to
    pub admin_id: i32,
    /// First day covered
    pub start_date: PmsiDate,
    /// Last day covered, DIP only
    pub end_date: Option<PmsiDate>,
    /// Session count, DIP only
    pub count: i32,
}

/// Decode one FICHCOMP line
///
/// Returns `Ok(None)` for record types that carry nothing stay-related.
///
/// # Errors
/// - [`LineError::Truncated`] for lines under 92 bytes
/// - [`LineError::MalformedFichComp`] for UCD/DIP lines with bad content
/// - [`LineError::UnknownFichCompType`] for unknown types
pub fn parse_fichcomp_line(line: &[u8]) -> Result<Option<FichComp>, LineError> {
    if line.len() < MIN_LINE_LEN {
        return Err(LineError::Truncated(RecordKind::FichComp));
    }

    let mut kind: i32 = 0;
    fields::read_int(&line[9..11], &mut kind);

    match kind {
        6 | 9 | 10 => parse_ucd(line).map(Some),
        7 => parse_dip(line).map(Some),
        2 | 3 | 4 | 99 => Ok(None),
        other => Err(LineError::UnknownFichCompType(other)),
    }
}

fn parse_ucd(line: &[u8]) -> Result<FichComp, LineError> {
    let malformed = || LineError::MalformedFichComp {
        kind: FichCompKind::Ucd.label(),
    };

    let admin_id = read_admin_id(line).ok_or_else(malformed)?;
    let start_date = read_required_date(&line[31..39]).ok_or_else(malformed)?;

    Ok(FichComp {
        kind: FichCompKind::Ucd,
        admin_id,
        start_date,
        end_date: None,
        count: 0,
    })
}

fn parse_dip(line: &[u8]) -> Result<FichComp, LineError> {
    let malformed = || LineError::MalformedFichComp {
        kind: FichCompKind::Dip.label(),
    };

    let admin_id = read_admin_id(line).ok_or_else(malformed)?;
    let start_date = read_required_date(&line[41..49]).ok_or_else(malformed)?;
    let end_date = read_required_date(&line[49..57]).ok_or_else(malformed)?;
    if &line[57..72] != DIP_MARKER {
        return Err(malformed());
    }
    let count = match fields::parse_int::<i32>(&line[72..82]) {
        Ok(Some(count)) if count != 0 => count,
        _ => return Err(malformed()),
    };

    Ok(FichComp {
        kind: FichCompKind::Dip,
        admin_id,
        start_date,
        end_date: Some(end_date),
        count,
    })
}

fn read_admin_id(line: &[u8]) -> Option<i32> {
    match fields::parse_int::<i32>(&line[11..31]) {
        Ok(Some(id)) if id != 0 => Some(id),
        _ => None,
    }
}

/// Date that must be present and non-zero
fn read_required_date(frag: &[u8]) -> Option<PmsiDate> {
    fields::parse_date(frag)
        .ok()
        .flatten()
        .filter(|date| *date != PmsiDate::default())
}
