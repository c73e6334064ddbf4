//! RSS / GRP line decoder
//!
//! One line per unit stay. GRP lines are RSS lines prefixed with the
//! reference grouping result; they announce themselves with a version
//! number above 100.

use crate::error::{LineError, RecordKind};
use crate::fields::{self, read_flag, FieldCursor};
use crate::stay::{
    ProcedureRealisation, Stay, StayError, StayErrors, StayFlag, StayTest, StayTests,
};
use pmsi_codes::{DiagnosisCode, GhmCode, ProcedureCode};

const VERSION_OFFSET: usize = 9;
const GRP_PREFIX_LEN: usize = 15;
const FIXED_PART_LEN: usize = 165;
const DIAGNOSIS_LEN: usize = 8;

/// Supported RUM format versions
pub const RUM_VERSIONS: std::ops::RangeInclusive<i16> = 16..=20;

/// Decode one RSS or GRP line and append the stay to `out`
///
/// Lines with an unsupported version still produce a stay, flagged with
/// [`StayError::UnknownRumVersion`]. GRP reference results are merged into
/// `tests` when given.
///
/// # Errors
/// Returns [`LineError::Truncated`] when the line is shorter than its layout.
pub fn parse_rss_line(
    line: &[u8],
    out: &mut Vec<Stay>,
    tests: Option<&mut StayTests>,
) -> Result<(), LineError> {
    if line.len() < 12 {
        return Err(LineError::Truncated(RecordKind::Rum));
    }

    let mut stay = Stay::default();
    let mut cur = FieldCursor::new(line, VERSION_OFFSET);

    let mut version: i16 = 0;
    fields::read_int(cur.take(3), &mut version);
    let grouped = version > 100;
    if grouped {
        version -= 100;
        cur.skip(GRP_PREFIX_LEN);
    }
    if !RUM_VERSIONS.contains(&version) {
        stay.errors.insert(StayError::UnknownRumVersion);
        out.push(stay);
        return Ok(());
    }
    if line.len() < cur.pos() + FIXED_PART_LEN {
        return Err(LineError::Truncated(RecordKind::Rum));
    }

    let errors = &mut stay.errors;
    errors.flag_unless(fields::read_int(cur.take(20), &mut stay.bill_id), StayError::MalformedBillId);
    fields::read_int(cur.take(20), &mut stay.admin_id);
    cur.skip(10); // RUM id
    errors.flag_unless(fields::read_date(cur.take(8), &mut stay.birthdate), StayError::MalformedBirthdate);
    errors.flag_unless(fields::read_int(cur.take(1), &mut stay.sex), StayError::MalformedSex);
    fields::read_int(cur.take(4), &mut stay.unit);
    fields::read_int(cur.take(2), &mut stay.bed_authorization);
    errors.flag_unless(fields::read_date(cur.take(8), &mut stay.entry.date), StayError::MalformedEntryDate);
    errors.flag_unless(fields::read_char(cur.next_byte(), &mut stay.entry.mode), StayError::MalformedEntryMode);
    errors.flag_unless(fields::read_char(cur.next_byte(), &mut stay.entry.origin), StayError::MalformedEntryOrigin);
    errors.flag_unless(fields::read_date(cur.take(8), &mut stay.exit.date), StayError::MalformedExitDate);
    errors.flag_unless(fields::read_char(cur.next_byte(), &mut stay.exit.mode), StayError::MalformedExitMode);
    errors.flag_unless(
        fields::read_char(cur.next_byte(), &mut stay.exit.destination),
        StayError::MalformedExitDestination,
    );
    cur.skip(5); // postal code
    errors.flag_unless(fields::read_int(cur.take(4), &mut stay.newborn_weight), StayError::MalformedNewbornWeight);
    errors.flag_unless(fields::read_int(cur.take(2), &mut stay.gestational_age), StayError::MalformedGestationalAge);
    errors.flag_unless(
        fields::read_date(cur.take(8), &mut stay.last_menstrual_period),
        StayError::MalformedLastMenstrualPeriod,
    );
    errors.flag_unless(fields::read_int(cur.take(2), &mut stay.session_count), StayError::MalformedSessionCount);

    let das_count = read_count(
        cur.take(2),
        errors,
        StayError::MissingOtherDiagnosesCount,
        StayError::MalformedOtherDiagnosesCount,
    );
    let dad_count = read_count(
        cur.take(2),
        errors,
        StayError::MissingOtherDiagnosesCount,
        StayError::MalformedOtherDiagnosesCount,
    );
    let procedures_count = read_count(
        cur.take(3),
        errors,
        StayError::MissingProceduresCount,
        StayError::MalformedProceduresCount,
    );

    errors.flag_unless(
        fields::read_diagnosis(cur.take(DIAGNOSIS_LEN), &mut stay.main_diagnosis),
        StayError::MalformedMainDiagnosis,
    );
    errors.flag_unless(
        fields::read_diagnosis(cur.take(DIAGNOSIS_LEN), &mut stay.linked_diagnosis),
        StayError::MalformedLinkedDiagnosis,
    );
    errors.flag_unless(fields::read_int(cur.take(3), &mut stay.igs2), StayError::MalformedIgs2);

    let flags = &mut stay.flags;
    read_flag(&mut cur, flags, errors, StayFlag::Confirmed, None, StayError::MalformedConfirmation);
    cur.skip(17);
    if version >= 19 {
        read_flag(
            &mut cur,
            flags,
            errors,
            StayFlag::Conversion,
            Some(StayFlag::NoConversion),
            StayError::MalformedConversion,
        );
        read_flag(&mut cur, flags, errors, StayFlag::Raac, None, StayError::MalformedRaac);

        if version >= 20 {
            read_flag(&mut cur, flags, errors, StayFlag::Context, None, StayError::MalformedContext);
            read_flag(&mut cur, flags, errors, StayFlag::HospitalUse, None, StayError::MalformedHospitalUse);
            read_flag(&mut cur, flags, errors, StayFlag::Rescript, None, StayError::MalformedRescript);
            fields::read_char(cur.next_byte(), &mut stay.interv_category);
            cur.skip(9);
        } else {
            cur.skip(13);
        }
    } else {
        cur.skip(15);
    }

    if let (Some(das_count), Some(dad_count), Some(procedures_count)) =
        (das_count, dad_count, procedures_count)
    {
        let procedure_len = if version >= 17 { 29 } else { 26 };
        let needed = DIAGNOSIS_LEN * (das_count + dad_count) + procedure_len * procedures_count;
        if line.len() < cur.pos() + needed {
            return Err(LineError::Truncated(RecordKind::Rum));
        }

        for _ in 0..das_count {
            match DiagnosisCode::parse(cur.take(DIAGNOSIS_LEN)) {
                Some(diag) => stay.other_diagnoses.push(diag),
                None => stay.errors.insert(StayError::MalformedOtherDiagnosis),
            }
        }
        cur.skip(DIAGNOSIS_LEN * dad_count); // documentary diagnoses

        for _ in 0..procedures_count {
            if let Some(proc) = read_procedure(&mut cur, version, &mut stay.errors) {
                stay.procedures.push(proc);
            } else {
                stay.errors.insert(StayError::MalformedProcedureCode);
            }
        }
    }

    if grouped {
        if let Some(tests) = tests {
            record_grp_test(line, stay.bill_id, tests);
        }
    }

    out.push(stay);
    Ok(())
}

fn read_count(
    frag: &[u8],
    errors: &mut StayErrors,
    missing: StayError,
    malformed: StayError,
) -> Option<usize> {
    match fields::parse_int::<usize>(frag) {
        Ok(Some(count)) => Some(count),
        Ok(None) => {
            errors.insert(missing);
            None
        }
        Err(_) => {
            errors.insert(malformed);
            None
        }
    }
}

fn read_procedure(
    cur: &mut FieldCursor<'_>,
    version: i16,
    errors: &mut StayErrors,
) -> Option<ProcedureRealisation> {
    let mut date = None;
    fields::read_date(cur.take(8), &mut date);
    let code = ProcedureCode::parse(cur.take(7));

    let mut extension = 0;
    if version >= 17 {
        let frag = cur.take(3);
        let valid = match frag.first() {
            None | Some(b' ') => true,
            Some(b'-') => fields::read_int(&frag[1..], &mut extension),
            Some(_) => false,
        };
        errors.flag_unless(valid, StayError::MalformedProcedureExtension);
    }

    let mut phase = 0;
    let mut activity = 0;
    fields::read_int(cur.take(1), &mut phase);
    fields::read_int(cur.take(1), &mut activity);
    let doc = match cur.next_byte() {
        b' ' => None,
        c => Some(char::from(c.to_ascii_uppercase())),
    };
    cur.skip(6); // modifiers, doc extension
    let mut count = 0;
    fields::read_int(cur.take(2), &mut count);

    code.map(|code| ProcedureRealisation {
        code,
        date,
        extension,
        phase,
        activity,
        doc,
        count,
    })
}

fn record_grp_test(line: &[u8], bill_id: i32, tests: &mut StayTests) {
    let ghm = GhmCode::parse(&line[2..8]);
    let mut error = 0;
    let error_valid = fields::read_int(&line[12..15], &mut error);

    match ghm {
        Some(ghm) if error_valid => {
            let test = tests.entry(bill_id).or_insert_with(|| StayTest {
                bill_id,
                ghm: Some(ghm),
                error,
                ..StayTest::default()
            });
            test.cluster_len += 1;
        }
        _ => {
            if let Some(test) = tests.get_mut(&bill_id) {
                test.cluster_len += 1;
            }
        }
    }
}
