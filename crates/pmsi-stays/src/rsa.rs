//! RSA line decoder
//!
//! An RSA line is an anonymised hospital stay: a header shared by every
//! unit stay, one fixed block per unit stay, then the diagnoses and
//! procedures of all unit stays. Dates are rebuilt from the exit month
//! and per-stay durations, so they are approximate.

use crate::error::{LineError, RecordKind};
use crate::fields::{self, read_flag, FieldCursor};
use crate::stay::{
    AuthSupplement, ProcedureRealisation, Stay, StayError, StayFlag, StayTest, StayTests,
    MAX_AUTH_SUPPLEMENTS,
};
use pmsi_codes::{DiagnosisCode, GhmCode, GhsCode, PmsiDate, ProcedureCode, SupplementType};

const VERSION_OFFSET: usize = 9;
const DIAGNOSIS_LEN: usize = 6;

/// Supported RSA format versions
pub const RSA_VERSIONS: std::ops::RangeInclusive<i16> = 220..=225;

/// Unit stay counts read from a fixed block
#[derive(Debug, Clone, Copy, Default)]
struct BlockCounts {
    diagnoses: usize,
    procedures: usize,
}

/// Decode one RSA line and append its unit stays to `out`
///
/// Nothing is appended when the line is truncated. The reference grouping
/// result replaces any previous entry for the same bill id in `tests`.
///
/// # Errors
/// Returns [`LineError::Truncated`] when the line is shorter than its layout.
pub fn parse_rsa_line(
    line: &[u8],
    out: &mut Vec<Stay>,
    tests: Option<&mut StayTests>,
) -> Result<(), LineError> {
    if line.len() < 12 {
        return Err(LineError::Truncated(RecordKind::Rsa));
    }

    let mut rsa = Stay::default();
    let mut test = StayTest::default();
    let mut cur = FieldCursor::new(line, VERSION_OFFSET);

    let mut version: i16 = 0;
    fields::read_int(cur.take(3), &mut version);
    if !RSA_VERSIONS.contains(&version) {
        rsa.errors.insert(StayError::UnknownRumVersion);
        out.push(rsa);
        return Ok(());
    }
    if line.len() < if version >= 222 { 174 } else { 182 } {
        return Err(LineError::Truncated(RecordKind::Rsa));
    }

    let entry_date = read_header(&mut cur, version, &mut rsa, &mut test);

    let block_len = if version >= 221 { 60 } else { 58 };
    let cluster_len = usize::try_from(test.cluster_len).unwrap_or(0);
    if line.len() < cur.pos() + cluster_len * block_len {
        return Err(LineError::Truncated(RecordKind::Rsa));
    }

    let mut stays: Vec<Stay> = Vec::with_capacity(cluster_len);
    let mut counts: Vec<BlockCounts> = Vec::with_capacity(cluster_len);
    for i in 0..cluster_len {
        let mut stay = rsa.clone();
        if let Some(prev) = stays.last() {
            stay.entry.date = prev.exit.date;
            stay.entry.mode = Some('6');
            stay.entry.origin = Some('1');
        }
        counts.push(read_unit_block(&mut cur, version, i, cluster_len, &mut stay, &mut test));
        stays.push(stay);
    }

    let procedure_len = if version >= 222 { 24 } else { 22 };
    let needed: usize = counts
        .iter()
        .map(|c| c.diagnoses * DIAGNOSIS_LEN + c.procedures * procedure_len)
        .sum();
    if line.len() < cur.pos() + needed {
        return Err(LineError::Truncated(RecordKind::Rsa));
    }

    for (stay, count) in stays.iter_mut().zip(&counts) {
        for _ in 0..count.diagnoses {
            match DiagnosisCode::parse(cur.take(DIAGNOSIS_LEN)) {
                Some(diag) => stay.other_diagnoses.push(diag),
                None => stay.errors.insert(StayError::MalformedOtherDiagnosis),
            }
        }
    }
    for (stay, count) in stays.iter_mut().zip(&counts) {
        for _ in 0..count.procedures {
            read_procedure(&mut cur, version, entry_date, stay);
        }
    }

    out.extend(stays);
    if let Some(tests) = tests {
        tests.insert(test.bill_id, test);
    }
    Ok(())
}

fn read_header(
    cur: &mut FieldCursor<'_>,
    version: i16,
    rsa: &mut Stay,
    test: &mut StayTest,
) -> Option<PmsiDate> {
    let errors = &mut rsa.errors;

    errors.flag_unless(fields::read_int(cur.take(10), &mut rsa.bill_id), StayError::MalformedBillId);
    rsa.admin_id = rsa.bill_id;
    test.bill_id = rsa.bill_id;
    cur.skip(19); // version details, first GHM
    test.ghm = GhmCode::parse(cur.take(6));
    fields::read_int(cur.take(3), &mut test.error);
    fields::read_int(cur.take(2), &mut test.cluster_len);

    let mut age: i16 = 0;
    let mut age_days: i32 = 0;
    errors.flag_unless(fields::read_int(cur.take(3), &mut age), StayError::MalformedBirthdate);
    errors.flag_unless(fields::read_int(cur.take(3), &mut age_days), StayError::MalformedBirthdate);
    errors.flag_unless(fields::read_int(cur.take(1), &mut rsa.sex), StayError::MalformedSex);
    errors.flag_unless(fields::read_char(cur.next_byte(), &mut rsa.entry.mode), StayError::MalformedEntryMode);
    errors.flag_unless(fields::read_char(cur.next_byte(), &mut rsa.entry.origin), StayError::MalformedEntryOrigin);

    let mut month: i8 = 0;
    let mut year: i16 = 0;
    let exit_valid = fields::read_int(cur.take(2), &mut month) & fields::read_int(cur.take(4), &mut year);
    if exit_valid {
        rsa.exit.date = Some(PmsiDate::new(year, month, 1));
    } else {
        errors.insert(StayError::MalformedExitDate);
    }
    errors.flag_unless(fields::read_char(cur.next_byte(), &mut rsa.exit.mode), StayError::MalformedExitMode);
    errors.flag_unless(
        fields::read_char(cur.next_byte(), &mut rsa.exit.destination),
        StayError::MalformedExitDestination,
    );
    cur.skip(1); // stay type

    let mut duration: i32 = 0;
    let duration_valid = fields::read_int(cur.take(4), &mut duration);
    let entry_date = rsa
        .exit
        .date
        .filter(|date| duration_valid && date.is_valid())
        .and_then(|date| date.sub_days(duration));
    match entry_date {
        Some(entry_date) => {
            rsa.entry.date = Some(entry_date);
            rsa.birthdate = if age != 0 {
                Some(PmsiDate::new(entry_date.year - age, 1, 1))
            } else {
                entry_date.sub_days(age_days)
            };
        }
        None => errors.insert(StayError::MalformedEntryDate),
    }

    cur.skip(5); // geography code
    errors.flag_unless(fields::read_int(cur.take(4), &mut rsa.newborn_weight), StayError::MalformedNewbornWeight);
    errors.flag_unless(fields::read_int(cur.take(2), &mut rsa.gestational_age), StayError::MalformedGestationalAge);
    let delay_frag = cur.take(3);
    if delay_frag.first() != Some(&b' ') {
        let last_period = match (fields::parse_int::<i32>(delay_frag), entry_date) {
            (Ok(Some(delay)), Some(entry_date)) => entry_date.sub_days(delay),
            _ => None,
        };
        match last_period {
            Some(date) => rsa.last_menstrual_period = Some(date),
            None => errors.insert(StayError::MalformedLastMenstrualPeriod),
        }
    }
    errors.flag_unless(fields::read_int(cur.take(2), &mut rsa.session_count), StayError::MalformedSessionCount);

    let mut ghs: i16 = 0;
    if cur.peek() == b' ' && cur.peek_at(1) == b'D' {
        cur.skip(2);
        fields::read_int(cur.take(2), &mut ghs);
        ghs += 20000;
    } else {
        fields::read_int(cur.take(4), &mut ghs);
    }
    test.ghs = GhsCode(ghs);

    let mut exh: i32 = 0;
    let mut exb: i32 = 0;
    fields::read_int(cur.take(4), &mut exh);
    cur.skip(1);
    fields::read_int(cur.take(2), &mut exb);
    test.exb_exh = exh - exb;
    cur.skip(6); // dialysis, UHCD

    match cur.next_byte() {
        b'1' => rsa.flags.insert(StayFlag::Confirmed),
        b' ' => {}
        _ => errors.insert(StayError::MalformedConfirmation),
    }

    let mut global_auth_count: usize = 0;
    fields::read_int(cur.take(1), &mut global_auth_count);
    let days = &mut test.supplement_days;
    for kind in [
        SupplementType::Dia,
        SupplementType::Ent1,
        SupplementType::Ent2,
        SupplementType::Ent3,
        SupplementType::Aph,
        SupplementType::Rap,
        SupplementType::Ant,
    ] {
        fields::read_int(cur.take(3), &mut days[kind]);
    }
    let mut radiotherapy_count: usize = 0;
    fields::read_int(cur.take(1), &mut radiotherapy_count);
    cur.skip(if version >= 222 { 14 } else { 22 });
    fields::read_int(cur.take(3), &mut days[SupplementType::Ohb]);
    cur.skip(1); // prestation type
    fields::read_int(cur.take(3), &mut days[SupplementType::Rea]);
    fields::read_int(cur.take(3), &mut days[SupplementType::Reasi]);
    let mut stf: i16 = 0;
    fields::read_int(cur.take(3), &mut stf);
    days[SupplementType::Si] = stf - days[SupplementType::Reasi];
    for kind in [
        SupplementType::Src,
        SupplementType::Nn1,
        SupplementType::Nn2,
        SupplementType::Nn3,
        SupplementType::Rep,
    ] {
        fields::read_int(cur.take(3), &mut days[kind]);
    }
    if cur.next_byte() > b'0' {
        rsa.bed_authorization = 8;
    }

    if version >= 225 {
        cur.skip(17);
        fields::read_int(cur.take(1), &mut days[SupplementType::Sdc]);
        read_flag(
            cur,
            &mut rsa.flags,
            errors,
            StayFlag::Conversion,
            Some(StayFlag::NoConversion),
            StayError::MalformedConversion,
        );
        match cur.next_byte() {
            b'1' => rsa.flags.insert(StayFlag::Raac),
            b'2' | b'0' | b' ' => {}
            _ => errors.insert(StayError::MalformedRaac),
        }
        cur.skip(44);
    } else if version >= 223 {
        cur.skip(17);
        fields::read_int(cur.take(1), &mut days[SupplementType::Sdc]);
        cur.skip(46);
    } else if version >= 222 {
        cur.skip(49);
    } else {
        cur.skip(41);
    }
    cur.skip(2 * global_auth_count + 7 * radiotherapy_count);

    entry_date
}

fn read_unit_block(
    cur: &mut FieldCursor<'_>,
    version: i16,
    index: usize,
    cluster_len: usize,
    stay: &mut Stay,
    test: &mut StayTest,
) -> BlockCounts {
    let errors = &mut stay.errors;
    let mut counts = BlockCounts::default();

    cur.skip(14);
    errors.flag_unless(
        fields::read_diagnosis(cur.take(DIAGNOSIS_LEN), &mut stay.main_diagnosis),
        StayError::MalformedMainDiagnosis,
    );
    errors.flag_unless(
        fields::read_diagnosis(cur.take(DIAGNOSIS_LEN), &mut stay.linked_diagnosis),
        StayError::MalformedLinkedDiagnosis,
    );
    fields::read_int(cur.take(3), &mut stay.igs2);
    if version >= 221 {
        fields::read_int(cur.take(2), &mut stay.gestational_age);
    }
    fields::read_int(cur.take(2), &mut counts.diagnoses);
    fields::read_int(cur.take(3), &mut counts.procedures);

    let mut duration: i32 = 0;
    if fields::read_int(cur.take(4), &mut duration) {
        stay.exit.date = stay.entry.date.and_then(|date| date.add_days(duration));
    } else {
        errors.insert(StayError::MalformedExitDate);
    }
    if index + 1 < cluster_len {
        stay.exit.mode = Some('6');
        stay.exit.destination = Some('1');
    }

    let mut unit: i16 = 0;
    fields::read_int(cur.take(2), &mut unit);
    stay.unit = unit + 10000;
    cur.skip(1); // end of unit type
    match cur.next_byte() {
        b'P' => {
            stay.unit += 1000;
            stay.flags.remove(StayFlag::Conversion);
        }
        b'M' => stay.unit += 2000,
        _ => {}
    }

    if index < MAX_AUTH_SUPPLEMENTS {
        let mut kind: i32 = 0;
        let mut days: i16 = 0;
        fields::read_int(cur.take(2), &mut kind);
        fields::read_int(cur.take(4), &mut days);
        test.auth_supplements
            .push(auth_supplement_kind(kind, days, stay.unit).map(|kind| AuthSupplement { kind, days }));
        cur.skip(10);
    } else {
        cur.skip(16);
    }

    counts
}

fn auth_supplement_kind(kind: i32, days: i16, unit: i16) -> Option<SupplementType> {
    if days == 0 {
        return None;
    }
    match kind {
        0 => None,
        1 => Some(SupplementType::Rea),
        2 if matches!(unit, 10002 | 10016 | 10018) => Some(SupplementType::Si),
        2 => Some(SupplementType::Reasi),
        3 => Some(SupplementType::Src),
        4 => Some(SupplementType::Nn1),
        5 => Some(SupplementType::Nn2),
        6 => Some(SupplementType::Nn3),
        13 => Some(SupplementType::Rep),
        other => {
            tracing::warn!(kind = other, "unrecognized authorization supplement type");
            None
        }
    }
}

fn read_procedure(
    cur: &mut FieldCursor<'_>,
    version: i16,
    entry_date: Option<PmsiDate>,
    stay: &mut Stay,
) {
    let mut date = None;
    if let Ok(Some(delay)) = fields::parse_int::<i32>(cur.take(3)) {
        date = entry_date.and_then(|entry| entry.add_days(delay));
    }
    let code = ProcedureCode::parse(cur.take(7));

    let mut extension = 0;
    if version >= 222 {
        stay.errors.flag_unless(
            fields::read_int(cur.take(2), &mut extension),
            StayError::MalformedProcedureExtension,
        );
    }
    let mut phase = 0;
    let mut activity = 0;
    fields::read_int(cur.take(1), &mut phase);
    fields::read_int(cur.take(1), &mut activity);
    let mut doc = None;
    fields::read_char(cur.next_byte(), &mut doc);
    cur.skip(6); // modifiers, doc extension
    let mut count = 0;
    fields::read_int(cur.take(2), &mut count);
    cur.skip(1); // date compatibility flag

    match code {
        Some(code) => stay.procedures.push(ProcedureRealisation {
            code,
            date,
            extension,
            phase,
            activity,
            doc,
            count,
        }),
        None => stay.errors.insert(StayError::MalformedProcedureCode),
    }
}
