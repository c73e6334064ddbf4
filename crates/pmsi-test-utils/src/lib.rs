//! Testing utilities for the PMSI workspace
//!
//! Builders producing well-formed fixed-width RSS, GRP, RSA and FICHCOMP
//! lines. Unset fields are left blank.

#![allow(missing_docs)]

use std::fmt::Display;

/// Fixed-width line writer
#[derive(Debug, Default)]
struct Fixed(String);

impl Fixed {
    /// Left-aligned, space-padded, truncated to `len`
    fn text(&mut self, value: &str, len: usize) -> &mut Self {
        let value: String = value.chars().take(len).collect();
        self.0.push_str(&format!("{value:<len$}"));
        self
    }

    /// Zero-padded number
    fn num(&mut self, value: impl Display, len: usize) -> &mut Self {
        self.0.push_str(&format!("{value:0>len$}"));
        self
    }

    /// Zero-padded number, or blanks
    fn opt_num<T: Display>(&mut self, value: Option<T>, len: usize) -> &mut Self {
        match value {
            Some(value) => self.num(value, len),
            None => self.blank(len),
        }
    }

    fn blank(&mut self, len: usize) -> &mut Self {
        self.text("", len)
    }

    fn ch(&mut self, c: char) -> &mut Self {
        self.0.push(c);
        self
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone)]
struct RssProcedure {
    date: String,
    code: String,
    activity: u8,
    extension: String,
}

/// RSS / GRP line builder
#[derive(Debug, Clone)]
pub struct RssLine {
    version: i16,
    grouped: Option<(String, i16)>,
    bill_id: Option<i32>,
    admin_id: Option<i32>,
    birthdate: String,
    sex: char,
    unit: Option<i16>,
    entry: (String, char, char),
    exit: (String, char, char),
    main_diagnosis: String,
    linked_diagnosis: String,
    other_diagnoses: Vec<String>,
    procedures: Vec<RssProcedure>,
    blank_counts: bool,
    confirm: char,
    conversion: char,
    raac: char,
    interv_category: char,
}

impl RssLine {
    pub fn new(version: i16) -> Self {
        Self {
            version,
            grouped: None,
            bill_id: None,
            admin_id: None,
            birthdate: String::new(),
            sex: '1',
            unit: None,
            entry: (String::new(), ' ', ' '),
            exit: (String::new(), ' ', ' '),
            main_diagnosis: String::new(),
            linked_diagnosis: String::new(),
            other_diagnoses: Vec::new(),
            procedures: Vec::new(),
            blank_counts: false,
            confirm: ' ',
            conversion: ' ',
            raac: ' ',
            interv_category: ' ',
        }
    }

    /// Turn into a GRP line carrying a reference result
    pub fn grouped(mut self, ghm: &str, error: i16) -> Self {
        self.grouped = Some((ghm.to_string(), error));
        self
    }

    pub fn bill_id(mut self, id: i32) -> Self {
        self.bill_id = Some(id);
        self
    }

    pub fn admin_id(mut self, id: i32) -> Self {
        self.admin_id = Some(id);
        self
    }

    pub fn birthdate(mut self, ddmmyyyy: &str) -> Self {
        self.birthdate = ddmmyyyy.to_string();
        self
    }

    pub fn sex(mut self, sex: char) -> Self {
        self.sex = sex;
        self
    }

    pub fn unit(mut self, unit: i16) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn entry(mut self, ddmmyyyy: &str, mode: char, origin: char) -> Self {
        self.entry = (ddmmyyyy.to_string(), mode, origin);
        self
    }

    pub fn exit(mut self, ddmmyyyy: &str, mode: char, destination: char) -> Self {
        self.exit = (ddmmyyyy.to_string(), mode, destination);
        self
    }

    pub fn main_diagnosis(mut self, code: &str) -> Self {
        self.main_diagnosis = code.to_string();
        self
    }

    pub fn linked_diagnosis(mut self, code: &str) -> Self {
        self.linked_diagnosis = code.to_string();
        self
    }

    pub fn other_diagnoses(mut self, codes: &[&str]) -> Self {
        self.other_diagnoses = codes.iter().map(ToString::to_string).collect();
        self
    }

    /// Add a procedure; `extension` is written verbatim (e.g. `-02`)
    pub fn procedure(mut self, ddmmyyyy: &str, code: &str, activity: u8, extension: &str) -> Self {
        self.procedures.push(RssProcedure {
            date: ddmmyyyy.to_string(),
            code: code.to_string(),
            activity,
            extension: extension.to_string(),
        });
        self
    }

    /// Leave the diagnosis and procedure counts blank
    pub fn blank_counts(mut self) -> Self {
        self.blank_counts = true;
        self
    }

    pub fn confirm(mut self, c: char) -> Self {
        self.confirm = c;
        self
    }

    pub fn conversion(mut self, c: char) -> Self {
        self.conversion = c;
        self
    }

    pub fn raac(mut self, c: char) -> Self {
        self.raac = c;
        self
    }

    pub fn interv_category(mut self, c: char) -> Self {
        self.interv_category = c;
        self
    }

    pub fn build(&self) -> String {
        let mut line = Fixed::default();

        match &self.grouped {
            Some((ghm, error)) => {
                line.text("  ", 2)
                    .text(ghm, 6)
                    .blank(1)
                    .num(self.version + 100, 3)
                    .num(error, 3)
                    .blank(12);
            }
            None => {
                line.text("750000001", 9).num(self.version, 3);
            }
        }

        line.opt_num(self.bill_id, 20)
            .opt_num(self.admin_id, 20)
            .blank(10)
            .text(&self.birthdate, 8)
            .ch(self.sex)
            .opt_num(self.unit, 4)
            .blank(2)
            .text(&self.entry.0, 8)
            .ch(self.entry.1)
            .ch(self.entry.2)
            .text(&self.exit.0, 8)
            .ch(self.exit.1)
            .ch(self.exit.2)
            .blank(5)
            .blank(4)
            .blank(2)
            .blank(8)
            .blank(2);

        if self.blank_counts {
            line.blank(7);
        } else {
            line.num(self.other_diagnoses.len(), 2)
                .num(0, 2)
                .num(self.procedures.len(), 3);
        }

        line.text(&self.main_diagnosis, 8)
            .text(&self.linked_diagnosis, 8)
            .blank(3)
            .ch(self.confirm)
            .blank(17);
        if self.version >= 19 {
            line.ch(self.conversion).ch(self.raac);
            if self.version >= 20 {
                line.blank(3).ch(self.interv_category).blank(9);
            } else {
                line.blank(13);
            }
        } else {
            line.blank(15);
        }

        if !self.blank_counts {
            for diag in &self.other_diagnoses {
                line.text(diag, 8);
            }
            for proc in &self.procedures {
                line.text(&proc.date, 8).text(&proc.code, 7);
                if self.version >= 17 {
                    line.text(&proc.extension, 3);
                }
                line.num(0, 1).num(proc.activity, 1).blank(1).blank(6).num(1, 2);
            }
        }

        line.0
    }
}

#[derive(Debug, Clone)]
struct RsaProcedure {
    delay: i32,
    code: String,
    activity: u8,
}

/// One unit stay block of an [`RsaLine`]
#[derive(Debug, Clone)]
pub struct RsaUnit {
    duration: i32,
    unit_type: char,
    unit: i16,
    main_diagnosis: String,
    linked_diagnosis: String,
    other_diagnoses: Vec<String>,
    procedures: Vec<RsaProcedure>,
    auth: (i32, i32),
}

impl RsaUnit {
    pub fn new(duration: i32, unit_type: char) -> Self {
        Self {
            duration,
            unit_type,
            unit: 0,
            main_diagnosis: String::new(),
            linked_diagnosis: String::new(),
            other_diagnoses: Vec::new(),
            procedures: Vec::new(),
            auth: (0, 0),
        }
    }

    /// Two-digit unit number, before the 10000 offset
    pub fn unit(mut self, unit: i16) -> Self {
        self.unit = unit;
        self
    }

    pub fn main_diagnosis(mut self, code: &str) -> Self {
        self.main_diagnosis = code.to_string();
        self
    }

    pub fn linked_diagnosis(mut self, code: &str) -> Self {
        self.linked_diagnosis = code.to_string();
        self
    }

    pub fn other_diagnoses(mut self, codes: &[&str]) -> Self {
        self.other_diagnoses = codes.iter().map(ToString::to_string).collect();
        self
    }

    /// Add a procedure performed `delay` days after the hospital entry
    pub fn procedure(mut self, delay: i32, code: &str, activity: u8) -> Self {
        self.procedures.push(RsaProcedure {
            delay,
            code: code.to_string(),
            activity,
        });
        self
    }

    pub fn auth_supplement(mut self, kind: i32, days: i32) -> Self {
        self.auth = (kind, days);
        self
    }
}

/// RSA line builder
#[derive(Debug, Clone)]
pub struct RsaLine {
    version: i16,
    bill_id: Option<i32>,
    ghm: (String, i16),
    age: (i32, i32),
    sex: char,
    entry: (char, char),
    exit: (i32, i32, char, char),
    duration: i32,
    ghs: String,
    conversion: char,
    units: Vec<RsaUnit>,
}

impl RsaLine {
    /// Offset of the 4-byte stay duration
    pub const DURATION_OFFSET: usize = 70;
    /// Offset of the 3-byte last menstrual period delay, left blank
    pub const LAST_PERIOD_OFFSET: usize = 85;

    pub fn new(version: i16) -> Self {
        Self {
            version,
            bill_id: None,
            ghm: (String::new(), 0),
            age: (0, 0),
            sex: '1',
            entry: (' ', ' '),
            exit: (0, 0, ' ', ' '),
            duration: 0,
            ghs: "0000".to_string(),
            conversion: ' ',
            units: Vec::new(),
        }
    }

    pub fn bill_id(mut self, id: i32) -> Self {
        self.bill_id = Some(id);
        self
    }

    pub fn ghm(mut self, ghm: &str, error: i16) -> Self {
        self.ghm = (ghm.to_string(), error);
        self
    }

    pub fn age(mut self, years: i32, days: i32) -> Self {
        self.age = (years, days);
        self
    }

    pub fn sex(mut self, sex: char) -> Self {
        self.sex = sex;
        self
    }

    pub fn entry(mut self, mode: char, origin: char) -> Self {
        self.entry = (mode, origin);
        self
    }

    pub fn exit(mut self, month: i32, year: i32, mode: char, destination: char) -> Self {
        self.exit = (month, year, mode, destination);
        self
    }

    /// Total hospital stay duration in days
    pub fn duration(mut self, days: i32) -> Self {
        self.duration = days;
        self
    }

    pub fn ghs(mut self, ghs: i16) -> Self {
        self.ghs = format!("{ghs:04}");
        self
    }

    /// Day-care GHS, written ` D` plus two digits
    pub fn short_ghs(mut self, number: u8) -> Self {
        self.ghs = format!(" D{number:02}");
        self
    }

    /// Conversion flag, only written from version 225
    pub fn conversion(mut self, c: char) -> Self {
        self.conversion = c;
        self
    }

    pub fn unit(mut self, unit: RsaUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn build(&self) -> String {
        let version = self.version;
        let mut line = Fixed::default();

        line.text("750000001", 9)
            .num(version, 3)
            .opt_num(self.bill_id, 10)
            .blank(19)
            .text(&self.ghm.0, 6)
            .num(self.ghm.1, 3)
            .num(self.units.len(), 2)
            .num(self.age.0, 3)
            .num(self.age.1, 3)
            .ch(self.sex)
            .ch(self.entry.0)
            .ch(self.entry.1)
            .num(self.exit.0, 2)
            .num(self.exit.1, 4)
            .ch(self.exit.2)
            .ch(self.exit.3)
            .blank(1);
        debug_assert_eq!(line.len(), Self::DURATION_OFFSET);
        line.num(self.duration, 4)
            .blank(5)
            .blank(4)
            .blank(2)
            .blank(3)
            .blank(2)
            .text(&self.ghs, 4)
            .num(0, 4)
            .blank(1)
            .num(0, 2)
            .blank(6)
            .blank(1)
            .num(0, 1);
        for _ in 0..7 {
            line.num(0, 3);
        }
        line.num(0, 1)
            .blank(if version >= 222 { 14 } else { 22 })
            .num(0, 3)
            .blank(1);
        for _ in 0..8 {
            line.num(0, 3);
        }
        line.num(0, 1);

        if version >= 225 {
            line.blank(17).num(0, 1).ch(self.conversion).ch(' ').blank(44);
        } else if version >= 223 {
            line.blank(17).num(0, 1).blank(46);
        } else if version >= 222 {
            line.blank(49);
        } else {
            line.blank(41);
        }

        for unit in &self.units {
            line.blank(14)
                .text(&unit.main_diagnosis, 6)
                .text(&unit.linked_diagnosis, 6)
                .blank(3);
            if version >= 221 {
                line.blank(2);
            }
            line.num(unit.other_diagnoses.len(), 2)
                .num(unit.procedures.len(), 3)
                .num(unit.duration, 4)
                .num(unit.unit, 2)
                .ch('A')
                .ch(unit.unit_type)
                .num(unit.auth.0, 2)
                .num(unit.auth.1, 4)
                .blank(10);
        }
        for unit in &self.units {
            for diag in &unit.other_diagnoses {
                line.text(diag, 6);
            }
        }
        for unit in &self.units {
            for proc in &unit.procedures {
                line.num(proc.delay, 3).text(&proc.code, 7);
                if version >= 222 {
                    line.blank(2);
                }
                line.num(0, 1)
                    .num(proc.activity, 1)
                    .blank(1)
                    .blank(6)
                    .num(1, 2)
                    .blank(1);
            }
        }

        line.0
    }
}

/// FICHCOMP line builder
#[derive(Debug, Clone)]
pub struct FichCompLine {
    kind: i32,
    admin_id: i32,
    ucd_start: String,
    dip: Option<(String, String, i32)>,
}

impl FichCompLine {
    /// Expensive drug record (type 6, 9 or 10)
    pub fn ucd(kind: i32, admin_id: i32, ddmmyyyy: &str) -> Self {
        Self {
            kind,
            admin_id,
            ucd_start: ddmmyyyy.to_string(),
            dip: None,
        }
    }

    /// Dialysis record (type 7)
    pub fn dip(admin_id: i32, start: &str, end: &str, count: i32) -> Self {
        Self {
            kind: 7,
            admin_id,
            ucd_start: String::new(),
            dip: Some((start.to_string(), end.to_string(), count)),
        }
    }

    /// Record of any other type, with no meaningful content
    pub fn other(kind: i32) -> Self {
        Self {
            kind,
            admin_id: 1,
            ucd_start: String::new(),
            dip: None,
        }
    }

    pub fn build(&self) -> String {
        let mut line = Fixed::default();
        line.text("750000001", 9)
            .num(self.kind, 2)
            .num(self.admin_id, 20);

        match &self.dip {
            Some((start, end, count)) => {
                line.blank(10)
                    .text(start, 8)
                    .text(end, 8)
                    .text("            DIP", 15)
                    .num(count, 10);
            }
            None => {
                line.text(&self.ucd_start, 8);
            }
        }

        let pad = 92usize.saturating_sub(line.len());
        line.blank(pad);
        line.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_fixed_part_length() {
        for version in 16..=20 {
            let line = RssLine::new(version).build();
            assert_eq!(line.len(), 12 + 165, "version {version}");
        }
        let grp = RssLine::new(18).grouped("04M05T", 0).build();
        assert_eq!(grp.len(), 27 + 165);
        assert_eq!(&grp[9..12], "118");
    }

    #[test]
    fn rsa_header_length() {
        assert_eq!(RsaLine::new(222).build().len(), 174 + 49);
        assert_eq!(RsaLine::new(220).build().len(), 182 + 41);
        assert_eq!(RsaLine::new(225).build().len(), 174 + 64);
    }

    #[test]
    fn fichcomp_length() {
        assert_eq!(FichCompLine::other(3).build().len(), 92);
        let dip = FichCompLine::dip(1, "01012020", "02012020", 2).build();
        assert_eq!(&dip[57..72], "            DIP");
        assert_eq!(&dip[72..82], "0000000002");
    }
}
