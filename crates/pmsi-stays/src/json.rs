//! JSON export and import of decoded stays

use crate::stay::{Stay, StayTests};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Exported document
///
/// `tests` is omitted from the output when empty, and optional on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StayDocument {
    /// Decoded unit stays
    pub stays: Vec<Stay>,
    /// Reference grouping results keyed by bill id
    #[serde(default, skip_serializing_if = "StayTests::is_empty")]
    pub tests: StayTests,
}

#[derive(Serialize)]
struct StayDocumentRef<'a> {
    stays: &'a [Stay],
    #[serde(skip_serializing_if = "Option::is_none")]
    tests: Option<&'a StayTests>,
}

/// Write stays (and optionally tests) as a [`StayDocument`]
///
/// The writer is flushed before returning.
///
/// # Errors
/// Returns serialization or IO failures from `serde_json`.
pub fn write_json<W: Write>(
    mut writer: W,
    stays: &[Stay],
    tests: Option<&StayTests>,
    pretty: bool,
) -> Result<(), serde_json::Error> {
    let doc = StayDocumentRef { stays, tests };
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &doc)?;
    } else {
        serde_json::to_writer(&mut writer, &doc)?;
    }
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)
}

/// Read a [`StayDocument`]
///
/// # Errors
/// Returns parse or IO failures from `serde_json`.
pub fn read_json<R: Read>(reader: R) -> Result<StayDocument, serde_json::Error> {
    serde_json::from_reader(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stay::{StayError, StayTest};
    use pmsi_codes::{DiagnosisCode, GhmCode};
    use pretty_assertions::assert_eq;

    fn sample_stay() -> Stay {
        let mut stay = Stay {
            bill_id: 3,
            admin_id: 30,
            main_diagnosis: DiagnosisCode::parse(b"J189"),
            ..Stay::default()
        };
        stay.errors.insert(StayError::MalformedSex);
        stay
    }

    #[test]
    fn shape_of_output() {
        let mut buf = Vec::new();
        write_json(&mut buf, &[sample_stay()], None, false).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["stays"][0]["main_diagnosis"], "J189");
        assert_eq!(value["stays"][0]["errors"], serde_json::json!(["malformed_sex"]));
        assert!(value.get("tests").is_none());
    }

    #[test]
    fn read_back_with_tests() {
        let mut tests = StayTests::new();
        tests.insert(
            3,
            StayTest {
                bill_id: 3,
                cluster_len: 1,
                ghm: GhmCode::parse(b"04M05T"),
                ..StayTest::default()
            },
        );

        let mut buf = Vec::new();
        write_json(&mut buf, &[sample_stay()], Some(&tests), true).unwrap();
        let doc = read_json(buf.as_slice()).unwrap();

        assert_eq!(
            doc,
            StayDocument {
                stays: vec![sample_stay()],
                tests,
            }
        );
    }

    /// Buffers writes and fails on flush, like a full disk behind a `BufWriter`
    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("no space left on device"))
        }
    }

    #[test]
    fn flush_failure_is_reported() {
        let result = write_json(FailingFlush(Vec::new()), &[sample_stay()], None, false);
        assert!(result.unwrap_err().is_io());
    }

    #[test]
    fn tests_are_optional_on_input() {
        let doc = read_json(r#"{"stays": [{"bill_id": 4}]}"#.as_bytes()).unwrap();
        assert_eq!(doc.stays.len(), 1);
        assert!(doc.tests.is_empty());
    }
}
