//! Stay pack container
//!
//! Layout:
//!
//! | bytes | content                         |
//! |-------|---------------------------------|
//! | 13    | signature `MCO_STAY_PACK`       |
//! | 1     | pack version                    |
//! | 32    | blake3 digest of the payload    |
//! | 8     | payload length, little endian   |
//! | n     | payload: JSON array of stays    |
//!
//! Packs hold decoded stays only, never reference results.

use crate::error::PackError;
use crate::format::{Compression, SourceFormat};
use crate::stay::Stay;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Leading bytes of every pack
pub const PACK_SIGNATURE: &[u8; 13] = b"MCO_STAY_PACK";

/// Version written by this build
pub const PACK_VERSION: u8 = 1;

const DIGEST_LEN: usize = 32;

/// Serialize `stays` as a pack
///
/// # Errors
/// Returns [`PackError`] on IO or serialization failure.
pub fn write_pack<W: Write>(mut writer: W, stays: &[Stay]) -> Result<(), PackError> {
    let payload = serde_json::to_vec(stays)?;
    let digest = blake3::hash(&payload);

    writer.write_all(PACK_SIGNATURE)?;
    writer.write_all(&[PACK_VERSION])?;
    writer.write_all(digest.as_bytes())?;
    writer.write_all(&(payload.len() as u64).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read a pack produced by [`write_pack`]
///
/// # Errors
/// Checks, in order: signature, version, payload length, digest.
pub fn read_pack<R: Read>(mut reader: R) -> Result<Vec<Stay>, PackError> {
    let mut signature = [0u8; PACK_SIGNATURE.len()];
    read_header_part(&mut reader, &mut signature)?;
    if &signature != PACK_SIGNATURE {
        return Err(PackError::BadSignature);
    }

    let mut version = [0u8; 1];
    read_header_part(&mut reader, &mut version)?;
    if version[0] != PACK_VERSION {
        return Err(PackError::UnsupportedVersion {
            found: version[0],
            expected: PACK_VERSION,
        });
    }

    let mut expected = [0u8; DIGEST_LEN];
    read_header_part(&mut reader, &mut expected)?;
    let mut len = [0u8; 8];
    read_header_part(&mut reader, &mut len)?;
    let len = u64::from_le_bytes(len);

    let mut payload = Vec::new();
    reader.take(len).read_to_end(&mut payload)?;
    if payload.len() as u64 != len {
        return Err(PackError::Corrupt(format!(
            "payload is {} bytes, header says {len}",
            payload.len()
        )));
    }

    let actual = blake3::hash(&payload);
    if actual.as_bytes() != &expected {
        return Err(PackError::Corrupt(format!(
            "digest mismatch: expected {}, found {}",
            hex::encode(expected),
            actual.to_hex()
        )));
    }

    Ok(serde_json::from_slice(&payload)?)
}

/// Open and read a pack file, gzip-compressed or not
///
/// # Errors
/// See [`read_pack`].
pub fn load_pack_file(path: &Path) -> Result<Vec<Stay>, PackError> {
    let file = BufReader::new(File::open(path)?);
    match SourceFormat::from_path(path) {
        Ok((_, Compression::Gzip)) => read_pack(GzDecoder::new(file)),
        _ => read_pack(file),
    }
}

/// Write `stays` to a pack file
///
/// A `.gz` suffix compresses the pack. Other extensions than `.dmpak` are
/// accepted with a warning.
///
/// # Errors
/// Returns [`PackError`] on IO or serialization failure.
pub fn save_pack(path: &Path, stays: &[Stay]) -> Result<(), PackError> {
    let compression = match SourceFormat::from_path(path) {
        Ok((SourceFormat::Pack, compression)) => compression,
        Ok((_, compression)) => {
            tracing::warn!(path = %path.display(), "pack written with a non-.dmpak extension");
            compression
        }
        Err(_) => {
            tracing::warn!(path = %path.display(), "pack written with a non-.dmpak extension");
            Compression::None
        }
    };

    let file = BufWriter::new(File::create(path)?);
    match compression {
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(file, flate2::Compression::default());
            write_pack(&mut encoder, stays)?;
            encoder.finish()?.flush()?;
        }
        Compression::None => write_pack(file, stays)?,
    }

    tracing::debug!(path = %path.display(), stays = stays.len(), "pack saved");
    Ok(())
}

fn read_header_part<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), PackError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => PackError::Corrupt("truncated header".to_string()),
        _ => PackError::Io(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmsi_codes::PmsiDate;

    fn sample() -> Vec<Stay> {
        vec![
            Stay {
                bill_id: 1,
                admin_id: 10,
                birthdate: Some(PmsiDate::new(1990, 5, 4)),
                ..Stay::default()
            },
            Stay {
                bill_id: 2,
                admin_id: 20,
                ..Stay::default()
            },
        ]
    }

    fn packed() -> Vec<u8> {
        let mut buf = Vec::new();
        write_pack(&mut buf, &sample()).unwrap();
        buf
    }

    #[test]
    fn read_back() {
        let stays = read_pack(packed().as_slice()).unwrap();
        assert_eq!(stays, sample());
    }

    #[test]
    fn bad_signature() {
        let mut buf = packed();
        buf[0] = b'X';
        assert!(matches!(read_pack(buf.as_slice()), Err(PackError::BadSignature)));
    }

    #[test]
    fn bad_version() {
        let mut buf = packed();
        buf[PACK_SIGNATURE.len()] = 7;
        assert!(matches!(
            read_pack(buf.as_slice()),
            Err(PackError::UnsupportedVersion { found: 7, expected: PACK_VERSION })
        ));
    }

    #[test]
    fn truncated_payload() {
        let buf = packed();
        let result = read_pack(&buf[..buf.len() - 5]);
        assert!(matches!(result, Err(PackError::Corrupt(_))));

        let result = read_pack(&buf[..20]);
        assert!(matches!(result, Err(PackError::Corrupt(_))));
    }

    #[test]
    fn flipped_payload_byte() {
        let mut buf = packed();
        let last = buf.len() - 2;
        buf[last] ^= 0x20;
        match read_pack(buf.as_slice()) {
            Err(PackError::Corrupt(msg)) => assert!(msg.contains("digest mismatch")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extreme_derived_dates_read_back() {
        use crate::rsa::parse_rsa_line;
        use pmsi_test_utils::{RsaLine, RsaUnit};

        let early = RsaLine::new(222)
            .bill_id(1)
            .age(40, 0)
            .exit(12, 1, '8', ' ')
            .duration(999)
            .unit(RsaUnit::new(999, 'C').main_diagnosis("I10"))
            .build();
        let late = RsaLine::new(222)
            .bill_id(2)
            .age(40, 0)
            .exit(12, 9999, '8', ' ')
            .duration(0)
            .unit(RsaUnit::new(0, 'C').main_diagnosis("I10").procedure(999, "DEQP003", 1))
            .build();

        let mut stays = Vec::new();
        parse_rsa_line(early.as_bytes(), &mut stays, None).unwrap();
        parse_rsa_line(late.as_bytes(), &mut stays, None).unwrap();
        assert_eq!(stays[0].birthdate, Some(PmsiDate::new(-41, 1, 1)));
        assert_eq!(stays[1].procedures[0].date, Some(PmsiDate::new(10002, 8, 26)));

        let mut buf = Vec::new();
        write_pack(&mut buf, &stays).unwrap();
        assert_eq!(read_pack(buf.as_slice()).unwrap(), stays);
    }

    #[test]
    fn save_and_load_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["stays.dmpak", "stays.dmpak.gz", "stays.bin"] {
            let path = dir.path().join(name);
            save_pack(&path, &sample()).unwrap();
            assert_eq!(load_pack_file(&path).unwrap(), sample(), "{name}");
        }
    }
}
