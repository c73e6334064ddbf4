//! Stay set builder
//!
//! Accumulates stays from any number of files, then attaches FICHCOMP data
//! in [`StaySetBuilder::finish`]. A file either contributes its stays or,
//! when nothing in it could be decoded, leaves the builder untouched.

use crate::error::{LineError, LoadError};
use crate::fichcomp::{parse_fichcomp_line, FichComp, FichCompKind};
use crate::format::{Compression, SourceFormat};
use crate::json::read_json;
use crate::pack::read_pack;
use crate::rsa::parse_rsa_line;
use crate::rss::parse_rss_line;
use crate::set::{cluster_ranges, StaySet};
use crate::stay::{Stay, StayFlag, StayTests};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Once;

type LineParser = fn(&[u8], &mut Vec<Stay>, Option<&mut StayTests>) -> Result<(), LineError>;

static RSA_WARNING: Once = Once::new();

/// What one file contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStats {
    /// Stays added
    pub stays: usize,
    /// Lines that could not be decoded
    pub line_errors: usize,
}

/// Outcome of [`StaySetBuilder::load_files`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Files loaded successfully
    pub files_loaded: usize,
    /// Files that could not be loaded
    pub failed: Vec<PathBuf>,
    /// Stays added across all files
    pub stays: usize,
    /// Line errors across all loaded files
    pub line_errors: usize,
}

impl LoadSummary {
    /// True when every file loaded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Incremental stay set construction
#[derive(Debug, Default)]
pub struct StaySetBuilder {
    set: StaySet,
    fichcomps: Vec<FichComp>,
}

impl StaySetBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stays accumulated so far
    #[must_use]
    pub fn stays(&self) -> &[Stay] {
        &self.set.stays
    }

    /// FICHCOMP entries waiting for [`Self::finish`]
    #[must_use]
    pub fn fichcomps(&self) -> &[FichComp] {
        &self.fichcomps
    }

    /// Load RSS or GRP lines
    ///
    /// `path` only labels diagnostics.
    ///
    /// # Errors
    /// See [`LoadError`].
    pub fn load_rss<R: BufRead>(
        &mut self,
        reader: R,
        path: &Path,
        tests: Option<&mut StayTests>,
    ) -> Result<FileStats, LoadError> {
        self.load_lines(reader, path, parse_rss_line, tests)
    }

    /// Load RSA lines
    ///
    /// # Errors
    /// See [`LoadError`].
    pub fn load_rsa<R: BufRead>(
        &mut self,
        reader: R,
        path: &Path,
        tests: Option<&mut StayTests>,
    ) -> Result<FileStats, LoadError> {
        RSA_WARNING.call_once(|| {
            tracing::warn!(
                "RSA files contain partial information that can lead to errors (such as procedure date errors)"
            );
        });
        self.load_lines(reader, path, parse_rsa_line, tests)
    }

    /// Load FICHCOMP lines
    ///
    /// The file fails only when every non-empty line is an error.
    ///
    /// # Errors
    /// See [`LoadError`].
    pub fn load_fichcomp<R: BufRead>(&mut self, reader: R, path: &Path) -> Result<FileStats, LoadError> {
        let start = self.fichcomps.len();
        let mut lines = 0;
        let mut errors = 0;

        let result = for_each_line(reader, |line_no, line| {
            lines += 1;
            match parse_fichcomp_line(line) {
                Ok(Some(fc)) => self.fichcomps.push(fc),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(line = line_no, error = %err, "skipping record");
                    errors += 1;
                }
            }
        });
        if let Err(err) = result {
            self.fichcomps.truncate(start);
            return Err(LoadError::io_error(path, err));
        }

        if errors > 0 && errors == lines {
            self.fichcomps.truncate(start);
            return Err(LoadError::NoValidRecord {
                path: path.to_path_buf(),
                errors,
            });
        }

        Ok(FileStats {
            stays: 0,
            line_errors: errors,
        })
    }

    /// Load a stay pack
    ///
    /// Packs carry no reference results; asking for them is logged as an
    /// error and otherwise ignored.
    ///
    /// # Errors
    /// Returns [`LoadError::Pack`] when the pack is invalid.
    pub fn load_pack<R: Read>(
        &mut self,
        reader: R,
        path: &Path,
        tests: Option<&mut StayTests>,
    ) -> Result<FileStats, LoadError> {
        if tests.is_some() {
            tracing::error!("testing is not supported with stay packs");
        }

        let stays = read_pack(reader).map_err(|source| LoadError::Pack {
            path: path.to_path_buf(),
            source,
        })?;
        let added = stays.len();
        self.set.stays.extend(stays);

        Ok(FileStats {
            stays: added,
            line_errors: 0,
        })
    }

    /// Load a JSON stay document
    ///
    /// # Errors
    /// Returns [`LoadError::Json`] when the document cannot be parsed.
    pub fn load_json<R: Read>(
        &mut self,
        reader: R,
        path: &Path,
        tests: Option<&mut StayTests>,
    ) -> Result<FileStats, LoadError> {
        let doc = read_json(reader).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let start = self.set.stays.len();
        self.set.stays.extend(doc.stays);
        sort_stays(&mut self.set.stays[start..]);
        if let Some(tests) = tests {
            tests.extend(doc.tests);
        }

        Ok(FileStats {
            stays: self.set.stays.len() - start,
            line_errors: 0,
        })
    }

    /// Load one file, choosing the decoder from its extension
    ///
    /// # Errors
    /// See [`LoadError`].
    pub fn load_file(&mut self, path: &Path, tests: Option<&mut StayTests>) -> Result<FileStats, LoadError> {
        let span = tracing::info_span!("load", path = %path.display());
        let _guard = span.enter();

        let (format, compression) =
            SourceFormat::from_path(path).map_err(|extension| LoadError::UnknownExtension {
                path: path.to_path_buf(),
                extension,
            })?;

        let file = File::open(path).map_err(|err| LoadError::io_error(path, err))?;
        let reader: Box<dyn BufRead> = match compression {
            Compression::None => Box::new(BufReader::new(file)),
            Compression::Gzip => Box::new(BufReader::new(GzDecoder::new(file))),
        };

        let stats = match format {
            SourceFormat::Rss => self.load_rss(reader, path, tests),
            SourceFormat::Rsa => self.load_rsa(reader, path, tests),
            SourceFormat::FichComp => self.load_fichcomp(reader, path),
            SourceFormat::Pack => self.load_pack(reader, path, tests),
            SourceFormat::Json => self.load_json(reader, path, tests),
        }?;

        tracing::info!(
            format = %format,
            stays = stats.stays,
            line_errors = stats.line_errors,
            "file loaded"
        );
        Ok(stats)
    }

    /// Load every file in `paths`
    ///
    /// A file that fails is logged and reported in the summary; the others
    /// are still loaded.
    pub fn load_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        mut tests: Option<&mut StayTests>,
    ) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for path in paths {
            let path = path.as_ref();
            match self.load_file(path, tests.as_deref_mut()) {
                Ok(stats) => {
                    summary.files_loaded += 1;
                    summary.stays += stats.stays;
                    summary.line_errors += stats.line_errors;
                }
                Err(err) => {
                    tracing::error!(error = %err, "cannot load file");
                    summary.failed.push(path.to_path_buf());
                }
            }
        }

        summary
    }

    /// Attach FICHCOMP data and return the set
    #[must_use]
    pub fn finish(self) -> StaySet {
        let Self { mut set, mut fichcomps } = self;

        let matched = attach_fichcomps(&mut set.stays, &mut fichcomps);
        if matched.unmatched > 0 {
            tracing::warn!(count = matched.unmatched, "some FICHCOMP entries have no matching stay");
        }

        set
    }

    fn load_lines<R: BufRead>(
        &mut self,
        reader: R,
        path: &Path,
        parse: LineParser,
        mut tests: Option<&mut StayTests>,
    ) -> Result<FileStats, LoadError> {
        let start = self.set.stays.len();
        let mut errors = 0;

        let stays = &mut self.set.stays;
        let result = for_each_line(reader, |line_no, line| {
            if let Err(err) = parse(line, stays, tests.as_deref_mut()) {
                tracing::warn!(line = line_no, error = %err, "skipping record");
                errors += 1;
            }
        });
        if let Err(err) = result {
            stays.truncate(start);
            return Err(LoadError::io_error(path, err));
        }

        if errors > 0 && stays.len() == start {
            return Err(LoadError::NoValidRecord {
                path: path.to_path_buf(),
                errors,
            });
        }

        sort_stays(&mut stays[start..]);
        Ok(FileStats {
            stays: stays.len() - start,
            line_errors: errors,
        })
    }
}

/// Counts from [`attach_fichcomps`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct FichCompMatch {
    unmatched: usize,
    dip_overwrites: usize,
}

/// Apply FICHCOMP entries to the first stay of each matching cluster
fn attach_fichcomps(stays: &mut [Stay], fichcomps: &mut [FichComp]) -> FichCompMatch {
    fichcomps.sort_by_key(|fc| fc.admin_id);

    let mut result = FichCompMatch::default();
    let mut matched = vec![false; fichcomps.len()];
    for range in cluster_ranges(stays) {
        let cluster = &mut stays[range];
        let admin_id = cluster[0].admin_id;
        let entry_date = cluster[0].entry.date;
        let exit_date = cluster[cluster.len() - 1].exit.date;

        let lo = fichcomps.partition_point(|fc| fc.admin_id < admin_id);
        for (i, fc) in fichcomps
            .iter()
            .enumerate()
            .skip(lo)
            .take_while(|(_, fc)| fc.admin_id == admin_id)
        {
            let applies = Some(fc.start_date) >= entry_date
                && fc.end_date.map_or(true, |end| Some(end) <= exit_date);
            if !applies {
                continue;
            }

            let first = &mut cluster[0];
            match fc.kind {
                FichCompKind::Ucd => first.flags.insert(StayFlag::Ucd),
                FichCompKind::Dip => {
                    if first.dip_count != 0 {
                        tracing::warn!(bill_id = first.bill_id, "overwriting DIP count");
                        result.dip_overwrites += 1;
                    }
                    first.dip_count = i16::try_from(fc.count).unwrap_or_else(|_| {
                        tracing::warn!(
                            bill_id = first.bill_id,
                            count = fc.count,
                            "DIP count out of range, saturated"
                        );
                        i16::MAX
                    });
                }
            }
            matched[i] = true;
        }
    }

    result.unmatched = matched.iter().filter(|m| !**m).count();
    result
}

fn sort_stays(stays: &mut [Stay]) {
    stays.sort_by_key(|stay| (stay.admin_id, stay.bill_id));
}

/// Call `f` with each non-empty line, 1-based line number first
///
/// Line terminators (`\n` or `\r\n`) are stripped.
fn for_each_line<R: BufRead>(mut reader: R, mut f: impl FnMut(usize, &[u8])) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        line_no += 1;

        let mut line = buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        if !line.is_empty() {
            f(line_no, line);
        }
    }
}
