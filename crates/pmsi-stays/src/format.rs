//! Input format detection
//!
//! Formats are chosen by file extension. A trailing `.gz` is stripped
//! first and selects gzip decompression.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Stay file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// RSS or GRP unit stays
    Rss,
    /// RSA anonymised stays
    Rsa,
    /// FICHCOMP complementary records
    FichComp,
    /// Checksummed stay pack
    Pack,
    /// JSON stay document
    Json,
}

/// Stream compression wrapped around a format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Plain file
    #[default]
    None,
    /// gzip stream
    Gzip,
}

impl SourceFormat {
    /// Detect format and compression from a path
    ///
    /// # Errors
    /// Returns the unknown extension, possibly empty.
    pub fn from_path(path: &Path) -> Result<(Self, Compression), String> {
        let (stem, compression) = match extension_of(path) {
            Some(ext) if ext == "gz" => (path.with_extension(""), Compression::Gzip),
            _ => (path.to_path_buf(), Compression::None),
        };

        let ext = extension_of(&stem).unwrap_or_default();
        FormatRegistry::lookup(&ext)
            .map(|format| (format, compression))
            .ok_or(ext)
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::Rsa => "rsa",
            Self::FichComp => "fichcomp",
            Self::Pack => "pack",
            Self::Json => "json",
        }
    }
}

impl Display for SourceFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Table of known extensions
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRegistry;

impl FormatRegistry {
    const ENTRIES: &'static [(&'static str, SourceFormat)] = &[
        ("rss", SourceFormat::Rss),
        ("grp", SourceFormat::Rss),
        ("rsa", SourceFormat::Rsa),
        ("txt", SourceFormat::FichComp),
        ("dmpak", SourceFormat::Pack),
        ("json", SourceFormat::Json),
    ];

    /// Format for a lowercase extension
    #[must_use]
    pub fn lookup(extension: &str) -> Option<SourceFormat> {
        Self::ENTRIES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, format)| *format)
    }

    /// Every supported extension
    pub fn extensions() -> impl Iterator<Item = &'static str> {
        Self::ENTRIES.iter().map(|(ext, _)| *ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_plain_formats() {
        let cases = [
            ("a.rss", SourceFormat::Rss),
            ("a.GRP", SourceFormat::Rss),
            ("dir/a.rsa", SourceFormat::Rsa),
            ("fichcomp.txt", SourceFormat::FichComp),
            ("stays.dmpak", SourceFormat::Pack),
            ("stays.json", SourceFormat::Json),
        ];
        for (path, expected) in cases {
            assert_eq!(
                SourceFormat::from_path(Path::new(path)),
                Ok((expected, Compression::None)),
                "{path}"
            );
        }
    }

    #[test]
    fn detects_gzip() {
        assert_eq!(
            SourceFormat::from_path(Path::new("2021.rsa.gz")),
            Ok((SourceFormat::Rsa, Compression::Gzip))
        );
    }

    #[test]
    fn unknown_extensions() {
        assert_eq!(
            SourceFormat::from_path(Path::new("stays.csv")),
            Err("csv".to_string())
        );
        assert_eq!(SourceFormat::from_path(Path::new("stays")), Err(String::new()));
        assert_eq!(SourceFormat::from_path(Path::new("stays.gz")), Err(String::new()));
    }

    #[test]
    fn registry_lists_extensions() {
        let exts: Vec<_> = FormatRegistry::extensions().collect();
        assert!(exts.contains(&"grp"));
        assert_eq!(exts.len(), 6);
    }
}
