//! Annotated feature matrix (AFM) reader.

use std::io::Read;
use std::path::{Path, PathBuf};

use thicket_split::{Feature, FeatureMatrix};
use tracing::{debug, info, instrument, warn};

use crate::IoError;

/// A parsed matrix together with the error that stopped parsing, if any.
///
/// Columns parsed before the error are kept so callers can continue with a
/// partial matrix.
#[derive(Debug)]
pub struct ParsedAfm {
    pub matrix: FeatureMatrix,
    pub error: Option<IoError>,
}

impl ParsedAfm {
    /// Discard partial results on error.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped parsing, if there was one.
    pub fn into_result(self) -> Result<FeatureMatrix, IoError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.matrix),
        }
    }
}

/// Reads an annotated feature matrix from a file.
///
/// Expected format (tab-separated):
/// - Header row: an ignored first field, then one label per case
/// - One row per feature: the feature name, then one value per case
/// - Names starting with `N:` are numeric; anything else is categorical
/// - Unparseable numeric values and categorical `?`, `nan`, `na`, `null`
///   (any case) are missing
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record (in [`ParsedAfm::error`]) |
/// | [`IoError::InconsistentRowLength`] | Row field count differs from the header (in [`ParsedAfm::error`]) |
/// | [`IoError::Matrix`] | Duplicate feature name (in [`ParsedAfm::error`]) |
pub struct AfmReader {
    path: PathBuf,
}

impl AfmReader {
    /// Create a new reader for the given AFM file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Open and parse the file.
    ///
    /// Only a failure to open the file is returned as `Err`; parse errors
    /// are carried in [`ParsedAfm::error`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<ParsedAfm, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(parse_afm(file))
    }
}

/// Parse an AFM from any reader.
///
/// An input with no rows yields an empty matrix and no error. Parsing stops
/// at the first malformed row; earlier rows are kept.
pub fn parse_afm(input: impl Read) -> ParsedAfm {
    // flexible(true) so that ragged rows surface as InconsistentRowLength
    // instead of a low-level CsvParse error.
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut records = rdr.records();

    let header = match records.next() {
        None => {
            debug!("empty input");
            return ParsedAfm {
                matrix: FeatureMatrix::default(),
                error: None,
            };
        }
        Some(Err(e)) => {
            warn!(error = %e, "malformed header");
            return ParsedAfm {
                matrix: FeatureMatrix::default(),
                error: Some(IoError::CsvParse {
                    row_index: 0,
                    source: e,
                }),
            };
        }
        Some(Ok(header)) => header,
    };

    let case_labels: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    let expected = header.len();
    let n_cases = case_labels.len();
    debug!(n_cases, "read AFM header");
    let mut matrix = FeatureMatrix::new(case_labels);

    let mut error = None;
    for (i, result) in records.enumerate() {
        let row_index = i + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                error = Some(IoError::CsvParse {
                    row_index,
                    source: e,
                });
                break;
            }
        };
        let name = record.get(0).unwrap_or("");
        if record.len() != expected {
            error = Some(IoError::InconsistentRowLength {
                row_index,
                feature: name.to_string(),
                expected,
                got: record.len(),
            });
            break;
        }

        let mut feature = Feature::with_name(name, n_cases);
        for value in record.iter().skip(1) {
            feature.append(value);
        }
        if let Err(source) = matrix.push(feature) {
            error = Some(IoError::Matrix { row_index, source });
            break;
        }
    }

    if let Some(e) = &error {
        warn!(error = %e, n_features = matrix.n_features(), "AFM parsing stopped early");
    }
    info!(
        n_features = matrix.n_features(),
        n_cases = matrix.n_cases(),
        "feature matrix loaded"
    );
    ParsedAfm { matrix, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_afm(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_mixed_columns() {
        let afm = "id\tr1\tr2\tr3\nN:age\t31\t45.5\tNA\nC:color\tred\t?\tblue\nB:flag\tT\tF\tT\n";
        let f = write_afm(afm);
        let fm = AfmReader::new(f.path())
            .read()
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(fm.n_cases(), 3);
        assert_eq!(fm.n_features(), 3);
        assert_eq!(fm.case_labels(), ["r1", "r2", "r3"]);

        let age = fm.feature("N:age").unwrap();
        assert!(age.is_numeric());
        assert_eq!(age.get_str(1).as_deref(), Some("45.5"));
        assert!(age.is_missing(2));

        let color = fm.feature("C:color").unwrap();
        assert!(!color.is_numeric());
        assert!(color.is_missing(1));
        assert_eq!(color.n_cats(), 2);

        assert!(!fm.feature("B:flag").unwrap().is_numeric());
        assert_eq!(fm.index_of("B:flag"), Some(2));
    }

    #[test]
    fn empty_input_is_empty_matrix() {
        let parsed = parse_afm("".as_bytes());
        assert!(parsed.error.is_none());
        assert_eq!(parsed.matrix.n_features(), 0);
        assert_eq!(parsed.matrix.n_cases(), 0);
    }

    #[test]
    fn header_only_keeps_case_labels() {
        let parsed = parse_afm("id\ta\tb\n".as_bytes());
        assert!(parsed.error.is_none());
        assert_eq!(parsed.matrix.n_cases(), 2);
        assert!(parsed.matrix.is_empty());
    }

    #[test]
    fn ragged_row_stops_with_partial_result() {
        let afm = "id\tr1\tr2\nN:x\t1\t2\nN:y\t1\nN:z\t3\t4\n";
        let parsed = parse_afm(afm.as_bytes());
        assert_eq!(parsed.matrix.n_features(), 1);
        assert_eq!(parsed.matrix.index_of("N:x"), Some(0));
        match parsed.error {
            Some(IoError::InconsistentRowLength {
                row_index,
                feature,
                expected,
                got,
            }) => {
                assert_eq!(row_index, 2);
                assert_eq!(feature, "N:y");
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("expected InconsistentRowLength, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_feature_is_reported() {
        let afm = "id\tr1\nC:a\tx\nC:a\ty\n";
        let parsed = parse_afm(afm.as_bytes());
        assert_eq!(parsed.matrix.n_features(), 1);
        assert!(matches!(
            parsed.error,
            Some(IoError::Matrix { row_index: 2, .. })
        ));
        assert!(parsed.into_result().is_err());
    }

    #[test]
    fn missing_tokens_are_case_insensitive() {
        let afm = "id\t1\t2\t3\t4\t5\nC:c\t?\tNaN\tnA\tNULL\tok\n";
        let fm = parse_afm(afm.as_bytes()).into_result().unwrap();
        let c = fm.feature("C:c").unwrap();
        assert_eq!((0..5).filter(|&i| c.is_missing(i)).count(), 4);
        assert_eq!(c.get_str(4).as_deref(), Some("ok"));
    }

    #[test]
    fn file_not_found() {
        let result = AfmReader::new(Path::new("/nonexistent/path/data.afm")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }
}
