//! Tabular source reading with Polars
//!
//! Every source is read as raw bytes, transcoded to UTF-8 when it is not
//! already valid UTF-8 (Latin-1 exports are common for retail datasets) and
//! parsed into a `DataFrame` with every column kept as text. Typed column
//! extraction happens once, here, so the rest of the crate never touches
//! string-indexed columns.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

use crate::error::{ArtifactSchemaError, DataFormatError};

// Ambiguous numeric dates are read month first, as in the US exports.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// A problem found while turning a CSV source into typed columns.
///
/// Callers decide which public error it becomes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FrameIssue {
    Parse(String),
    MissingColumns(Vec<String>),
    Null { column: String, row: usize },
    BadValue { column: String, row: usize, detail: String },
    BadDate { column: String, row: usize, value: String },
}

impl FrameIssue {
    pub(crate) fn into_data_error(self, path: &Path) -> DataFormatError {
        let path = path.to_path_buf();
        match self {
            FrameIssue::Parse(message) => DataFormatError::Parse { path, message },
            FrameIssue::MissingColumns(columns) => {
                DataFormatError::MissingColumns { path, columns }
            }
            FrameIssue::Null { column, row } => DataFormatError::NullValue { path, column, row },
            FrameIssue::BadValue { column, row, detail } => DataFormatError::OutOfRange {
                path,
                column,
                row,
                detail,
            },
            FrameIssue::BadDate { column, row, value } => DataFormatError::InvalidDate {
                path,
                column,
                row,
                value,
            },
        }
    }

    pub(crate) fn into_artifact_error(
        self,
        artifact: &'static str,
        path: &Path,
    ) -> ArtifactSchemaError {
        let path = path.to_path_buf();
        match self {
            FrameIssue::Parse(message) => ArtifactSchemaError::Parse { artifact, path, message },
            FrameIssue::MissingColumns(columns) => ArtifactSchemaError::MissingColumns {
                artifact,
                path,
                columns,
            },
            FrameIssue::Null { column, row } => ArtifactSchemaError::BadValue {
                artifact,
                path,
                column,
                row,
                detail: "empty value".to_string(),
            },
            FrameIssue::BadValue { column, row, detail } => ArtifactSchemaError::BadValue {
                artifact,
                path,
                column,
                row,
                detail,
            },
            FrameIssue::BadDate { column, row, value } => ArtifactSchemaError::BadValue {
                artifact,
                path,
                column,
                row,
                detail: format!("'{value}' is not a recognised date"),
            },
        }
    }
}

/// Decode source bytes, falling back to Latin-1 when they are not UTF-8.
pub(crate) fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            log::debug!("source is not UTF-8, decoding as Latin-1");
            // Latin-1 maps every byte to the code point of the same value
            err.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Parse CSV text into a frame whose columns are all strings.
pub(crate) fn parse_csv(text: String) -> Result<DataFrame, FrameIssue> {
    CsvReadOptions::default()
        .with_has_header(true)
        // schema inference off: every column stays text and is typed below
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
        .map_err(|e| FrameIssue::Parse(e.to_string()))
}

/// Fail with every absent column at once rather than the first one.
pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), FrameIssue> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FrameIssue::MissingColumns(missing))
    }
}

/// Extract a required text column, trimming surrounding whitespace.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>, FrameIssue> {
    let series = df
        .column(name)
        .map_err(|_| FrameIssue::MissingColumns(vec![name.to_string()]))?;
    let values = series.str().map_err(|e| FrameIssue::Parse(e.to_string()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value.map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(FrameIssue::Null {
                column: name.to_string(),
                row: i + 1,
            }),
        })
        .collect()
}

pub(crate) fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, FrameIssue> {
    parsed_column(df, name, |raw| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{raw}' is not a number"))
    })
}

pub(crate) fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<i64>, FrameIssue> {
    parsed_column(df, name, parse_integer)
}

pub(crate) fn date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>, FrameIssue> {
    string_column(df, name)?
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            parse_date(&raw).ok_or_else(|| FrameIssue::BadDate {
                column: name.to_string(),
                row: i + 1,
                value: raw,
            })
        })
        .collect()
}

fn parsed_column<T>(
    df: &DataFrame,
    name: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Vec<T>, FrameIssue> {
    string_column(df, name)?
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            parse(raw).map_err(|detail| FrameIssue::BadValue {
                column: name.to_string(),
                row: i + 1,
                detail,
            })
        })
        .collect()
}

/// Integers may arrive as "3" or, from upstream float exports, "3.0".
fn parse_integer(raw: &str) -> Result<i64, String> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
        _ => Err(format!("'{raw}' is not an integer")),
    }
}

/// Parse a day-level date, accepting a trailing time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"Caf\xe9,Ni\xf1o".to_vec();
        assert_eq!(decode_text(bytes), "Café,Niño");

        let utf8 = "Café".as_bytes().to_vec();
        assert_eq!(decode_text(utf8), "Café");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 8).unwrap();
        assert_eq!(parse_date("2016-11-08"), Some(expected));
        assert_eq!(parse_date("11/8/2016"), Some(expected));
        assert_eq!(parse_date("2016-11-08 00:00:00"), Some(expected));
        assert_eq!(parse_date("2016-11-08T13:45:00"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2016-13-40"), None);
    }

    #[test]
    fn test_dashed_dates_read_month_first() {
        assert_eq!(parse_date("05-01-2024"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_date("11-08-2016"), NaiveDate::from_ymd_opt(2016, 11, 8));
        // a day-first reading is never attempted
        assert_eq!(parse_date("25-12-2024"), None);
    }

    #[test]
    fn test_typed_columns() {
        let df = parse_csv("a,b,c\n1.5,2,2024-01-05\n-3,4.0,1/20/2024\n".to_string()).unwrap();
        assert_eq!(df.height(), 2);

        assert_eq!(f64_column(&df, "a").unwrap(), vec![1.5, -3.0]);
        assert_eq!(i64_column(&df, "b").unwrap(), vec![2, 4]);
        let dates = date_column(&df, "c").unwrap();
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let df = parse_csv("a\n1\n".to_string()).unwrap();
        let issue = require_columns(&df, &["a", "b", "c"]).unwrap_err();
        assert_eq!(
            issue,
            FrameIssue::MissingColumns(vec!["b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_bad_value_row_number() {
        let df = parse_csv("a\n1\nabc\n".to_string()).unwrap();
        match f64_column(&df, "a").unwrap_err() {
            FrameIssue::BadValue { column, row, .. } => {
                assert_eq!(column, "a");
                assert_eq!(row, 2);
            }
            other => panic!("unexpected issue: {:?}", other),
        }
    }

    #[test]
    fn test_empty_value_is_null() {
        let df = parse_csv("a,b\n1,\n2,x\n".to_string()).unwrap();
        assert_eq!(
            string_column(&df, "b").unwrap_err(),
            FrameIssue::Null {
                column: "b".to_string(),
                row: 1
            }
        );
    }
}
