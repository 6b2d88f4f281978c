//! Reading and parsing of the temperature record.

use std::path::PathBuf;

use tokio::fs;

/// One temperature measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub temperature: f64,
    pub timestamp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// The record file could not be opened or read.
    #[error("sensor source unavailable")]
    Unavailable(#[source] std::io::Error),
    /// The record was readable but is not a `temperature,timestamp` pair.
    #[error("malformed sensor record {0:?}")]
    Format(String),
}

/// Reads `temperature,timestamp` records from a file.
///
/// Only the first line is consulted; the writer truncates and rewrites the
/// whole file for every sample. No retries happen here: a failed read is
/// reported and the caller decides what to do with the dropped sample.
#[derive(Debug, Clone)]
pub struct SensorReader {
    path: PathBuf,
}

impl SensorReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn read_sample(&self) -> Result<SensorSample, SensorError> {
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(SensorError::Unavailable)?;
        parse_record(raw.lines().next().unwrap_or(""))
    }
}

fn parse_record(line: &str) -> Result<SensorSample, SensorError> {
    let parsed = (|| {
        let (temperature, timestamp) = line.trim().split_once(',')?;
        Some(SensorSample {
            temperature: temperature.trim().parse().ok()?,
            timestamp: timestamp.trim().parse().ok()?,
        })
    })();
    parsed.ok_or_else(|| SensorError::Format(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_record() {
        let sample = parse_record("36.50,1700000000").unwrap();
        assert_eq!(
            sample,
            SensorSample {
                temperature: 36.5,
                timestamp: 1_700_000_000,
            }
        );
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let sample = parse_record(" -3.25 , 42 \r").unwrap();
        assert_eq!(
            sample,
            SensorSample {
                temperature: -3.25,
                timestamp: 42,
            }
        );
    }

    #[test]
    fn rejects_records_without_a_comma() {
        assert!(matches!(
            parse_record("36.5 1700000000"),
            Err(SensorError::Format(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        assert!(matches!(parse_record("warm,1"), Err(SensorError::Format(_))));
        assert!(matches!(
            parse_record("36.5,later"),
            Err(SensorError::Format(_))
        ));
        assert!(matches!(
            parse_record("36.5,12.7"),
            Err(SensorError::Format(_))
        ));
    }

    #[test]
    fn rejects_an_empty_record() {
        assert!(matches!(parse_record(""), Err(SensorError::Format(_))));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let reader = SensorReader::new(dir.path().join("no-such-record"));
        assert!(matches!(
            reader.read_sample().await,
            Err(SensorError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn reads_the_first_line_only() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "21.0,7\n99.9,8\n").unwrap();
        let reader = SensorReader::new(file.path());
        assert_eq!(
            reader.read_sample().await.unwrap(),
            SensorSample {
                temperature: 21.0,
                timestamp: 7,
            }
        );
    }
}
