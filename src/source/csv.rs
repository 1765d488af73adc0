//! CSV export of hourly station readings.

use crate::core::table::ObservationTable;
use crate::source::{derive_features, DataSource, SourceError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the timestamp column after aliasing.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Reads a comma-separated file with a header row.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    aliases: BTreeMap<String, String>,
    timezone: Tz,
}

impl CsvFileSource {
    pub fn new(path: PathBuf, aliases: BTreeMap<String, String>, timezone: Tz) -> Self {
        Self {
            path,
            aliases,
            timezone,
        }
    }

    /// Parse CSV text into a table.
    pub fn parse(&self, content: &str) -> Result<ObservationTable, SourceError> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_line, header) = lines.next().ok_or(SourceError::Parse {
            line: 1,
            message: "empty file".to_string(),
        })?;
        let header: Vec<String> = split_record(header)
            .map_err(|message| SourceError::Parse {
                line: header_line,
                message,
            })?
            .into_iter()
            .map(|name| {
                let name = name.trim().trim_start_matches('\u{feff}').to_string();
                self.aliases.get(&name).cloned().unwrap_or(name)
            })
            .collect();

        let ts_index = header
            .iter()
            .position(|name| name == TIMESTAMP_COLUMN)
            .ok_or_else(|| SourceError::Parse {
                line: header_line,
                message: format!("no '{TIMESTAMP_COLUMN}' column"),
            })?;

        let mut timestamps = Vec::new();
        // None once a column has shown a non-numeric cell
        let mut columns: Vec<Option<Vec<f64>>> = vec![Some(Vec::new()); header.len()];

        for (line_no, line) in lines {
            let cells = split_record(line).map_err(|message| SourceError::Parse {
                line: line_no,
                message,
            })?;
            if cells.len() != header.len() {
                return Err(SourceError::Parse {
                    line: line_no,
                    message: format!("expected {} fields, found {}", header.len(), cells.len()),
                });
            }

            let ts = parse_timestamp(&cells[ts_index], self.timezone).ok_or_else(|| {
                SourceError::Parse {
                    line: line_no,
                    message: format!("invalid timestamp '{}'", cells[ts_index]),
                }
            })?;
            timestamps.push(ts);

            for (index, cell) in cells.iter().enumerate() {
                if index == ts_index {
                    continue;
                }
                let Some(values) = columns[index].as_mut() else {
                    continue;
                };
                let cell = cell.trim();
                if cell.is_empty() {
                    values.push(f64::NAN);
                } else if let Ok(value) = cell.parse::<f64>() {
                    values.push(value);
                } else {
                    tracing::debug!(column = %header[index], line = line_no, "Dropping text column");
                    columns[index] = None;
                }
            }
        }

        let columns: BTreeMap<String, Vec<f64>> = header
            .into_iter()
            .zip(columns)
            .enumerate()
            .filter(|(index, _)| *index != ts_index)
            .filter_map(|(_, (name, values))| values.map(|v| (name, v)))
            .collect();

        let mut table = ObservationTable::new(timestamps, columns)?;
        derive_features(&mut table, self.timezone)?;
        Ok(table)
    }
}

impl DataSource for CsvFileSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn load(&self) -> Result<ObservationTable, SourceError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", self.path.display())))?;
        let table = self.parse(&content)?;
        tracing::info!(
            path = %self.path.display(),
            rows = table.len(),
            columns = table.column_names().count(),
            "Loaded observations"
        );
        Ok(table)
    }
}

/// Parse an RFC 3339 timestamp, or a naive one interpreted in `tz`.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

/// Split one record on commas, honoring double quotes.
fn split_record(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn source() -> CsvFileSource {
        CsvFileSource::new(
            PathBuf::from("unused.csv"),
            Config::default().column_aliases,
            chrono_tz::Africa::Tunis,
        )
    }

    #[test]
    fn test_parse_with_aliases() {
        let csv = "datetime,SO2_ug_m3,NH3_ug_m3,station\n\
                   2024-05-01 10:00:00,42.5,8.0,GCT\n\
                   2024-05-01 11:00:00,,9.5,GCT\n";
        let table = source().parse(csv).unwrap();

        assert_eq!(table.len(), 2);
        assert!(!table.has_column("station"));
        let so2 = table.column("so2").unwrap();
        assert_eq!(so2[0], 42.5);
        assert!(so2[1].is_nan());
        // Naive 10:00 in Tunis is 09:00 UTC
        assert_eq!(
            table.timestamps()[0],
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(table.column("hour").unwrap(), &[10.0, 11.0]);
        assert_eq!(table.column("NH3_lag1").unwrap()[1], 8.0);
    }

    #[test]
    fn test_rfc3339_and_quotes() {
        let csv = "timestamp,so2,\"note\"\n\
                   2024-05-01T09:00:00Z,10,\"a, b\"\n\
                   2024-05-01T10:00:00+00:00,\"12.5\",\"c\"\n";
        let table = source().parse(csv).unwrap();
        assert_eq!(table.column("so2").unwrap(), &[10.0, 12.5]);
        assert!(!table.has_column("note"));
    }

    #[test]
    fn test_rows_sorted() {
        let csv = "timestamp,so2\n2024-05-01 12:00,3\n2024-05-01 10:00,1\n2024-05-01 11:00,2\n";
        let table = source().parse(csv).unwrap();
        assert_eq!(table.column("so2").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_errors() {
        let err = source().parse("so2\n1\n").unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 1, .. }));

        let err = source().parse("timestamp,so2\n2024-05-01 10:00,1,2\n").unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));

        let err = source().parse("timestamp,so2\nyesterday,1\n").unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));

        let err = source()
            .parse("timestamp,so2\n2024-05-01 10:00,1\n2024-05-01 10:00,2\n")
            .unwrap_err();
        assert!(matches!(err, SourceError::Table(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = source().load().unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_split_record() {
        assert_eq!(split_record("a,\"b,c\",").unwrap(), vec!["a", "b,c", ""]);
        assert_eq!(split_record("\"say \"\"hi\"\"\"").unwrap(), vec!["say \"hi\""]);
        assert!(split_record("\"open").is_err());
    }
}
