//! Leaderboard file: `;`-delimited text with a header row
//!
//! ```text
//! Posizione;Pilota;Tempo (s);Dist. prec.;Dist. 1°
//! 1;Mario;1,234;-;-
//! 2;Luigi;1,500;+0,266;+0,266
//! ```
//!
//! Only the name and time columns are read back; positions and gaps are
//! recomputed from the times. Either decimal separator is accepted on read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::LeaderboardRow;
use crate::config::DecimalSeparator;
use crate::types::{CompetitorName, ElapsedTime, LeaderboardEntry};
use crate::{Result, TimingError};

/// Header written as the first line of every leaderboard file.
pub const HEADER: [&str; 5] = ["Posizione", "Pilota", "Tempo (s)", "Dist. prec.", "Dist. 1°"];

const DELIMITER: char = ';';

/// Outcome of reading a leaderboard file.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Entries in file order
    pub entries: Vec<LeaderboardEntry>,
    /// Rows that could not be parsed and were left out
    pub skipped: Vec<TimingError>,
}

/// Parse leaderboard file contents. The first record is the header and is
/// ignored; blank records are ignored; malformed rows, including rows that
/// are not valid UTF-8, are skipped with a warning.
pub fn parse_leaderboard(data: impl AsRef<[u8]>) -> LoadReport {
    let mut report = LoadReport::default();
    let data = data.as_ref();
    let data = data.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(data);

    for (line_number, record) in split_records(data).into_iter().skip(1) {
        if record.trim_ascii().is_empty() {
            continue;
        }
        let parsed = std::str::from_utf8(record)
            .map_err(|_| TimingError::malformed_row(line_number, "row is not valid UTF-8"))
            .and_then(|line| parse_row(line, line_number));
        match parsed {
            Ok(entry) => report.entries.push(entry),
            Err(error) => {
                warn!("Skipping leaderboard row: {}", error);
                report.skipped.push(error);
            }
        }
    }

    report
}

/// Split raw contents into records on line breaks outside quoted fields,
/// paired with the 1-based line each record starts on.
fn split_records(data: &[u8]) -> Vec<(usize, &[u8])> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut start = 0;
    let mut line = 1;
    let mut record_line = 1;

    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'"' if in_quotes && data.get(i + 1) == Some(&b'"') => i += 1,
            b'"' if in_quotes => in_quotes = false,
            b'"' if field_start => in_quotes = true,
            b';' if !in_quotes => {
                field_start = true;
                i += 1;
                continue;
            }
            b'\n' => {
                line += 1;
                if !in_quotes {
                    records.push((record_line, trim_cr(&data[start..i])));
                    start = i + 1;
                    record_line = line;
                    field_start = true;
                    i += 1;
                    continue;
                }
            }
            _ => {}
        }
        field_start = false;
        i += 1;
    }
    if start < data.len() {
        records.push((record_line, trim_cr(&data[start..])));
    }
    records
}

fn trim_cr(record: &[u8]) -> &[u8] {
    record.strip_suffix(b"\r").unwrap_or(record)
}

fn parse_row(line: &str, line_number: usize) -> Result<LeaderboardEntry> {
    let fields = split_fields(line);
    if fields.len() < 3 {
        return Err(TimingError::malformed_row(
            line_number,
            format!("expected at least 3 columns, found {}", fields.len()),
        ));
    }

    let competitor = CompetitorName::new(fields[1].as_str())
        .map_err(|_| TimingError::malformed_row(line_number, "missing competitor name"))?;

    let raw_time = fields[2].trim();
    let secs: f64 = raw_time
        .replace(',', ".")
        .parse()
        .map_err(|_| TimingError::malformed_row(line_number, format!("invalid time {:?}", raw_time)))?;
    let elapsed = ElapsedTime::from_secs(secs)
        .map_err(|e| TimingError::malformed_row(line_number, e.to_string()))?;

    Ok(LeaderboardEntry::new(competitor, elapsed))
}

/// Split one record on `;`, honouring `"` quoting with doubled inner quotes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' if in_quotes => in_quotes = false,
            '"' if field.is_empty() => in_quotes = true,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}

fn quote_field(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render rows as leaderboard text, header included.
pub fn format_leaderboard(rows: &[LeaderboardRow], separator: DecimalSeparator) -> String {
    let mut out = HEADER.join(";");
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = row.fields(separator).iter().map(|f| quote_field(f)).collect();
        out.push_str(&fields.join(";"));
        out.push('\n');
    }
    out
}

/// Leaderboard stored in a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLeaderboardFile {
    path: PathBuf,
    separator: DecimalSeparator,
}

impl CsvLeaderboardFile {
    pub fn new(path: impl Into<PathBuf>, separator: DecimalSeparator) -> Self {
        Self { path: path.into(), separator }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Same format, different file.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self::new(path, self.separator)
    }

    /// Read the file. A missing file is an empty leaderboard.
    pub fn load(&self) -> Result<LoadReport> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No leaderboard file at {}", self.path.display());
                return Ok(LoadReport::default());
            }
            Err(e) => return Err(TimingError::Io(e)),
        };

        let report = parse_leaderboard(&data);
        info!(
            path = %self.path.display(),
            entries = report.entries.len(),
            skipped = report.skipped.len(),
            "Leaderboard loaded"
        );
        Ok(report)
    }

    /// Overwrite the file with the given rows.
    pub fn save(&self, rows: &[LeaderboardRow]) -> Result<()> {
        fs::write(&self.path, format_leaderboard(rows, self.separator))
            .map_err(|e| TimingError::persistence(&self.path, e))?;
        debug!(path = %self.path.display(), rows = rows.len(), "Leaderboard saved");
        Ok(())
    }

    /// Delete the file. A file that is already gone is fine.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed leaderboard file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TimingError::persistence(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::Leaderboard;
    use proptest::prelude::*;

    #[test]
    fn accepts_both_separators_and_skips_bad_rows() {
        let text = "Posizione;Pilota;Tempo (s);Dist. prec.;Dist. 1°\n\
                    1;Mario;1,234;-;-\n\
                    2;Luigi;1.500;+0.266;+0.266\n\
                    3;Peach;fast;-;-\n\
                    \n\
                    4;;2,0;-;-\n\
                    5;Toad\n\
                    6;Yoshi;-1,0;-;-\n\
                    7;Wario;3,25\n";
        let report = parse_leaderboard(text);
        let parsed: Vec<_> =
            report.entries.iter().map(|e| (e.competitor.as_str(), e.elapsed.as_secs())).collect();
        assert_eq!(parsed, [("Mario", 1.234), ("Luigi", 1.5), ("Wario", 3.25)]);
        assert_eq!(report.skipped.len(), 4);
        assert!(matches!(report.skipped[0], TimingError::MalformedRow { line: 4, .. }));
    }

    #[test]
    fn quoted_names_survive() {
        assert_eq!(split_fields(r#"1;"Team; ""Red"";2,5;-;-"#), [
            "1",
            "Team; \"Red\"",
            "2,5",
            "-",
            "-"
        ]);
        assert_eq!(quote_field("Team; \"Red\""), r#""Team; ""Red""""#);
        assert_eq!(quote_field("Mario"), "Mario");
    }

    #[test]
    fn writes_header_and_comma_decimals() {
        let mut board = Leaderboard::new();
        board.load_from(parse_leaderboard("h\n1;Mario;1.234\n2;Luigi;1.5\n").entries);
        let text = format_leaderboard(&board.persist(), DecimalSeparator::Comma);
        assert_eq!(
            text,
            "Posizione;Pilota;Tempo (s);Dist. prec.;Dist. 1°\n\
             1;Mario;1,234;-;-\n\
             2;Luigi;1,500;+0,266;+0,266\n"
        );
    }

    #[test]
    fn file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvLeaderboardFile::new(dir.path().join("classifica.csv"), DecimalSeparator::Comma);

        assert!(store.load().unwrap().entries.is_empty());

        let mut board = Leaderboard::new();
        board.load_from(parse_leaderboard("h\n1;Mario;1,234\n").entries);
        store.save(&board.persist()).unwrap();
        assert_eq!(store.load().unwrap().entries, board.entries());

        store.remove().unwrap();
        assert!(!store.path().exists());
        store.remove().unwrap();
    }

    #[test]
    fn unwritable_path_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            CsvLeaderboardFile::new(dir.path().join("missing").join("x.csv"), DecimalSeparator::Point);
        assert!(matches!(store.save(&[]), Err(TimingError::Persistence { .. })));
    }

    #[test]
    fn quoted_line_breaks_stay_in_the_name() {
        let text = "Posizione;Pilota;Tempo (s);Dist. prec.;Dist. 1°\r\n\
                    1;\"Team\nRed\";1,500;-;-\r\n\
                    2;Mario;2,000;+0,500;+0,500\r\n\
                    3;Wa\"rio;2,5;-;-\n";
        let report = parse_leaderboard(text);
        let names: Vec<_> = report.entries.iter().map(|e| e.competitor.as_str()).collect();
        assert_eq!(names, ["Team\nRed", "Mario", "Wa\"rio"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn rows_with_bad_bytes_are_skipped_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvLeaderboardFile::new(dir.path().join("classifica.csv"), DecimalSeparator::Comma);
        let mut data = "Posizione;Pilota;Tempo (s);Dist. prec.;Dist. 1°\n1;Mario;1,234;-;-\n2;Nicol"
            .as_bytes()
            .to_vec();
        // Latin-1 'ò'
        data.push(0xF2);
        data.extend_from_slice(b";1,500;+0,266;+0,266\n3;Luigi;2,000;-;-\n");
        fs::write(store.path(), data).unwrap();

        let report = store.load().unwrap();
        let names: Vec<_> = report.entries.iter().map(|e| e.competitor.as_str()).collect();
        assert_eq!(names, ["Mario", "Luigi"]);
        assert!(matches!(report.skipped.as_slice(), [TimingError::MalformedRow { line: 3, .. }]));
    }

    proptest! {
        #[test]
        fn persist_then_load_round_trips(
            times in prop::collection::vec(0.0f64..500.0, 1..30),
            names in prop::collection::vec("[A-Za-z][A-Za-z0-9;\"\n ]{0,8}[A-Za-z0-9]", 30),
            comma in any::<bool>(),
        ) {
            let separator = if comma { DecimalSeparator::Comma } else { DecimalSeparator::Point };
            let mut board = Leaderboard::new();
            for (i, secs) in times.iter().enumerate() {
                board.insert(LeaderboardEntry::new(
                    CompetitorName::new(names[i].as_str()).unwrap(),
                    ElapsedTime::from_secs(*secs).unwrap(),
                ));
            }

            let text = format_leaderboard(&board.persist(), separator);
            let report = parse_leaderboard(&text);
            prop_assert!(report.skipped.is_empty());

            let mut reloaded = Leaderboard::new();
            reloaded.load_from(report.entries);
            prop_assert_eq!(reloaded.len(), board.len());
            for (a, b) in board.entries().iter().zip(reloaded.entries()) {
                prop_assert_eq!(&a.competitor, &b.competitor);
                prop_assert!((a.elapsed.as_secs() - b.elapsed.as_secs()).abs() <= 0.0005 + 1e-9);
            }
        }
    }
}
