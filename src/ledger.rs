//! Submission ledger — the append-only audit log of submission attempts.
//!
//! One CSV row per trip attempt, comparing the input values against what was
//! actually selected on the page. The file is opened, written, and closed
//! per entry; it is never truncated or rewritten.

use crate::filler::FillOutcome;
use crate::record::{TripField, TripRecord};
use crate::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Ledger column headers, written once when the file is created.
pub const HEADER: [&str; 15] = [
    "Timestamp",
    "Status",
    "Error Message",
    "Department (Input)",
    "Department (Actual)",
    "Plate (Input)",
    "Plate (Actual)",
    "Date",
    "Start Time",
    "Start Odometer",
    "End Time",
    "End Odometer",
    "Destination",
    "Driver (Input)",
    "Driver (Actual)",
];

/// One append-only audit row.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    row: Vec<String>,
}

impl LedgerEntry {
    /// Build an entry from a trip attempt. Connection fields log the input
    /// value paired with the actually-selected value (defaulting to the
    /// input when no selection was captured); simple fields log the input.
    pub fn new(record: &TripRecord, outcome: &FillOutcome, success: bool, error: &str) -> Self {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let status = if success { "SUCCESS" } else { "FAILED" };

        let pair = |field: TripField| {
            let input = record.get(field).to_string();
            let actual = outcome.actual_for(field, &input);
            (input, actual)
        };

        let (dept_in, dept_actual) = pair(TripField::Department);
        let (plate_in, plate_actual) = pair(TripField::Plate);
        let (driver_in, driver_actual) = pair(TripField::Driver);

        let row = vec![
            timestamp,
            status.to_string(),
            error.to_string(),
            dept_in,
            dept_actual,
            plate_in,
            plate_actual,
            record.get(TripField::Date).to_string(),
            record.get(TripField::StartTime).to_string(),
            record.get(TripField::StartOdometer).to_string(),
            record.get(TripField::EndTime).to_string(),
            record.get(TripField::EndOdometer).to_string(),
            record.get(TripField::Destination).to_string(),
            driver_in,
            driver_actual,
        ];
        Self { row }
    }

    pub fn row(&self) -> &[String] {
        &self.row
    }
}

/// Append-only CSV ledger. Holds no open handle between appends.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file with its header row first if it
    /// does not exist yet.
    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record(entry.row())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filler::FillValue;
    use crate::resolver::MatchKind;

    fn sample_record() -> TripRecord {
        TripRecord::from_pairs([
            (TripField::Department, "Facilities".to_string()),
            (TripField::Plate, "ABC-123".to_string()),
            (TripField::Date, "05/01/2024".to_string()),
            (TripField::Driver, "Jane Roe".to_string()),
        ])
    }

    fn ledger_in(dir: &tempfile::TempDir) -> Ledger {
        Ledger::new(dir.path().join("log.csv"))
    }

    fn read_lines(ledger: &Ledger) -> Vec<String> {
        std::fs::read_to_string(ledger.path())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let entry = LedgerEntry::new(&sample_record(), &FillOutcome::default(), true, "");

        ledger.append(&entry).unwrap();
        ledger.append(&entry).unwrap();

        let lines = read_lines(&ledger);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp,Status,Error Message"));
        assert!(!lines[1].starts_with("Timestamp"));
        assert!(!lines[2].starts_with("Timestamp"));
    }

    #[test]
    fn test_append_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let entry = LedgerEntry::new(&sample_record(), &FillOutcome::default(), true, "");

        // first "run"
        ledger.append(&entry).unwrap();
        ledger.append(&entry).unwrap();
        let after_first = read_lines(&ledger).len();

        // re-run appends disjoint rows after the prior run's rows
        let ledger2 = Ledger::new(ledger.path());
        ledger2.append(&entry).unwrap();
        ledger2.append(&entry).unwrap();
        assert_eq!(read_lines(&ledger2).len(), after_first + 2);
    }

    #[test]
    fn test_entry_compares_input_and_actual() {
        let mut outcome = FillOutcome::default();
        outcome.insert(
            TripField::Department,
            FillValue::Selected {
                requested: "Facilities".into(),
                actual: "Facilities Management".into(),
                kind: MatchKind::Partial,
            },
        );
        let entry = LedgerEntry::new(&sample_record(), &outcome, true, "");
        let row = entry.row();
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[1], "SUCCESS");
        assert_eq!(row[3], "Facilities");
        assert_eq!(row[4], "Facilities Management");
        // no selection captured for the driver: actual defaults to input
        assert_eq!(row[13], "Jane Roe");
        assert_eq!(row[14], "Jane Roe");
    }

    #[test]
    fn test_failed_entry_has_error_message() {
        let entry = LedgerEntry::new(
            &sample_record(),
            &FillOutcome::default(),
            false,
            "could not locate form fields",
        );
        assert_eq!(entry.row()[1], "FAILED");
        assert_eq!(entry.row()[2], "could not locate form fields");
    }
}
