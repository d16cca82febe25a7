//! Trip record model and the CSV trip data source.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// The fixed logical field set of one trip log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TripField {
    Department,
    Plate,
    Date,
    StartTime,
    StartOdometer,
    EndTime,
    EndOdometer,
    Destination,
    Driver,
}

impl TripField {
    /// All fields, in form-fill order. Department precedes Driver because
    /// the eligible-driver options depend on the chosen department.
    pub const ALL: [TripField; 9] = [
        TripField::Department,
        TripField::Plate,
        TripField::Date,
        TripField::StartTime,
        TripField::StartOdometer,
        TripField::EndTime,
        TripField::EndOdometer,
        TripField::Destination,
        TripField::Driver,
    ];

    /// Fields backed by a searchable dependent dropdown.
    pub fn is_connection(self) -> bool {
        matches!(
            self,
            TripField::Department | TripField::Plate | TripField::Driver
        )
    }

    /// Human-readable field name.
    pub fn label(self) -> &'static str {
        match self {
            TripField::Department => "Department",
            TripField::Plate => "Plate",
            TripField::Date => "Date",
            TripField::StartTime => "Start Time",
            TripField::StartOdometer => "Start Odometer",
            TripField::EndTime => "End Time",
            TripField::EndOdometer => "End Odometer",
            TripField::Destination => "Destination",
            TripField::Driver => "Driver",
        }
    }

    /// Accepted input column names, normalized (lowercase, spaces as
    /// underscores). Covers both the legacy export headers and the
    /// on-form labels.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            TripField::Department => &["department"],
            TripField::Plate => &["plate", "vehicle_plate", "vehicle"],
            TripField::Date => &["date"],
            TripField::StartTime => &["start_time"],
            TripField::StartOdometer => &["start_mileage", "start_odometer", "odometer_start"],
            TripField::EndTime => &["end_time"],
            TripField::EndOdometer => &["end_mileage", "end_odometer", "odometer_end"],
            TripField::Destination => &["destination"],
            TripField::Driver => &["driver"],
        }
    }
}

impl fmt::Display for TripField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized input row. Every logical field is present, possibly with
/// an empty value; immutable for the lifetime of one submission attempt.
#[derive(Debug, Clone)]
pub struct TripRecord {
    values: HashMap<TripField, String>,
}

impl TripRecord {
    /// Build a record from field/value pairs. Fields not supplied are
    /// present with an empty value.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (TripField, String)>,
    {
        let mut values: HashMap<TripField, String> = TripField::ALL
            .iter()
            .map(|f| (*f, String::new()))
            .collect();
        for (field, value) in pairs {
            values.insert(field, value);
        }
        Self { values }
    }

    /// The input value for a field. Always present; may be empty.
    pub fn get(&self, field: TripField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }
}

/// Load trip records from a CSV file.
///
/// Headers are matched case/space/underscore-insensitively against the known
/// column aliases. Missing required columns fail the whole load; missing
/// cell values become empty strings; dates are normalized to `MM/DD/YYYY`.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<TripRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Data(format!("input file not found: {}", path.display())));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut columns: HashMap<TripField, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let normalized = normalize_header(header);
        for field in TripField::ALL {
            if !columns.contains_key(&field) && field.aliases().contains(&normalized.as_str()) {
                columns.insert(field, idx);
            }
        }
    }

    let missing: Vec<&str> = TripField::ALL
        .iter()
        .filter(|f| !columns.contains_key(f))
        .map(|f| f.label())
        .collect();
    if !missing.is_empty() {
        return Err(Error::Data(format!(
            "missing required columns in input file: {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let pairs = TripField::ALL.iter().map(|field| {
            let raw = columns
                .get(field)
                .and_then(|&idx| row.get(idx))
                .unwrap_or("")
                .trim()
                .to_string();
            let value = if *field == TripField::Date {
                normalize_date(&raw)
            } else {
                raw
            };
            (*field, value)
        });
        records.push(TripRecord::from_pairs(pairs));
    }

    Ok(records)
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Normalize a date value to `MM/DD/YYYY`. Unparseable non-empty values are
/// dropped to empty, matching the data source contract.
fn normalize_date(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.format("%m/%d/%Y").to_string();
        }
    }
    // spreadsheet exports often carry a midnight time component
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%m/%d/%Y").to_string();
    }
    warn!("unparseable date '{raw}' dropped from record");
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_basic() {
        let file = write_csv(
            "Department,Plate,Date,Start_Time,Start_Mileage,End_Time,End_Mileage,Destination,Driver\n\
             Facilities,ABC-123,2024-05-01,08:00,1200,09:30,1240,Warehouse,Jane Roe\n",
        );
        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.get(TripField::Department), "Facilities");
        assert_eq!(rec.get(TripField::Date), "05/01/2024");
        assert_eq!(rec.get(TripField::StartOdometer), "1200");
        assert_eq!(rec.get(TripField::Driver), "Jane Roe");
    }

    #[test]
    fn test_header_normalization() {
        // spaces, case, and odometer-vs-mileage naming all accepted
        let file = write_csv(
            "department,PLATE,Date,Start Time,Odometer Start,End Time,Odometer End,destination,DRIVER\n\
             IT,XYZ-9,05/02/2024,,,,,Office,\n",
        );
        let records = load_records(file.path()).unwrap();
        assert_eq!(records[0].get(TripField::Plate), "XYZ-9");
        assert_eq!(records[0].get(TripField::Date), "05/02/2024");
        // absent values present as empty, not missing
        assert_eq!(records[0].get(TripField::StartTime), "");
        assert_eq!(records[0].get(TripField::Driver), "");
    }

    #[test]
    fn test_missing_columns_listed() {
        let file = write_csv("Department,Plate,Date\nIT,X,2024-01-01\n");
        let err = load_records(file.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Start Time"), "got: {msg}");
        assert!(msg.contains("Driver"), "got: {msg}");
    }

    #[test]
    fn test_missing_file() {
        assert!(load_records("does_not_exist.csv").is_err());
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-05-01"), "05/01/2024");
        assert_eq!(normalize_date("5/1/2024"), "05/01/2024");
        assert_eq!(normalize_date("2024-05-01 00:00:00"), "05/01/2024");
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("not a date"), "");
    }

    #[test]
    fn test_record_has_every_field() {
        let rec = TripRecord::from_pairs([(TripField::Plate, "ABC".to_string())]);
        for field in TripField::ALL {
            // get never panics and never reports a field as absent
            let _ = rec.get(field);
        }
        assert_eq!(rec.get(TripField::Plate), "ABC");
        assert_eq!(rec.get(TripField::Destination), "");
    }

    #[test]
    fn test_fill_order_department_before_driver() {
        let dept = TripField::ALL.iter().position(|f| *f == TripField::Department);
        let driver = TripField::ALL.iter().position(|f| *f == TripField::Driver);
        assert!(dept < driver);
    }
}
