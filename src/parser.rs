use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::Result;
use crate::schedule::{AvailabilityEntry, AvailabilityStatus, Day, Shift, WeekAvailability};

/// Column positions, found by header name with positional fallbacks.
struct Columns {
    id: usize,
    name: usize,
    day: usize,
    shift: usize,
    status: usize,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        id: 0,
        name: 1,
        day: 2,
        shift: 3,
        status: 4,
    };

    fn from_headers(headers: &StringRecord) -> Self {
        let find = |needle: &str, fallback: usize| {
            headers
                .iter()
                .position(|h| h.trim().to_lowercase().contains(needle))
                .unwrap_or(fallback)
        };
        Columns {
            id: find("id", 0),
            name: find("name", 1),
            day: find("day", 2),
            shift: find("shift", 3),
            status: find("status", 4),
        }
    }
}

fn parse_record(record: &StringRecord, columns: &Columns) -> Option<(Day, Shift, AvailabilityEntry)> {
    let field = |index: usize| record.get(index).map(str::trim).unwrap_or("");

    let employee_id: i64 = field(columns.id).parse().ok()?;
    let employee_name = field(columns.name).to_string();
    let day: Day = field(columns.day).parse().ok()?;
    let shift: Shift = field(columns.shift).parse().ok()?;
    let status = field(columns.status)
        .parse::<u8>()
        .ok()
        .and_then(|s| AvailabilityStatus::try_from(s).ok())?;

    Some((
        day,
        shift,
        AvailabilityEntry {
            employee_id,
            employee_name,
            status,
        },
    ))
}

/// Reads availability rows `employee_id,name,day,shift,status`.
///
/// The header row is optional: a first row that already parses as data is
/// kept and columns are read by position. A later row for the same employee
/// and cell replaces the earlier one, so a resubmitted form wins. Rows that
/// don't parse are skipped with a warning.
pub fn read_availability<R: Read>(reader: R) -> Result<WeekAvailability> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = reader.records();
    let mut availability = WeekAvailability::new();

    let Some(first) = records.next().transpose()? else {
        return Ok(availability);
    };
    let columns = match parse_record(&first, &Columns::POSITIONAL) {
        Some((day, shift, entry)) => {
            tracing::warn!(record = ?first, "No header row found, reading columns by position");
            availability.insert(day, shift, entry);
            Columns::POSITIONAL
        }
        None => Columns::from_headers(&first),
    };

    for (line, result) in records.enumerate() {
        let record = result?;
        match parse_record(&record, &columns) {
            Some((day, shift, entry)) => availability.insert(day, shift, entry),
            // +2: first line, then 1-based numbering
            None => tracing::warn!(line = line + 2, record = ?record, "Skipping invalid availability row"),
        }
    }

    Ok(availability)
}

/// Loads availability from a CSV file
pub fn load_availability<P: AsRef<Path>>(csv_path: P) -> Result<WeekAvailability> {
    let file = std::fs::File::open(csv_path)?;
    read_availability(file)
}
