use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::Result;
use crate::schedule::ScheduleOption;

const HEADER: [&str; 4] = ["day", "shift", "employee_id", "employee_name"];

/// Writes one row per cell: day, shift, employee id and name (both empty when unfilled).
pub fn write_schedule_csv<W: Write>(
    writer: W,
    option: &ScheduleOption,
    names: &HashMap<i64, String>,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HEADER)?;

    for (day, shift, cell) in option.iter() {
        let (id, name) = match cell {
            Some(id) => (
                id.to_string(),
                names.get(&id).cloned().unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };
        wtr.write_record([day.name(), shift.label(), id.as_str(), name.as_str()])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn schedule_to_csv_string(option: &ScheduleOption, names: &HashMap<i64, String>) -> Result<String> {
    let mut buffer = Vec::new();
    write_schedule_csv(&mut buffer, option, names)?;
    // csv only writes the UTF-8 we gave it
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn export_schedule_to_file(
    option: &ScheduleOption,
    names: &HashMap<i64, String>,
    csv_path: &Path,
) -> Result<()> {
    let file = File::create(csv_path)?;
    write_schedule_csv(file, option, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Day, Shift};

    #[test]
    fn exports_every_cell_with_names() {
        let mut option = ScheduleOption::empty();
        option.set(Day::Monday, Shift::Early, Some(3));
        option.set(Day::Sunday, Shift::Late, Some(8));
        let names = HashMap::from([(3, "Ivy, Jr.".to_string())]);

        let csv = schedule_to_csv_string(&option, &names).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 22);
        assert_eq!(lines[0], "day,shift,employee_id,employee_name");
        assert_eq!(lines[1], "Monday,07:00-16:00,3,\"Ivy, Jr.\"");
        assert_eq!(lines[2], "Monday,10:00-19:00,,");
        assert_eq!(lines[21], "Sunday,13:00-22:00,8,");
    }

    #[test]
    fn writes_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.csv");
        export_schedule_to_file(&ScheduleOption::empty(), &HashMap::new(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 22);
    }
}
