use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::AppError;

/// Day of the scheduling week. Stored as 1 (Monday) .. 7 (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn number(self) -> i64 {
        self as i64 + 1
    }

    pub fn from_number(number: i64) -> Option<Day> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        Day::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = AppError;

    /// Accepts a day name (any case) or its storage number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<i64>() {
            return Day::from_number(number)
                .ok_or_else(|| AppError::Validation(format!("Invalid day number: {}", number)));
        }
        Day::ALL
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| AppError::Validation(format!("Invalid day: {}", trimmed)))
    }
}

/// The three fixed daily shifts, in assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    #[serde(rename = "07:00-16:00")]
    Early,
    #[serde(rename = "10:00-19:00")]
    Middle,
    #[serde(rename = "13:00-22:00")]
    Late,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Early, Shift::Middle, Shift::Late];

    /// Display label, e.g. `07:00-16:00`
    pub fn label(self) -> &'static str {
        match self {
            Shift::Early => "07:00-16:00",
            Shift::Middle => "10:00-19:00",
            Shift::Late => "13:00-22:00",
        }
    }

    pub fn start_time(self) -> &'static str {
        match self {
            Shift::Early => "07:00:00",
            Shift::Middle => "10:00:00",
            Shift::Late => "13:00:00",
        }
    }

    pub fn end_time(self) -> &'static str {
        match self {
            Shift::Early => "16:00:00",
            Shift::Middle => "19:00:00",
            Shift::Late => "22:00:00",
        }
    }

    /// Matches stored `HH:MM[:SS]` start/end columns against the fixed shifts.
    pub fn from_times(start: &str, end: &str) -> Option<Shift> {
        let start = start.get(..5)?;
        let end = end.get(..5)?;
        Shift::ALL
            .iter()
            .find(|s| s.start_time().starts_with(start) && s.end_time().starts_with(end))
            .copied()
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Shift {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Invalid shift: {}", s.trim()));
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        Shift::from_times(start.trim(), end.trim()).ok_or_else(invalid)
    }
}

/// Employee-submitted preference for one (day, shift) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AvailabilityStatus {
    CantWork = 0,
    Available = 1,
    Preferred = 2,
}

impl AvailabilityStatus {
    /// Status 1 or 2; only these may be assigned.
    pub fn is_eligible(self) -> bool {
        matches!(self, AvailabilityStatus::Available | AvailabilityStatus::Preferred)
    }
}

impl TryFrom<u8> for AvailabilityStatus {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AvailabilityStatus::CantWork),
            1 => Ok(AvailabilityStatus::Available),
            2 => Ok(AvailabilityStatus::Preferred),
            other => Err(AppError::Validation(format!(
                "Invalid availability status: {} (expected 0, 1 or 2)",
                other
            ))),
        }
    }
}

impl TryFrom<i64> for AvailabilityStatus {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let narrow = u8::try_from(value).map_err(|_| {
            AppError::Validation(format!("Invalid availability status: {}", value))
        })?;
        AvailabilityStatus::try_from(narrow)
    }
}

impl From<AvailabilityStatus> for u8 {
    fn from(status: AvailabilityStatus) -> u8 {
        status as u8
    }
}

/// ISO date of the Monday that starts a scheduling week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekId(NaiveDate);

impl WeekId {
    pub fn new(date: NaiveDate) -> Result<Self, AppError> {
        if date.weekday() != Weekday::Mon {
            return Err(AppError::Validation(format!(
                "Week must start on a Monday, got {} ({})",
                date,
                date.weekday()
            )));
        }
        Ok(WeekId(date))
    }

    /// Calendar year of the week's Monday.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn iso_week(&self) -> u32 {
        self.0.iso_week().week()
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for WeekId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid week date: {}", s.trim())))?;
        WeekId::new(date)
    }
}

impl TryFrom<String> for WeekId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WeekId> for String {
    fn from(week: WeekId) -> String {
        week.to_string()
    }
}

/// One employee's preference for a single (day, shift) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    #[serde(rename = "id")]
    pub employee_id: i64,
    #[serde(rename = "name")]
    pub employee_name: String,
    pub status: AvailabilityStatus,
}

/// Every employee's availability for one week, grouped by cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekAvailability {
    cells: BTreeMap<Day, BTreeMap<Shift, Vec<AvailabilityEntry>>>,
}

impl WeekAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any earlier entry by the same employee for this cell.
    pub fn insert(&mut self, day: Day, shift: Shift, entry: AvailabilityEntry) {
        let entries = self.cells.entry(day).or_default().entry(shift).or_default();
        match entries.iter_mut().find(|e| e.employee_id == entry.employee_id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    pub fn entries(&self, day: Day, shift: Shift) -> &[AvailabilityEntry] {
        self.cells
            .get(&day)
            .and_then(|shifts| shifts.get(&shift))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|shifts| shifts.values().all(Vec::is_empty))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Day, Shift, &AvailabilityEntry)> {
        self.cells.iter().flat_map(|(day, shifts)| {
            shifts
                .iter()
                .flat_map(move |(shift, entries)| entries.iter().map(move |e| (*day, *shift, e)))
        })
    }

    /// employee id -> name, for rendering options
    pub fn employee_names(&self) -> HashMap<i64, String> {
        self.iter()
            .map(|(_, _, e)| (e.employee_id, e.employee_name.clone()))
            .collect()
    }
}

type CellMap = BTreeMap<Day, BTreeMap<Shift, Option<i64>>>;

/// A full weekly assignment: every (day, shift) cell holds one employee id or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOption")]
pub struct ScheduleOption {
    cells: CellMap,
}

impl ScheduleOption {
    /// All 21 cells unfilled.
    pub fn empty() -> Self {
        let cells = Day::ALL
            .iter()
            .map(|day| (*day, Shift::ALL.iter().map(|shift| (*shift, None)).collect()))
            .collect();
        ScheduleOption { cells }
    }

    pub fn get(&self, day: Day, shift: Shift) -> Option<i64> {
        self.cells.get(&day).and_then(|shifts| shifts.get(&shift)).copied().flatten()
    }

    pub fn set(&mut self, day: Day, shift: Shift, employee_id: Option<i64>) {
        self.cells.entry(day).or_default().insert(shift, employee_id);
    }

    /// Cells in day order, then shift order.
    pub fn iter(&self) -> impl Iterator<Item = (Day, Shift, Option<i64>)> + '_ {
        Day::ALL
            .into_iter()
            .flat_map(move |day| Shift::ALL.into_iter().map(move |shift| (day, shift, self.get(day, shift))))
    }

    pub fn filled_count(&self) -> usize {
        self.iter().filter(|(_, _, cell)| cell.is_some()).count()
    }
}

impl Default for ScheduleOption {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for ScheduleOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cells.serialize(serializer)
    }
}

/// Cell as sent by a browser: an id, `null`, or the `-` placeholder.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCell {
    Id(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawOption(BTreeMap<Day, BTreeMap<Shift, Option<RawCell>>>);

impl TryFrom<RawOption> for ScheduleOption {
    type Error = AppError;

    fn try_from(raw: RawOption) -> Result<Self, Self::Error> {
        let mut option = ScheduleOption::empty();
        for (day, shifts) in raw.0 {
            for (shift, cell) in shifts {
                let employee_id = match cell {
                    None => None,
                    Some(RawCell::Id(id)) => Some(id),
                    Some(RawCell::Text(text)) => {
                        let text = text.trim();
                        if text.is_empty() || text == "-" {
                            None
                        } else {
                            Some(text.parse::<i64>().map_err(|_| {
                                AppError::Validation(format!(
                                    "Invalid assignment for {} {}: {}",
                                    day, shift, text
                                ))
                            })?)
                        }
                    }
                };
                option.set(day, shift, employee_id);
            }
        }
        Ok(option)
    }
}
