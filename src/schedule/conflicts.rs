use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::types::{Day, ScheduleOption, Shift};

/// An employee placed on more than one shift of the same day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateAssignment {
    pub day: Day,
    pub employee_id: i64,
    pub shifts: Vec<Shift>,
}

impl fmt::Display for DuplicateAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.shifts.iter().map(|s| s.label()).collect();
        write!(
            f,
            "employee {} is assigned to {} on {}",
            self.employee_id,
            labels.join(" and "),
            self.day
        )
    }
}

/// Finds same-day double bookings in an option, e.g. after manual edits.
/// Generated options never contain any.
pub fn find_duplicate_assignments(option: &ScheduleOption) -> Vec<DuplicateAssignment> {
    let mut duplicates = Vec::new();

    for day in Day::ALL {
        let mut by_employee: BTreeMap<i64, Vec<Shift>> = BTreeMap::new();
        for shift in Shift::ALL {
            if let Some(employee_id) = option.get(day, shift) {
                by_employee.entry(employee_id).or_default().push(shift);
            }
        }
        duplicates.extend(
            by_employee
                .into_iter()
                .filter(|(_, shifts)| shifts.len() > 1)
                .map(|(employee_id, shifts)| DuplicateAssignment { day, employee_id, shifts }),
        );
    }

    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_same_day_double_booking() {
        let mut option = ScheduleOption::empty();
        option.set(Day::Wednesday, Shift::Early, Some(4));
        option.set(Day::Wednesday, Shift::Late, Some(4));
        option.set(Day::Thursday, Shift::Early, Some(4));

        let found = find_duplicate_assignments(&option);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].day, Day::Wednesday);
        assert_eq!(found[0].shifts, vec![Shift::Early, Shift::Late]);
        assert_eq!(
            found[0].to_string(),
            "employee 4 is assigned to 07:00-16:00 and 13:00-22:00 on Wednesday"
        );
    }

    #[test]
    fn clean_option_has_no_warnings() {
        let mut option = ScheduleOption::empty();
        option.set(Day::Monday, Shift::Early, Some(1));
        option.set(Day::Monday, Shift::Middle, Some(2));
        assert!(find_duplicate_assignments(&option).is_empty());
    }
}
