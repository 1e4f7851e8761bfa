use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{AvailabilityStatus, Day, Shift, WeekAvailability};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRef {
    pub id: i64,
    pub name: String,
}

/// Employees for one cell, bucketed by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSummary {
    pub preferred: Vec<EmployeeRef>,
    pub available: Vec<EmployeeRef>,
    pub cant_work: Vec<EmployeeRef>,
}

/// Manager-facing availability list covering all 21 cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailabilityList {
    cells: BTreeMap<Day, BTreeMap<Shift, CellSummary>>,
}

impl AvailabilityList {
    pub fn from_week(week: &WeekAvailability) -> Self {
        let mut cells: BTreeMap<Day, BTreeMap<Shift, CellSummary>> = Day::ALL
            .iter()
            .map(|day| (*day, Shift::ALL.iter().map(|s| (*s, CellSummary::default())).collect()))
            .collect();

        for (day, shift, entry) in week.iter() {
            let Some(summary) = cells.get_mut(&day).and_then(|shifts| shifts.get_mut(&shift)) else {
                continue;
            };
            let employee = EmployeeRef {
                id: entry.employee_id,
                name: entry.employee_name.clone(),
            };
            match entry.status {
                AvailabilityStatus::Preferred => summary.preferred.push(employee),
                AvailabilityStatus::Available => summary.available.push(employee),
                AvailabilityStatus::CantWork => summary.cant_work.push(employee),
            }
        }

        for summary in cells.values_mut().flat_map(|shifts| shifts.values_mut()) {
            for bucket in [&mut summary.preferred, &mut summary.available, &mut summary.cant_work] {
                bucket.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            }
        }

        AvailabilityList { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::AvailabilityEntry;

    #[test]
    fn buckets_by_status_and_sorts_by_name() {
        let mut week = WeekAvailability::new();
        let add = |week: &mut WeekAvailability, id: i64, name: &str, status| {
            week.insert(
                Day::Tuesday,
                Shift::Middle,
                AvailabilityEntry {
                    employee_id: id,
                    employee_name: name.to_string(),
                    status,
                },
            );
        };
        add(&mut week, 1, "Zoe", AvailabilityStatus::Available);
        add(&mut week, 2, "Adam", AvailabilityStatus::Available);
        add(&mut week, 3, "Mia", AvailabilityStatus::Preferred);
        add(&mut week, 4, "Lee", AvailabilityStatus::CantWork);

        let list = AvailabilityList::from_week(&week);
        let cell = &list.cells[&Day::Tuesday][&Shift::Middle];
        let names = |refs: &[EmployeeRef]| refs.iter().map(|e| e.name.clone()).collect::<Vec<_>>();

        assert_eq!(names(&cell.preferred), vec!["Mia"]);
        assert_eq!(names(&cell.available), vec!["Adam", "Zoe"]);
        assert_eq!(names(&cell.cant_work), vec!["Lee"]);
    }

    #[test]
    fn every_cell_present_even_without_data() {
        let list = AvailabilityList::from_week(&WeekAvailability::new());
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["Sunday"]["13:00-22:00"]["cantWork"], serde_json::json!([]));
        assert_eq!(json.as_object().unwrap().len(), 7);
    }
}
