use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{AvailabilityEntry, AvailabilityStatus, Day, ScheduleOption, Shift, WeekAvailability};

/// Number of independent options shown side by side to a manager.
pub const OPTIONS_PER_REQUEST: usize = 2;

/// Generates one candidate weekly assignment.
///
/// Each day is filled shift by shift in fixed order. A cell picks uniformly at
/// random among employees who want to work it (status 2); when there are none
/// it picks among everyone available (status 1 or 2). Employees already placed
/// earlier that day, or flagged can't-work, are never candidates. A cell with
/// no candidates stays unfilled.
pub fn generate_option<R: Rng + ?Sized>(availability: &WeekAvailability, rng: &mut R) -> ScheduleOption {
    let mut option = ScheduleOption::empty();

    for day in Day::ALL {
        let mut assigned_today: HashSet<i64> = HashSet::new();

        for shift in Shift::ALL {
            let candidates: Vec<&AvailabilityEntry> = availability
                .entries(day, shift)
                .iter()
                .filter(|e| e.status.is_eligible() && !assigned_today.contains(&e.employee_id))
                .collect();

            let preferred: Vec<&AvailabilityEntry> = candidates
                .iter()
                .copied()
                .filter(|e| e.status == AvailabilityStatus::Preferred)
                .collect();

            let pool = if preferred.is_empty() { &candidates } else { &preferred };
            let chosen = pool.choose(rng).map(|e| e.employee_id);

            if let Some(employee_id) = chosen {
                assigned_today.insert(employee_id);
            }
            option.set(day, shift, chosen);
        }
    }

    option
}

/// Generates `count` independent options from the same availability.
pub fn generate_options<R: Rng + ?Sized>(
    availability: &WeekAvailability,
    count: usize,
    rng: &mut R,
) -> Vec<ScheduleOption> {
    (0..count).map(|_| generate_option(availability, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(id: i64, status: AvailabilityStatus) -> AvailabilityEntry {
        AvailabilityEntry {
            employee_id: id,
            employee_name: format!("Employee {}", id),
            status,
        }
    }

    /// Everyone marks every cell with the given status.
    fn uniform_week(ids: &[i64], status: AvailabilityStatus) -> WeekAvailability {
        let mut week = WeekAvailability::new();
        for day in Day::ALL {
            for shift in Shift::ALL {
                for id in ids {
                    week.insert(day, shift, entry(*id, status));
                }
            }
        }
        week
    }

    #[test]
    fn empty_availability_yields_unfilled_option() {
        let mut rng = StdRng::seed_from_u64(1);
        let option = generate_option(&WeekAvailability::new(), &mut rng);
        assert_eq!(option, ScheduleOption::empty());
    }

    #[test]
    fn never_assigns_an_employee_twice_in_one_day() {
        let week = uniform_week(&[1, 2, 3, 4], AvailabilityStatus::Available);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let option = generate_option(&week, &mut rng);
            for day in Day::ALL {
                let ids: Vec<i64> = Shift::ALL.iter().filter_map(|s| option.get(day, *s)).collect();
                let unique: HashSet<i64> = ids.iter().copied().collect();
                assert_eq!(ids.len(), 3, "every cell fillable with four employees");
                assert_eq!(ids.len(), unique.len(), "duplicate on {} with seed {}", day, seed);
            }
        }
    }

    #[test]
    fn single_employee_fills_only_first_shift_of_each_day() {
        let week = uniform_week(&[9], AvailabilityStatus::Preferred);
        let mut rng = StdRng::seed_from_u64(7);
        let option = generate_option(&week, &mut rng);
        for day in Day::ALL {
            assert_eq!(option.get(day, Shift::Early), Some(9));
            assert_eq!(option.get(day, Shift::Middle), None);
            assert_eq!(option.get(day, Shift::Late), None);
        }
    }

    #[test]
    fn preferred_employees_win_over_available_ones() {
        let mut week = WeekAvailability::new();
        week.insert(Day::Monday, Shift::Early, entry(1, AvailabilityStatus::Available));
        week.insert(Day::Monday, Shift::Early, entry(2, AvailabilityStatus::Preferred));
        week.insert(Day::Monday, Shift::Early, entry(3, AvailabilityStatus::Available));

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let option = generate_option(&week, &mut rng);
            assert_eq!(option.get(Day::Monday, Shift::Early), Some(2));
        }
    }

    #[test]
    fn cant_work_is_never_assigned() {
        let mut week = WeekAvailability::new();
        week.insert(Day::Friday, Shift::Late, entry(1, AvailabilityStatus::CantWork));
        week.insert(Day::Friday, Shift::Late, entry(2, AvailabilityStatus::CantWork));
        week.insert(Day::Friday, Shift::Middle, entry(1, AvailabilityStatus::CantWork));
        week.insert(Day::Friday, Shift::Middle, entry(3, AvailabilityStatus::Available));

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let option = generate_option(&week, &mut rng);
            assert_eq!(option.get(Day::Friday, Shift::Late), None);
            assert_eq!(option.get(Day::Friday, Shift::Middle), Some(3));
        }
    }

    #[test]
    fn preferred_employee_used_earlier_falls_back_to_available() {
        // Employee 1 prefers both morning shifts; once placed on the first,
        // the second cell falls back to the available employee.
        let mut week = WeekAvailability::new();
        week.insert(Day::Monday, Shift::Early, entry(1, AvailabilityStatus::Preferred));
        week.insert(Day::Monday, Shift::Middle, entry(1, AvailabilityStatus::Preferred));
        week.insert(Day::Monday, Shift::Middle, entry(2, AvailabilityStatus::Available));

        let mut rng = StdRng::seed_from_u64(3);
        let option = generate_option(&week, &mut rng);
        assert_eq!(option.get(Day::Monday, Shift::Early), Some(1));
        assert_eq!(option.get(Day::Monday, Shift::Middle), Some(2));
    }

    #[test]
    fn same_employee_may_work_every_day() {
        let week = uniform_week(&[5], AvailabilityStatus::Available);
        let mut rng = StdRng::seed_from_u64(11);
        let option = generate_option(&week, &mut rng);
        assert_eq!(option.filled_count(), 7);
    }

    #[test]
    fn same_seed_gives_same_options() {
        let week = uniform_week(&[1, 2, 3, 4, 5, 6], AvailabilityStatus::Available);
        let first = generate_options(&week, OPTIONS_PER_REQUEST, &mut StdRng::seed_from_u64(42));
        let second = generate_options(&week, OPTIONS_PER_REQUEST, &mut StdRng::seed_from_u64(42));
        assert_eq!(first.len(), OPTIONS_PER_REQUEST);
        assert_eq!(first, second);
    }

    #[test]
    fn selection_spreads_across_candidates() {
        let mut week = WeekAvailability::new();
        week.insert(Day::Sunday, Shift::Late, entry(1, AvailabilityStatus::Available));
        week.insert(Day::Sunday, Shift::Late, entry(2, AvailabilityStatus::Available));

        let mut rng = StdRng::seed_from_u64(99);
        let picks: HashSet<Option<i64>> = (0..200)
            .map(|_| generate_option(&week, &mut rng).get(Day::Sunday, Shift::Late))
            .collect();
        assert_eq!(picks, HashSet::from([Some(1), Some(2)]));
    }
}
