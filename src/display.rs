use std::collections::HashMap;
use std::fmt::Write;

use crate::schedule::{find_duplicate_assignments, Day, ScheduleOption, Shift};

/// Placeholder shown for an unfilled cell
pub const UNFILLED: &str = "-";

/// Formats an assignee as `Name (#id)`, or `#id` when the name is unknown
pub fn format_employee(employee_id: i64, names: &HashMap<i64, String>) -> String {
    match names.get(&employee_id) {
        Some(name) if !name.is_empty() => format!("{} (#{})", name, employee_id),
        _ => format!("#{}", employee_id),
    }
}

/// Renders an option as a day-by-shift table.
pub fn render_option(title: &str, option: &ScheduleOption, names: &HashMap<i64, String>) -> String {
    let cell_text = |day: Day, shift: Shift| {
        option
            .get(day, shift)
            .map(|id| format_employee(id, names))
            .unwrap_or_else(|| UNFILLED.to_string())
    };

    let width = Day::ALL
        .iter()
        .flat_map(|day| Shift::ALL.iter().map(move |shift| cell_text(*day, *shift).len()))
        .chain(Shift::ALL.iter().map(|s| s.label().len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", title);
    let _ = write!(out, "{:<10}", "");
    for shift in Shift::ALL {
        let _ = write!(out, " | {:<width$}", shift.label(), width = width);
    }
    out.push('\n');

    for day in Day::ALL {
        let _ = write!(out, "{:<10}", day.name());
        for shift in Shift::ALL {
            let _ = write!(out, " | {:<width$}", cell_text(day, shift), width = width);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Filled shifts: {}/{}", option.filled_count(), Day::ALL.len() * Shift::ALL.len());
    for duplicate in find_duplicate_assignments(option) {
        let _ = writeln!(out, "Warning: {}", duplicate);
    }

    out
}

/// Prints an option in a readable format
pub fn print_option(title: &str, option: &ScheduleOption, names: &HashMap<i64, String>) {
    println!("\n{}", render_option(title, option, names));
}
