use std::fmt;

use super::schedule::LineService;
use super::schedule::Schedule;


/// Renders a schedule as a lines x periods text table.
///
/// Cells list trains per hour by length, longest first, e.g. `2x10c, 1x4c`.  A cell is marked
/// `(!)` when its line runs only the minimum frequency.
pub struct ScheduleTable<'a> {
    schedule: &'a Schedule,
    min_frequency: u32,
}

impl<'a> ScheduleTable<'a> {
    pub fn new(schedule: &'a Schedule, min_frequency: u32) -> ScheduleTable<'a> {
        ScheduleTable{schedule, min_frequency}
    }

    fn cell_text(&self, service: Option<&LineService>) -> String {
        let service = match service {
            Some(service) if !service.is_empty() => service,
            _ => return String::from("0 trains (!)"),
        };
        let mut text = service.allocations.iter()
            .map(|aa| format!("{}x{}c", aa.trains_per_hour, aa.length))
            .collect::<Vec<String>>()
            .join(", ");
        if service.total_frequency() == self.min_frequency {
            text.push_str(" (!)");
        }
        text
    }
}

impl<'a> fmt::Display for ScheduleTable<'a> {
    fn fmt(&self, ff: &mut fmt::Formatter) -> fmt::Result {
        let periods = self.schedule.periods();
        let mut rows: Vec<Vec<String>> = vec![];
        let mut header = vec![String::from("LINE")];
        header.extend(periods.iter().map(|pp| pp.to_string()));
        rows.push(header);
        for line in self.schedule.lines() {
            let mut row = vec![line.to_string()];
            for period in &periods {
                row.push(self.cell_text(self.schedule.service(line, *period)));
            }
            rows.push(row);
        }

        let mut widths = vec![0; periods.len() + 1];
        for row in &rows {
            for (ii, cell) in row.iter().enumerate() {
                widths[ii] = widths[ii].max(cell.len());
            }
        }
        for row in &rows {
            let cells: Vec<String> = row.iter().zip(widths.iter())
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            writeln!(ff, "{}", cells.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
