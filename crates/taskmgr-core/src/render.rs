use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, NaiveDate, TimeZone};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{Cell, MonthCursor};
use crate::countdown::Countdown;
use crate::datetime::{format_display_date, format_long_date};
use crate::filter::FilterKey;
use crate::stats::TaskStats;
use crate::task::{Priority, Task};

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const CALENDAR_CELL_WIDTH: usize = 9;

/// Plain-text presentation of the core views.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Colors only when stdout is a terminal.
    pub fn for_stdout() -> Self {
        Self::new(io::stdout().is_terminal())
    }

    pub fn write_task_list<W: Write, Z: TimeZone>(
        &self,
        out: &mut W,
        tasks: &[Task],
        key: FilterKey,
        now: &DateTime<Z>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{} ({})", key.label(), tasks.len())?;
        if tasks.is_empty() {
            writeln!(out, "{}", key.empty_message())?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Priority".to_string(),
            "Due".to_string(),
            "Countdown".to_string(),
            "Title".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let due = task.due_date.map(format_display_date).unwrap_or_default();
                let due = if task.is_overdue(now) {
                    self.paint(&due, "31")
                } else {
                    due
                };
                let countdown = task
                    .countdown(now)
                    .map(|countdown| self.paint_countdown(&countdown))
                    .unwrap_or_default();
                vec![
                    self.paint(task.id.as_str(), "33"),
                    if task.completed { "[x]" } else { "[ ]" }.to_string(),
                    self.paint_priority(task.priority),
                    due,
                    countdown,
                    task.title.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn write_calendar<W: Write>(
        &self,
        out: &mut W,
        month: MonthCursor,
        grid: &[Cell],
        indicator_limit: usize,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", month.title())?;
        for label in WEEKDAY_LABELS {
            write!(out, "{label:<width$}", width = CALENDAR_CELL_WIDTH)?;
        }
        writeln!(out)?;

        for week in grid.chunks(7) {
            for cell in week {
                let text = match cell {
                    Cell::Empty => String::new(),
                    Cell::Day(day) => {
                        let marker = if day.is_selected {
                            ">"
                        } else if day.is_today {
                            "*"
                        } else {
                            " "
                        };
                        let indicators = day.indicators(indicator_limit);
                        let mut dots: String = indicators
                            .markers
                            .iter()
                            .map(|m| priority_letter(m.priority))
                            .collect();
                        if indicators.overflow > 0 {
                            dots.push_str(&format!("+{}", indicators.overflow));
                        }
                        format!("{marker}{:>2} {dots}", day.day_number)
                    }
                };
                let padding = CALENDAR_CELL_WIDTH.saturating_sub(UnicodeWidthStr::width(text.as_str()));
                write!(out, "{text}{}", " ".repeat(padding))?;
            }
            writeln!(out)?;
        }
        writeln!(out, "* today  > selected  H/M/L priority markers")?;
        Ok(())
    }

    pub fn write_day_detail<W: Write>(
        &self,
        out: &mut W,
        date: NaiveDate,
        tasks: &[Task],
    ) -> anyhow::Result<()> {
        writeln!(out, "Tasks for {}", format_long_date(date))?;
        if tasks.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for task in tasks {
            let done = if task.completed { "[x]" } else { "[ ]" };
            writeln!(
                out,
                "  {done} {:<6} {} ({})",
                task.priority.as_str(),
                task.title,
                task.id
            )?;
        }
        Ok(())
    }

    pub fn write_stats<W: Write>(&self, out: &mut W, stats: &TaskStats) -> anyhow::Result<()> {
        writeln!(out, "Total          {}", stats.total)?;
        writeln!(out, "Active         {}", stats.active)?;
        writeln!(out, "Completed      {}", stats.completed)?;
        writeln!(out, "High priority  {}", stats.high_priority_active)?;
        writeln!(out, "Progress       {}%", stats.completion_percent)?;
        Ok(())
    }

    pub fn countdown_line(&self, task: &Task, countdown: Option<&Countdown>) -> String {
        match countdown {
            Some(countdown) => format!("{}  {}", self.paint_countdown(countdown), task.title),
            None => format!("-  {}", task.title),
        }
    }

    fn paint_countdown(&self, countdown: &Countdown) -> String {
        if countdown.is_overdue() {
            self.paint(&countdown.text, "31")
        } else {
            countdown.text.clone()
        }
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "32",
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn priority_letter(priority: Priority) -> char {
    match priority {
        Priority::High => 'H',
        Priority::Medium => 'M',
        Priority::Low => 'L',
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::Renderer;
    use crate::calendar::{MonthCursor, build_grid};
    use crate::filter::FilterKey;
    use crate::task::{Priority, Task, TaskId};

    fn task(id: &str, title: &str, due: Option<NaiveDate>, priority: Priority) -> Task {
        Task {
            id: TaskId::new(id),
            title: title.to_string(),
            description: None,
            priority,
            due_date: due,
            completed: false,
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_list_prints_filter_message() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut out = Vec::new();
        Renderer::new(false)
            .write_task_list(&mut out, &[], FilterKey::Low, &now)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No tasks match the \"Low Priority\" filter"));
    }

    #[test]
    fn list_aligns_wide_titles_and_shows_countdown() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 22, 0, 0).unwrap();
        let tasks = vec![
            task("1", "家賃を払う", NaiveDate::from_ymd_opt(2026, 10, 20), Priority::High),
            task("2", "plain", None, Priority::Low),
        ];
        let mut out = Vec::new();
        Renderer::new(false)
            .write_task_list(&mut out, &tasks, FilterKey::All, &now)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("2h 0m 0s"));
        assert!(text.contains("Oct 20, 2026"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn calendar_caps_markers_per_day() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let tasks: Vec<Task> = (0..5)
            .map(|i| task(&i.to_string(), "t", Some(date), Priority::High))
            .collect();
        let month = MonthCursor::new(2026, 10).unwrap();
        let grid = build_grid(month, &tasks, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());

        let mut out = Vec::new();
        Renderer::new(false)
            .write_calendar(&mut out, month, &grid, 3)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("October 2026"));
        assert!(text.contains("20 HHH+2"));
        assert!(text.contains("*19"));
    }
}
