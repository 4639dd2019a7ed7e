use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  TimeZone
};

use crate::datetime::{
  days_in_month,
  first_day_of_month,
  is_same_day,
  month_title,
  shift_months,
  starting_weekday
};
use crate::error::TaskError;
use crate::task::{
  Priority,
  Task,
  TaskId
};

/// Markers surfaced per day cell before
/// the remainder collapses into a count.
pub const DEFAULT_INDICATOR_LIMIT: usize =
  3;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
)]
pub struct MonthCursor {
  year:  i32,
  month: u32
}

impl MonthCursor {
  pub fn new(
    year: i32,
    month: u32
  ) -> Result<Self, TaskError> {
    if !(1..=12).contains(&month)
      || !is_representable(year, month)
    {
      return Err(
        TaskError::InvalidMonth(
          format!("{year}-{month:02}")
        )
      );
    }
    Ok(Self { year, month })
  }

  #[must_use]
  pub fn containing(
    date: NaiveDate
  ) -> Self {
    if is_representable(
      date.year(),
      date.month()
    ) {
      Self {
        year:  date.year(),
        month: date.month()
      }
    } else {
      Self::latest()
    }
  }

  /// First month whose grid chrono can
  /// build.
  #[must_use]
  pub fn earliest() -> Self {
    Self {
      year:  NaiveDate::MIN.year(),
      month: NaiveDate::MIN.month()
    }
  }

  /// Last month whose grid chrono can
  /// build; the following month's first
  /// day must exist too.
  #[must_use]
  pub fn latest() -> Self {
    let (year, month) = shift_months(
      NaiveDate::MAX.year(),
      NaiveDate::MAX.month(),
      -1
    );
    Self { year, month }
  }

  #[must_use]
  pub fn today<Z: TimeZone>(
    now: &DateTime<Z>
  ) -> Self {
    Self::containing(now.date_naive())
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.year
  }

  /// 1-based.
  #[must_use]
  pub fn month(&self) -> u32 {
    self.month
  }

  #[must_use]
  pub fn prev(self) -> Self {
    self.shift(-1)
  }

  #[must_use]
  pub fn next(self) -> Self {
    self.shift(1)
  }

  #[must_use]
  pub fn shift(
    self,
    months: i32
  ) -> Self {
    let (year, month) = shift_months(
      self.year, self.month, months
    );
    if is_representable(year, month) {
      Self { year, month }
    } else if months < 0 {
      Self::earliest()
    } else {
      Self::latest()
    }
  }

  #[must_use]
  pub fn first_day(&self) -> NaiveDate {
    first_day_of_month(
      self.year, self.month
    )
  }

  #[must_use]
  pub fn days_in_month(&self) -> u32 {
    days_in_month(self.year, self.month)
  }

  #[must_use]
  pub fn starting_weekday(&self) -> u32 {
    starting_weekday(
      self.year, self.month
    )
  }

  #[must_use]
  pub fn title(&self) -> String {
    month_title(self.year, self.month)
  }

  #[must_use]
  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    date.year() == self.year
      && date.month() == self.month
  }

  #[must_use]
  pub fn day(
    &self,
    day: u32
  ) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
      self.year, self.month, day
    )
  }
}

fn is_representable(
  year: i32,
  month: u32
) -> bool {
  let (next_year, next_month) =
    shift_months(year, month, 1);
  NaiveDate::from_ymd_opt(year, month, 1)
    .is_some()
    && NaiveDate::from_ymd_opt(
      next_year, next_month, 1
    )
    .is_some()
}

impl fmt::Display for MonthCursor {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-{:02}",
      self.year, self.month
    )
  }
}

impl FromStr for MonthCursor {
  type Err = TaskError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let invalid = || {
      TaskError::InvalidMonth(
        s.to_string()
      )
    };
    let (year, month) = s
      .trim()
      .split_once('-')
      .ok_or_else(invalid)?;
    let year = year
      .parse::<i32>()
      .map_err(|_| invalid())?;
    let month = month
      .parse::<u32>()
      .map_err(|_| invalid())?;
    Self::new(year, month)
      .map_err(|_| invalid())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMarker {
  pub id:       TaskId,
  pub priority: Priority,
  pub title:    String
}

/// What a day cell shows: the first few
/// markers plus how many were left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicators {
  pub markers:  Vec<TaskMarker>,
  pub overflow: usize
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
  pub date:        NaiveDate,
  pub day_number:  u32,
  pub is_today:    bool,
  pub is_selected: bool,
  /// Every task due this day, in store
  /// order. Never capped.
  pub tasks:       Vec<Task>,
  pub has_tasks:   bool
}

impl DayCell {
  #[must_use]
  pub fn indicators(
    &self,
    limit: usize
  ) -> Indicators {
    let capped =
      self.tasks.len().min(limit);
    Indicators {
      markers:  self
        .tasks
        .iter()
        .take(capped)
        .map(|task| TaskMarker {
          id:       task.id.clone(),
          priority: task.priority,
          title:    task.title.clone()
        })
        .collect(),
      overflow: self
        .tasks
        .len()
        .saturating_sub(capped)
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
  /// Padding before the 1st.
  Empty,
  Day(DayCell)
}

impl Cell {
  #[must_use]
  pub fn as_day(&self) -> Option<&DayCell> {
    match self {
      | Cell::Day(day) => Some(day),
      | Cell::Empty => None
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    matches!(self, Cell::Empty)
  }
}

/// Month grid: `starting_weekday` empty
/// cells, then one cell per day. Rows
/// are not padded at the end.
#[must_use]
pub fn build_grid(
  month: MonthCursor,
  tasks: &[Task],
  today: NaiveDate
) -> Vec<Cell> {
  build_grid_with_selection(
    month, tasks, today, None
  )
}

#[must_use]
pub fn build_grid_with_selection(
  month: MonthCursor,
  tasks: &[Task],
  today: NaiveDate,
  selected: Option<NaiveDate>
) -> Vec<Cell> {
  let leading =
    month.starting_weekday() as usize;
  let days = month.days_in_month();

  let mut by_day: BTreeMap<
    u32,
    Vec<Task>
  > = BTreeMap::new();
  for task in tasks {
    if let Some(due) = task.due_date
      && month.contains(due)
    {
      by_day
        .entry(due.day())
        .or_default()
        .push(task.clone());
    }
  }

  let mut cells = Vec::with_capacity(
    leading + days as usize
  );
  cells.extend(
    std::iter::repeat_n(
      Cell::Empty,
      leading
    )
  );

  for day_number in 1..=days {
    let Some(date) =
      month.day(day_number)
    else {
      continue;
    };
    let day_tasks = by_day
      .remove(&day_number)
      .unwrap_or_default();
    cells.push(Cell::Day(DayCell {
      date,
      day_number,
      is_today: is_same_day(
        date, today
      ),
      is_selected: selected
        .is_some_and(|sel| {
          is_same_day(sel, date)
        }),
      has_tasks: !day_tasks.is_empty(),
      tasks: day_tasks
    }));
  }

  tracing::debug!(
    month = %month,
    cells = cells.len(),
    leading,
    "calendar grid built"
  );
  cells
}

/// Every task due on `date`, uncapped,
/// for the selected-day detail list.
#[must_use]
pub fn tasks_for_date(
  tasks: &[Task],
  date: NaiveDate
) -> Vec<Task> {
  tasks
    .iter()
    .filter(|task| {
      task.due_date.is_some_and(|due| {
        is_same_day(due, date)
      })
    })
    .cloned()
    .collect()
}

/// Navigation and selection state of
/// the calendar view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarState {
  pub month:    MonthCursor,
  pub selected: Option<NaiveDate>
}

impl CalendarState {
  #[must_use]
  pub fn new(month: MonthCursor) -> Self {
    Self {
      month,
      selected: None
    }
  }

  pub fn prev_month(&mut self) {
    self.month = self.month.prev();
  }

  pub fn next_month(&mut self) {
    self.month = self.month.next();
  }

  pub fn go_to_today<Z: TimeZone>(
    &mut self,
    now: &DateTime<Z>
  ) {
    self.month = MonthCursor::today(now);
  }

  /// Selecting a day also moves the
  /// view to its month.
  pub fn select(
    &mut self,
    date: NaiveDate
  ) {
    self.month =
      MonthCursor::containing(date);
    self.selected = Some(date);
  }

  pub fn clear_selection(&mut self) {
    self.selected = None;
  }
}
