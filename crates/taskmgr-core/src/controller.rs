use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone};
use tracing::{debug, instrument};

use crate::calendar::{
    CalendarState, Cell, DEFAULT_INDICATOR_LIMIT, MonthCursor, build_grid_with_selection,
    tasks_for_date,
};
use crate::clock::Clock;
use crate::countdown::Countdown;
use crate::error::TaskError;
use crate::filter::{FilterKey, filter};
use crate::stats::TaskStats;
use crate::storage::KeyValueStore;
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};

/// Everything the presentation layer renders, recomputed after each change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Views {
    pub visible: Vec<Task>,
    pub grid: Vec<Cell>,
    pub selected_tasks: Vec<Task>,
    pub stats: TaskStats,
}

/// Owns the task store and view state. Every mutation goes through here and
/// is followed by a synchronous recomputation of [`Views`].
pub struct Controller<K: KeyValueStore, Z: TimeZone> {
    store: TaskStore<K>,
    zone: Z,
    clock: Arc<dyn Clock>,
    filter: FilterKey,
    calendar: CalendarState,
    indicator_limit: usize,
    views: Views,
}

impl<K, Z> Controller<K, Z>
where
    K: KeyValueStore,
    Z: TimeZone,
{
    pub fn new(store: TaskStore<K>, zone: Z, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now().with_timezone(&zone);
        let mut controller = Self {
            store,
            calendar: CalendarState::new(MonthCursor::today(&now)),
            zone,
            clock,
            filter: FilterKey::All,
            indicator_limit: DEFAULT_INDICATOR_LIMIT,
            views: Views {
                visible: Vec::new(),
                grid: Vec::new(),
                selected_tasks: Vec::new(),
                stats: TaskStats::default(),
            },
        };
        controller.recompute();
        controller
    }

    pub fn with_filter(mut self, key: FilterKey) -> Self {
        self.filter = key;
        self.recompute();
        self
    }

    pub fn with_indicator_limit(mut self, limit: usize) -> Self {
        self.indicator_limit = limit.max(1);
        self
    }

    pub fn now(&self) -> DateTime<Z> {
        self.clock.now().with_timezone(&self.zone)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn views(&self) -> &Views {
        &self.views
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.list()
    }

    pub fn store(&self) -> &TaskStore<K> {
        &self.store
    }

    pub fn filter_key(&self) -> FilterKey {
        self.filter
    }

    pub fn calendar(&self) -> &CalendarState {
        &self.calendar
    }

    pub fn indicator_limit(&self) -> usize {
        self.indicator_limit
    }

    #[instrument(skip(self, draft))]
    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, TaskError> {
        let task = self.store.add(draft, self.clock.now())?;
        self.recompute();
        Ok(task)
    }

    /// Adds a task due on the calendar's selected day, or today when no day
    /// is selected.
    #[instrument(skip(self, draft))]
    pub fn add_on_selected_date(&mut self, mut draft: TaskDraft) -> Result<Task, TaskError> {
        let date = self.calendar.selected.unwrap_or_else(|| self.today());
        draft.due_date = Some(date);
        self.add(draft)
    }

    #[instrument(skip(self, patch))]
    pub fn edit(&mut self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskError> {
        self.store.edit(id, patch)?;
        self.recompute();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn toggle(&mut self, id: &TaskId) -> Result<bool, TaskError> {
        let completed = self.store.toggle(id)?;
        self.recompute();
        Ok(completed)
    }

    #[instrument(skip(self))]
    pub fn remove(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        let task = self.store.remove(id)?;
        self.recompute();
        Ok(task)
    }

    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        self.store.clear();
        self.recompute();
    }

    pub fn set_filter(&mut self, key: FilterKey) {
        self.filter = key;
        self.recompute();
    }

    pub fn prev_month(&mut self) {
        self.calendar.prev_month();
        self.recompute();
    }

    pub fn next_month(&mut self) {
        self.calendar.next_month();
        self.recompute();
    }

    pub fn go_to_today(&mut self) {
        let now = self.now();
        self.calendar.go_to_today(&now);
        self.recompute();
    }

    pub fn show_month(&mut self, month: MonthCursor) {
        self.calendar.month = month;
        self.recompute();
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.calendar.select(date);
        self.recompute();
    }

    pub fn clear_selection(&mut self) {
        self.calendar.clear_selection();
        self.recompute();
    }

    /// Countdown for one task at the current instant.
    pub fn countdown(&self, id: &TaskId) -> Option<Countdown> {
        let now = self.now();
        self.store.get(id).and_then(|task| task.countdown(&now))
    }

    fn recompute(&mut self) {
        let tasks = self.store.list();
        let today = self.today();

        self.views = Views {
            visible: filter(tasks, self.filter),
            grid: build_grid_with_selection(
                self.calendar.month,
                tasks,
                today,
                self.calendar.selected,
            ),
            selected_tasks: self
                .calendar
                .selected
                .map(|date| tasks_for_date(tasks, date))
                .unwrap_or_default(),
            stats: TaskStats::from_tasks(tasks),
        };

        debug!(
            filter = %self.filter,
            visible = self.views.visible.len(),
            month = %self.calendar.month,
            "views recomputed"
        );
    }
}
