use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::task::{Priority, Task};

/// The single filter dimension of the task list. Priority keys ignore
/// completion state; they are not combined with `active`/`completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterKey {
    #[default]
    All,
    Active,
    Completed,
    High,
    Medium,
    Low,
}

impl FilterKey {
    pub const ALL: [FilterKey; 6] = [
        FilterKey::All,
        FilterKey::Active,
        FilterKey::Completed,
        FilterKey::High,
        FilterKey::Medium,
        FilterKey::Low,
    ];

    /// Unknown keys fall back to [`FilterKey::All`].
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => FilterKey::All,
            "active" => FilterKey::Active,
            "completed" => FilterKey::Completed,
            "high" => FilterKey::High,
            "medium" => FilterKey::Medium,
            "low" => FilterKey::Low,
            other => {
                debug!(key = other, "unknown filter key; showing all tasks");
                FilterKey::All
            }
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            FilterKey::All => "all",
            FilterKey::Active => "active",
            FilterKey::Completed => "completed",
            FilterKey::High => "high",
            FilterKey::Medium => "medium",
            FilterKey::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterKey::All => "All Tasks",
            FilterKey::Active => "Active",
            FilterKey::Completed => "Completed",
            FilterKey::High => "High Priority",
            FilterKey::Medium => "Medium Priority",
            FilterKey::Low => "Low Priority",
        }
    }

    /// Text shown when the filtered list is empty.
    pub fn empty_message(&self) -> String {
        match self {
            FilterKey::All => "Start by adding your first task above!".to_string(),
            other => format!("No tasks match the \"{}\" filter", other.label()),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            FilterKey::All => true,
            FilterKey::Active => !task.completed,
            FilterKey::Completed => task.completed,
            FilterKey::High => task.priority == Priority::High,
            FilterKey::Medium => task.priority == Priority::Medium,
            FilterKey::Low => task.priority == Priority::Low,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for FilterKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

/// Tasks matching `key`, in their original order.
pub fn filter(tasks: &[Task], key: FilterKey) -> Vec<Task> {
    tasks.iter().filter(|task| key.matches(task)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{FilterKey, filter};
    use crate::task::{Priority, Task, TaskId};

    fn task(id: &str, priority: Priority, completed: bool) -> Task {
        Task {
            id: TaskId::new(id),
            title: format!("task {id}"),
            description: None,
            priority,
            due_date: None,
            completed,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("1", Priority::High, false),
            task("2", Priority::Low, true),
            task("3", Priority::Medium, false),
            task("4", Priority::High, true),
            task("5", Priority::Medium, true),
            task("6", Priority::Low, false),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn completion_filters_partition_in_order() {
        let tasks = sample();
        for key in [FilterKey::Active, FilterKey::Completed] {
            let selected = filter(&tasks, key);
            let rest: Vec<Task> = tasks
                .iter()
                .filter(|t| !key.matches(t))
                .cloned()
                .collect();

            assert!(selected.iter().all(|t| !rest.contains(t)));
            assert_eq!(selected.len() + rest.len(), tasks.len());

            // Merging both sides by walking the store order rebuilds it.
            let mut left = selected.iter().peekable();
            let mut right = rest.iter().peekable();
            let mut merged = Vec::new();
            for original in &tasks {
                if left.peek() == Some(&original) {
                    merged.push(left.next().unwrap().clone());
                } else if right.peek() == Some(&original) {
                    merged.push(right.next().unwrap().clone());
                }
            }
            assert_eq!(merged, tasks);
        }
        assert_eq!(ids(&filter(&tasks, FilterKey::Active)), vec!["1", "3", "6"]);
        assert_eq!(ids(&filter(&tasks, FilterKey::Completed)), vec!["2", "4", "5"]);
    }

    #[test]
    fn priority_filters_ignore_completion() {
        let tasks = sample();
        assert_eq!(ids(&filter(&tasks, FilterKey::High)), vec!["1", "4"]);
        assert_eq!(ids(&filter(&tasks, FilterKey::Medium)), vec!["3", "5"]);
        assert_eq!(ids(&filter(&tasks, FilterKey::Low)), vec!["2", "6"]);
    }

    #[test]
    fn all_is_identity() {
        let tasks = sample();
        assert_eq!(filter(&tasks, FilterKey::All), tasks);
        assert!(filter(&[], FilterKey::Active).is_empty());
    }

    #[test]
    fn unknown_key_falls_back_to_all() {
        assert_eq!(FilterKey::parse_lenient("overdue"), FilterKey::All);
        assert_eq!("HIGH".parse::<FilterKey>(), Ok(FilterKey::High));
        assert_eq!("".parse::<FilterKey>(), Ok(FilterKey::All));
    }

    #[test]
    fn labels_and_empty_messages() {
        assert_eq!(
            FilterKey::All.empty_message(),
            "Start by adding your first task above!"
        );
        assert_eq!(
            FilterKey::High.empty_message(),
            "No tasks match the \"High Priority\" filter"
        );
        assert!(FilterKey::ALL.iter().all(|key| !key.label().is_empty()));
    }
}
