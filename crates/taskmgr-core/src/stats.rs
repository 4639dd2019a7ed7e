use crate::task::{Priority, Task};

/// Counters behind the stat cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// High priority and not yet completed.
    pub high_priority_active: usize,
    /// Rounded to the nearest whole percent, halves up.
    pub completion_percent: u32,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        let high_priority_active = tasks
            .iter()
            .filter(|task| task.priority == Priority::High && !task.completed)
            .count();

        let completion_percent = if total == 0 {
            0
        } else {
            let rounded = (completed * 200 + total) / (total * 2);
            u32::try_from(rounded).unwrap_or(100)
        };

        Self {
            total,
            completed,
            active: total - completed,
            high_priority_active,
            completion_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::TaskStats;
    use crate::task::{Priority, Task, TaskId};

    fn task(id: &str, priority: Priority, completed: bool) -> Task {
        Task {
            id: TaskId::new(id),
            title: id.to_string(),
            description: None,
            priority,
            due_date: None,
            completed,
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_store_reports_zero_percent() {
        assert_eq!(TaskStats::from_tasks(&[]), TaskStats::default());
    }

    #[test]
    fn counts_and_rounding() {
        let tasks = vec![
            task("1", Priority::High, false),
            task("2", Priority::High, true),
            task("3", Priority::Low, false),
        ];
        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.high_priority_active, 1);
        // 33.3% rounds down.
        assert_eq!(stats.completion_percent, 33);

        let tasks = vec![
            task("1", Priority::Medium, true),
            task("2", Priority::Medium, true),
            task("3", Priority::Medium, false),
        ];
        // 66.7% rounds up.
        assert_eq!(TaskStats::from_tasks(&tasks).completion_percent, 67);

        let tasks = vec![
            task("1", Priority::Medium, true),
            task("2", Priority::Medium, false),
            task("3", Priority::Medium, false),
            task("4", Priority::Medium, false),
            task("5", Priority::Medium, false),
            task("6", Priority::Medium, false),
            task("7", Priority::Medium, false),
            task("8", Priority::Medium, false),
        ];
        // 12.5% rounds half up.
        assert_eq!(TaskStats::from_tasks(&tasks).completion_percent, 13);
    }
}
