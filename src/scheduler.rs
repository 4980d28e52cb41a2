//! Repeating-task scheduler driven by an external clock.

use std::time::Duration;

use crate::clock::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
pub struct RepeatingTask {
    name: &'static str,
    period: Duration,
    next_due: Timestamp,
    runs: u64,
}

impl RepeatingTask {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Timestamp {
        self.next_due
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Keeps a set of fixed-period tasks and reports which are due.
///
/// A task fires at most once per poll. Periods missed while nobody polled
/// are skipped rather than replayed, the way a browser interval behaves
/// under a stalled event loop.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<(TaskId, RepeatingTask)>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task whose first run is one period after `now`.
    pub fn register(&mut self, name: &'static str, period: Duration, now: Timestamp) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push((
            id,
            RepeatingTask {
                name,
                period,
                next_due: now + period,
                runs: 0,
            },
        ));
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(task_id, _)| *task_id != id);
        self.tasks.len() != before
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn task(&self, id: TaskId) -> Option<&RepeatingTask> {
        self.tasks
            .iter()
            .find(|(task_id, _)| *task_id == id)
            .map(|(_, task)| task)
    }

    /// Returns the tasks due at `now`, earliest deadline first (registration
    /// order breaks ties), and reschedules each past `now`.
    pub fn due(&mut self, now: Timestamp) -> Vec<TaskId> {
        let mut fired: Vec<(Timestamp, TaskId)> = Vec::new();
        for (id, task) in &mut self.tasks {
            if task.next_due > now {
                continue;
            }
            fired.push((task.next_due, *id));
            task.runs += 1;
            while task.next_due <= now {
                task.next_due += task.period;
            }
        }
        fired.sort_by_key(|(due, id)| (*due, id.0));
        fired.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Timestamp {
        Timestamp::from_millis(value)
    }

    #[test]
    fn first_run_is_one_period_out() {
        let mut scheduler = Scheduler::new();
        let spawn = scheduler.register("spawn", Duration::from_millis(100), ms(0));
        assert!(scheduler.due(ms(99)).is_empty());
        assert_eq!(scheduler.due(ms(100)), vec![spawn]);
        assert!(scheduler.due(ms(150)).is_empty());
        assert_eq!(scheduler.task(spawn).map(RepeatingTask::runs), Some(1));
    }

    #[test]
    fn missed_periods_are_coalesced() {
        let mut scheduler = Scheduler::new();
        let spawn = scheduler.register("spawn", Duration::from_millis(100), ms(0));
        assert_eq!(scheduler.due(ms(1_050)), vec![spawn]);
        assert_eq!(scheduler.task(spawn).map(|t| t.next_due()), Some(ms(1_100)));
    }

    #[test]
    fn earlier_deadline_runs_first() {
        let mut scheduler = Scheduler::new();
        let slow = scheduler.register("evict", Duration::from_millis(1_000), ms(0));
        let fast = scheduler.register("spawn", Duration::from_millis(100), ms(0));
        for step in 1..10 {
            assert_eq!(scheduler.due(ms(step * 100)), vec![fast]);
        }
        assert_eq!(scheduler.due(ms(1_000)), vec![slow, fast]);
    }

    #[test]
    fn cancelled_tasks_stop_firing() {
        let mut scheduler = Scheduler::new();
        let spawn = scheduler.register("spawn", Duration::from_millis(10), ms(0));
        assert!(scheduler.cancel(spawn));
        assert!(!scheduler.cancel(spawn));
        assert!(scheduler.due(ms(1_000)).is_empty());
        assert!(scheduler.is_empty());
    }
}
