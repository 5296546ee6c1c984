//! ### English
//! Caller-pumped task queue on a virtual clock.
//!
//! ### 中文
//! 由调用方驱动、基于虚拟时钟的任务队列。

use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::scheduled::{ScheduledTask, pop_due};
use super::{Task, TaskQueue};

struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<ScheduledTask<Duration>>,
}

/// ### English
/// Task queue that only runs when its owner pumps it.
///
/// Time is virtual: it starts at zero and moves only through [`ManualLooper::advance_by`] /
/// [`ManualLooper::advance_to`]. Tasks run on the pumping thread, one at a time, with the
/// internal lock released so they may post more work.
///
/// ### 中文
/// 仅在所有者主动驱动时才执行任务的队列。
///
/// 时间是虚拟的：从 0 开始，只通过 [`ManualLooper::advance_by`] / [`ManualLooper::advance_to`]
/// 前进。任务在驱动线程上逐个执行，执行时内部锁已释放，因此任务可以继续投递新任务。
pub struct ManualLooper {
    state: Mutex<ManualState>,
    pump: Mutex<()>,
}

impl ManualLooper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                next_seq: 1,
                queue: BinaryHeap::new(),
            }),
            pump: Mutex::new(()),
        })
    }

    /// ### English
    /// Binds this queue as the calling thread's current queue.
    ///
    /// ### 中文
    /// 将该队列绑定为当前线程的当前队列。
    pub fn install_for_current_thread(self: &Arc<Self>) {
        let queue: Arc<dyn TaskQueue> = self.clone();
        super::set_current(Some(queue));
    }

    pub fn now(&self) -> Duration {
        self.lock_state().now
    }

    pub fn pending_count(&self) -> usize {
        self.lock_state().queue.len()
    }

    /// ### English
    /// Runs every task due at the current virtual time, including tasks they post with no
    /// delay. Returns the number of tasks run.
    ///
    /// ### 中文
    /// 执行当前虚拟时间下所有到期任务（包括这些任务无延迟投递的新任务）。返回执行的任务数。
    pub fn run_pending(&self) -> usize {
        let _pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.now();
        self.run_due(now)
    }

    pub fn advance_by(&self, delta: Duration) -> usize {
        let _pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        let target = self.now().saturating_add(delta);
        self.advance_locked(target)
    }

    /// ### English
    /// Moves the clock forward to `target`, running tasks in deadline order. The clock is set to
    /// each task's deadline while it runs. A target in the past only runs due tasks.
    ///
    /// ### 中文
    /// 将时钟推进到 `target`，按 deadline 顺序执行任务。每个任务执行时时钟等于其 deadline。
    /// 若 `target` 早于当前时间，则只执行已到期任务。
    pub fn advance_to(&self, target: Duration) -> usize {
        let _pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        self.advance_locked(target)
    }

    fn advance_locked(&self, target: Duration) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.lock_state();
                let next = pop_due(&mut state.queue, &target);
                if let Some(task) = &next
                    && task.deadline > state.now
                {
                    state.now = task.deadline;
                }
                next
            };
            match next {
                Some(task) => {
                    (task.task)();
                    ran += 1;
                }
                None => break,
            }
        }
        let mut state = self.lock_state();
        if target > state.now {
            state.now = target;
        }
        ran
    }

    fn run_due(&self, now: Duration) -> usize {
        let mut ran = 0;
        loop {
            let next = pop_due(&mut self.lock_state().queue, &now);
            match next {
                Some(task) => {
                    (task.task)();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    fn post_at(&self, delay: Duration, task: Task) {
        let mut state = self.lock_state();
        let deadline = state.now.saturating_add(delay);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(ScheduledTask {
            deadline,
            seq,
            task,
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskQueue for ManualLooper {
    fn post_now(&self, task: Task) {
        self.post_at(Duration::ZERO, task);
    }

    fn post_after(&self, delay: Duration, task: Task) {
        self.post_at(delay, task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Task) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let for_tasks = seen.clone();
        let make = move |value: u32| -> Task {
            let seen = for_tasks.clone();
            Box::new(move || seen.lock().unwrap().push(value))
        };
        (seen, make)
    }

    #[test]
    fn delayed_tasks_wait_for_the_clock() {
        let looper = ManualLooper::new();
        let (seen, make) = recorder();
        looper.post_after(Duration::from_millis(300), make(2));
        looper.post_now(make(1));

        assert_eq!(looper.run_pending(), 1);
        assert_eq!(looper.advance_by(Duration::from_millis(299)), 0);
        assert_eq!(looper.advance_by(Duration::from_millis(1)), 1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(looper.now(), Duration::from_millis(300));
        assert_eq!(looper.pending_count(), 0);
    }

    #[test]
    fn tasks_may_post_more_work() {
        let looper = ManualLooper::new();
        let (seen, make) = recorder();
        let inner = looper.clone();
        let second = make(2);
        looper.post_now(Box::new(move || inner.post_now(second)));
        looper.post_now(make(1));

        assert_eq!(looper.run_pending(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn clock_tracks_each_task_deadline() {
        let looper = ManualLooper::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        for delay in [20u64, 10] {
            let looper_in_task = looper.clone();
            let observed = observed.clone();
            looper.post_after(
                Duration::from_millis(delay),
                Box::new(move || observed.lock().unwrap().push(looper_in_task.now())),
            );
        }
        looper.advance_to(Duration::from_millis(100));
        assert_eq!(
            *observed.lock().unwrap(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(looper.now(), Duration::from_millis(100));
    }
}
