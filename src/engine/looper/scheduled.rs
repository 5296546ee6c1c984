use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::Task;

/// ### English
/// One posted task stored in a looper's priority queue.
///
/// `BinaryHeap` is a max-heap, so `Ord` is reversed to pop the earliest deadline first;
/// `seq` keeps equal deadlines in posting order.
///
/// ### 中文
/// 存储在 looper 优先队列中的单个已投递任务。
///
/// `BinaryHeap` 是最大堆，因此 `Ord` 被反转以优先弹出最早的 deadline；
/// `seq` 保证 deadline 相同的任务按投递顺序执行。
pub(super) struct ScheduledTask<D> {
    pub(super) deadline: D,
    pub(super) seq: u64,
    pub(super) task: Task,
}

impl<D: Ord> PartialEq for ScheduledTask<D> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<D: Ord> Eq for ScheduledTask<D> {}

impl<D: Ord> PartialOrd for ScheduledTask<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Ord> Ord for ScheduledTask<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.deadline.cmp(&self.deadline) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

/// ### English
/// Pops the earliest task if its deadline is not after `now`.
///
/// ### 中文
/// 若最早任务的 deadline 不晚于 `now`，则弹出该任务。
pub(super) fn pop_due<D: Ord>(
    queue: &mut BinaryHeap<ScheduledTask<D>>,
    now: &D,
) -> Option<ScheduledTask<D>> {
    if queue.peek().is_some_and(|next| next.deadline <= *now) {
        queue.pop()
    } else {
        None
    }
}
