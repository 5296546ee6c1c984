//! ### English
//! Lock-free frame metrics ring shared by the render thread (producer) and one observer's
//! owner queue (consumer).
//!
//! ### 中文
//! 渲染线程（生产者）与某个观察者的 owner 队列（消费者）共享的无锁帧指标环形缓冲。

use std::array;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};

use crate::engine::frame_info::FRAME_STATS_COUNT;

/// ### English
/// Number of slots in a frame metrics ring.
///
/// ### 中文
/// 帧指标环形缓冲的槽位数量。
pub const FRAME_METRICS_RING_SIZE: usize = 3;

#[repr(C, align(64))]
struct MetricsSlot {
    /// ### English
    /// `true` while the slot holds a published, undrained sample.
    ///
    /// ### 中文
    /// 槽位持有已发布且未被取走的样本时为 `true`。
    has_data: AtomicBool,
    /// ### English
    /// Samples dropped right before this one was published.
    ///
    /// ### 中文
    /// 本样本发布前被丢弃的样本数量。
    drop_count: AtomicU32,
    fields: [AtomicI64; FRAME_STATS_COUNT],
}

impl MetricsSlot {
    fn new() -> Self {
        Self {
            has_data: AtomicBool::new(false),
            drop_count: AtomicU32::new(0),
            fields: array::from_fn(|_| AtomicI64::new(0)),
        }
    }
}

/// ### English
/// Single-producer single-consumer ring of frame metrics samples.
///
/// The producer only ever touches the slot at `next_free` and the consumer only the slot at
/// `next_in_queue`; the per-slot `has_data` flag is the sole handoff (release on store, acquire
/// on load), so the two cursors are never compared. A full ring never blocks the producer: the
/// sample is counted in `dropped_reports` and that count rides along with the next sample that
/// does get published.
///
/// Exactly one thread may call [`publish`](Self::publish) and exactly one thread may call
/// [`drain`](Self::drain).
///
/// ### 中文
/// 单生产者单消费者的帧指标样本环形缓冲。
///
/// 生产者只访问 `next_free` 指向的槽位，消费者只访问 `next_in_queue` 指向的槽位；
/// 每个槽位的 `has_data` 标志是唯一的交接点（写入用 release，读取用 acquire），
/// 因此两个游标从不互相比较。缓冲满时不会阻塞生产者：样本计入 `dropped_reports`，
/// 该计数随下一个成功发布的样本一起带出。
///
/// 只能有一个线程调用 [`publish`](Self::publish)，也只能有一个线程调用 [`drain`](Self::drain)。
pub struct FrameMetricsRing {
    slots: [MetricsSlot; FRAME_METRICS_RING_SIZE],
    next_free: AtomicUsize,
    next_in_queue: AtomicUsize,
    dropped_reports: AtomicU32,
}

impl Default for FrameMetricsRing {
    fn default() -> Self {
        Self {
            slots: array::from_fn(|_| MetricsSlot::new()),
            next_free: AtomicUsize::new(0),
            next_in_queue: AtomicUsize::new(0),
            dropped_reports: AtomicU32::new(0),
        }
    }
}

impl FrameMetricsRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Producer side. Returns `true` when the sample was stored and the consumer should be
    /// signalled, `false` when it was dropped.
    ///
    /// #### Parameters
    /// - `sample`: Frame record to copy into the next free slot.
    ///
    /// ### 中文
    /// 生产者侧。样本写入成功（需要通知消费者）时返回 `true`，被丢弃时返回 `false`。
    ///
    /// #### 参数
    /// - `sample`：要拷贝到下一个空闲槽位的帧记录。
    pub fn publish(&self, sample: &[i64; FRAME_STATS_COUNT]) -> bool {
        let index = self.next_free.load(Ordering::Relaxed);
        let slot = &self.slots[index];
        if slot.has_data.load(Ordering::Acquire) {
            self.dropped_reports.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        for (field, value) in slot.fields.iter().zip(sample) {
            field.store(*value, Ordering::Relaxed);
        }
        let dropped = self.dropped_reports.swap(0, Ordering::Relaxed);
        slot.drop_count.store(dropped, Ordering::Relaxed);
        slot.has_data.store(true, Ordering::Release);
        self.next_free
            .store((index + 1) % FRAME_METRICS_RING_SIZE, Ordering::Relaxed);
        true
    }

    /// ### English
    /// Consumer side. Copies the oldest undrained sample into `sink` and returns its drop count,
    /// or `None` when nothing is available.
    ///
    /// #### Parameters
    /// - `sink`: Destination of the sample; untouched when `None` is returned.
    ///
    /// ### 中文
    /// 消费者侧。把最早的未取走样本拷贝到 `sink` 并返回其丢弃计数；无可用数据时返回 `None`。
    ///
    /// #### 参数
    /// - `sink`：样本写入的位置；返回 `None` 时保持不变。
    pub fn drain(&self, sink: &mut [i64; FRAME_STATS_COUNT]) -> Option<u32> {
        let index = self.next_in_queue.load(Ordering::Relaxed);
        let slot = &self.slots[index];
        if !slot.has_data.load(Ordering::Acquire) {
            return None;
        }

        for (out, field) in sink.iter_mut().zip(&slot.fields) {
            *out = field.load(Ordering::Relaxed);
        }
        let dropped = slot.drop_count.load(Ordering::Relaxed);
        slot.has_data.store(false, Ordering::Release);
        self.next_in_queue
            .store((index + 1) % FRAME_METRICS_RING_SIZE, Ordering::Relaxed);
        Some(dropped)
    }

    /// ### English
    /// Drops counted since the last successful publish.
    ///
    /// ### 中文
    /// 自上次成功发布以来累计的丢弃数量。
    pub fn dropped_reports(&self) -> u32 {
        self.dropped_reports.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tag: i64) -> [i64; FRAME_STATS_COUNT] {
        array::from_fn(|index| tag * 100 + index as i64)
    }

    #[test]
    fn empty_ring_has_nothing_to_drain() {
        let ring = FrameMetricsRing::new();
        let mut sink = [0; FRAME_STATS_COUNT];
        assert_eq!(ring.drain(&mut sink), None);
        assert_eq!(sink, [0; FRAME_STATS_COUNT]);
    }

    #[test]
    fn full_ring_keeps_undrained_samples_and_counts_drops() {
        let ring = FrameMetricsRing::new();
        for tag in 1..=3 {
            assert!(ring.publish(&sample(tag)));
        }
        assert!(!ring.publish(&sample(4)));
        assert_eq!(ring.dropped_reports(), 1);

        let mut sink = [0; FRAME_STATS_COUNT];
        for tag in 1..=3 {
            assert_eq!(ring.drain(&mut sink), Some(0));
            assert_eq!(sink, sample(tag));
        }
        assert_eq!(ring.drain(&mut sink), None);

        assert!(ring.publish(&sample(5)));
        assert_eq!(ring.dropped_reports(), 0);
        assert_eq!(ring.drain(&mut sink), Some(1));
        assert_eq!(sink, sample(5));
    }

    #[test]
    fn drained_slot_is_reused() {
        let ring = FrameMetricsRing::new();
        let mut sink = [0; FRAME_STATS_COUNT];
        for tag in 0..10 {
            assert!(ring.publish(&sample(tag)));
            assert_eq!(ring.drain(&mut sink), Some(0));
            assert_eq!(sink, sample(tag));
        }
    }

    #[test]
    fn concurrent_producer_and_consumer_agree_on_totals() {
        use std::sync::Arc;
        use std::thread;

        const TOTAL: i64 = 2_000;
        let ring = Arc::new(FrameMetricsRing::new());
        let producer = {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut published = 0u32;
                for tag in 0..TOTAL {
                    if ring.publish(&sample(tag)) {
                        published += 1;
                    }
                }
                published
            })
        };

        let mut sink = [0; FRAME_STATS_COUNT];
        let mut received = 0u32;
        let mut dropped = 0u32;
        let mut last_tag = -1;
        while !producer.is_finished() {
            match ring.drain(&mut sink) {
                Some(count) => {
                    let tag = sink[0] / 100;
                    assert!(tag > last_tag);
                    assert_eq!(sink, sample(tag));
                    last_tag = tag;
                    received += 1;
                    dropped += count;
                }
                None => thread::yield_now(),
            }
        }
        let published = producer.join().unwrap();
        while let Some(count) = ring.drain(&mut sink) {
            received += 1;
            dropped += count;
        }
        assert_eq!(received, published);
        assert_eq!(published + dropped + ring.dropped_reports(), TOTAL as u32);
    }
}
