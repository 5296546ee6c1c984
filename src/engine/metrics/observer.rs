//! ### English
//! Frame metrics observers and the proxy that carries samples from the render thread to the
//! observer's queue.
//!
//! ### 中文
//! 帧指标观察者，以及把样本从渲染线程带到观察者队列的代理。

use std::sync::{Arc, Weak};

use log::trace;

use crate::engine::error::{BridgeError, Result};
use crate::engine::frame_info::FRAME_STATS_COUNT;
use crate::engine::looper::TaskQueue;

use super::ring::FrameMetricsRing;

/// ### English
/// Receives frame metrics samples on the queue it was registered with.
///
/// `notify_available` is called once per drained sample; `drop_count` is the number of samples
/// lost to backpressure right before this one.
///
/// ### 中文
/// 在注册时指定的队列上接收帧指标样本。
///
/// 每取出一个样本调用一次 `notify_available`；`drop_count` 为该样本之前因背压丢失的样本数。
pub trait FrameMetricsObserver: Send + Sync {
    fn notify_available(&self, sample: &[i64; FRAME_STATS_COUNT], drop_count: u32);

    /// ### English
    /// Field count the observer expects per sample; must equal `FRAME_STATS_COUNT`.
    ///
    /// ### 中文
    /// 观察者期望的每样本字段数；必须等于 `FRAME_STATS_COUNT`。
    fn frame_stats_count(&self) -> usize {
        FRAME_STATS_COUNT
    }
}

/// ### English
/// Render-side stand-in for one observer: a ring plus the queue that drains it.
///
/// The observer is held weakly; a proxy outliving its observer silently discards samples.
/// Every published sample posts one notification holding a strong reference to the proxy, so the
/// ring stays alive until the message has run.
///
/// ### 中文
/// 渲染侧代表某个观察者的代理：一个环形缓冲加上负责取数的队列。
///
/// 观察者以弱引用持有；代理比观察者活得久时会静默丢弃样本。
/// 每个发布成功的样本都会投递一条持有代理强引用的通知，因此消息执行完之前环形缓冲始终有效。
pub struct ObserverProxy {
    observer: Weak<dyn FrameMetricsObserver>,
    queue: Arc<dyn TaskQueue>,
    ring: FrameMetricsRing,
}

impl ObserverProxy {
    /// ### English
    /// Checks the observer's field count and builds an empty proxy.
    ///
    /// #### Parameters
    /// - `observer`: Observer to downgrade into the proxy.
    /// - `queue`: Queue that drains the ring and calls the observer.
    ///
    /// ### 中文
    /// 校验观察者的字段数量并构造空代理。
    ///
    /// #### 参数
    /// - `observer`：降级为弱引用后放入代理的观察者。
    /// - `queue`：负责取数并调用观察者的队列。
    pub fn new(
        observer: &Arc<dyn FrameMetricsObserver>,
        queue: Arc<dyn TaskQueue>,
    ) -> Result<Arc<Self>> {
        let got = observer.frame_stats_count();
        if got != FRAME_STATS_COUNT {
            return Err(BridgeError::MismatchedFrameMetricsFormat {
                expected: FRAME_STATS_COUNT,
                got,
            });
        }
        Ok(Arc::new(Self {
            observer: Arc::downgrade(observer),
            queue,
            ring: FrameMetricsRing::new(),
        }))
    }

    pub fn is_observer_alive(&self) -> bool {
        self.observer.strong_count() > 0
    }

    /// ### English
    /// Producer path. Publishes the sample and, if stored, posts a drain to the observer queue.
    ///
    /// ### 中文
    /// 生产者路径。发布样本，写入成功时向观察者队列投递一次取数任务。
    pub fn notify(self: &Arc<Self>, sample: &[i64; FRAME_STATS_COUNT]) -> bool {
        if !self.ring.publish(sample) {
            trace!("frame metrics ring full, {} dropped", self.ring.dropped_reports());
            return false;
        }
        let proxy = self.clone();
        self.queue.post_now(Box::new(move || proxy.deliver()));
        true
    }

    /// ### English
    /// Consumer path. Copies the oldest available sample into `sink`.
    ///
    /// ### 中文
    /// 消费者路径。把最早的可用样本拷贝到 `sink`。
    pub fn drain(&self, sink: &mut [i64; FRAME_STATS_COUNT]) -> Option<u32> {
        self.ring.drain(sink)
    }

    fn deliver(&self) {
        let Some(observer) = self.observer.upgrade() else {
            return;
        };
        let mut sample = [0; FRAME_STATS_COUNT];
        while let Some(drop_count) = self.ring.drain(&mut sample) {
            observer.notify_available(&sample, drop_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::looper::ManualLooper;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        samples: Mutex<Vec<(i64, u32)>>,
    }

    impl FrameMetricsObserver for Recorder {
        fn notify_available(&self, sample: &[i64; FRAME_STATS_COUNT], drop_count: u32) {
            self.samples.lock().unwrap().push((sample[0], drop_count));
        }
    }

    struct LegacyObserver;

    impl FrameMetricsObserver for LegacyObserver {
        fn notify_available(&self, _: &[i64; FRAME_STATS_COUNT], _: u32) {}

        fn frame_stats_count(&self) -> usize {
            14
        }
    }

    fn sample(tag: i64) -> [i64; FRAME_STATS_COUNT] {
        let mut sample = [0; FRAME_STATS_COUNT];
        sample[0] = tag;
        sample
    }

    #[test]
    fn rejects_observer_with_other_field_count() {
        let observer: Arc<dyn FrameMetricsObserver> = Arc::new(LegacyObserver);
        let err = ObserverProxy::new(&observer, ManualLooper::new())
            .err()
            .expect("format mismatch");
        assert!(matches!(
            err,
            BridgeError::MismatchedFrameMetricsFormat {
                expected: FRAME_STATS_COUNT,
                got: 14
            }
        ));
    }

    #[test]
    fn one_message_drains_every_available_slot() {
        let queue = ManualLooper::new();
        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn FrameMetricsObserver> = recorder.clone();
        let proxy = ObserverProxy::new(&observer, queue.clone()).unwrap();

        for tag in 1..=4 {
            proxy.notify(&sample(tag));
        }
        assert_eq!(queue.pending_count(), 3);
        assert_eq!(Arc::strong_count(&proxy), 4);

        queue.run_pending();
        assert_eq!(*recorder.samples.lock().unwrap(), vec![(1, 0), (2, 0), (3, 0)]);
        assert_eq!(Arc::strong_count(&proxy), 1);

        assert!(proxy.notify(&sample(5)));
        queue.run_pending();
        assert_eq!(recorder.samples.lock().unwrap().last(), Some(&(5, 1)));
    }

    #[test]
    fn dead_observer_releases_proxy_without_draining() {
        let queue = ManualLooper::new();
        let observer: Arc<dyn FrameMetricsObserver> = Arc::new(Recorder::default());
        let proxy = ObserverProxy::new(&observer, queue.clone()).unwrap();
        drop(observer);

        assert!(proxy.notify(&sample(1)));
        assert!(!proxy.is_observer_alive());
        queue.run_pending();
        assert_eq!(Arc::strong_count(&proxy), 1);

        let mut sink = [0; FRAME_STATS_COUNT];
        assert_eq!(proxy.drain(&mut sink), Some(0));
        assert_eq!(sink[0], 1);
    }
}
