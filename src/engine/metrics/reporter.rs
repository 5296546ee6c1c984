//! ### English
//! Registry of frame metrics observers, fed once per drawn frame.
//!
//! ### 中文
//! 帧指标观察者注册表，每绘制一帧上报一次。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::engine::error::Result;
use crate::engine::frame_info::FrameInfo;
use crate::engine::looper::TaskQueue;

use super::observer::{FrameMetricsObserver, ObserverProxy};

/// ### English
/// Registration handle returned by [`FrameMetricsReporter::add_observer`].
///
/// ### 中文
/// [`FrameMetricsReporter::add_observer`] 返回的注册句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

/// ### English
/// Fans each completed frame out to every registered observer proxy.
///
/// ### 中文
/// 把每个完成的帧分发给所有已注册的观察者代理。
#[derive(Default)]
pub struct FrameMetricsReporter {
    next_handle: AtomicU64,
    proxies: Mutex<Vec<(ObserverHandle, Arc<ObserverProxy>)>>,
}

impl FrameMetricsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Wraps `observer` in a proxy and returns the handle used to remove it.
    ///
    /// #### Parameters
    /// - `observer`: Observer to notify; held weakly.
    /// - `queue`: Queue the observer's notifications run on.
    ///
    /// ### 中文
    /// 用代理包装 `observer`，并返回用于移除它的句柄。
    ///
    /// #### 参数
    /// - `observer`：要通知的观察者；以弱引用持有。
    /// - `queue`：观察者通知运行所在的队列。
    pub fn add_observer(
        &self,
        observer: Arc<dyn FrameMetricsObserver>,
        queue: Arc<dyn TaskQueue>,
    ) -> Result<ObserverHandle> {
        let proxy = ObserverProxy::new(&observer, queue)?;
        let handle = ObserverHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.lock().push((handle, proxy));
        debug!("frame metrics observer {handle:?} added");
        Ok(handle)
    }

    /// ### English
    /// Returns whether the handle was registered. Notifications already posted still run.
    ///
    /// ### 中文
    /// 返回该句柄是否曾注册。已投递的通知仍会执行。
    pub fn remove_observer(&self, handle: ObserverHandle) -> bool {
        let mut proxies = self.lock();
        let before = proxies.len();
        proxies.retain(|(other, _)| *other != handle);
        let removed = proxies.len() != before;
        if removed {
            debug!("frame metrics observer {handle:?} removed");
        }
        removed
    }

    pub fn report_frame(&self, frame: &FrameInfo) {
        let proxies: Vec<Arc<ObserverProxy>> = {
            let mut proxies = self.lock();
            proxies.retain(|(_, proxy)| proxy.is_observer_alive());
            proxies.iter().map(|(_, proxy)| proxy.clone()).collect()
        };
        for proxy in proxies {
            proxy.notify(frame.data());
        }
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ObserverHandle, Arc<ObserverProxy>)>> {
        self.proxies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
