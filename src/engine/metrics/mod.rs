//! ### English
//! Frame metrics delivery from the render thread to observers on other threads.
//!
//! Each observer gets its own fixed three-slot ring. The render thread never blocks on a slow
//! observer: when the ring is full the sample is dropped and counted.
//!
//! ### 中文
//! 从渲染线程向其他线程上的观察者投递帧指标。
//!
//! 每个观察者拥有独立的固定三槽环形缓冲。渲染线程从不因观察者处理慢而阻塞：
//! 缓冲满时样本被丢弃并计数。

mod observer;
mod reporter;
mod ring;

pub use observer::{FrameMetricsObserver, ObserverProxy};
pub use reporter::{FrameMetricsReporter, ObserverHandle};
pub use ring::{FRAME_METRICS_RING_SIZE, FrameMetricsRing};
