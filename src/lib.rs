/// ### English
/// `xian_render_bridge` crate root.
/// Render-thread animation bridge: a root scene node coordinating animator sets across the owner
/// and render threads, batched completion delivery, and lock-free frame metrics reporting.
/// Everything lives under `engine`; the most used types are re-exported here.
///
/// ### 中文
/// `xian_render_bridge` 的 crate 根。
/// 渲染线程动画桥接层：在 owner 线程与渲染线程之间协调动画集合的根场景节点、批量完成事件投递，
/// 以及无锁帧指标上报。全部实现位于 `engine` 模块；常用类型在此重新导出。
pub mod engine;

pub use engine::animation::{AnimationContext, AnimationListener, Animator, AnimatorSet};
pub use engine::bridge::AnimationContextBridge;
pub use engine::config::RenderConfig;
pub use engine::driver::FrameDriver;
pub use engine::error::{BridgeError, Result};
pub use engine::frame_info::{FRAME_STATS_COUNT, FrameInfo, FrameInfoIndex};
pub use engine::looper::{Looper, ManualLooper, TaskQueue};
pub use engine::metrics::{FrameMetricsObserver, FrameMetricsReporter, ObserverHandle};
pub use engine::scene::{RootRenderNode, TraversalMode};
