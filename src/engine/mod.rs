/// ### English
/// Render bridge modules: task queues, animators, scene traversal, the animation context bridge
/// and frame metrics.
///
/// ### 中文
/// 渲染桥接模块：任务队列、动画器、场景遍历、动画 context 桥接以及帧指标。
pub mod animation;
pub mod bridge;
pub mod config;
pub mod driver;
pub mod error;
pub mod flags;
pub mod frame_info;
pub mod looper;
pub mod metrics;
pub mod scene;
pub mod time;
