//! ### English
//! Bitflags stored in the `Flags` field of a `FrameInfo` record.
//!
//! These travel to frame metrics observers as part of the raw `i64` timing payload, so the bit
//! positions are part of the reporting contract.
//!
//! ### 中文
//! 存放在 `FrameInfo` 记录 `Flags` 字段中的位标志（bitflags）。
//!
//! 这些位会作为原始 `i64` 计时数据的一部分传给帧指标观察者，因此位的位置属于上报契约。

/// ### English
/// The window layout changed during this frame (first frame after a resize/relayout).
///
/// ### 中文
/// 本帧期间窗口布局发生变化（resize/重新布局后的第一帧）。
pub const FRAME_INFO_FLAG_WINDOW_LAYOUT_CHANGED: i64 = 1 << 0;

/// ### English
/// The frame was produced by the render thread alone to pulse animations (no UI sync).
///
/// ### 中文
/// 该帧仅由渲染线程为推进动画而产生（没有 UI 同步）。
pub const FRAME_INFO_FLAG_RT_ANIMATION: i64 = 1 << 1;

/// ### English
/// The frame was drawn through a surface canvas instead of the hardware pipeline.
///
/// ### 中文
/// 该帧通过 surface canvas 绘制，而不是硬件管线。
pub const FRAME_INFO_FLAG_SURFACE_CANVAS: i64 = 1 << 2;

/// ### English
/// The frame was skipped (nothing was drawn). Observers usually ignore its durations.
///
/// ### 中文
/// 该帧被跳过（没有绘制任何内容）。观察者通常会忽略其耗时数据。
pub const FRAME_INFO_FLAG_SKIPPED_FRAME: i64 = 1 << 3;
