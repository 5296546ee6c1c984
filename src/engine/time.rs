//! ### English
//! Monotonic time helpers and the frame clock used by the animation engine.
//!
//! ### 中文
//! 单调时钟工具，以及动画引擎使用的帧时钟。

use std::sync::OnceLock;
use std::time::Instant;

pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// ### English
/// Nanoseconds elapsed on a process-wide monotonic timeline.
///
/// The timeline starts at the first call, so values are always positive and comparable across
/// threads.
///
/// ### 中文
/// 进程级单调时间线上经过的纳秒数。
///
/// 时间线从首次调用开始，因此数值始终为正，且可以跨线程比较。
pub fn monotonic_now_ns() -> i64 {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let origin = *ORIGIN.get_or_init(Instant::now);
    // Offset by one so the first reading is never zero (zero means "unset" in frame records).
    i64::try_from(origin.elapsed().as_nanos())
        .unwrap_or(i64::MAX)
        .saturating_add(1)
}

#[inline]
pub const fn ns_to_ms(ns: i64) -> i64 {
    ns / NANOS_PER_MILLI
}

#[inline]
pub const fn ms_to_ns(ms: i64) -> i64 {
    ms.saturating_mul(NANOS_PER_MILLI)
}

/// ### English
/// Frame clock fed from vsync timestamps.
///
/// Animators read the frame time instead of the wall clock so every animator in one frame
/// observes the same instant.
///
/// ### 中文
/// 由 vsync 时间戳驱动的帧时钟。
///
/// 动画器读取帧时间而不是墙钟时间，从而保证同一帧内所有动画器看到同一个时刻。
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    frame_time_ns: i64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Records a new vsync. Returns `false` (and ignores it) if it is older than the current
    /// frame time.
    ///
    /// ### 中文
    /// 记录新的 vsync。若其早于当前帧时间，则忽略并返回 `false`。
    pub fn vsync_received(&mut self, vsync_ns: i64) -> bool {
        if vsync_ns > self.frame_time_ns {
            self.frame_time_ns = vsync_ns;
            true
        } else {
            false
        }
    }

    pub fn frame_time_ns(&self) -> i64 {
        self.frame_time_ns
    }

    pub fn frame_time_ms(&self) -> i64 {
        ns_to_ms(self.frame_time_ns)
    }
}
