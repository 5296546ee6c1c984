//! ### English
//! Per-frame lifecycle record (`FrameInfo`).
//!
//! The field order below is a stable contract: frame metrics observers receive the raw
//! `[i64; FRAME_STATS_COUNT]` payload and index it positionally.
//!
//! ### 中文
//! 单帧生命周期记录（`FrameInfo`）。
//!
//! 下面的字段顺序是稳定契约：帧指标观察者收到原始 `[i64; FRAME_STATS_COUNT]` 数据后按位置索引。

use crate::engine::time::monotonic_now_ns;

/// ### English
/// Number of `i64` fields in one frame record (and in one frame metrics sample).
///
/// ### 中文
/// 单帧记录（以及单个帧指标样本）中 `i64` 字段的数量。
pub const FRAME_STATS_COUNT: usize = 16;

/// ### English
/// Number of leading fields produced by the UI thread (`Flags` through `DrawStart`).
///
/// ### 中文
/// 由 UI 线程产生的前置字段数量（`Flags` 到 `DrawStart`）。
pub const UI_THREAD_FRAME_INFO_SIZE: usize = 9;

#[repr(usize)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameInfoIndex {
    Flags = 0,
    IntendedVsync,
    Vsync,
    OldestInputEvent,
    NewestInputEvent,
    HandleInputStart,
    AnimationStart,
    PerformTraversalsStart,
    DrawStart,
    SyncQueued,
    SyncStart,
    IssueDrawCommandsStart,
    SwapBuffers,
    FrameCompleted,
    DequeueBufferDuration,
    QueueBufferDuration,
}

impl FrameInfoIndex {
    pub const ALL: [FrameInfoIndex; FRAME_STATS_COUNT] = [
        Self::Flags,
        Self::IntendedVsync,
        Self::Vsync,
        Self::OldestInputEvent,
        Self::NewestInputEvent,
        Self::HandleInputStart,
        Self::AnimationStart,
        Self::PerformTraversalsStart,
        Self::DrawStart,
        Self::SyncQueued,
        Self::SyncStart,
        Self::IssueDrawCommandsStart,
        Self::SwapBuffers,
        Self::FrameCompleted,
        Self::DequeueBufferDuration,
        Self::QueueBufferDuration,
    ];

    #[inline]
    pub const fn as_usize(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        FRAME_INFO_NAMES[self as usize]
    }
}

pub const FRAME_INFO_NAMES: [&str; FRAME_STATS_COUNT] = [
    "Flags",
    "IntendedVsync",
    "Vsync",
    "OldestInputEvent",
    "NewestInputEvent",
    "HandleInputStart",
    "AnimationStart",
    "PerformTraversalsStart",
    "DrawStart",
    "SyncQueued",
    "SyncStart",
    "IssueDrawCommandsStart",
    "SwapBuffers",
    "FrameCompleted",
    "DequeueBufferDuration",
    "QueueBufferDuration",
];

/// ### English
/// Writes the UI-thread block of a frame record.
///
/// The builder zeroes the block on construction; `set_vsync` also stamps the intermediate UI
/// milestones with the vsync time so naive durations come out as `0` instead of huge values.
///
/// ### 中文
/// 写入帧记录中的 UI 线程部分。
///
/// 构造时会将该部分清零；`set_vsync` 同时把 UI 中间阶段的时间戳设为 vsync 时间，
/// 这样简单的耗时计算结果为 `0`，而不是一个巨大的值。
pub struct UiFrameInfoBuilder<'a> {
    buffer: &'a mut [i64; UI_THREAD_FRAME_INFO_SIZE],
}

impl<'a> UiFrameInfoBuilder<'a> {
    pub fn new(buffer: &'a mut [i64; UI_THREAD_FRAME_INFO_SIZE]) -> Self {
        buffer.fill(0);
        Self { buffer }
    }

    pub fn set_vsync(self, vsync_ns: i64, intended_vsync_ns: i64) -> Self {
        self.buffer[FrameInfoIndex::Vsync.as_usize()] = vsync_ns;
        self.buffer[FrameInfoIndex::IntendedVsync.as_usize()] = intended_vsync_ns;
        for index in [
            FrameInfoIndex::HandleInputStart,
            FrameInfoIndex::AnimationStart,
            FrameInfoIndex::PerformTraversalsStart,
            FrameInfoIndex::DrawStart,
        ] {
            self.buffer[index.as_usize()] = vsync_ns;
        }
        self
    }

    pub fn add_flag(self, flag: i64) -> Self {
        self.buffer[FrameInfoIndex::Flags.as_usize()] |= flag;
        self
    }
}

/// ### English
/// One frame's lifecycle milestones, in `FrameInfoIndex` order.
///
/// ### 中文
/// 单帧生命周期里程碑，按 `FrameInfoIndex` 顺序存储。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    fields: [i64; FRAME_STATS_COUNT],
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self {
            fields: [0; FRAME_STATS_COUNT],
        }
    }
}

impl FrameInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Copies the UI-thread block verbatim; render-thread fields are left untouched.
    ///
    /// ### 中文
    /// 原样拷贝 UI 线程部分；渲染线程字段保持不变。
    pub fn import_ui_thread_info(&mut self, info: &[i64; UI_THREAD_FRAME_INFO_SIZE]) {
        self.fields[..UI_THREAD_FRAME_INFO_SIZE].copy_from_slice(info);
    }

    pub fn mark_sync_queued(&mut self) {
        self.set(FrameInfoIndex::SyncQueued, monotonic_now_ns());
    }

    pub fn mark_sync_start(&mut self) {
        self.set(FrameInfoIndex::SyncStart, monotonic_now_ns());
    }

    pub fn mark_issue_draw_commands_start(&mut self) {
        self.set(FrameInfoIndex::IssueDrawCommandsStart, monotonic_now_ns());
    }

    pub fn mark_swap_buffers(&mut self) {
        self.set(FrameInfoIndex::SwapBuffers, monotonic_now_ns());
    }

    pub fn mark_frame_completed(&mut self) {
        self.set(FrameInfoIndex::FrameCompleted, monotonic_now_ns());
    }

    pub fn add_flag(&mut self, flag: i64) {
        self.fields[FrameInfoIndex::Flags.as_usize()] |= flag;
    }

    pub fn has_flag(&self, flag: i64) -> bool {
        self.fields[FrameInfoIndex::Flags.as_usize()] & flag != 0
    }

    #[inline]
    pub fn set(&mut self, index: FrameInfoIndex, value: i64) {
        self.fields[index.as_usize()] = value;
    }

    #[inline]
    pub fn get(&self, index: FrameInfoIndex) -> i64 {
        self.fields[index.as_usize()]
    }

    /// ### English
    /// Positional access for consumers that only know raw indices; out of range reads `0`.
    ///
    /// ### 中文
    /// 供只知道原始索引的消费者按位置访问；越界读取返回 `0`。
    pub fn get_raw(&self, index: usize) -> i64 {
        self.fields.get(index).copied().unwrap_or(0)
    }

    pub fn data(&self) -> &[i64; FRAME_STATS_COUNT] {
        &self.fields
    }

    /// ### English
    /// Duration between two milestones, clamped to `0`.
    ///
    /// A range that spans `SyncQueued` excludes the time the frame sat stalled between
    /// `SyncQueued` and `SyncStart`; that stall is attributed to the previous frame.
    ///
    /// ### 中文
    /// 两个里程碑之间的耗时，下限为 `0`。
    ///
    /// 若区间跨越 `SyncQueued`，会扣除帧在 `SyncQueued` 与 `SyncStart` 之间的停滞时间；
    /// 该停滞计入上一帧。
    pub fn duration(&self, start: FrameInfoIndex, end: FrameInfoIndex) -> i64 {
        let start_time = self.get(start);
        let end_time = self.get(end);
        let mut gap = if start_time > 0 {
            end_time - start_time
        } else {
            0
        };
        if end > FrameInfoIndex::SyncQueued && start < FrameInfoIndex::SyncQueued {
            let stall = self.get(FrameInfoIndex::SyncStart) - self.get(FrameInfoIndex::SyncQueued);
            if stall > 0 {
                gap -= stall;
            }
        }
        gap.max(0)
    }

    pub fn total_duration(&self) -> i64 {
        self.duration(FrameInfoIndex::IntendedVsync, FrameInfoIndex::FrameCompleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flags::{FRAME_INFO_FLAG_RT_ANIMATION, FRAME_INFO_FLAG_WINDOW_LAYOUT_CHANGED};

    #[test]
    fn names_follow_index_order() {
        for (position, index) in FrameInfoIndex::ALL.iter().enumerate() {
            assert_eq!(index.as_usize(), position);
        }
        assert_eq!(FrameInfoIndex::QueueBufferDuration.name(), "QueueBufferDuration");
        assert_eq!(FrameInfoIndex::SyncQueued.as_usize(), UI_THREAD_FRAME_INFO_SIZE);
    }

    #[test]
    fn builder_stamps_ui_milestones_with_vsync() {
        let mut ui = [7; UI_THREAD_FRAME_INFO_SIZE];
        UiFrameInfoBuilder::new(&mut ui)
            .set_vsync(1_000, 900)
            .add_flag(FRAME_INFO_FLAG_WINDOW_LAYOUT_CHANGED);

        let mut info = FrameInfo::new();
        info.import_ui_thread_info(&ui);
        assert_eq!(info.get(FrameInfoIndex::IntendedVsync), 900);
        assert_eq!(info.get(FrameInfoIndex::DrawStart), 1_000);
        assert_eq!(info.get(FrameInfoIndex::OldestInputEvent), 0);
        assert!(info.has_flag(FRAME_INFO_FLAG_WINDOW_LAYOUT_CHANGED));
        assert!(!info.has_flag(FRAME_INFO_FLAG_RT_ANIMATION));
        assert_eq!(info.duration(FrameInfoIndex::Vsync, FrameInfoIndex::DrawStart), 0);
    }

    #[test]
    fn duration_subtracts_sync_stall() {
        let mut info = FrameInfo::new();
        info.set(FrameInfoIndex::IntendedVsync, 100);
        info.set(FrameInfoIndex::SyncQueued, 200);
        info.set(FrameInfoIndex::SyncStart, 250);
        info.set(FrameInfoIndex::FrameCompleted, 400);
        assert_eq!(info.total_duration(), 250);
        assert_eq!(info.duration(FrameInfoIndex::SyncStart, FrameInfoIndex::FrameCompleted), 150);
    }

    #[test]
    fn duration_is_zero_without_start() {
        let mut info = FrameInfo::new();
        info.set(FrameInfoIndex::FrameCompleted, 400);
        assert_eq!(info.total_duration(), 0);
        assert_eq!(info.get_raw(FRAME_STATS_COUNT), 0);
    }
}
