//! ### English
//! Render-side frame driver: owns the root node, its animation context and the metrics reporter,
//! and runs one full frame lifecycle per call.
//!
//! ### 中文
//! 渲染侧帧驱动：持有根节点、其动画 context 与指标上报器，每次调用执行一个完整的帧生命周期。

use std::sync::Arc;

use log::{trace, warn};

use crate::engine::animation::AnimationContext;
use crate::engine::bridge::AnimationContextBridge;
use crate::engine::config::RenderConfig;
use crate::engine::error::Result;
use crate::engine::flags::FRAME_INFO_FLAG_RT_ANIMATION;
use crate::engine::frame_info::{FrameInfo, FrameInfoIndex, UI_THREAD_FRAME_INFO_SIZE};
use crate::engine::looper::{Looper, LooperThread, TaskQueue};
use crate::engine::metrics::{FrameMetricsObserver, FrameMetricsReporter, ObserverHandle};
use crate::engine::scene::{RenderingErrorHandler, RootRenderNode, TraversalMode, TreeInfo, TreeOutput};

/// ### English
/// Spawns the owner thread named by `config.owner_thread_name`.
///
/// ### 中文
/// 启动名称为 `config.owner_thread_name` 的 owner 线程。
pub fn spawn_owner_looper(config: &RenderConfig) -> Result<LooperThread> {
    Looper::spawn(config.owner_thread_name.clone())
}

/// ### English
/// Render-thread entry point for one surface.
///
/// Owns the root node, the batching animation context and the metrics reporter. Dropping the
/// driver destroys it.
///
/// ### 中文
/// 单个 surface 的渲染线程入口。
///
/// 持有根节点、批量投递的动画 context 与指标上报器。驱动被 drop 时会执行销毁。
pub struct FrameDriver {
    config: RenderConfig,
    root: Arc<RootRenderNode>,
    bridge: AnimationContextBridge,
    reporter: FrameMetricsReporter,
    frame_info: FrameInfo,
    destroyed: bool,
}

impl FrameDriver {
    /// ### English
    /// Creates a driver whose completions and errors are delivered on `owner`.
    ///
    /// #### Parameters
    /// - `config`: Render configuration; copied.
    /// - `owner`: Owner thread queue.
    /// - `handler`: Rendering error handler run on `owner`.
    ///
    /// ### 中文
    /// 创建驱动；完成事件与错误都在 `owner` 上投递。
    ///
    /// #### 参数
    /// - `config`：渲染配置；会被复制。
    /// - `owner`：owner 线程队列。
    /// - `handler`：在 `owner` 上运行的渲染错误处理器。
    pub fn new(
        config: &RenderConfig,
        owner: Arc<dyn TaskQueue>,
        handler: Arc<dyn RenderingErrorHandler>,
    ) -> Self {
        let root = Arc::new(RootRenderNode::new(owner, handler));
        Self {
            config: config.clone(),
            bridge: AnimationContextBridge::new(root.clone()),
            root,
            reporter: FrameMetricsReporter::new(),
            frame_info: FrameInfo::new(),
            destroyed: false,
        }
    }

    pub fn root(&self) -> &Arc<RootRenderNode> {
        &self.root
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// ### English
    /// Record of the most recently completed frame.
    ///
    /// ### 中文
    /// 最近一次完成的帧记录。
    pub fn last_frame_info(&self) -> &FrameInfo {
        &self.frame_info
    }

    /// ### English
    /// Runs one frame: import UI timings, advance the frame clock, `start_frame`, traverse,
    /// `run_remaining_animations`, then publish the frame record to metrics observers.
    ///
    /// `ui_info[Vsync]` is the frame time for every animator in this frame. `RtOnly` frames are
    /// tagged with `FRAME_INFO_FLAG_RT_ANIMATION`.
    ///
    /// #### Parameters
    /// - `ui_info`: UI-thread block of the frame record (flags, intended vsync, vsync, ...).
    /// - `mode`: `Full` syncs membership; `RtOnly` only advances running animators.
    ///
    /// ### 中文
    /// 执行一帧：导入 UI 计时、推进帧时钟、`start_frame`、遍历、`run_remaining_animations`，
    /// 最后把帧记录发布给指标观察者。
    ///
    /// `ui_info[Vsync]` 即本帧所有动画器使用的帧时间。`RtOnly` 帧会带上
    /// `FRAME_INFO_FLAG_RT_ANIMATION` 标志。
    ///
    /// #### 参数
    /// - `ui_info`：帧记录中 UI 线程部分（标志、预期 vsync、vsync 等）。
    /// - `mode`：`Full` 同步集合归属；`RtOnly` 只推进运行中的动画器。
    pub fn sync_and_draw_frame(
        &mut self,
        ui_info: &[i64; UI_THREAD_FRAME_INFO_SIZE],
        mode: TraversalMode,
    ) -> TreeOutput {
        let mut frame = FrameInfo::new();
        frame.import_ui_thread_info(ui_info);
        frame.mark_sync_queued();
        frame.mark_sync_start();
        if mode == TraversalMode::RtOnly {
            frame.add_flag(FRAME_INFO_FLAG_RT_ANIMATION);
        }

        let vsync_ns = frame.get(FrameInfoIndex::Vsync);
        if vsync_ns < 0 {
            warn!("negative frame time {vsync_ns}ns; animators keep the previous frame time");
        }
        if !self.bridge.base_mut().clock_mut().vsync_received(vsync_ns) {
            trace!("vsync {vsync_ns}ns does not advance the frame clock");
        }

        self.bridge.start_frame(mode);
        let mut info = TreeInfo::new(mode, &self.config);
        self.root.prepare_tree(&mut info, &mut self.bridge);
        self.bridge.run_remaining_animations(&mut info);

        frame.mark_issue_draw_commands_start();
        frame.mark_swap_buffers();
        frame.mark_frame_completed();
        self.reporter.report_frame(&frame);
        self.frame_info = frame;
        info.out
    }

    pub fn pause_animators(&mut self) {
        self.bridge.pause_animators();
    }

    /// ### English
    /// Surface teardown. Force-ends every animator and flushes their completions. Idempotent.
    ///
    /// ### 中文
    /// surface 销毁。强制结束所有动画器并投递其完成事件。可重复调用。
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.bridge.destroy();
    }

    /// ### English
    /// Registers an observer that receives every drawn frame on `queue`.
    ///
    /// Fails with `MismatchedFrameMetricsFormat` when the observer expects a different field count.
    ///
    /// #### Parameters
    /// - `observer`: Held weakly; dropping it stops delivery.
    /// - `queue`: Queue the observer is called on.
    ///
    /// ### 中文
    /// 注册一个观察者，在 `queue` 上接收每个绘制帧。
    ///
    /// 观察者期望的字段数不一致时返回 `MismatchedFrameMetricsFormat`。
    ///
    /// #### 参数
    /// - `observer`：以弱引用持有；drop 后停止投递。
    /// - `queue`：调用观察者所在的队列。
    pub fn add_frame_metrics_observer(
        &self,
        observer: Arc<dyn FrameMetricsObserver>,
        queue: Arc<dyn TaskQueue>,
    ) -> Result<ObserverHandle> {
        self.reporter.add_observer(observer, queue)
    }

    pub fn remove_frame_metrics_observer(&self, handle: ObserverHandle) -> bool {
        self.reporter.remove_observer(handle)
    }

    pub fn frame_metrics_observer_count(&self) -> usize {
        self.reporter.observer_count()
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.destroy();
    }
}
