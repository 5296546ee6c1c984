//! ### English
//! Per-traversal parameters and results.
//!
//! ### 中文
//! 单次遍历的参数与结果。

use std::sync::Arc;

use dpi::PhysicalPosition;
use log::error;

use crate::engine::config::RenderConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraversalMode {
    /// ### English
    /// UI-synced frame: staging state is pushed and animator membership may change.
    ///
    /// ### 中文
    /// 与 UI 同步的帧：会推送 staging 状态，动画器归属关系可以变化。
    Full,
    /// ### English
    /// Render-thread-only frame: time-based state advances, membership is left alone.
    ///
    /// ### 中文
    /// 仅渲染线程的帧：只推进基于时间的状态，不改变归属关系。
    RtOnly,
}

/// ### English
/// Receives errors raised while a traversal is in progress.
///
/// ### 中文
/// 接收遍历过程中产生的错误。
pub trait ErrorHandler: Send + Sync {
    fn on_error(&self, message: String);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeOutput {
    /// ### English
    /// Some animator is still running; another frame should be scheduled.
    ///
    /// ### 中文
    /// 仍有动画器在运行；需要调度下一帧。
    pub has_animations: bool,
    pub errors: u32,
}

pub struct TreeInfo {
    pub mode: TraversalMode,
    /// ### English
    /// Installed by the root for the duration of one traversal.
    ///
    /// ### 中文
    /// 由根节点在单次遍历期间安装。
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
    /// ### English
    /// Offset added to node positions when recording window positions.
    ///
    /// ### 中文
    /// 记录窗口位置时叠加到节点位置上的偏移。
    pub window_inset: PhysicalPosition<i32>,
    pub update_window_positions: bool,
    pub max_layer_dimension: u32,
    pub out: TreeOutput,
}

impl TreeInfo {
    pub fn new(mode: TraversalMode, config: &RenderConfig) -> Self {
        Self {
            mode,
            error_handler: None,
            window_inset: PhysicalPosition::new(0, 0),
            update_window_positions: false,
            max_layer_dimension: config.max_layer_dimension,
            out: TreeOutput::default(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.mode == TraversalMode::Full
    }

    /// ### English
    /// Counts the error and forwards it to the installed handler, if any.
    ///
    /// ### 中文
    /// 记录该错误，并转交给已安装的处理器（若存在）。
    pub fn report_error(&mut self, message: String) {
        error!("{message}");
        self.out.errors += 1;
        if let Some(handler) = &self.error_handler {
            handler.on_error(message);
        }
    }
}
