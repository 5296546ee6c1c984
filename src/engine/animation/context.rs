//! ### English
//! Animation engine base: frame time, animating node bookkeeping and the overridable per-frame
//! hooks.
//!
//! Specialized contexts (see `engine::bridge`) embed a [`BaseAnimationContext`] and override the
//! hooks of [`AnimationContext`]; the default behavior is available to them through the
//! `*_base` functions so an override can run "super" first or last.
//!
//! ### 中文
//! 动画引擎基础部分：帧时间、动画节点登记，以及可覆盖的逐帧钩子。
//!
//! 特化的 context（见 `engine::bridge`）内嵌 [`BaseAnimationContext`] 并覆盖 [`AnimationContext`]
//! 的钩子；默认行为通过 `*_base` 函数提供，覆盖实现可以先或后调用这些“父类”逻辑。

use std::sync::Arc;

use log::trace;

use super::listener::{AnimationListener, Animator, OnFinishedEvent};
use crate::engine::scene::{RenderNode, TraversalMode, TreeInfo};
use crate::engine::time::FrameClock;

pub trait AnimationContext {
    fn base(&self) -> &BaseAnimationContext;

    fn base_mut(&mut self) -> &mut BaseAnimationContext;

    /// ### English
    /// Frame time captured by the last `start_frame`, in milliseconds.
    ///
    /// ### 中文
    /// 上一次 `start_frame` 捕获的帧时间（毫秒）。
    fn frame_time_ms(&self) -> i64 {
        self.base().frame_time_ms()
    }

    fn add_animating_node(&mut self, node: Arc<RenderNode>) {
        self.base_mut().add_animating_node(node);
    }

    fn start_frame(&mut self, mode: TraversalMode) {
        start_frame_base(self, mode);
    }

    /// ### English
    /// Runs animators of nodes that the traversal did not reach this frame.
    ///
    /// ### 中文
    /// 运行本帧遍历未到达节点上的动画器。
    fn run_remaining_animations(&mut self, info: &mut TreeInfo) {
        run_remaining_animations_base(self, info);
    }

    fn call_on_finished(&mut self, animator: Arc<dyn Animator>, listener: Arc<dyn AnimationListener>) {
        OnFinishedEvent::new(animator, listener).deliver();
    }

    fn pause_animators(&mut self) {}

    fn destroy(&mut self) {
        destroy_base(self);
    }
}

/// ### English
/// State shared by every animation context: the frame clock and the animating node lists.
///
/// Nodes registered for the next frame are rotated into the current frame by `start_frame`;
/// nodes still in the current list after traversal are run by `run_remaining_animations`.
///
/// ### 中文
/// 所有动画 context 共享的状态：帧时钟与动画节点列表。
///
/// 为下一帧登记的节点会在 `start_frame` 时轮转进当前帧；遍历后仍留在当前列表中的节点由
/// `run_remaining_animations` 运行。
#[derive(Default)]
pub struct BaseAnimationContext {
    clock: FrameClock,
    frame_time_ms: i64,
    current_frame: Vec<Arc<RenderNode>>,
    next_frame: Vec<Arc<RenderNode>>,
}

impl BaseAnimationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn frame_time_ms(&self) -> i64 {
        self.frame_time_ms
    }

    pub fn add_animating_node(&mut self, node: Arc<RenderNode>) {
        if !contains(&self.current_frame, &node) && !contains(&self.next_frame, &node) {
            self.next_frame.push(node);
        }
    }

    /// ### English
    /// The node ran its animators this frame and still has some: keep it for the next frame.
    ///
    /// ### 中文
    /// 该节点本帧已运行动画器且仍有剩余：保留到下一帧。
    pub fn notify_animations_ran(&mut self, node: &Arc<RenderNode>) {
        self.current_frame.retain(|other| !Arc::ptr_eq(other, node));
        if !contains(&self.next_frame, node) {
            self.next_frame.push(node.clone());
        }
    }

    pub fn release_animating_node(&mut self, node: &Arc<RenderNode>) {
        self.current_frame.retain(|other| !Arc::ptr_eq(other, node));
        self.next_frame.retain(|other| !Arc::ptr_eq(other, node));
    }

    pub fn animating_node_count(&self) -> usize {
        self.current_frame.len() + self.next_frame.len()
    }
}

impl AnimationContext for BaseAnimationContext {
    fn base(&self) -> &BaseAnimationContext {
        self
    }

    fn base_mut(&mut self) -> &mut BaseAnimationContext {
        self
    }
}

fn contains(nodes: &[Arc<RenderNode>], node: &Arc<RenderNode>) -> bool {
    nodes.iter().any(|other| Arc::ptr_eq(other, node))
}

/// ### English
/// Captures the frame time and rotates next-frame nodes into the current frame.
///
/// ### 中文
/// 捕获帧时间，并将下一帧节点轮转进当前帧。
pub fn start_frame_base<C: AnimationContext + ?Sized>(ctx: &mut C, _mode: TraversalMode) {
    let base = ctx.base_mut();
    base.frame_time_ms = base.clock.frame_time_ms();
    let mut next = std::mem::take(&mut base.next_frame);
    base.current_frame.append(&mut next);
}

pub fn run_remaining_animations_base<C: AnimationContext + ?Sized>(
    ctx: &mut C,
    info: &mut TreeInfo,
) {
    let nodes = std::mem::take(&mut ctx.base_mut().current_frame);
    trace!("running animators of {} unreached nodes", nodes.len());
    for node in nodes {
        node.animate_no_damage(ctx, info);
    }
}

/// ### English
/// Force-ends every animator still registered with the context and drops all node registrations.
///
/// ### 中文
/// 强制结束仍登记在 context 中的所有动画器，并清空全部节点登记。
pub fn destroy_base<C: AnimationContext + ?Sized>(ctx: &mut C) {
    start_frame_base(ctx, TraversalMode::RtOnly);
    let nodes = std::mem::take(&mut ctx.base_mut().current_frame);
    for node in nodes {
        node.end_all_active_animators(ctx);
    }
}
