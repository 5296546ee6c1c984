//! ### English
//! Animation context specialized for a root scene node.
//!
//! Per frame: `start_frame` → traversal → `run_remaining_animations`. Completion callbacks
//! raised during the frame are batched and posted to the owner thread as one message at the end
//! of `run_remaining_animations`, so observers see all finishes of one frame before any of the
//! next.
//!
//! ### 中文
//! 针对根场景节点特化的动画 context。
//!
//! 每帧流程：`start_frame` → 遍历 → `run_remaining_animations`。帧内产生的完成回调会被批量
//! 收集，并在 `run_remaining_animations` 末尾作为一条消息投递到 owner 线程，
//! 因此观察者总是先看到某一帧的全部完成事件，再看到下一帧的。

use std::sync::Arc;

use log::trace;

use crate::engine::animation::{
    AnimationContext, AnimationListener, Animator, BaseAnimationContext, OnFinishedEvent,
    destroy_base, run_remaining_animations_base, start_frame_base,
};
use crate::engine::scene::{RootRenderNode, TraversalMode, TreeInfo};

/// ### English
/// Render-thread animation context of one root node; batches completions per frame.
///
/// ### 中文
/// 单个根节点的渲染线程动画 context；按帧批量收集完成事件。
pub struct AnimationContextBridge {
    base: BaseAnimationContext,
    root: Arc<RootRenderNode>,
    pending_events: Vec<OnFinishedEvent>,
}

impl AnimationContextBridge {
    /// ### English
    /// Creates the context for `root`.
    ///
    /// #### Parameters
    /// - `root`: Root whose pending work is attached on every full `start_frame`.
    ///
    /// ### 中文
    /// 为 `root` 创建 context。
    ///
    /// #### 参数
    /// - `root`：每次完整 `start_frame` 时挂接其待处理工作的根节点。
    pub fn new(root: Arc<RootRenderNode>) -> Self {
        Self {
            base: BaseAnimationContext::new(),
            root,
            pending_events: Vec::new(),
        }
    }

    pub fn root(&self) -> &Arc<RootRenderNode> {
        &self.root
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events.len()
    }

    /// ### English
    /// Posts the frame's batched completions as a single owner-thread message.
    ///
    /// ### 中文
    /// 把本帧批量收集的完成事件作为一条 owner 线程消息投递出去。
    fn post_on_finished_events(&mut self) {
        if self.pending_events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending_events);
        trace!("posting {} animation finished events", events.len());
        self.root.send_message(Box::new(move || {
            for event in events {
                event.deliver();
            }
        }));
    }
}

impl AnimationContext for AnimationContextBridge {
    fn base(&self) -> &BaseAnimationContext {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseAnimationContext {
        &mut self.base
    }

    fn start_frame(&mut self, mode: TraversalMode) {
        if mode == TraversalMode::Full {
            let root = self.root.clone();
            root.do_attach_animating_nodes(self);
            root.attach_pending_vector_drawable_animators();
        }
        start_frame_base(self, mode);
    }

    fn run_remaining_animations(&mut self, info: &mut TreeInfo) {
        run_remaining_animations_base(self, info);
        let root = self.root.clone();
        root.run_vector_drawable_animators(self, info);
        self.post_on_finished_events();
    }

    fn call_on_finished(&mut self, animator: Arc<dyn Animator>, listener: Arc<dyn AnimationListener>) {
        self.pending_events.push(OnFinishedEvent::new(animator, listener));
    }

    fn pause_animators(&mut self) {
        self.root.pause_animators();
    }

    fn destroy(&mut self) {
        destroy_base(self);
        self.root.detach_animators();
        self.root.destroy();
        self.post_on_finished_events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::{AnimatorSet, PropertyAnimator, VectorTarget};
    use crate::engine::config::RenderConfig;
    use crate::engine::looper::ManualLooper;
    use crate::engine::scene::{DisplayList, PanicOnRenderingError};
    use crate::engine::time::ms_to_ns;
    use std::sync::Mutex;

    fn recording_listener(
        log: &Arc<Mutex<Vec<&'static str>>>,
        label: &'static str,
    ) -> Arc<dyn AnimationListener> {
        let log = log.clone();
        Arc::new(move |_: Option<&dyn Animator>| log.lock().unwrap().push(label))
    }

    fn set_with_duration(duration_ms: i64) -> Arc<AnimatorSet> {
        let set = AnimatorSet::new(Arc::new(VectorTarget::new("vd", 1)));
        set.add_property_animator(PropertyAnimator::new(0, 0.0, 1.0, duration_ms));
        set
    }

    fn run_frame(bridge: &mut AnimationContextBridge, frame_time_ms: i64, mode: TraversalMode) {
        let config = RenderConfig::default();
        bridge.base_mut().clock_mut().vsync_received(ms_to_ns(frame_time_ms));
        bridge.start_frame(mode);
        let mut info = TreeInfo::new(mode, &config);
        let root = bridge.root().clone();
        root.prepare_tree(&mut info, bridge);
        bridge.run_remaining_animations(&mut info);
    }

    #[test]
    fn finishes_of_one_frame_arrive_in_one_message() {
        let owner = ManualLooper::new();
        let root = Arc::new(RootRenderNode::new(owner.clone(), Arc::new(PanicOnRenderingError)));
        let mut bridge = AnimationContextBridge::new(root.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = set_with_duration(100);
        let second = set_with_duration(100);
        root.node().set_staging_display_list(
            DisplayList::new()
                .with_vector_target(first.target().clone())
                .with_vector_target(second.target().clone()),
        );
        for (set, label) in [(&first, "first"), (&second, "second")] {
            set.start(Some(recording_listener(&log, label)));
            root.add_vector_drawable_animator(set.clone());
        }

        run_frame(&mut bridge, 10, TraversalMode::Full);
        assert_eq!(root.running_count(), 2);
        assert_eq!(owner.pending_count(), 0);

        run_frame(&mut bridge, 200, TraversalMode::RtOnly);
        assert_eq!(root.running_count(), 0);
        assert_eq!(bridge.pending_event_count(), 0);
        assert_eq!(owner.pending_count(), 1);
        assert!(log.lock().unwrap().is_empty());

        owner.run_pending();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn partial_frames_do_not_attach_pending_sets() {
        let owner = ManualLooper::new();
        let root = Arc::new(RootRenderNode::new(owner, Arc::new(PanicOnRenderingError)));
        let mut bridge = AnimationContextBridge::new(root.clone());
        let set = set_with_duration(100);
        set.start(None);
        root.add_vector_drawable_animator(set.clone());

        run_frame(&mut bridge, 10, TraversalMode::RtOnly);
        assert!(root.is_pending(&set));
        run_frame(&mut bridge, 20, TraversalMode::Full);
        assert!(!root.is_pending(&set));
    }
}
