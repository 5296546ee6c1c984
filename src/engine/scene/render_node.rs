//! ### English
//! Scene graph node and its per-frame traversal.
//!
//! Every node keeps two copies of its state: staging (written by the UI side) and render (read by
//! the render thread). A full traversal copies staging over render; animators then write animated
//! values straight into the render copy.
//!
//! ### 中文
//! 场景图节点及其逐帧遍历。
//!
//! 每个节点保存两份状态：staging（由 UI 侧写入）与 render（由渲染线程读取）。完整遍历会用
//! staging 覆盖 render；随后动画器把动画值直接写入 render 副本。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dpi::PhysicalPosition;

use super::animator_manager::AnimatorManager;
use super::properties::{RenderProperties, RenderProperty};
use super::tree_info::TreeInfo;
use crate::engine::animation::{AnimationContext, RenderNodeAnimator, VectorTarget};

/// ### English
/// Drawing content of a node: child nodes and the vector drawables it draws.
///
/// ### 中文
/// 节点的绘制内容：子节点以及它绘制的矢量图。
#[derive(Clone, Default)]
pub struct DisplayList {
    pub children: Vec<Arc<RenderNode>>,
    pub vector_targets: Vec<Arc<VectorTarget>>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_child(mut self, child: Arc<RenderNode>) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_vector_target(mut self, target: Arc<VectorTarget>) -> Self {
        self.vector_targets.push(target);
        self
    }
}

#[derive(Default)]
struct StagingState {
    properties: RenderProperties,
    display_list: Option<DisplayList>,
}

#[derive(Default)]
struct RenderState {
    properties: RenderProperties,
    display_list: DisplayList,
    window_position: Option<PhysicalPosition<i32>>,
}

pub struct RenderNode {
    name: String,
    staging: Mutex<StagingState>,
    render: Mutex<RenderState>,
    animators: AnimatorManager,
    parent_count: AtomicUsize,
}

impl RenderNode {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            staging: Mutex::new(StagingState::default()),
            render: Mutex::new(RenderState::default()),
            animators: AnimatorManager::new(),
            parent_count: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn staging_properties(&self) -> RenderProperties {
        self.lock_staging().properties
    }

    pub fn mutate_staging_properties(&self, mutate: impl FnOnce(&mut RenderProperties)) {
        mutate(&mut self.lock_staging().properties);
    }

    pub fn set_staging_property(&self, property: RenderProperty, value: f32) {
        self.lock_staging().properties.set(property, value);
    }

    /// ### English
    /// Replaces the display list at the next full traversal.
    ///
    /// ### 中文
    /// 在下一次完整遍历时替换 display list。
    pub fn set_staging_display_list(&self, display_list: DisplayList) {
        self.lock_staging().display_list = Some(display_list);
    }

    pub fn properties(&self) -> RenderProperties {
        self.lock_render().properties
    }

    pub fn property(&self, property: RenderProperty) -> f32 {
        self.lock_render().properties.get(property)
    }

    pub(crate) fn set_animated_property(&self, property: RenderProperty, value: f32) {
        self.lock_render().properties.set(property, value);
    }

    pub fn display_list(&self) -> DisplayList {
        self.lock_render().display_list.clone()
    }

    /// ### English
    /// Position in window coordinates recorded by the last traversal that updated positions.
    ///
    /// ### 中文
    /// 上一次更新位置的遍历所记录的窗口坐标位置。
    pub fn window_position(&self) -> Option<PhysicalPosition<i32>> {
        self.lock_render().window_position
    }

    pub fn add_animator(self: &Arc<Self>, animator: Arc<RenderNodeAnimator>) {
        animator.attach(self);
        self.animators.add_animator(animator);
    }

    pub fn animators(&self) -> &AnimatorManager {
        &self.animators
    }

    pub fn parent_count(&self) -> usize {
        self.parent_count.load(Ordering::Acquire)
    }

    pub fn has_parents(&self) -> bool {
        self.parent_count() > 0
    }

    /// ### English
    /// Traverses this node and its subtree for one frame.
    ///
    /// ### 中文
    /// 对该节点及其子树执行一帧的遍历。
    pub fn prepare_tree<C: AnimationContext + ?Sized>(
        self: &Arc<Self>,
        info: &mut TreeInfo,
        ctx: &mut C,
    ) {
        if info.is_full() {
            // Animators read their start values before staging properties overwrite render ones.
            self.animators.push_staging(ctx);
            self.push_staging_changes();
        }
        if self.animators.has_active_animators() {
            self.run_animators(ctx, info);
        }

        let (properties, display_list) = {
            let mut render = self.lock_render();
            if info.update_window_positions {
                render.window_position = Some(PhysicalPosition::new(
                    info.window_inset.x + render.properties.position.x,
                    info.window_inset.y + render.properties.position.y,
                ));
            }
            (render.properties, render.display_list.clone())
        };

        if properties.layer_exceeds(info.max_layer_dimension) {
            info.report_error(format!(
                "{}: Layer exceeds max dimensions supported by the GPU ({}x{}, max={}x{})",
                self.name,
                properties.size.width,
                properties.size.height,
                info.max_layer_dimension,
                info.max_layer_dimension
            ));
        }

        for target in &display_list.vector_targets {
            target.consume();
        }

        let saved_inset = info.window_inset;
        info.window_inset = PhysicalPosition::new(
            saved_inset.x + properties.position.x,
            saved_inset.y + properties.position.y,
        );
        for child in &display_list.children {
            child.prepare_tree(info, ctx);
        }
        info.window_inset = saved_inset;
    }

    /// ### English
    /// Runs the node's animators for a frame in which the traversal did not reach it.
    ///
    /// ### 中文
    /// 在遍历未到达该节点的帧中运行其动画器。
    pub fn animate_no_damage<C: AnimationContext + ?Sized>(
        self: &Arc<Self>,
        ctx: &mut C,
        info: &mut TreeInfo,
    ) {
        self.run_animators(ctx, info);
    }

    pub fn end_all_active_animators<C: AnimationContext + ?Sized>(&self, ctx: &mut C) {
        self.animators.end_all_active_animators(ctx);
    }

    fn run_animators<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C, info: &mut TreeInfo) {
        if self.animators.animate(ctx) {
            info.out.has_animations = true;
            ctx.base_mut().notify_animations_ran(self);
        } else {
            ctx.base_mut().release_animating_node(self);
        }
    }

    fn push_staging_changes(&self) {
        let (properties, display_list) = {
            let mut staging = self.lock_staging();
            (staging.properties, staging.display_list.take())
        };
        let previous = {
            let mut render = self.lock_render();
            render.properties = properties;
            display_list.map(|list| std::mem::replace(&mut render.display_list, list))
        };
        if let Some(previous) = previous {
            for child in &self.lock_render().display_list.children {
                child.parent_count.fetch_add(1, Ordering::AcqRel);
            }
            for child in &previous.children {
                child.parent_count.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }

    fn lock_staging(&self) -> MutexGuard<'_, StagingState> {
        self.staging.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_render(&self) -> MutexGuard<'_, RenderState> {
        self.render.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::{BaseAnimationContext, Interpolator, start_frame_base};
    use crate::engine::config::RenderConfig;
    use crate::engine::scene::{ErrorHandler, TraversalMode};
    use crate::engine::time::ms_to_ns;
    use dpi::PhysicalSize;

    fn frame(ctx: &mut BaseAnimationContext, frame_time_ms: i64, mode: TraversalMode) {
        ctx.clock_mut().vsync_received(ms_to_ns(frame_time_ms));
        start_frame_base(ctx, mode);
    }

    #[derive(Default)]
    struct CollectErrors(Mutex<Vec<String>>);

    impl ErrorHandler for CollectErrors {
        fn on_error(&self, message: String) {
            self.0.lock().unwrap().push(message);
        }
    }

    #[test]
    fn full_traversal_pushes_staging_display_list() {
        let root = RenderNode::new("root");
        let child = RenderNode::new("child");
        let target = Arc::new(VectorTarget::new("vd", 1));
        target.set_property_change_will_be_consumed(false);
        child.set_staging_display_list(DisplayList::new().with_vector_target(target.clone()));
        root.set_staging_display_list(DisplayList::new().with_child(child.clone()));

        let config = RenderConfig::default();
        let mut ctx = BaseAnimationContext::new();

        let mut info = TreeInfo::new(TraversalMode::RtOnly, &config);
        root.prepare_tree(&mut info, &mut ctx);
        assert!(!child.has_parents());
        assert!(!target.property_change_will_be_consumed());

        let mut info = TreeInfo::new(TraversalMode::Full, &config);
        root.prepare_tree(&mut info, &mut ctx);
        assert_eq!(child.parent_count(), 1);
        assert!(target.property_change_will_be_consumed());

        root.set_staging_display_list(DisplayList::new());
        let mut info = TreeInfo::new(TraversalMode::Full, &config);
        root.prepare_tree(&mut info, &mut ctx);
        assert!(!child.has_parents());
    }

    #[test]
    fn window_positions_accumulate_parent_offsets() {
        let root = RenderNode::new("root");
        let child = RenderNode::new("child");
        root.mutate_staging_properties(|p| p.position = PhysicalPosition::new(10, 20));
        child.mutate_staging_properties(|p| p.position = PhysicalPosition::new(5, 5));
        root.set_staging_display_list(DisplayList::new().with_child(child.clone()));

        let config = RenderConfig::default();
        let mut ctx = BaseAnimationContext::new();
        let mut info = TreeInfo::new(TraversalMode::Full, &config);
        info.update_window_positions = true;
        info.window_inset = PhysicalPosition::new(-10, -20);
        root.prepare_tree(&mut info, &mut ctx);

        assert_eq!(root.window_position(), Some(PhysicalPosition::new(0, 0)));
        assert_eq!(child.window_position(), Some(PhysicalPosition::new(5, 5)));
        assert_eq!(info.window_inset, PhysicalPosition::new(-10, -20));
    }

    #[test]
    fn oversized_layer_is_reported() {
        let node = RenderNode::new("huge");
        node.mutate_staging_properties(|p| {
            p.has_layer = true;
            p.size = PhysicalSize::new(5000, 10);
        });
        let config = RenderConfig::default();
        let handler = Arc::new(CollectErrors::default());
        let mut ctx = BaseAnimationContext::new();
        let mut info = TreeInfo::new(TraversalMode::Full, &config);
        info.error_handler = Some(handler.clone());
        node.prepare_tree(&mut info, &mut ctx);

        assert_eq!(info.out.errors, 1);
        assert_eq!(
            handler.0.lock().unwrap().as_slice(),
            ["huge: Layer exceeds max dimensions supported by the GPU (5000x10, max=4096x4096)"]
        );
    }

    #[test]
    fn node_animator_runs_through_context() {
        let node = RenderNode::new("animated");
        let animator = RenderNodeAnimator::new(RenderProperty::Alpha, 0.0);
        animator.set_duration_ms(100);
        animator.set_interpolator(Interpolator::Linear);
        node.add_animator(animator.clone());
        animator.start();
        assert_eq!(node.staging_properties().alpha, 0.0);

        let config = RenderConfig::default();
        let mut ctx = BaseAnimationContext::new();
        ctx.add_animating_node(node.clone());

        frame(&mut ctx, 1_000, TraversalMode::Full);
        let mut info = TreeInfo::new(TraversalMode::Full, &config);
        node.prepare_tree(&mut info, &mut ctx);
        assert!(info.out.has_animations);
        assert_eq!(node.property(RenderProperty::Alpha), 1.0);

        // Not reached by traversal: the context runs it as a remaining animation.
        frame(&mut ctx, 1_050, TraversalMode::RtOnly);
        let mut info = TreeInfo::new(TraversalMode::RtOnly, &config);
        ctx.run_remaining_animations(&mut info);
        assert_eq!(node.property(RenderProperty::Alpha), 0.5);
        assert_eq!(ctx.animating_node_count(), 1);

        frame(&mut ctx, 1_100, TraversalMode::RtOnly);
        let mut info = TreeInfo::new(TraversalMode::RtOnly, &config);
        ctx.run_remaining_animations(&mut info);
        assert!(!info.out.has_animations);
        assert_eq!(ctx.animating_node_count(), 0);
    }

    #[test]
    fn destroy_force_ends_active_animators() {
        let node = RenderNode::new("animated");
        let animator = RenderNodeAnimator::new(RenderProperty::ScaleX, 2.0);
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        animator.set_listener(Some(Arc::new(
            move |_: Option<&dyn crate::engine::animation::Animator>| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )));
        node.add_animator(animator.clone());
        animator.start();

        let config = RenderConfig::default();
        let mut ctx = BaseAnimationContext::new();
        frame(&mut ctx, 10, TraversalMode::Full);
        let mut info = TreeInfo::new(TraversalMode::Full, &config);
        node.prepare_tree(&mut info, &mut ctx);

        ctx.destroy();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!node.animators().has_animators());
    }
}
