//! ### English
//! Float property animators attached to scene nodes.
//!
//! ### 中文
//! 挂载在场景节点上的浮点属性动画器。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::animator::{AnimatorCore, AnimatorTarget, PlayState, StagingRequest};
use super::context::AnimationContext;
use super::interpolator::Interpolator;
use super::listener::{AnimationListener, Animator};
use crate::engine::scene::{RenderNode, RenderProperty};

struct PropertyState {
    core: AnimatorCore,
    staging_target: Option<Weak<RenderNode>>,
    target: Option<Weak<RenderNode>>,
    update_staging_on_push: bool,
}

/// ### English
/// Writes animated values into the target node's render properties.
///
/// ### 中文
/// 把动画值写入目标节点的渲染属性。
struct NodeSink {
    node: Option<Arc<RenderNode>>,
    property: RenderProperty,
}

impl AnimatorTarget for NodeSink {
    fn set_value(&mut self, value: f32) {
        if let Some(node) = &self.node {
            node.set_animated_property(self.property, value);
        }
    }
}

/// ### English
/// Animates one float property of a scene node towards `final_value`.
///
/// The node holds its animators strongly; the animator only keeps a weak link back to the node.
///
/// ### 中文
/// 把场景节点的一个 float 属性动画到 `final_value`。
///
/// 节点强持有其动画器；动画器只保留指回节点的弱引用。
pub struct RenderNodeAnimator {
    property: RenderProperty,
    state: Mutex<PropertyState>,
    listener: Mutex<Option<Arc<dyn AnimationListener>>>,
}

impl RenderNodeAnimator {
    pub fn new(property: RenderProperty, final_value: f32) -> Arc<Self> {
        Arc::new(Self {
            property,
            state: Mutex::new(PropertyState {
                core: AnimatorCore::new(final_value),
                staging_target: None,
                target: None,
                update_staging_on_push: false,
            }),
            listener: Mutex::new(None),
        })
    }

    pub fn property(&self) -> RenderProperty {
        self.property
    }

    pub fn set_duration_ms(&self, duration_ms: i64) {
        self.lock_state().core.set_duration_ms(duration_ms);
    }

    pub fn set_start_delay_ms(&self, start_delay_ms: i64) {
        self.lock_state().core.set_start_delay_ms(start_delay_ms);
    }

    pub fn set_interpolator(&self, interpolator: Interpolator) {
        self.lock_state().core.set_interpolator(interpolator);
    }

    pub fn set_start_value(&self, value: f32) {
        self.lock_state().core.set_start_value(value);
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn AnimationListener>>) {
        *self.lock_listener() = listener;
    }

    pub fn listener(&self) -> Option<Arc<dyn AnimationListener>> {
        self.lock_listener().clone()
    }

    pub(crate) fn attach(&self, node: &Arc<RenderNode>) {
        self.lock_state().staging_target = Some(Arc::downgrade(node));
    }

    pub fn start(&self) {
        self.request(StagingRequest::Start);
    }

    pub fn reverse(&self) {
        self.request(StagingRequest::Reverse);
    }

    pub fn reset(&self) {
        self.request(StagingRequest::Reset);
    }

    pub fn cancel(&self) {
        self.request(StagingRequest::Cancel);
    }

    pub fn end(&self) {
        self.request(StagingRequest::End);
    }

    fn request(&self, request: StagingRequest) {
        let mut state = self.lock_state();
        state.core.request(request);
        if state.core.staging_play_state() == PlayState::Running {
            // The UI side observes the final value while the render thread animates towards it.
            let final_value = state.core.final_value();
            match state.staging_target.as_ref().and_then(Weak::upgrade) {
                Some(node) => node.set_staging_property(self.property, final_value),
                None => state.update_staging_on_push = true,
            }
        }
    }

    pub fn staging_play_state(&self) -> PlayState {
        self.lock_state().core.staging_play_state()
    }

    pub fn push_staging<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) {
        let frame_time_ms = ctx.frame_time_ms();
        let notify = {
            let mut state = self.lock_state();
            if let Some(staging) = state.staging_target.take() {
                state.target = Some(staging);
            }
            let target = state.target.as_ref().and_then(Weak::upgrade);
            let property = self.property;
            let notify = state.core.push_staging(frame_time_ms, || {
                target.as_ref().map_or(0.0, |node| node.property(property))
            });
            if state.update_staging_on_push
                && let Some(node) = &target
            {
                node.set_staging_property(property, state.core.final_value());
                state.update_staging_on_push = false;
            }
            notify
        };
        if notify {
            self.call_on_finished_listener(ctx);
        }
    }

    /// ### English
    /// Advances to the context's frame time. Returns `true` once finished.
    ///
    /// ### 中文
    /// 推进到 context 的帧时间。结束后返回 `true`。
    pub fn animate<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) -> bool {
        let frame_time_ms = ctx.frame_time_ms();
        let step = {
            let mut state = self.lock_state();
            let mut sink = NodeSink {
                node: state.target.as_ref().and_then(Weak::upgrade),
                property: self.property,
            };
            state.core.animate(frame_time_ms, &mut sink)
        };
        if step.notify {
            self.call_on_finished_listener(ctx);
        }
        step.finished
    }

    pub fn force_end_now<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) {
        let notify = self.lock_state().core.force_end_now();
        if notify {
            self.call_on_finished_listener(ctx);
        }
    }

    /// ### English
    /// Invokes the listener synchronously on the calling thread.
    ///
    /// ### 中文
    /// 在调用线程上同步调用监听器。
    pub(crate) fn notify_listener_now(self: &Arc<Self>) {
        if let Some(listener) = self.listener() {
            let animator: &dyn Animator = &**self;
            listener.on_animation_finished(Some(animator));
        }
    }

    fn call_on_finished_listener<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) {
        if let Some(listener) = self.listener() {
            let animator: Arc<dyn Animator> = self.clone();
            ctx.call_on_finished(animator, listener);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PropertyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Arc<dyn AnimationListener>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Animator for RenderNodeAnimator {
    fn play_state(&self) -> PlayState {
        self.lock_state().core.play_state()
    }

    fn remaining_play_time_ms(&self) -> i64 {
        self.lock_state().core.remaining_play_time_ms()
    }
}
