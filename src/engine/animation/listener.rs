//! ### English
//! Read-only animator view and completion callbacks.
//!
//! ### 中文
//! 只读的动画器视图与完成回调。

use std::sync::Arc;

use super::animator::PlayState;

/// ### English
/// Read-only view of an animator handed to completion listeners.
///
/// ### 中文
/// 交给完成监听器的动画器只读视图。
pub trait Animator: Send + Sync {
    fn play_state(&self) -> PlayState;

    fn remaining_play_time_ms(&self) -> i64;
}

/// ### English
/// Completion callback. Invoked on the owner thread; `animator` is `None` when the completion was
/// synthesized for an animator that left the running set before finishing.
///
/// ### 中文
/// 完成回调。在 owner 线程上调用；若该完成事件是为在结束前离开运行集合的动画器合成的，
/// 则 `animator` 为 `None`。
pub trait AnimationListener: Send + Sync {
    fn on_animation_finished(&self, animator: Option<&dyn Animator>);
}

impl<F> AnimationListener for F
where
    F: Fn(Option<&dyn Animator>) + Send + Sync,
{
    fn on_animation_finished(&self, animator: Option<&dyn Animator>) {
        self(animator)
    }
}

/// ### English
/// One finished animator paired with the listener to notify, queued for batched delivery.
///
/// ### 中文
/// 一个已结束的动画器及其待通知监听器，排队等待批量投递。
pub struct OnFinishedEvent {
    pub animator: Arc<dyn Animator>,
    pub listener: Arc<dyn AnimationListener>,
}

impl OnFinishedEvent {
    pub fn new(animator: Arc<dyn Animator>, listener: Arc<dyn AnimationListener>) -> Self {
        Self { animator, listener }
    }

    pub fn deliver(self) {
        self.listener.on_animation_finished(Some(self.animator.as_ref()));
    }
}
