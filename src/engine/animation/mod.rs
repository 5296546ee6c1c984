//! ### English
//! Render-thread animators and the animation context they run in.
//!
//! ### 中文
//! 渲染线程动画器及其运行所在的动画 context。

mod animator;
mod animator_set;
mod context;
mod interpolator;
mod listener;
mod property;
mod vector;

pub use animator::{
    AnimateStep, AnimatorCore, AnimatorTarget, DEFAULT_DURATION_MS, PlayState, StagingRequest,
};
pub use animator_set::{AnimatorSet, PropertyAnimator, RepeatCount, RepeatMode};
pub use context::{
    AnimationContext, BaseAnimationContext, destroy_base, run_remaining_animations_base,
    start_frame_base,
};
pub use interpolator::Interpolator;
pub use listener::{AnimationListener, Animator, OnFinishedEvent};
pub use property::RenderNodeAnimator;
pub use vector::VectorTarget;
