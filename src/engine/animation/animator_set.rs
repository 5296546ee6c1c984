//! ### English
//! Vector drawable animator set: a group of property animators driven by one play clock, with
//! one-shot completion listener semantics and a request identifier for stale message detection.
//!
//! ### 中文
//! 矢量图动画器集合：由同一播放时钟驱动的一组属性动画器，具备一次性完成监听器语义，
//! 并带有用于检测过期消息的请求 ID。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::animator::{AnimatorCore, AnimatorTarget, PlayState, StagingRequest};
use super::context::AnimationContext;
use super::interpolator::Interpolator;
use super::listener::{AnimationListener, Animator};
use super::vector::VectorTarget;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatCount {
    Finite(u32),
    Infinite,
}

impl RepeatCount {
    fn as_f64(self) -> f64 {
        match self {
            Self::Finite(count) => f64::from(count),
            Self::Infinite => f64::INFINITY,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    Restart,
    Reverse,
}

/// ### English
/// One child of an animator set: animates property `property` of the set's target from `from` to
/// `to` after `start_delay_ms`, repeating per `repeat_count` / `repeat_mode`.
///
/// ### 中文
/// 动画器集合中的一个子动画器：在 `start_delay_ms` 之后把集合目标的 `property` 属性从 `from`
/// 动画到 `to`，并按 `repeat_count` / `repeat_mode` 重复。
#[derive(Clone, Debug)]
pub struct PropertyAnimator {
    property: usize,
    from: f32,
    to: f32,
    interpolator: Interpolator,
    start_delay_ms: i64,
    duration_ms: i64,
    repeat_count: RepeatCount,
    repeat_mode: RepeatMode,
    total_duration_ms: i64,
    latest_fraction: f64,
}

impl PropertyAnimator {
    pub fn new(property: usize, from: f32, to: f32, duration_ms: i64) -> Self {
        let mut animator = Self {
            property,
            from,
            to,
            interpolator: Interpolator::Linear,
            start_delay_ms: 0,
            duration_ms: duration_ms.max(0),
            repeat_count: RepeatCount::Finite(0),
            repeat_mode: RepeatMode::Restart,
            total_duration_ms: 0,
            latest_fraction: 0.0,
        };
        animator.update_total_duration();
        animator
    }

    pub fn with_interpolator(mut self, interpolator: Interpolator) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn with_start_delay(mut self, start_delay_ms: i64) -> Self {
        self.start_delay_ms = start_delay_ms.max(0);
        self.update_total_duration();
        self
    }

    pub fn with_repeat(mut self, repeat_count: RepeatCount, repeat_mode: RepeatMode) -> Self {
        self.repeat_count = repeat_count;
        self.repeat_mode = repeat_mode;
        self.update_total_duration();
        self
    }

    fn update_total_duration(&mut self) {
        self.total_duration_ms = match self.repeat_count {
            RepeatCount::Infinite => i64::MAX,
            RepeatCount::Finite(count) => self
                .duration_ms
                .saturating_mul(i64::from(count) + 1)
                .saturating_add(self.start_delay_ms),
        };
    }

    pub fn total_duration_ms(&self) -> i64 {
        self.total_duration_ms
    }

    pub fn is_infinite(&self) -> bool {
        self.repeat_count == RepeatCount::Infinite
    }

    fn set_current_play_time(&mut self, play_time_ms: i64, target: &VectorTarget) {
        if play_time_ms < self.start_delay_ms {
            return;
        }
        let (fraction, iteration) =
            if play_time_ms >= self.total_duration_ms || self.duration_ms == 0 {
                let iteration = match self.repeat_count {
                    RepeatCount::Finite(count) => i64::from(count),
                    RepeatCount::Infinite => 0,
                };
                (1.0, iteration)
            } else {
                let elapsed = play_time_ms - self.start_delay_ms;
                let iteration = elapsed / self.duration_ms;
                let fraction =
                    (elapsed - iteration * self.duration_ms) as f32 / self.duration_ms as f32;
                (fraction, iteration)
            };
        self.set_fraction(fraction, iteration, target);
    }

    fn set_fraction(&mut self, fraction: f32, iteration: i64, target: &VectorTarget) {
        let total_fraction = f64::from(fraction) + iteration as f64;
        let final_fraction = self.repeat_count.as_f64() + 1.0;
        // The final value is written at most once so a later child animating the same property
        // keeps the last word.
        if self.latest_fraction == final_fraction && total_fraction == final_fraction {
            return;
        }
        self.latest_fraction = total_fraction;

        let fraction = if iteration % 2 == 1 && self.repeat_mode == RepeatMode::Reverse {
            1.0 - fraction
        } else {
            fraction
        };
        let eased = self.interpolator.interpolate(fraction);
        target.set_property(self.property, self.from + (self.to - self.from) * eased);
    }
}

struct SetState {
    core: AnimatorCore,
    children: Vec<PropertyAnimator>,
    initialized: bool,
    infinite: bool,
    last_fraction: f32,
}

/// ### English
/// Drives the children of a set from the set's own play time.
///
/// ### 中文
/// 根据集合自身的播放时间驱动其子动画器。
struct ChildDriver<'a> {
    children: &'a mut [PropertyAnimator],
    target: &'a VectorTarget,
    duration_ms: i64,
    last_fraction: &'a mut f32,
}

impl AnimatorTarget for ChildDriver<'_> {
    fn on_play_time_changed(&mut self, play_time_ms: i64) {
        if play_time_ms == 0 && self.duration_ms > 0 {
            // Reset in reverse order so the children that end first have the final say.
            for child in self.children.iter_mut().rev() {
                child.set_fraction(0.0, 0, self.target);
            }
        } else {
            for child in self.children.iter_mut() {
                child.set_current_play_time(play_time_ms, self.target);
            }
        }
    }

    fn set_value(&mut self, value: f32) {
        *self.last_fraction = value;
    }
}

/// ### English
/// Reference-counted vector drawable animator.
///
/// UI-side lifecycle calls (`start`, `reverse`, `reset`, `cancel`, `end`) bump the request id;
/// `start` and `reverse` also arm the one-shot listener, which is consumed by the first
/// completion.
/// Render-side calls (`push_staging`, `animate`, `force_end_now`) take the animation context.
///
/// ### 中文
/// 引用计数的矢量图动画器。
///
/// UI 侧生命周期调用（`start`、`reverse`、`reset`、`cancel`、`end`）会递增请求 ID；
/// `start` 与 `reverse` 还会挂上一次性监听器，该监听器在第一次完成时被消费。渲染侧调用（`push_staging`、`animate`、
/// `force_end_now`）需要传入动画 context。
pub struct AnimatorSet {
    target: Arc<VectorTarget>,
    state: Mutex<SetState>,
    one_shot_listener: Mutex<Option<Arc<dyn AnimationListener>>>,
    request_id: AtomicU32,
    finish_listener: Arc<dyn AnimationListener>,
}

/// ### English
/// Internal listener registered with the animation context; routes completion to the set's
/// one-shot listener.
///
/// ### 中文
/// 注册到动画 context 的内部监听器；把完成事件转交给集合的一次性监听器。
struct SetFinishListener {
    set: Weak<AnimatorSet>,
}

impl AnimationListener for SetFinishListener {
    fn on_animation_finished(&self, animator: Option<&dyn Animator>) {
        if let Some(set) = self.set.upgrade() {
            set.on_finished(animator);
        }
    }
}

impl AnimatorSet {
    pub fn new(target: Arc<VectorTarget>) -> Arc<Self> {
        Arc::new_cyclic(|set| {
            let mut core = AnimatorCore::new(1.0);
            core.set_start_value(0.0);
            core.set_interpolator(Interpolator::Linear);
            Self {
                target,
                state: Mutex::new(SetState {
                    core,
                    children: Vec::new(),
                    initialized: false,
                    infinite: false,
                    last_fraction: 0.0,
                }),
                one_shot_listener: Mutex::new(None),
                request_id: AtomicU32::new(0),
                finish_listener: Arc::new(SetFinishListener { set: set.clone() }),
            }
        })
    }

    pub fn target(&self) -> &Arc<VectorTarget> {
        &self.target
    }

    pub fn add_property_animator(&self, animator: PropertyAnimator) {
        let mut state = self.lock_state();
        if animator.is_infinite() {
            state.infinite = true;
        }
        state.children.push(animator);
    }

    fn init(state: &mut SetState) {
        if state.initialized {
            return;
        }
        // Children start together, so the longest total duration ends last.
        state.children.sort_by_key(PropertyAnimator::total_duration_ms);
        let duration = state
            .children
            .last()
            .map_or(0, PropertyAnimator::total_duration_ms);
        state.core.set_duration_ms(duration);
        state.initialized = true;
    }

    fn lifecycle_request(&self, request: StagingRequest) {
        let mut state = self.lock_state();
        Self::init(&mut state);
        self.request_id.fetch_add(1, Ordering::AcqRel);
        state.core.request(request);
    }

    /// ### English
    /// Requests a start from the beginning; takes effect at the next full frame.
    ///
    /// #### Parameters
    /// - `listener`: One-shot completion listener; replaces any armed one.
    ///
    /// ### 中文
    /// 请求从头开始播放；在下一个完整帧生效。
    ///
    /// #### 参数
    /// - `listener`：一次性完成监听器；会替换已挂上的监听器。
    pub fn start(&self, listener: Option<Arc<dyn AnimationListener>>) {
        self.arm_one_shot_listener(listener);
        self.lifecycle_request(StagingRequest::Start);
    }

    pub fn reverse(&self, listener: Option<Arc<dyn AnimationListener>>) {
        self.arm_one_shot_listener(listener);
        self.lifecycle_request(StagingRequest::Reverse);
    }

    pub fn reset(&self) {
        self.lifecycle_request(StagingRequest::Reset);
    }

    pub fn end(&self) {
        self.lifecycle_request(StagingRequest::End);
    }

    /// ### English
    /// Stops without jumping to either end. A finish message already posted becomes stale.
    ///
    /// ### 中文
    /// 停止播放且不跳到任一端。已投递的完成消息随之过期。
    pub fn cancel(&self) {
        self.lifecycle_request(StagingRequest::Cancel);
    }

    /// ### English
    /// Generation counter bumped by every user lifecycle call.
    ///
    /// ### 中文
    /// 每次用户生命周期调用都会递增的代数计数器。
    pub fn request_id(&self) -> u32 {
        self.request_id.load(Ordering::Acquire)
    }

    pub fn arm_one_shot_listener(&self, listener: Option<Arc<dyn AnimationListener>>) {
        *self.lock_listener() = listener;
    }

    /// ### English
    /// Returns and clears the armed one-shot listener.
    ///
    /// ### 中文
    /// 返回并清除已挂上的一次性监听器。
    pub fn take_one_shot_listener(&self) -> Option<Arc<dyn AnimationListener>> {
        self.lock_listener().take()
    }

    pub fn has_one_shot_listener(&self) -> bool {
        self.lock_listener().is_some()
    }

    fn on_finished(&self, animator: Option<&dyn Animator>) {
        // Cleared before the callback so a restart from inside it can re-arm.
        let listener = self.take_one_shot_listener();
        if let Some(listener) = listener {
            listener.on_animation_finished(animator);
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.lock_state().infinite
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().core.is_running()
    }

    pub fn staging_play_state(&self) -> PlayState {
        self.lock_state().core.staging_play_state()
    }

    pub fn duration_ms(&self) -> i64 {
        self.lock_state().core.duration_ms()
    }

    /// ### English
    /// Fraction of the set's own clock (linear, `0..=1`) written by the last advance.
    ///
    /// ### 中文
    /// 上一次推进写入的集合自身时钟进度（线性，`0..=1`）。
    pub fn last_fraction(&self) -> f32 {
        self.lock_state().last_fraction
    }

    pub fn push_staging<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) {
        let frame_time_ms = ctx.frame_time_ms();
        let notify = {
            let mut state = self.lock_state();
            let last_fraction = state.last_fraction;
            state.core.push_staging(frame_time_ms, || last_fraction)
        };
        if notify {
            self.call_on_finished_listener(ctx);
        }
    }

    /// ### English
    /// Advances the set to the context's frame time. Returns `true` once finished.
    ///
    /// ### 中文
    /// 将集合推进到 context 的帧时间。结束后返回 `true`。
    pub fn animate<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) -> bool {
        let frame_time_ms = ctx.frame_time_ms();
        let step = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let duration_ms = state.core.duration_ms();
            let mut driver = ChildDriver {
                children: &mut state.children,
                target: &self.target,
                duration_ms,
                last_fraction: &mut state.last_fraction,
            };
            state.core.animate(frame_time_ms, &mut driver)
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

    fn call_on_finished_listener<C: AnimationContext + ?Sized>(self: &Arc<Self>, ctx: &mut C) {
        let animator: Arc<dyn Animator> = self.clone();
        ctx.call_on_finished(animator, self.finish_listener.clone());
    }

    fn lock_state(&self) -> MutexGuard<'_, SetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Arc<dyn AnimationListener>>> {
        self.one_shot_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Animator for AnimatorSet {
    fn play_state(&self) -> PlayState {
        self.lock_state().core.play_state()
    }

    fn remaining_play_time_ms(&self) -> i64 {
        self.lock_state().core.remaining_play_time_ms()
    }
}
