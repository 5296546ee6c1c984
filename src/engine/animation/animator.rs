//! ### English
//! Play-state machine shared by every render-thread animator.
//!
//! The UI side records lifecycle requests (`start`, `reverse`, `reset`, `cancel`, `end`) as
//! staging requests; the render thread resolves them in [`AnimatorCore::push_staging`] and then
//! advances play time from the frame clock in [`AnimatorCore::animate`].
//!
//! ### 中文
//! 所有渲染线程动画器共用的播放状态机。
//!
//! UI 侧把生命周期请求（`start`、`reverse`、`reset`、`cancel`、`end`）记录为 staging 请求；
//! 渲染线程在 [`AnimatorCore::push_staging`] 中依次处理，然后在 [`AnimatorCore::animate`]
//! 中根据帧时钟推进播放时间。

use log::warn;

use super::interpolator::Interpolator;

pub const DEFAULT_DURATION_MS: i64 = 300;

const MAX_SANE_START_DELAY_MS: i64 = 50_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayState {
    NotStarted,
    Running,
    Reversing,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StagingRequest {
    Start,
    Reverse,
    Reset,
    Cancel,
    End,
}

impl StagingRequest {
    fn staging_play_state(self) -> PlayState {
        match self {
            Self::Start => PlayState::Running,
            Self::Reverse => PlayState::Reversing,
            Self::Reset | Self::Cancel | Self::End => PlayState::Finished,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum PendingAction {
    #[default]
    None,
    Reset,
    End,
}

/// ### English
/// Receives the values produced while an animator advances.
///
/// ### 中文
/// 接收动画器推进过程中产生的数值。
pub trait AnimatorTarget {
    /// ### English
    /// Called with the (direction-adjusted) play time before every value update.
    ///
    /// ### 中文
    /// 在每次数值更新前，以（已按方向调整的）播放时间调用。
    fn on_play_time_changed(&mut self, _play_time_ms: i64) {}

    fn set_value(&mut self, value: f32);
}

/// ### English
/// Outcome of one [`AnimatorCore::animate`] call.
///
/// ### 中文
/// 一次 [`AnimatorCore::animate`] 调用的结果。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimateStep {
    /// ### English
    /// The animator is done and should leave its active list.
    ///
    /// ### 中文
    /// 动画器已结束，应从活动列表中移除。
    pub finished: bool,
    /// ### English
    /// The finished listener must be called for this step.
    ///
    /// ### 中文
    /// 本次推进需要调用结束监听器。
    pub notify: bool,
}

#[derive(Clone, Debug)]
pub struct AnimatorCore {
    final_value: f32,
    from_value: f32,
    delta_value: f32,
    has_start_value: bool,
    staging_play_state: PlayState,
    play_state: PlayState,
    staging_requests: Vec<StagingRequest>,
    pending_action: PendingAction,
    interpolator: Option<Interpolator>,
    start_time_ms: i64,
    duration_ms: i64,
    start_delay_ms: i64,
    play_time_ms: i64,
}

impl AnimatorCore {
    pub fn new(final_value: f32) -> Self {
        Self {
            final_value,
            from_value: 0.0,
            delta_value: 0.0,
            has_start_value: false,
            staging_play_state: PlayState::NotStarted,
            play_state: PlayState::NotStarted,
            staging_requests: Vec::new(),
            pending_action: PendingAction::None,
            interpolator: None,
            start_time_ms: 0,
            duration_ms: DEFAULT_DURATION_MS,
            start_delay_ms: 0,
            play_time_ms: 0,
        }
    }

    /// ### English
    /// Configuration is frozen once the animator has been started; late writes are ignored.
    ///
    /// ### 中文
    /// 动画器启动后配置即被冻结；之后的写入会被忽略。
    fn check_mutable(&self, what: &str) -> bool {
        if self.staging_play_state != PlayState::NotStarted {
            warn!("animator has already been started; ignoring {what}");
            return false;
        }
        true
    }

    pub fn set_interpolator(&mut self, interpolator: Interpolator) {
        if self.check_mutable("set_interpolator") {
            self.interpolator = Some(interpolator);
        }
    }

    pub fn set_start_value(&mut self, value: f32) {
        if self.check_mutable("set_start_value") {
            self.apply_start_value(value);
        }
    }

    pub fn set_duration_ms(&mut self, duration_ms: i64) {
        if self.check_mutable("set_duration") {
            self.duration_ms = duration_ms;
        }
    }

    pub fn set_start_delay_ms(&mut self, start_delay_ms: i64) {
        if self.check_mutable("set_start_delay") {
            self.start_delay_ms = start_delay_ms;
        }
    }

    fn apply_start_value(&mut self, value: f32) {
        self.from_value = value;
        self.delta_value = self.final_value - value;
        self.has_start_value = true;
    }

    pub fn final_value(&self) -> f32 {
        self.final_value
    }

    pub fn has_start_value(&self) -> bool {
        self.has_start_value
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn start_delay_ms(&self) -> i64 {
        self.start_delay_ms
    }

    pub fn play_time_ms(&self) -> i64 {
        self.play_time_ms
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn staging_play_state(&self) -> PlayState {
        self.staging_play_state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.play_state, PlayState::Running | PlayState::Reversing)
    }

    /// ### English
    /// Records a UI-side lifecycle request; it takes effect at the next `push_staging`.
    ///
    /// ### 中文
    /// 记录一个 UI 侧生命周期请求；在下一次 `push_staging` 时生效。
    pub fn request(&mut self, request: StagingRequest) {
        self.staging_play_state = request.staging_play_state();
        self.staging_requests.push(request);
    }

    fn resolve_staging_request(&mut self, request: StagingRequest) {
        let active = self.is_running();
        match request {
            StagingRequest::Start => {
                self.play_time_ms = if active { self.play_time_ms } else { 0 };
                self.play_state = PlayState::Running;
                self.pending_action = PendingAction::None;
            }
            StagingRequest::Reverse => {
                self.play_time_ms = if active {
                    self.play_time_ms
                } else {
                    self.duration_ms
                };
                self.play_state = PlayState::Reversing;
                self.pending_action = PendingAction::None;
            }
            StagingRequest::Reset => {
                self.play_time_ms = 0;
                self.play_state = PlayState::Finished;
                self.pending_action = PendingAction::Reset;
            }
            StagingRequest::Cancel => {
                self.play_state = PlayState::Finished;
                self.pending_action = PendingAction::None;
            }
            StagingRequest::End => {
                self.play_time_ms = if self.play_state == PlayState::Reversing {
                    0
                } else {
                    self.duration_ms
                };
                self.play_state = PlayState::Finished;
                self.pending_action = PendingAction::End;
            }
        }
    }

    /// ### English
    /// Resolves queued staging requests against the frame time.
    ///
    /// `current_value` supplies the start value when none was set explicitly. Returns `true` when
    /// the requests finished the animator and the finished listener must be called.
    ///
    /// ### 中文
    /// 根据帧时间处理排队的 staging 请求。
    ///
    /// 未显式设置起始值时由 `current_value` 提供。若请求使动画器结束、需要调用结束监听器，
    /// 则返回 `true`。
    pub fn push_staging(&mut self, frame_time_ms: i64, current_value: impl FnOnce() -> f32) -> bool {
        if !self.has_start_value {
            self.apply_start_value(current_value());
        }
        if self.staging_requests.is_empty() {
            return false;
        }
        if self.play_state == PlayState::NotStarted && self.interpolator.is_none() {
            self.interpolator = Some(Interpolator::default());
        }

        let previous_play_time = self.play_time_ms;
        let previous_play_state = self.play_state;
        for request in std::mem::take(&mut self.staging_requests) {
            self.resolve_staging_request(request);
        }

        match self.staging_play_state {
            PlayState::Finished => true,
            PlayState::Running | PlayState::Reversing => {
                let changed = previous_play_time != self.play_time_ms
                    || previous_play_state != self.staging_play_state;
                if previous_play_state != self.staging_play_state {
                    self.transition_to_running(frame_time_ms);
                }
                if changed {
                    // Seek so that `frame_time - start_time` lands on the requested play time.
                    self.start_time_ms = if self.play_state == PlayState::Reversing {
                        frame_time_ms - (self.duration_ms - self.play_time_ms)
                    } else if self.play_time_ms == 0 {
                        frame_time_ms + self.start_delay_ms
                    } else {
                        frame_time_ms - self.play_time_ms
                    };
                }
                false
            }
            PlayState::NotStarted => false,
        }
    }

    fn transition_to_running(&mut self, frame_time_ms: i64) {
        if frame_time_ms < 0 {
            warn!("{frame_time_ms} isn't a real frame time");
        }
        if !(0..=MAX_SANE_START_DELAY_MS).contains(&self.start_delay_ms) {
            warn!("start delay is strange and confusing: {}", self.start_delay_ms);
        }
        self.start_time_ms = frame_time_ms + self.start_delay_ms;
        if self.start_time_ms < 0 {
            warn!(
                "ended up with a really weird start time of {} with frame time {} and start delay {}",
                self.start_time_ms, frame_time_ms, self.start_delay_ms
            );
            self.start_time_ms = 0;
        }
        if self.duration_ms < 0 {
            warn!("duration is strange and confusing: {}", self.duration_ms);
        }
    }

    pub fn animate(&mut self, frame_time_ms: i64, target: &mut dyn AnimatorTarget) -> AnimateStep {
        if self.play_state < PlayState::Running {
            return AnimateStep::default();
        }
        if self.play_state == PlayState::Finished {
            match self.pending_action {
                PendingAction::Reset => {
                    self.update_play_time(0, target);
                }
                PendingAction::End => {
                    self.update_play_time(self.duration_ms, target);
                }
                PendingAction::None => {}
            }
            self.pending_action = PendingAction::None;
            return AnimateStep {
                finished: true,
                notify: false,
            };
        }

        let finished = self.update_play_time(frame_time_ms - self.start_time_ms, target);
        let notify = finished && self.play_state != PlayState::Finished;
        if notify {
            self.play_state = PlayState::Finished;
        }
        AnimateStep { finished, notify }
    }

    fn update_play_time(&mut self, play_time_ms: i64, target: &mut dyn AnimatorTarget) -> bool {
        self.play_time_ms = if self.play_state == PlayState::Reversing {
            self.duration_ms - play_time_ms
        } else {
            play_time_ms
        };
        target.on_play_time_changed(self.play_time_ms);

        if play_time_ms < 0 {
            target.set_value(self.from_value);
            return false;
        }

        let mut fraction = 1.0_f32;
        if self.is_running() && self.duration_ms > 0 {
            fraction = self.play_time_ms as f32 / self.duration_ms as f32;
        }
        let fraction = self
            .interpolator
            .unwrap_or_default()
            .interpolate(fraction.clamp(0.0, 1.0));
        target.set_value(self.from_value + self.delta_value * fraction);
        play_time_ms >= self.duration_ms
    }

    pub fn remaining_play_time_ms(&self) -> i64 {
        if self.play_state == PlayState::Reversing {
            self.play_time_ms
        } else {
            self.duration_ms - self.play_time_ms
        }
    }

    /// ### English
    /// Finishes an unfinished animator immediately. Returns `true` if the listener must be called.
    ///
    /// ### 中文
    /// 立即结束尚未结束的动画器。若需要调用监听器则返回 `true`。
    pub fn force_end_now(&mut self) -> bool {
        if self.play_state < PlayState::Finished {
            self.play_state = PlayState::Finished;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        values: Vec<f32>,
        play_times: Vec<i64>,
    }

    impl AnimatorTarget for Recorder {
        fn on_play_time_changed(&mut self, play_time_ms: i64) {
            self.play_times.push(play_time_ms);
        }

        fn set_value(&mut self, value: f32) {
            self.values.push(value);
        }
    }

    fn linear(duration_ms: i64) -> AnimatorCore {
        let mut core = AnimatorCore::new(100.0);
        core.set_start_value(0.0);
        core.set_duration_ms(duration_ms);
        core.set_interpolator(Interpolator::Linear);
        core
    }

    #[test]
    fn runs_from_start_to_finish() {
        let mut core = linear(100);
        let mut target = Recorder::default();
        core.request(StagingRequest::Start);
        assert!(!core.push_staging(1_000, || 0.0));
        assert_eq!(core.play_state(), PlayState::Running);

        assert_eq!(core.animate(1_050, &mut target), AnimateStep::default());
        assert_eq!(core.remaining_play_time_ms(), 50);

        let step = core.animate(1_100, &mut target);
        assert_eq!(
            step,
            AnimateStep {
                finished: true,
                notify: true
            }
        );
        assert_eq!(target.values, vec![50.0, 100.0]);
        assert_eq!(core.play_state(), PlayState::Finished);
    }

    #[test]
    fn start_delay_holds_the_start_value() {
        let mut core = linear(100);
        core.set_start_delay_ms(20);
        let mut target = Recorder::default();
        core.request(StagingRequest::Start);
        core.push_staging(0, || 0.0);

        core.animate(10, &mut target);
        assert_eq!(target.values, vec![0.0]);
        assert_eq!(target.play_times, vec![-10]);
    }

    #[test]
    fn reverse_counts_play_time_down() {
        let mut core = linear(100);
        let mut target = Recorder::default();
        core.request(StagingRequest::Reverse);
        core.push_staging(500, || 0.0);
        assert_eq!(core.play_state(), PlayState::Reversing);

        core.animate(525, &mut target);
        assert_eq!(core.play_time_ms(), 75);
        assert_eq!(core.remaining_play_time_ms(), 75);
        assert_eq!(target.values, vec![75.0]);
    }

    #[test]
    fn end_request_skips_to_final_value() {
        let mut core = linear(100);
        let mut target = Recorder::default();
        core.request(StagingRequest::Start);
        core.push_staging(0, || 0.0);
        core.animate(10, &mut target);

        core.request(StagingRequest::End);
        assert!(core.push_staging(20, || 0.0));
        let step = core.animate(20, &mut target);
        assert!(step.finished);
        assert!(!step.notify);
        assert_eq!(target.values.last(), Some(&100.0));
    }

    #[test]
    fn configuration_is_frozen_after_start() {
        let mut core = linear(100);
        core.request(StagingRequest::Start);
        core.set_duration_ms(5);
        assert_eq!(core.duration_ms(), 100);
    }

    #[test]
    fn force_end_notifies_once() {
        let mut core = linear(100);
        core.request(StagingRequest::Start);
        core.push_staging(0, || 0.0);
        assert!(core.force_end_now());
        assert!(!core.force_end_now());
    }

    #[test]
    fn missing_start_value_is_read_from_target() {
        let mut core = AnimatorCore::new(10.0);
        core.request(StagingRequest::Start);
        core.push_staging(0, || 4.0);
        assert!(core.has_start_value());
        assert_eq!(core.remaining_play_time_ms(), DEFAULT_DURATION_MS);
    }
}
