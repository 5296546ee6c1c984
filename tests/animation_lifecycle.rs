use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use xian_render_bridge::engine::animation::{
    AnimationListener, Animator, AnimatorSet, PlayState, PropertyAnimator, RenderNodeAnimator,
    VectorTarget,
};
use xian_render_bridge::engine::frame_info::{UI_THREAD_FRAME_INFO_SIZE, UiFrameInfoBuilder};
use xian_render_bridge::engine::scene::{
    DisplayList, PanicOnRenderingError, RenderNode, RenderProperty, TraversalMode,
};
use xian_render_bridge::engine::time::ms_to_ns;
use xian_render_bridge::{FrameDriver, ManualLooper, RenderConfig};

fn ui_info(frame_time_ms: i64) -> [i64; UI_THREAD_FRAME_INFO_SIZE] {
    let mut ui = [0; UI_THREAD_FRAME_INFO_SIZE];
    let vsync = ms_to_ns(frame_time_ms);
    UiFrameInfoBuilder::new(&mut ui).set_vsync(vsync, vsync);
    ui
}

fn counting_listener(count: &Arc<AtomicUsize>) -> Arc<dyn AnimationListener> {
    let count = count.clone();
    Arc::new(move |_: Option<&dyn Animator>| {
        count.fetch_add(1, Ordering::SeqCst);
    })
}

struct Harness {
    owner: Arc<ManualLooper>,
    driver: FrameDriver,
}

impl Harness {
    fn new() -> Self {
        let owner = ManualLooper::new();
        let driver = FrameDriver::new(
            &RenderConfig::default(),
            owner.clone(),
            Arc::new(PanicOnRenderingError),
        );
        Self { owner, driver }
    }

    fn show(&self, targets: &[&Arc<AnimatorSet>]) {
        let list = targets
            .iter()
            .fold(DisplayList::new(), |list, set| list.with_vector_target(set.target().clone()));
        self.driver.root().node().set_staging_display_list(list);
    }

    fn frame(&mut self, frame_time_ms: i64, mode: TraversalMode) -> bool {
        self.driver
            .sync_and_draw_frame(&ui_info(frame_time_ms), mode)
            .has_animations
    }

    /// Starts a 100ms set at t=1000 and hides its target at t=1050, leaving it paused with a
    /// finish message due 50ms later.
    fn start_and_hide(&mut self, listener: Arc<dyn AnimationListener>) -> Arc<AnimatorSet> {
        let set = AnimatorSet::new(Arc::new(VectorTarget::new("progress", 1)));
        set.add_property_animator(PropertyAnimator::new(0, 0.0, 1.0, 100));
        self.show(&[&set]);
        set.start(Some(listener));
        self.driver.root().add_vector_drawable_animator(set.clone());

        assert!(self.frame(1_000, TraversalMode::Full));
        assert!(self.driver.root().is_running(&set));

        self.show(&[]);
        assert!(!self.frame(1_050, TraversalMode::Full));
        assert!(self.driver.root().is_paused(&set));
        assert_eq!(self.owner.pending_count(), 1);
        set
    }
}

#[test]
fn hidden_set_is_finished_by_the_delayed_message() {
    let mut harness = Harness::new();
    let finished = Arc::new(AtomicUsize::new(0));
    let set = harness.start_and_hide(counting_listener(&finished));
    assert!(!set.has_one_shot_listener());
    assert_eq!(set.request_id(), 1);

    assert_eq!(harness.owner.advance_by(Duration::from_millis(49)), 0);
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    assert_eq!(harness.owner.advance_by(Duration::from_millis(1)), 1);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(set.request_id(), 2);
    assert_eq!(set.staging_play_state(), PlayState::Finished);

    harness.owner.advance_by(Duration::from_secs(1));
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn restart_before_delivery_makes_the_message_stale() {
    let mut harness = Harness::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let set = harness.start_and_hide(counting_listener(&first));

    set.start(Some(counting_listener(&second)));
    harness.owner.advance_by(Duration::from_millis(50));

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
    assert_eq!(set.staging_play_state(), PlayState::Running);
    assert!(set.has_one_shot_listener());
}

#[test]
fn cancel_before_delivery_makes_the_message_stale() {
    let mut harness = Harness::new();
    let finished = Arc::new(AtomicUsize::new(0));
    let set = harness.start_and_hide(counting_listener(&finished));

    set.cancel();
    assert_eq!(set.request_id(), 2);
    harness.owner.advance_by(Duration::from_millis(50));

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(set.request_id(), 2);
    assert_eq!(set.staging_play_state(), PlayState::Finished);
}

#[test]
fn paused_set_expires_on_the_next_full_frame_only() {
    let mut harness = Harness::new();
    let set = harness.start_and_hide(counting_listener(&Arc::new(AtomicUsize::new(0))));

    assert!(!harness.frame(1_200, TraversalMode::RtOnly));
    assert!(harness.driver.root().is_paused(&set));

    assert!(!harness.frame(1_216, TraversalMode::Full));
    assert!(!harness.driver.root().is_paused(&set));
    assert!(!harness.driver.root().is_running(&set));
}

#[test]
fn listener_fires_even_when_the_set_is_gone() {
    let mut harness = Harness::new();
    let finished = Arc::new(AtomicUsize::new(0));
    let set = harness.start_and_hide(counting_listener(&finished));
    let weak = Arc::downgrade(&set);
    drop(set);

    harness.frame(1_060, TraversalMode::Full);
    assert_eq!(harness.driver.root().paused_count(), 0);
    assert!(weak.upgrade().is_none());

    harness.owner.advance_by(Duration::from_millis(50));
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn target_shown_again_resumes_the_set() {
    let mut harness = Harness::new();
    let finished = Arc::new(AtomicUsize::new(0));
    let set = harness.start_and_hide(counting_listener(&finished));

    harness.show(&[&set]);
    assert!(harness.frame(1_070, TraversalMode::Full));
    assert!(harness.driver.root().is_running(&set));
    assert!(!harness.driver.root().is_paused(&set));

    assert!(!harness.frame(1_200, TraversalMode::RtOnly));
    assert!(!harness.driver.root().is_running(&set));
}

#[test]
fn partial_frames_never_change_membership() {
    let mut harness = Harness::new();
    let set = AnimatorSet::new(Arc::new(VectorTarget::new("idle", 1)));
    set.add_property_animator(PropertyAnimator::new(0, 0.0, 1.0, 100));
    set.start(None);
    harness.driver.root().add_vector_drawable_animator(set.clone());

    harness.frame(1_000, TraversalMode::RtOnly);
    assert!(harness.driver.root().is_pending(&set));
    assert_eq!(harness.driver.root().running_count(), 0);

    harness.show(&[&set]);
    harness.frame(1_016, TraversalMode::Full);
    assert!(harness.driver.root().is_running(&set));
    assert_eq!(harness.driver.root().pending_count(), 0);
}

#[test]
fn destroy_ends_staging_animators_of_pending_nodes_once() {
    let mut harness = Harness::new();
    let node = RenderNode::new("card");
    let fade = RenderNodeAnimator::new(RenderProperty::Alpha, 0.0);
    let finished = Arc::new(AtomicUsize::new(0));
    fade.set_listener(Some(counting_listener(&finished)));
    fade.start();
    node.add_animator(fade.clone());
    harness.driver.root().attach_animating_node(node.clone());

    harness.driver.destroy();
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(fade.staging_play_state(), PlayState::Finished);
    assert_eq!(harness.driver.root().pending_node_count(), 0);
    assert_eq!(node.animators().staging_count(), 0);

    harness.driver.destroy();
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn destroy_posts_finish_for_running_sets() {
    let mut harness = Harness::new();
    let finished = Arc::new(AtomicUsize::new(0));
    let set = AnimatorSet::new(Arc::new(VectorTarget::new("spinner", 1)));
    set.add_property_animator(PropertyAnimator::new(0, 0.0, 1.0, 100));
    harness.show(&[&set]);
    set.start(Some(counting_listener(&finished)));
    harness.driver.root().add_vector_drawable_animator(set.clone());
    harness.frame(1_000, TraversalMode::Full);

    harness.driver.destroy();
    assert_eq!(harness.driver.root().running_count(), 0);
    assert_eq!(harness.driver.root().paused_count(), 0);

    harness.owner.advance_by(Duration::from_millis(100));
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(set.staging_play_state(), PlayState::Finished);
}
