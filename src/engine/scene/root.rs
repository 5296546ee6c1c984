//! ### English
//! Root scene node: owns the vector drawable animator sets of one surface and moves them between
//! pending, running and paused once per frame.
//!
//! All membership changes happen on the render thread. Anything destined for the owner thread
//! (completion listeners, traversal errors) is posted to the owner task queue, never called
//! inline.
//!
//! ### 中文
//! 根场景节点：持有一个 surface 的全部矢量图动画器集合，并在每帧中把它们在 pending、running、
//! paused 之间迁移。
//!
//! 所有归属变化都发生在渲染线程。发往 owner 线程的内容（完成监听器、遍历错误）都会投递到
//! owner 任务队列，而不是直接调用。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use dpi::PhysicalPosition;
use log::{debug, trace};

use super::render_node::RenderNode;
use super::tree_info::{ErrorHandler, TraversalMode, TreeInfo};
use crate::engine::animation::{AnimationContext, AnimationListener, Animator, AnimatorSet};
use crate::engine::error::{BridgeError, Result};
use crate::engine::looper::{self, Task, TaskQueue};

/// ### English
/// Surfaces traversal errors on the owner thread.
///
/// ### 中文
/// 在 owner 线程上呈现遍历错误。
pub trait RenderingErrorHandler: Send + Sync {
    fn on_rendering_error(&self, error: BridgeError);
}

/// ### English
/// Default handler: a rendering error is an unrecoverable failure of the owner thread.
///
/// ### 中文
/// 默认处理器：渲染错误视为 owner 线程不可恢复的失败。
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicOnRenderingError;

impl RenderingErrorHandler for PanicOnRenderingError {
    fn on_rendering_error(&self, error: BridgeError) {
        panic!("{error}");
    }
}

/// ### English
/// Error handler installed into every traversal; converts errors into owner-thread messages.
///
/// ### 中文
/// 安装到每次遍历中的错误处理器；把错误转换为发往 owner 线程的消息。
struct RenderingException {
    owner: Arc<dyn TaskQueue>,
    handler: Arc<dyn RenderingErrorHandler>,
}

impl ErrorHandler for RenderingException {
    fn on_error(&self, message: String) {
        let handler = self.handler.clone();
        self.owner.post_now(Box::new(move || {
            handler.on_rendering_error(BridgeError::Rendering(message));
        }));
    }
}

/// ### English
/// Deferred completion for a set that left the running list before finishing.
///
/// Holds the set weakly. On delivery the set is ended only if no lifecycle call happened since
/// the message was posted; the listener is invoked either way.
///
/// ### 中文
/// 为在结束前离开运行列表的集合准备的延迟完成消息。
///
/// 对集合只持有弱引用。投递时，仅当投递后没有发生新的生命周期调用才会结束该集合；
/// 监听器则无论如何都会被调用。
struct FinishAndInvokeListener {
    set: Weak<AnimatorSet>,
    request_id: u32,
    listener: Arc<dyn AnimationListener>,
}

impl FinishAndInvokeListener {
    fn run(self) {
        match self.set.upgrade() {
            Some(set) if set.request_id() == self.request_id => set.end(),
            Some(_) => debug!("stale finish message (request {}); skipping end", self.request_id),
            None => debug!("animator set dropped before its finish message"),
        }
        self.listener.on_animation_finished(None);
    }
}

#[derive(Default)]
struct RootState {
    pending_nodes: Vec<Arc<RenderNode>>,
    pending: Vec<Arc<AnimatorSet>>,
    running: Vec<Arc<AnimatorSet>>,
    paused: Vec<Arc<AnimatorSet>>,
}

fn contains(sets: &[Arc<AnimatorSet>], set: &Arc<AnimatorSet>) -> bool {
    sets.iter().any(|other| Arc::ptr_eq(other, set))
}

fn insert_unique(sets: &mut Vec<Arc<AnimatorSet>>, set: Arc<AnimatorSet>) {
    if !contains(sets, &set) {
        sets.push(set);
    }
}

/// ### English
/// Root of one surface's scene.
///
/// Holds the pending scene nodes and the pending, running and paused animator sets. A set is in
/// at most one of those lists at a time. The root is shared between the owner thread, which adds
/// work, and the render thread, which drives it once per frame.
///
/// ### 中文
/// 一个 surface 场景的根节点。
///
/// 持有待注册的场景节点，以及 pending、running、paused 三类动画器集合；同一集合同一时刻最多
/// 位于其中一个列表。根节点由 owner 线程（添加工作）与渲染线程（每帧驱动）共享。
pub struct RootRenderNode {
    node: Arc<RenderNode>,
    owner: Arc<dyn TaskQueue>,
    error_handler: Arc<dyn ErrorHandler>,
    state: Mutex<RootState>,
}

impl RootRenderNode {
    /// ### English
    /// Creates a root bound to an explicit owner queue.
    ///
    /// #### Parameters
    /// - `owner`: Queue receiving completion messages and rendering errors.
    /// - `handler`: Called on the owner queue for every traversal error.
    ///
    /// ### 中文
    /// 创建绑定到指定 owner 队列的根节点。
    ///
    /// #### 参数
    /// - `owner`：接收完成消息与渲染错误的队列。
    /// - `handler`：每个遍历错误都会在 owner 队列上调用它。
    pub fn new(owner: Arc<dyn TaskQueue>, handler: Arc<dyn RenderingErrorHandler>) -> Self {
        let error_handler: Arc<dyn ErrorHandler> = Arc::new(RenderingException {
            owner: owner.clone(),
            handler,
        });
        Self {
            node: RenderNode::new("RootRenderNode"),
            owner,
            error_handler,
            state: Mutex::new(RootState::default()),
        }
    }

    /// ### English
    /// Binds the root to the calling thread's task queue, which becomes the owner queue.
    ///
    /// ### 中文
    /// 把根节点绑定到当前线程的任务队列，该队列即为 owner 队列。
    pub fn for_current_thread(handler: Arc<dyn RenderingErrorHandler>) -> Result<Self> {
        let owner = looper::current().ok_or(BridgeError::NoLooper)?;
        Ok(Self::new(owner, handler))
    }

    pub fn node(&self) -> &Arc<RenderNode> {
        &self.node
    }

    pub fn send_message(&self, task: Task) {
        self.owner.post_now(task);
    }

    pub fn send_message_delayed(&self, delay: Duration, task: Task) {
        self.owner.post_after(delay, task);
    }

    /// ### English
    /// Queues a scene node for registration with the animation context at the next full frame.
    /// Order is preserved; queuing the same node twice is harmless.
    ///
    /// #### Parameters
    /// - `node`: Node whose animators should run even when the traversal skips it.
    ///
    /// ### 中文
    /// 把场景节点排队，在下一个完整帧注册到动画 context。保持顺序；重复排队无副作用。
    ///
    /// #### 参数
    /// - `node`：即使遍历跳过它也需要运行其动画器的节点。
    pub fn attach_animating_node(&self, node: Arc<RenderNode>) {
        self.lock().pending_nodes.push(node);
    }

    /// ### English
    /// Queues a started set; it joins the running list at the next full frame.
    ///
    /// #### Parameters
    /// - `set`: Set to run. Adding a set already pending is a no-op.
    ///
    /// ### 中文
    /// 把已启动的集合排队；它会在下一个完整帧加入 running 列表。
    ///
    /// #### 参数
    /// - `set`：要运行的集合。重复添加已在 pending 的集合不做任何事。
    pub fn add_vector_drawable_animator(&self, set: Arc<AnimatorSet>) {
        insert_unique(&mut self.lock().pending, set);
    }

    /// ### English
    /// Hands every queued scene node to `ctx` and empties the queue.
    ///
    /// #### Parameters
    /// - `ctx`: Animation context of the current frame.
    ///
    /// ### 中文
    /// 把所有排队的场景节点交给 `ctx` 并清空队列。
    ///
    /// #### 参数
    /// - `ctx`：当前帧的动画 context。
    pub fn do_attach_animating_nodes<C: AnimationContext + ?Sized>(&self, ctx: &mut C) {
        let nodes = std::mem::take(&mut self.lock().pending_nodes);
        for node in nodes {
            ctx.add_animating_node(node);
        }
    }

    /// Pending sets join running; a set restarted while paused leaves paused.
    pub fn attach_pending_vector_drawable_animators(&self) {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending);
        for set in pending {
            state.paused.retain(|other| !Arc::ptr_eq(other, &set));
            insert_unique(&mut state.running, set);
        }
    }

    /// ### English
    /// Traverses the scene with the root's error handler and window inset installed for the
    /// duration of the call.
    ///
    /// ### 中文
    /// 遍历场景；调用期间安装根节点的错误处理器与窗口 inset。
    pub fn prepare_tree<C: AnimationContext + ?Sized>(&self, info: &mut TreeInfo, ctx: &mut C) {
        info.error_handler = Some(self.error_handler.clone());

        {
            let state = self.lock();
            // Assume no target is reachable; the traversal marks the ones it finds.
            let paused: &[Arc<AnimatorSet>] = if info.is_full() { &state.paused } else { &[] };
            for set in state.running.iter().chain(paused) {
                set.target().set_property_change_will_be_consumed(false);
                set.target().mark_dirty();
            }
        }

        let staging = self.node.staging_properties();
        info.window_inset = PhysicalPosition::new(-staging.position.x, -staging.position.y);
        info.update_window_positions = true;
        self.node.prepare_tree(info, ctx);
        info.update_window_positions = false;
        info.window_inset = PhysicalPosition::new(0, 0);
        info.error_handler = None;
    }

    /// ### English
    /// Runs vector drawable animators after the traversal. The step order is significant.
    ///
    /// The running and paused lists are taken out of the lock while animators run, so a
    /// completion listener called inline may add sets to the root.
    ///
    /// #### Parameters
    /// - `ctx`: Animation context of the current frame.
    /// - `info`: Traversal state; `info.out.has_animations` is raised while sets keep running.
    ///
    /// ### 中文
    /// 在遍历之后运行矢量图动画器。步骤顺序不可调换。
    ///
    /// 动画器运行期间 running 与 paused 列表被移出锁外，因此内联调用的完成监听器可以向根节点
    /// 添加集合。
    ///
    /// #### 参数
    /// - `ctx`：当前帧的动画 context。
    /// - `info`：遍历状态；仍有集合运行时置位 `info.out.has_animations`。
    pub fn run_vector_drawable_animators<C: AnimationContext + ?Sized>(
        &self,
        ctx: &mut C,
        info: &mut TreeInfo,
    ) {
        let full = info.mode == TraversalMode::Full;
        let (mut running, mut paused) = {
            let mut state = self.lock();
            (
                std::mem::take(&mut state.running),
                std::mem::take(&mut state.paused),
            )
        };

        if full {
            for set in &running {
                set.push_staging(ctx);
            }
        }

        running.retain(|set| !set.animate(ctx));

        if full {
            // Paused sets still honor their scheduled end.
            paused.retain(|set| !set.animate(ctx));
        }

        let (reachable, unreachable): (Vec<_>, Vec<_>) = running
            .into_iter()
            .partition(|set| set.target().property_change_will_be_consumed());
        running = reachable;
        for set in unreachable {
            self.detach_vector_drawable_animator(&set);
            insert_unique(&mut paused, set);
        }

        if full {
            let (back, still_paused): (Vec<_>, Vec<_>) = paused
                .into_iter()
                .partition(|set| set.target().property_change_will_be_consumed());
            paused = still_paused;
            for set in back {
                insert_unique(&mut running, set);
            }

            let before = paused.len();
            paused.retain(|set| Arc::strong_count(set) > 1);
            if paused.len() != before {
                debug!("pruned {} orphaned paused animator sets", before - paused.len());
            }
        }

        let mut state = self.lock();
        let state = &mut *state;
        for set in std::mem::replace(&mut state.running, running) {
            insert_unique(&mut state.running, set);
        }
        for set in std::mem::replace(&mut state.paused, paused) {
            insert_unique(&mut state.paused, set);
        }
        let running = &state.running;
        state.paused.retain(|set| !contains(running, set));

        info.out.has_animations |= !state.running.is_empty();
        trace!(
            "vector drawable animators: running={} paused={}",
            state.running.len(),
            state.paused.len()
        );
    }

    /// ### English
    /// Posts the deferred completion of a set leaving the running list, at most once per arm.
    ///
    /// ### 中文
    /// 为离开运行列表的集合投递延迟完成消息，每次挂载最多投递一次。
    fn detach_vector_drawable_animator(&self, set: &Arc<AnimatorSet>) {
        if set.is_infinite() || !set.is_running() {
            return;
        }
        let Some(listener) = set.take_one_shot_listener() else {
            return;
        };
        let remaining_ms = set.remaining_play_time_ms();
        let message = FinishAndInvokeListener {
            set: Arc::downgrade(set),
            request_id: set.request_id(),
            listener,
        };
        debug!("posting finish message in {remaining_ms}ms (request {})", message.request_id);
        let delay = Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(0));
        self.send_message_delayed(delay, Box::new(move || message.run()));
    }

    /// ### English
    /// Detaches every running set and forgets running and paused sets (surface teardown).
    ///
    /// ### 中文
    /// 分离所有运行中的集合，并清空 running 与 paused（surface 销毁时）。
    pub fn detach_animators(&self) {
        let mut state = self.lock();
        for set in &state.running {
            self.detach_vector_drawable_animator(set);
        }
        state.running.clear();
        state.paused.clear();
    }

    /// ### English
    /// Moves every running set to paused and posts their deferred completions.
    ///
    /// ### 中文
    /// 把所有运行中的集合移到 paused，并投递其延迟完成消息。
    pub fn pause_animators(&self) {
        let mut state = self.lock();
        let running = std::mem::take(&mut state.running);
        for set in running {
            self.detach_vector_drawable_animator(&set);
            insert_unique(&mut state.paused, set);
        }
    }

    /// ### English
    /// Ends the staging animators of pending nodes and clears the pending collections.
    /// Running and paused sets are left to `detach_animators`.
    ///
    /// ### 中文
    /// 结束 pending 节点上的 staging 动画器，并清空 pending 集合。
    /// running 与 paused 集合交由 `detach_animators` 处理。
    pub fn destroy(&self) {
        let nodes = {
            let mut state = self.lock();
            state.pending.clear();
            std::mem::take(&mut state.pending_nodes)
        };
        for node in nodes {
            node.animators().end_all_staging_animators(node.name());
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn pending_node_count(&self) -> usize {
        self.lock().pending_nodes.len()
    }

    pub fn running_count(&self) -> usize {
        self.lock().running.len()
    }

    pub fn paused_count(&self) -> usize {
        self.lock().paused.len()
    }

    pub fn is_pending(&self, set: &Arc<AnimatorSet>) -> bool {
        contains(&self.lock().pending, set)
    }

    pub fn is_running(&self, set: &Arc<AnimatorSet>) -> bool {
        contains(&self.lock().running, set)
    }

    pub fn is_paused(&self, set: &Arc<AnimatorSet>) -> bool {
        contains(&self.lock().paused, set)
    }

    fn lock(&self) -> MutexGuard<'_, RootState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
