//! ### English
//! Per-node animator bookkeeping: staging animators added from the owner thread and active
//! animators driven on the render thread.
//!
//! ### 中文
//! 节点级动画器登记：owner 线程添加的 staging 动画器，以及在渲染线程驱动的活动动画器。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::engine::animation::{AnimationContext, RenderNodeAnimator};

#[derive(Default)]
struct AnimatorLists {
    staging: Vec<Arc<RenderNodeAnimator>>,
    active: Vec<Arc<RenderNodeAnimator>>,
}

/// ### English
/// Animators owned by one scene node.
///
/// Newly added animators wait in the staging list until the next full traversal pushes them into
/// the active list. Lists are taken out of the lock while animators run so callbacks may add more.
///
/// ### 中文
/// 单个场景节点拥有的动画器。
///
/// 新添加的动画器先放在 staging 列表中，直到下一次完整遍历把它们推入活动列表。
/// 动画器运行期间列表会被移出锁外，因此回调中可以继续添加动画器。
#[derive(Default)]
pub struct AnimatorManager {
    lists: Mutex<AnimatorLists>,
}

impl AnimatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Stages `animator` until the next full traversal.
    ///
    /// #### Parameters
    /// - `animator`: Animator to stage; staging it twice is a no-op.
    ///
    /// ### 中文
    /// 暂存 `animator`，直到下一次完整遍历。
    ///
    /// #### 参数
    /// - `animator`：要暂存的动画器；重复暂存不做任何事。
    pub fn add_animator(&self, animator: Arc<RenderNodeAnimator>) {
        let mut lists = self.lock();
        if !lists.staging.iter().any(|other| Arc::ptr_eq(other, &animator)) {
            lists.staging.push(animator);
        }
    }

    pub fn push_staging<C: AnimationContext + ?Sized>(&self, ctx: &mut C) {
        let active = {
            let mut lists = self.lock();
            let staged = std::mem::take(&mut lists.staging);
            for animator in staged {
                if !lists.active.iter().any(|other| Arc::ptr_eq(other, &animator)) {
                    lists.active.push(animator);
                }
            }
            lists.active.clone()
        };
        for animator in &active {
            animator.push_staging(ctx);
        }
    }

    /// ### English
    /// Advances every active animator, dropping the finished ones. Returns whether any remain.
    ///
    /// ### 中文
    /// 推进所有活动动画器并移除已结束的。返回是否仍有剩余。
    pub fn animate<C: AnimationContext + ?Sized>(&self, ctx: &mut C) -> bool {
        let mut active = std::mem::take(&mut self.lock().active);
        active.retain(|animator| !animator.animate(ctx));
        let mut lists = self.lock();
        active.append(&mut lists.active);
        lists.active = active;
        !lists.active.is_empty()
    }

    /// ### English
    /// Cancels every animator that never reached the render thread and notifies its listener
    /// synchronously.
    ///
    /// ### 中文
    /// 取消所有尚未到达渲染线程的动画器，并同步通知其监听器。
    pub fn end_all_staging_animators(&self, node_name: &str) {
        let staged = std::mem::take(&mut self.lock().staging);
        debug!("ending {} staging animators on {node_name}", staged.len());
        for animator in staged {
            animator.cancel();
            animator.notify_listener_now();
        }
    }

    pub fn end_all_active_animators<C: AnimationContext + ?Sized>(&self, ctx: &mut C) {
        let active = std::mem::take(&mut self.lock().active);
        for animator in active {
            animator.force_end_now(ctx);
        }
    }

    pub fn has_active_animators(&self) -> bool {
        !self.lock().active.is_empty()
    }

    pub fn has_animators(&self) -> bool {
        let lists = self.lock();
        !lists.staging.is_empty() || !lists.active.is_empty()
    }

    pub fn staging_count(&self) -> usize {
        self.lock().staging.len()
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    fn lock(&self) -> MutexGuard<'_, AnimatorLists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
