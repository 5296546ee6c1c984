//! ### English
//! Animated property storage of a vector drawable.
//!
//! ### 中文
//! 矢量图的动画属性存储。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// ### English
/// Vector drawable root animated by an [`super::AnimatorSet`].
///
/// Holds a flat table of animatable float properties plus the two per-frame flags the root node
/// uses for reachability: "property change will be consumed" (set while the target is found in
/// the traversed display list) and "dirty".
///
/// ### 中文
/// 由 [`super::AnimatorSet`] 驱动的矢量图根节点。
///
/// 保存一张可动画 float 属性表，以及根节点用于可达性判断的两个逐帧标志：
/// “属性变化将被消费”（在遍历的 display list 中找到该目标时置位）与 “dirty”。
#[derive(Debug)]
pub struct VectorTarget {
    name: String,
    properties: Mutex<Vec<f32>>,
    will_be_consumed: AtomicBool,
    dirty: AtomicBool,
}

impl VectorTarget {
    pub fn new(name: impl Into<String>, property_count: usize) -> Self {
        Self {
            name: name.into(),
            properties: Mutex::new(vec![0.0; property_count]),
            will_be_consumed: AtomicBool::new(true),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self, index: usize) -> Option<f32> {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .copied()
    }

    /// ### English
    /// Writes one property; out-of-range indices are ignored.
    ///
    /// ### 中文
    /// 写入一个属性；越界索引会被忽略。
    pub fn set_property(&self, index: usize, value: f32) {
        if let Some(slot) = self
            .properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(index)
        {
            *slot = value;
        }
    }

    pub fn set_property_change_will_be_consumed(&self, consumed: bool) {
        self.will_be_consumed.store(consumed, Ordering::Relaxed);
    }

    pub fn property_change_will_be_consumed(&self) -> bool {
        self.will_be_consumed.load(Ordering::Relaxed)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// ### English
    /// Records that a traversal reached this target: its next property change will be drawn.
    /// Returns whether it was dirty.
    ///
    /// ### 中文
    /// 记录遍历到达了该目标：其下一次属性变化会被绘制。返回其此前是否为 dirty。
    pub fn consume(&self) -> bool {
        self.will_be_consumed.store(true, Ordering::Relaxed);
        self.dirty.swap(false, Ordering::Relaxed)
    }
}
