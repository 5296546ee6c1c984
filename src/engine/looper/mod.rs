//! ### English
//! Thread-bound task queues ("loopers") used for one-way cross-thread messaging.
//!
//! Every cross-thread interaction in the render bridge is a posted task: completion listeners,
//! frame metrics notifications and traversal errors all travel to the owner thread this way.
//! Nothing ever blocks waiting for a reply.
//!
//! - [`Looper`]: a dedicated named thread draining its own queue.
//! - [`ManualLooper`]: a caller-pumped queue on a virtual clock (embedders with their own loop,
//!   deterministic tests).
//!
//! ### 中文
//! 绑定到线程的任务队列（looper），用于单向跨线程消息传递。
//!
//! 渲染桥接层中所有跨线程交互都是投递任务：完成监听器、帧指标通知、遍历错误都以此方式送达
//! owner 线程。任何地方都不会阻塞等待回复。
//!
//! - [`Looper`]：独立命名线程，循环处理自己的队列。
//! - [`ManualLooper`]：由调用方驱动、基于虚拟时钟的队列（适用于自带事件循环的宿主与确定性测试）。

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

mod manual;
mod scheduled;
mod thread;

pub use manual::ManualLooper;
pub use thread::{Looper, LooperThread};

/// ### English
/// One unit of work executed on the queue's thread.
///
/// ### 中文
/// 在队列所属线程上执行的一个工作单元。
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Single-threaded FIFO task queue with delayed posting.
///
/// Tasks run in deadline order; tasks with equal deadlines run in posting order. Tasks of one
/// queue never run concurrently with each other.
///
/// ### 中文
/// 支持延迟投递的单线程 FIFO 任务队列。
///
/// 任务按 deadline 顺序执行；deadline 相同的任务按投递顺序执行。同一队列的任务之间不会并发执行。
pub trait TaskQueue: Send + Sync {
    fn post_now(&self, task: Task);

    fn post_after(&self, delay: Duration, task: Task);
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<dyn TaskQueue>>> = const { RefCell::new(None) };
}

/// ### English
/// Returns the task queue bound to the calling thread, if any.
///
/// ### 中文
/// 返回绑定到当前线程的任务队列（若存在）。
pub fn current() -> Option<Arc<dyn TaskQueue>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// ### English
/// Binds (or unbinds with `None`) a task queue to the calling thread.
///
/// ### 中文
/// 将任务队列绑定到当前线程（传入 `None` 则解除绑定）。
pub fn set_current(queue: Option<Arc<dyn TaskQueue>>) {
    CURRENT.with(|current| *current.borrow_mut() = queue);
}
