//! ### English
//! Dedicated looper thread backed by a crossbeam channel and a deadline heap.
//!
//! ### 中文
//! 由 crossbeam channel 与 deadline 堆驱动的独立 looper 线程。

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, warn};

use super::scheduled::{ScheduledTask, pop_due};
use super::{Task, TaskQueue};
use crate::engine::error::{BridgeError, Result};

const LOOPER_INIT_TIMEOUT: Duration = Duration::from_secs(5);

enum LooperMessage {
    Post(ScheduledTask<Instant>),
    Quit,
}

struct LooperShared {
    name: String,
    tx: Sender<LooperMessage>,
    next_seq: AtomicU64,
    quitting: AtomicBool,
}

/// ### English
/// Cloneable handle for posting tasks to a looper thread.
///
/// Posting after [`Looper::quit`] drops the task and logs a warning.
///
/// ### 中文
/// 可克隆的句柄，用于向 looper 线程投递任务。
///
/// 在 [`Looper::quit`] 之后投递的任务会被丢弃，并输出一条警告日志。
#[derive(Clone)]
pub struct Looper {
    shared: Arc<LooperShared>,
}

impl Looper {
    /// ### English
    /// Spawns a named looper thread and waits until it is bound and running.
    ///
    /// The new thread is registered as the thread's current queue, so code running inside its
    /// tasks can reach it through [`super::current`].
    ///
    /// ### 中文
    /// 启动一个命名 looper 线程，并等待其完成绑定并开始运行。
    ///
    /// 新线程会注册为该线程的当前队列，因此其任务中的代码可以通过 [`super::current`] 获取它。
    pub fn spawn(name: impl Into<String>) -> Result<LooperThread> {
        let name = name.into();
        let (tx, rx) = crossbeam_channel::unbounded();
        let looper = Looper {
            shared: Arc::new(LooperShared {
                name: name.clone(),
                tx,
                next_seq: AtomicU64::new(1),
                quitting: AtomicBool::new(false),
            }),
        };

        let (init_tx, init_rx) = crossbeam_channel::bounded::<()>(1);
        let looper_for_thread = looper.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                super::set_current(Some(Arc::new(looper_for_thread)));
                let _ = init_tx.send(());
                run_looper(rx);
                super::set_current(None);
            })?;

        match init_rx.recv_timeout(LOOPER_INIT_TIMEOUT) {
            Ok(()) => {
                debug!("looper {name} started");
                Ok(LooperThread {
                    looper,
                    join: Some(join),
                })
            }
            Err(err) => {
                looper.quit();
                Err(BridgeError::LooperInit(format!("{name}: {err}")))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// ### English
    /// Stops the loop after the task currently running; tasks still queued are dropped.
    ///
    /// ### 中文
    /// 在当前任务执行完后停止循环；仍在队列中的任务会被丢弃。
    pub fn quit(&self) {
        if !self.shared.quitting.swap(true, Ordering::AcqRel) {
            let _ = self.shared.tx.send(LooperMessage::Quit);
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.shared.quitting.load(Ordering::Acquire)
    }

    fn post_at(&self, deadline: Instant, task: Task) {
        if self.is_quitting() {
            warn!("looper {} is quitting; dropping posted task", self.shared.name);
            return;
        }
        let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed);
        let message = LooperMessage::Post(ScheduledTask {
            deadline,
            seq,
            task,
        });
        if self.shared.tx.send(message).is_err() {
            warn!("looper {} has exited; dropping posted task", self.shared.name);
        }
    }
}

impl TaskQueue for Looper {
    fn post_now(&self, task: Task) {
        self.post_at(Instant::now(), task);
    }

    fn post_after(&self, delay: Duration, task: Task) {
        self.post_at(Instant::now() + delay, task);
    }
}

/// ### English
/// Owner of a spawned looper thread. Dropping it quits the loop and joins the thread.
///
/// ### 中文
/// 已启动 looper 线程的所有者。drop 时会退出循环并 join 该线程。
pub struct LooperThread {
    looper: Looper,
    join: Option<thread::JoinHandle<()>>,
}

impl LooperThread {
    pub fn looper(&self) -> Looper {
        self.looper.clone()
    }

    /// ### English
    /// The looper as a shareable task queue handle.
    ///
    /// ### 中文
    /// 以可共享任务队列句柄的形式返回该 looper。
    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        Arc::new(self.looper.clone())
    }
}

impl Drop for LooperThread {
    fn drop(&mut self) {
        self.looper.quit();
        if let Some(join) = self.join.take()
            && thread::current().id() != join.thread().id()
        {
            let _ = join.join();
        }
    }
}

fn run_looper(rx: Receiver<LooperMessage>) {
    let mut queue: BinaryHeap<ScheduledTask<Instant>> = BinaryHeap::new();

    loop {
        loop {
            match rx.try_recv() {
                Ok(LooperMessage::Post(task)) => queue.push(task),
                Ok(LooperMessage::Quit) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => break,
            }
        }

        let now = Instant::now();
        if let Some(next) = pop_due(&mut queue, &now) {
            (next.task)();
            continue;
        }

        let message = match queue.peek() {
            Some(next) => {
                let timeout = next.deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match rx.recv() {
                Ok(message) => message,
                Err(_) => return,
            },
        };
        match message {
            LooperMessage::Post(task) => queue.push(task),
            LooperMessage::Quit => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn runs_tasks_in_deadline_then_posting_order() {
        let thread = Looper::spawn("test-looper-order").unwrap();
        let looper = thread.looper();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let delayed = seen.clone();
        looper.post_after(
            Duration::from_millis(30),
            Box::new(move || {
                delayed.lock().unwrap().push("delayed");
                let _ = done_tx.send(());
            }),
        );
        for label in ["a", "b", "c"] {
            let seen = seen.clone();
            looper.post_now(Box::new(move || seen.lock().unwrap().push(label)));
        }

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c", "delayed"]);
    }

    #[test]
    fn binds_itself_as_current_queue() {
        let thread = Looper::spawn("test-looper-current").unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread.looper().post_now(Box::new(move || {
            let _ = tx.send(crate::engine::looper::current().is_some());
        }));
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn posting_after_quit_drops_the_task() {
        let thread = Looper::spawn("test-looper-quit").unwrap();
        let looper = thread.looper();
        looper.quit();
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        looper.post_now(Box::new(move || {
            let _ = tx.send(());
        }));
        drop(thread);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
