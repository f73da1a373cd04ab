// 可整体取消的重复定时任务
//
// 每个任务在触发前检查取消闸门；cancel_all 返回后不会再有新的触发

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// 定时任务组
pub struct TimerGroup {
    name: &'static str,
    /// true 表示已取消；任务在持有该锁期间执行回调
    gate: Arc<Mutex<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl TimerGroup {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            gate: Arc::new(Mutex::new(false)),
            handles: Vec::new(),
        }
    }

    /// 启动一个自我重排的定时任务
    ///
    /// 首次在 `initial_delay` 后触发，之后每隔 `period` 触发一次，
    /// 直到回调返回 `ControlFlow::Break` 或整组被取消
    pub fn spawn_repeating<F>(&mut self, initial_delay: Duration, period: Duration, mut tick: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let gate = self.gate.clone();
        let name = self.name;

        let handle = tokio::spawn(async move {
            let mut delay = initial_delay;
            loop {
                tokio::time::sleep(delay).await;
                delay = period;

                let proceed = {
                    match gate.lock() {
                        Ok(cancelled) if !*cancelled => tick().is_continue(),
                        _ => false,
                    }
                };

                if !proceed {
                    trace!("定时任务结束: {}", name);
                    break;
                }
            }
        });

        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    /// 取消组内所有定时任务，返回被取消时仍在运行的任务数
    pub fn cancel_all(&mut self) -> usize {
        {
            let mut cancelled = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            *cancelled = true;
        }

        let mut aborted = 0;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                aborted += 1;
            }
            handle.abort();
        }

        // 新闸门，允许复用本组
        self.gate = Arc::new(Mutex::new(false));

        if aborted > 0 {
            debug!("已取消定时任务组 {}: {} 个任务", self.name, aborted);
        }
        aborted
    }

    /// 仍在运行的任务数
    pub fn active_count(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for TimerGroup {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
