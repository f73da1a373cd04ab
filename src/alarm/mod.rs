// 闹钟副作用模块 - 响铃器与可取消定时任务

pub mod ringer;
pub mod timers;

pub use ringer::Ringer;
pub use timers::TimerGroup;
