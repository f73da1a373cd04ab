//! 宿主命令模块
//!
//! 提供宿主界面调用的所有命令接口，按功能分组：
//! - alarm: 闹钟控制命令
//! - config: 配置管理命令
//!
//! 跨越宿主边界时错误统一转换为字符串

pub mod alarm;
pub mod config;

// 重新导出所有命令
pub use alarm::*;
pub use config::*;
