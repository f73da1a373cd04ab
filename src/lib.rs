// 位置闹钟 - 移动应用核心库
//
// 宿主（地图、搜索、权限弹窗、通知栏）通过 commands 和事件总线与核心交互，
// 定位、音频、振动通过 platform 中的 trait 注入

// 声明模块
pub mod actors;
pub mod alarm;
pub mod app;
pub mod commands;
pub mod error;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod platform;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use actors::AlarmHandle;
use event_bus::EventBus;
use logger::LogBroadcaster;
use settings::SettingsManager;

pub use app::{init_logging, start, Platform};
pub use error::{AlarmError, PlatformError};
pub use models::{AlarmConfig, AlarmSnapshot, AlarmState, Destination, LocationSample};

/// 应用状态
///
/// 宿主持有该状态并注入到各个界面，界面只能通过它读取快照、订阅事件和发送命令
#[derive(Clone)]
pub struct AppState {
    /// 闹钟控制器
    pub alarm: AlarmHandle,
    /// 配置管理
    pub settings: Arc<SettingsManager>,
    /// 事件总线
    pub event_bus: Arc<EventBus>,
    /// 日志推送器
    pub log_broadcaster: Arc<LogBroadcaster>,
}
