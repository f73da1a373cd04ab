//! 应用程序初始化和启动
//!
//! 负责核心库的完整启动流程，包括：
//! - 日志系统初始化
//! - 配置加载
//! - 事件总线创建
//! - 闹钟控制器 Actor 启动

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::actors::GeofenceAlarmController;
use crate::event_bus::EventBus;
use crate::logger::{self, LogBroadcaster};
use crate::platform::{AudioPlayer, LocationProvider, VibrationDriver};
use crate::settings::SettingsManager;
use crate::AppState;

/// 宿主平台提供的协作者
pub struct Platform {
    pub location: Arc<dyn LocationProvider>,
    pub player: Arc<dyn AudioPlayer>,
    pub vibrator: Arc<dyn VibrationDriver>,
}

/// 初始化日志系统
///
/// 返回日志推送器和文件日志 guard，宿主需要在进程生命周期内持有 guard
pub fn init_logging(log_dir: &Path) -> Result<(Arc<LogBroadcaster>, WorkerGuard)> {
    let broadcaster = Arc::new(LogBroadcaster::new(256));
    let guard = logger::init_with_broadcaster(log_dir, broadcaster.clone())
        .context("Failed to initialize logger")?;
    Ok((broadcaster, guard))
}

/// 启动核心
///
/// 必须在 tokio 运行时内调用，包含以下步骤：
/// 1. 加载配置（`data_dir/settings.json`）
/// 2. 创建事件总线
/// 3. 启动闹钟控制器 Actor
pub async fn start(
    platform: Platform,
    data_dir: &Path,
    log_broadcaster: Arc<LogBroadcaster>,
) -> Result<AppState> {
    info!("初始化位置闹钟核心...");

    let settings = SettingsManager::new(data_dir.join("settings.json"))
        .await
        .context("加载配置失败")?;
    let config = settings.get().await;
    log_broadcaster.set_enabled(config.enable_host_logging);

    let event_bus = Arc::new(EventBus::new(256));

    let (actor, alarm) = GeofenceAlarmController::new(
        config.alarm,
        platform.location,
        platform.player,
        platform.vibrator,
        event_bus.clone(),
    );
    tokio::spawn(async move {
        actor.run().await;
    });

    info!("位置闹钟核心已启动");

    Ok(AppState {
        alarm,
        settings: Arc::new(settings),
        event_bus,
        log_broadcaster,
    })
}
