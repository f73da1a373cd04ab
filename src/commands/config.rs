//! 配置管理命令
//!
//! 提供闹钟配置的读取和更新接口

use crate::event_bus::AlarmEvent;
use crate::models::{AlarmConfigUpdate, PersistedAlarmConfig};
use crate::AppState;
use tracing::info;

/// 获取闹钟配置
pub async fn get_alarm_config(state: &AppState) -> Result<PersistedAlarmConfig, String> {
    Ok(state.settings.get().await)
}

/// 更新配置
///
/// 阈值与定位间隔从下一次布防开始生效，铃声参数从下一次响铃开始生效
pub async fn update_alarm_config(
    state: &AppState,
    update: AlarmConfigUpdate,
) -> Result<PersistedAlarmConfig, String> {
    let logger_settings = update.logger_settings.clone();

    let updated = state
        .settings
        .update(update)
        .await
        .map_err(|e| e.to_string())?;

    state.alarm.update_config(updated.alarm.clone()).await;

    // 更新日志配置
    if let Some(logger_settings) = logger_settings {
        state
            .log_broadcaster
            .set_enabled(logger_settings.enable_host_logging);
        info!(
            "日志推送已{}",
            if logger_settings.enable_host_logging {
                "启用"
            } else {
                "禁用"
            }
        );
    }

    state.event_bus.publish(AlarmEvent::ConfigUpdated);
    Ok(updated)
}
