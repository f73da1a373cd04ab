//! 闹钟控制命令
//!
//! 宿主界面调用的闹钟接口，包括：
//! - 设置目的地
//! - 解除响铃
//! - 取消布防
//! - 状态查询

use crate::models::AlarmSnapshot;
use crate::utils::location_text;
use crate::AppState;
use tracing::info;

/// 设置目的地并布防
pub async fn set_destination(
    state: &AppState,
    latitude: f64,
    longitude: f64,
) -> Result<AlarmSnapshot, String> {
    state
        .alarm
        .set_destination(latitude, longitude)
        .await
        .map_err(|e| e.to_string())
}

/// 解除响铃
///
/// 非响铃状态下调用不会报错，返回 false
pub async fn dismiss_alarm(state: &AppState) -> Result<bool, String> {
    let dismissed = state.alarm.dismiss().await;
    if dismissed {
        info!("用户解除了闹钟");
    }
    Ok(dismissed)
}

/// 取消布防（通知栏上的"停止定位"操作）
pub async fn cancel_arming(state: &AppState) -> Result<bool, String> {
    Ok(state.alarm.cancel_arming().await)
}

/// 获取闹钟状态
pub async fn get_alarm_status(state: &AppState) -> Result<AlarmSnapshot, String> {
    Ok(state.alarm.snapshot())
}

/// 获取当前位置的可读文本，用于常驻通知
pub async fn get_location_text(state: &AppState) -> Result<String, String> {
    let snapshot = state.alarm.snapshot();
    Ok(location_text(snapshot.last_sample.as_ref()))
}
