//! 输入验证工具函数
//!
//! 提供坐标与配置参数的验证功能，拒绝无效输入

use crate::error::AlarmError;
use crate::models::AlarmConfig;

/// 振动时长、振动间隔和音量渐强间隔的上限（毫秒）
pub const MAX_RINGER_INTERVAL_MS: u64 = 60_000;

/// 验证坐标是否有效
///
/// # 参数
/// - `latitude`: 纬度，范围 -90..=90
/// - `longitude`: 经度，范围 -180..=180
///
/// # 返回
/// - `Ok(())`: 验证通过
/// - `Err(AlarmError::InvalidCoordinate)`: 坐标超出范围或不是有限数
pub fn validate_coordinate(latitude: f64, longitude: f64) -> Result<(), AlarmError> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    if !valid {
        return Err(AlarmError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }
    Ok(())
}

/// 验证闹钟配置
pub fn validate_config(config: &AlarmConfig) -> Result<(), String> {
    if !(config.threshold_meters.is_finite() && config.threshold_meters > 0.0) {
        return Err(format!("无效的到达阈值: {}", config.threshold_meters));
    }
    if config.update_interval_ms == 0 || config.fastest_update_interval_ms == 0 {
        return Err("定位更新间隔必须大于0".to_string());
    }
    if config.fastest_update_interval_ms > config.update_interval_ms {
        return Err(format!(
            "最快更新间隔({}ms)不能大于更新间隔({}ms)",
            config.fastest_update_interval_ms, config.update_interval_ms
        ));
    }
    if config.vibration_pulse_ms == 0 {
        return Err("振动时长必须大于0".to_string());
    }
    if config.volume_ramp_interval_ms == 0 {
        return Err("音量渐强间隔必须大于0".to_string());
    }
    for (name, value) in [
        ("振动时长", config.vibration_pulse_ms),
        ("振动间隔", config.vibration_rest_ms),
        ("音量渐强间隔", config.volume_ramp_interval_ms),
    ] {
        if value > MAX_RINGER_INTERVAL_MS {
            return Err(format!(
                "{}({}ms)不能超过{}ms",
                name, value, MAX_RINGER_INTERVAL_MS
            ));
        }
    }
    if !(config.max_volume > 0.0 && config.max_volume <= 1.0) {
        return Err(format!("无效的最大音量: {}", config.max_volume));
    }
    if !(config.volume_step > 0.0 && config.volume_step <= config.max_volume) {
        return Err(format!("无效的音量步长: {}", config.volume_step));
    }
    if config.alarm_tone.trim().is_empty() {
        return Err("闹铃资源不能为空".to_string());
    }
    Ok(())
}
