// 错误类型定义
//
// 拒绝请求的错误同步返回给调用方，信息性错误通过事件总线上报

use thiserror::Error;

/// 闹钟控制器错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlarmError {
    /// 坐标超出范围
    #[error("无效坐标: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// 当前位置已在目的地阈值范围内
    #[error("已经接近目的地: 距离 {distance_meters:.1} 米, 阈值 {threshold_meters:.1} 米")]
    AlreadyNearDestination {
        distance_meters: f64,
        threshold_meters: f64,
    },

    /// 闹钟正在响铃，需要先解除
    #[error("闹钟正在响铃，请先解除")]
    AlarmRinging,

    /// 定位权限丢失
    #[error("定位权限丢失: {reason}")]
    PermissionLost { reason: String },

    /// 闹钟启动失败（音频或振动初始化失败）
    #[error("闹钟启动失败: {reason}")]
    AlarmStartFailed { reason: String },

    /// 控制器Actor已停止
    #[error("闹钟控制器已停止")]
    ControllerStopped,
}

/// 平台协作者（定位、音频、振动）返回的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("权限被拒绝: {0}")]
    PermissionDenied(String),

    #[error("资源不可用: {0}")]
    ResourceUnavailable(String),

    #[error("驱动错误: {0}")]
    Driver(String),
}

impl From<PlatformError> for AlarmError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(reason) => AlarmError::PermissionLost { reason },
            other => AlarmError::AlarmStartFailed {
                reason: other.to_string(),
            },
        }
    }
}
