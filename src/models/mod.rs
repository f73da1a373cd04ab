// 数据模型模块 - 定义所有的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 目的地坐标（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub latitude: f64,
    pub longitude: f64,
}

impl Destination {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// 定位采样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// 精度（米）
    pub accuracy_meters: Option<f32>,
    /// 采样时间
    pub timestamp: Option<DateTime<Utc>>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: None,
            timestamp: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy_meters: f32) -> Self {
        self.accuracy_meters = Some(accuracy_meters);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// 闹钟状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    /// 未设置目的地，或闹钟已解除
    #[default]
    Idle,
    /// 已设置目的地，正在定位，距离大于阈值
    Armed,
    /// 已到达阈值范围内，铃声和振动进行中
    Ringing,
}

/// 控制器状态快照 - 供UI只读查询
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlarmSnapshot {
    pub state: AlarmState,
    pub destination: Option<Destination>,
    pub last_sample: Option<LocationSample>,
    /// 最近一次计算的到目的地距离（米）
    pub distance_meters: Option<f64>,
    /// 当前布防周期ID
    pub cycle_id: Option<Uuid>,
}

/// 定位请求参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRequest {
    /// 期望的更新间隔（毫秒），不精确
    pub interval_ms: u64,
    /// 最快更新间隔（毫秒）
    pub fastest_interval_ms: u64,
    /// 是否要求高精度
    pub high_accuracy: bool,
}

/// 闹钟配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// 到达判定阈值（米）
    pub threshold_meters: f64,
    /// 定位更新间隔（毫秒）
    pub update_interval_ms: u64,
    /// 最快定位更新间隔（毫秒）
    pub fastest_update_interval_ms: u64,
    /// 单次振动时长（毫秒）
    pub vibration_pulse_ms: u64,
    /// 两次振动之间的间隔（毫秒）
    pub vibration_rest_ms: u64,
    /// 音量渐强步长
    pub volume_step: f32,
    /// 音量渐强间隔（毫秒）
    pub volume_ramp_interval_ms: u64,
    /// 最大音量
    pub max_volume: f32,
    /// 闹铃资源
    pub alarm_tone: String,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            threshold_meters: 200.0,
            update_interval_ms: 40_000,
            fastest_update_interval_ms: 20_000,
            vibration_pulse_ms: 1000,
            vibration_rest_ms: 2000,
            volume_step: 0.01,
            volume_ramp_interval_ms: 500,
            max_volume: 1.0,
            alarm_tone: "default_alarm".to_string(),
        }
    }
}

impl AlarmConfig {
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            interval_ms: self.update_interval_ms,
            fastest_interval_ms: self.fastest_update_interval_ms,
            high_accuracy: true,
        }
    }

    /// 振动周期 = 振动时长 + 间隔
    pub fn vibration_period_ms(&self) -> u64 {
        self.vibration_pulse_ms.saturating_add(self.vibration_rest_ms)
    }
}

/// 配置更新（仅更新提供的字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmConfigUpdate {
    pub threshold_meters: Option<f64>,
    pub update_interval_ms: Option<u64>,
    pub fastest_update_interval_ms: Option<u64>,
    pub vibration_pulse_ms: Option<u64>,
    pub vibration_rest_ms: Option<u64>,
    pub volume_step: Option<f32>,
    pub volume_ramp_interval_ms: Option<u64>,
    pub max_volume: Option<f32>,
    pub alarm_tone: Option<String>,
    pub logger_settings: Option<LoggerSettings>,
}

/// 日志设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// 是否将日志推送到宿主UI
    pub enable_host_logging: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            enable_host_logging: true,
        }
    }
}

/// 持久化的应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAlarmConfig {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default = "default_host_logging")]
    pub enable_host_logging: bool,
}

fn default_host_logging() -> bool {
    true
}

impl Default for PersistedAlarmConfig {
    fn default() -> Self {
        Self {
            alarm: AlarmConfig::default(),
            enable_host_logging: default_host_logging(),
        }
    }
}

/// 到达通知内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalNotice {
    pub title: String,
    pub body: String,
}

impl Default for ArrivalNotice {
    fn default() -> Self {
        Self {
            title: "Location Reached".to_string(),
            body: "You reached Destination.".to_string(),
        }
    }
}
