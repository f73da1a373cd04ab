// 平台协作者接口
//
// 定位、音频、振动均由宿主平台提供，核心只依赖这里的trait

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

use crate::actors::AlarmCommand;
use crate::error::PlatformError;
use crate::models::{LocationRequest, LocationSample};

/// 定位服务
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// 开始定位，采样通过 `sink` 异步送回
    async fn subscribe(
        &self,
        request: LocationRequest,
        sink: LocationSink,
    ) -> Result<(), PlatformError>;

    /// 停止定位
    async fn unsubscribe(&self) -> Result<(), PlatformError>;

    /// 最近一次缓存的位置
    async fn last_known(&self) -> Option<LocationSample>;
}

/// 音频播放器
///
/// 运行期错误由宿主的错误回调通过 `AlarmHandle::report_player_error` 上报
pub trait AudioPlayer: Send + Sync {
    fn load(&self, tone: &str) -> Result<(), PlatformError>;
    fn set_looping(&self, looping: bool) -> Result<(), PlatformError>;
    fn set_volume(&self, volume: f32) -> Result<(), PlatformError>;
    fn play(&self) -> Result<(), PlatformError>;
    fn stop(&self);
    fn release(&self);
}

/// 振动驱动
pub trait VibrationDriver: Send + Sync {
    fn vibrate(&self, duration_ms: u64) -> Result<(), PlatformError>;
}

/// 定位回调入口
///
/// 可在任意线程调用，不阻塞；邮箱满时丢弃该采样（后续采样会覆盖）
#[derive(Clone)]
pub struct LocationSink {
    sender: mpsc::Sender<AlarmCommand>,
}

impl LocationSink {
    pub(crate) fn new(sender: mpsc::Sender<AlarmCommand>) -> Self {
        Self { sender }
    }

    /// 投递一次定位采样
    pub fn deliver(&self, sample: LocationSample) {
        if let Err(e) = self.sender.try_send(AlarmCommand::LocationSample { sample }) {
            warn!("定位采样投递失败，已丢弃: {}", e);
        }
    }

    /// 上报定位权限丢失
    pub fn permission_lost(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if let Err(e) = self
            .sender
            .try_send(AlarmCommand::PermissionLost { reason })
        {
            warn!("权限丢失通知投递失败: {}", e);
        }
    }
}

impl fmt::Debug for LocationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationSink")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}
