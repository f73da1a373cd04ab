// 响铃器 - 负责振动循环、音量渐强和播放器生命周期
//
// 所有周期任务都挂在同一个 TimerGroup 上，stop() 一次性取消

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::timers::TimerGroup;
use crate::error::{AlarmError, PlatformError};
use crate::models::AlarmConfig;
use crate::platform::{AudioPlayer, VibrationDriver};

pub struct Ringer {
    player: Arc<dyn AudioPlayer>,
    vibrator: Arc<dyn VibrationDriver>,
    timers: TimerGroup,
    ringing: bool,
}

impl Ringer {
    pub fn new(player: Arc<dyn AudioPlayer>, vibrator: Arc<dyn VibrationDriver>) -> Self {
        Self {
            player,
            vibrator,
            timers: TimerGroup::new("ringer"),
            ringing: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_ringing(&self) -> bool {
        self.ringing
    }

    /// 仍在运行的周期任务数
    #[cfg(test)]
    pub(crate) fn pending_timers(&self) -> usize {
        self.timers.active_count()
    }

    /// 开始响铃
    ///
    /// 先准备音频，再开始振动，保证不会出现只振动没有声音的情况。
    /// 任一步失败都会释放已占用的资源并返回错误
    pub fn start(&mut self, config: &AlarmConfig) -> Result<(), AlarmError> {
        if self.ringing {
            debug!("已在响铃，忽略重复启动");
            return Ok(());
        }

        if let Err(e) = self.start_player(config) {
            warn!("闹铃播放器启动失败: {}", e);
            self.player.release();
            return Err(e.into());
        }

        if let Err(e) = self.vibrator.vibrate(config.vibration_pulse_ms) {
            warn!("振动启动失败: {}", e);
            self.player.stop();
            self.player.release();
            return Err(e.into());
        }

        self.ringing = true;
        self.schedule_vibration(config);
        self.schedule_volume_ramp(config);

        info!(
            "闹钟开始响铃: 铃声={}, 振动周期={}ms",
            config.alarm_tone,
            config.vibration_period_ms()
        );
        Ok(())
    }

    /// 停止响铃，返回是否确实停止了正在进行的响铃
    pub fn stop(&mut self) -> bool {
        if !self.ringing {
            return false;
        }

        let cancelled = self.timers.cancel_all();
        self.player.stop();
        self.player.release();
        self.ringing = false;

        info!("闹钟已停止，取消 {} 个定时任务", cancelled);
        true
    }

    fn start_player(&self, config: &AlarmConfig) -> Result<(), PlatformError> {
        self.player.load(&config.alarm_tone)?;
        self.player.set_looping(true)?;
        self.player.set_volume(0.0)?;
        self.player.play()
    }

    fn schedule_vibration(&mut self, config: &AlarmConfig) {
        let vibrator = self.vibrator.clone();
        let pulse_ms = config.vibration_pulse_ms;
        let period = Duration::from_millis(config.vibration_period_ms());

        self.timers.spawn_repeating(period, period, move || {
            if let Err(e) = vibrator.vibrate(pulse_ms) {
                warn!("振动失败: {}", e);
            }
            ControlFlow::Continue(())
        });
    }

    fn schedule_volume_ramp(&mut self, config: &AlarmConfig) {
        let player = self.player.clone();
        let step = config.volume_step;
        let max_volume = config.max_volume;
        let interval = Duration::from_millis(config.volume_ramp_interval_ms);
        let mut steps: u32 = 0;

        self.timers.spawn_repeating(interval, interval, move || {
            steps += 1;
            let level = (step * steps as f32).min(max_volume);
            if let Err(e) = player.set_volume(level) {
                warn!("调整音量失败: {}", e);
                return ControlFlow::Break(());
            }
            if level >= max_volume {
                debug!("音量已达到最大值: {}", level);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
    }
}

impl Drop for Ringer {
    fn drop(&mut self) {
        self.stop();
    }
}
