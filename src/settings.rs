use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;
use tracing::warn;

use crate::models::{AlarmConfigUpdate, PersistedAlarmConfig};
use crate::utils::validate_config;

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<PersistedAlarmConfig>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                match serde_json::from_slice::<PersistedAlarmConfig>(&bytes) {
                    Ok(config) if validate_config(&config.alarm).is_ok() => config,
                    Ok(_) | Err(_) => {
                        warn!("配置文件无效，使用默认配置: {:?}", path);
                        PersistedAlarmConfig::default()
                    }
                }
            }
            _ => {
                let default = PersistedAlarmConfig::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> PersistedAlarmConfig {
        self.data.read().await.clone()
    }

    pub async fn update(&self, update: AlarmConfigUpdate) -> Result<PersistedAlarmConfig> {
        let mut config = self.data.write().await;
        let mut next = config.clone();

        if let Some(value) = update.threshold_meters {
            next.alarm.threshold_meters = value;
        }
        if let Some(interval) = update.update_interval_ms {
            next.alarm.update_interval_ms = interval;
        }
        if let Some(interval) = update.fastest_update_interval_ms {
            next.alarm.fastest_update_interval_ms = interval;
        }
        if let Some(pulse) = update.vibration_pulse_ms {
            next.alarm.vibration_pulse_ms = pulse;
        }
        if let Some(rest) = update.vibration_rest_ms {
            next.alarm.vibration_rest_ms = rest;
        }
        if let Some(step) = update.volume_step {
            next.alarm.volume_step = step;
        }
        if let Some(interval) = update.volume_ramp_interval_ms {
            next.alarm.volume_ramp_interval_ms = interval;
        }
        if let Some(volume) = update.max_volume {
            next.alarm.max_volume = volume;
        }
        if let Some(tone) = update.alarm_tone {
            next.alarm.alarm_tone = tone;
        }
        if let Some(logger) = update.logger_settings {
            next.enable_host_logging = logger.enable_host_logging;
        }

        validate_config(&next.alarm).map_err(|e| anyhow!(e))?;

        self.save(&next).await?;
        *config = next;
        Ok(config.clone())
    }

    async fn save(&self, config: &PersistedAlarmConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
