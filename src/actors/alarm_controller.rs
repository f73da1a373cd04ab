// Geofence Alarm Controller - 使用Actor模式管理闹钟状态机
//
// 所有状态变更（设置目的地、定位采样、解除）都经由同一个邮箱串行处理，
// 避免解除闹钟与定位采样并发时重新触发响铃

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::alarm::Ringer;
use crate::error::AlarmError;
use crate::event_bus::{AlarmEvent, EventBus};
use crate::models::{
    AlarmConfig, AlarmSnapshot, AlarmState, ArrivalNotice, Destination, LocationSample,
};
use crate::platform::{AudioPlayer, LocationProvider, LocationSink, VibrationDriver};
use crate::utils::{distance_to, location_text, validate_coordinate};

/// 闹钟控制器命令
pub enum AlarmCommand {
    /// 设置目的地
    SetDestination {
        destination: Destination,
        reply: oneshot::Sender<Result<AlarmSnapshot, AlarmError>>,
    },

    /// 新的定位采样
    LocationSample { sample: LocationSample },

    /// 解除响铃
    Dismiss { reply: oneshot::Sender<bool> },

    /// 取消布防
    CancelArming { reply: oneshot::Sender<bool> },

    /// 播放器运行期错误
    PlayerError { reason: String },

    /// 定位权限丢失
    PermissionLost { reason: String },

    /// 更新配置（下一个布防周期生效）
    UpdateConfig { config: AlarmConfig },

    /// 健康检查
    HealthCheck { reply: oneshot::Sender<()> },
}

/// 地理围栏闹钟控制器
pub struct GeofenceAlarmController {
    receiver: mpsc::Receiver<AlarmCommand>,
    /// 用于构造定位回调；弱引用，所有Handle释放后Actor可以退出
    sink_sender: mpsc::WeakSender<AlarmCommand>,
    snapshot_tx: watch::Sender<AlarmSnapshot>,
    event_bus: Arc<EventBus>,
    provider: Arc<dyn LocationProvider>,
    ringer: Ringer,

    /// 最新配置
    config: AlarmConfig,
    /// 当前布防周期使用的配置
    cycle_config: AlarmConfig,

    state: AlarmState,
    destination: Option<Destination>,
    last_sample: Option<LocationSample>,
    distance_meters: Option<f64>,
    cycle_id: Option<Uuid>,
    sampling: bool,
}

impl GeofenceAlarmController {
    /// 创建新的Actor
    pub fn new(
        config: AlarmConfig,
        provider: Arc<dyn LocationProvider>,
        player: Arc<dyn AudioPlayer>,
        vibrator: Arc<dyn VibrationDriver>,
        event_bus: Arc<EventBus>,
    ) -> (Self, AlarmHandle) {
        let (sender, receiver) = mpsc::channel(64);
        let (snapshot_tx, snapshot_rx) = watch::channel(AlarmSnapshot::default());

        let actor = Self {
            receiver,
            sink_sender: sender.downgrade(),
            snapshot_tx,
            event_bus,
            provider,
            ringer: Ringer::new(player, vibrator),
            cycle_config: config.clone(),
            config,
            state: AlarmState::Idle,
            destination: None,
            last_sample: None,
            distance_meters: None,
            cycle_id: None,
            sampling: false,
        };
        let handle = AlarmHandle {
            sender,
            snapshot: snapshot_rx,
        };
        (actor, handle)
    }

    /// 运行Actor
    pub async fn run(mut self) {
        info!("Geofence Alarm Controller 已启动");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                AlarmCommand::SetDestination { destination, reply } => {
                    let result = self.set_destination(destination).await;
                    let _ = reply.send(result);
                }

                AlarmCommand::LocationSample { sample } => {
                    self.on_location_sample(sample).await;
                }

                AlarmCommand::Dismiss { reply } => {
                    let dismissed = self.dismiss();
                    let _ = reply.send(dismissed);
                }

                AlarmCommand::CancelArming { reply } => {
                    let cancelled = self.cancel_arming().await;
                    let _ = reply.send(cancelled);
                }

                AlarmCommand::PlayerError { reason } => {
                    self.on_player_error(reason).await;
                }

                AlarmCommand::PermissionLost { reason } => {
                    self.on_permission_lost(reason);
                }

                AlarmCommand::UpdateConfig { config } => {
                    info!("闹钟配置已更新: {:?}", config);
                    self.config = config;
                }

                AlarmCommand::HealthCheck { reply } => {
                    let _ = reply.send(());
                }
            }
        }

        self.ringer.stop();
        self.stop_sampling().await;
        info!("Geofence Alarm Controller 已停止");
    }

    async fn set_destination(
        &mut self,
        destination: Destination,
    ) -> Result<AlarmSnapshot, AlarmError> {
        validate_coordinate(destination.latitude, destination.longitude)?;

        if self.state == AlarmState::Ringing {
            return Err(AlarmError::AlarmRinging);
        }

        let config = self.config.clone();
        let reference = match self.provider.last_known().await {
            Some(sample) if validate_coordinate(sample.latitude, sample.longitude).is_ok() => {
                Some(sample)
            }
            _ => self.last_sample.clone(),
        };

        let distance = reference.as_ref().map(|s| distance_to(s, &destination));
        if let Some(d) = distance {
            if d < config.threshold_meters {
                info!("目的地距当前位置仅 {:.1} 米，拒绝设置", d);
                return Err(AlarmError::AlreadyNearDestination {
                    distance_meters: d,
                    threshold_meters: config.threshold_meters,
                });
            }
        }

        let cycle_id = Uuid::new_v4();
        self.destination = Some(destination);
        self.cycle_id = Some(cycle_id);
        self.cycle_config = config;
        self.last_sample = reference;
        self.distance_meters = distance;
        self.state = AlarmState::Armed;

        info!(
            "目的地已设置: ({}, {}), 布防周期 {}",
            destination.latitude, destination.longitude, cycle_id
        );

        if !self.sampling {
            self.start_sampling().await;
        }

        self.event_bus.publish(AlarmEvent::StateChanged {
            state: AlarmState::Armed,
            cycle_id: Some(cycle_id),
        });
        if let (Some(d), Some(sample)) = (distance, self.last_sample.clone()) {
            self.publish_distance(cycle_id, d, sample);
        }

        Ok(self.publish_snapshot())
    }

    async fn on_location_sample(&mut self, sample: LocationSample) {
        if self.state != AlarmState::Armed {
            trace!("状态为 {:?}，忽略定位采样", self.state);
            return;
        }

        if let Err(e) = validate_coordinate(sample.latitude, sample.longitude) {
            warn!("忽略无效的定位采样: {}", e);
            return;
        }

        let (Some(destination), Some(cycle_id)) = (self.destination, self.cycle_id) else {
            return;
        };

        let distance = distance_to(&sample, &destination);
        debug!(
            "新位置 {}，距目的地 {:.1} 米",
            location_text(Some(&sample)),
            distance
        );

        self.last_sample = Some(sample.clone());
        self.distance_meters = Some(distance);

        if distance < self.cycle_config.threshold_meters {
            self.enter_ringing(cycle_id).await;
        } else {
            self.publish_distance(cycle_id, distance, sample);
            self.publish_snapshot();
        }
    }

    async fn enter_ringing(&mut self, cycle_id: Uuid) {
        info!("已到达目的地，开始响铃 (周期 {})", cycle_id);

        if let Err(e) = self.ringer.start(&self.cycle_config) {
            error!("闹钟启动失败，保持布防: {}", e);
            self.event_bus.publish(AlarmEvent::AlarmStartFailed {
                cycle_id: Some(cycle_id),
                reason: e.to_string(),
            });
            self.publish_snapshot();
            return;
        }

        self.state = AlarmState::Ringing;
        self.stop_sampling().await;

        self.event_bus.publish(AlarmEvent::StateChanged {
            state: AlarmState::Ringing,
            cycle_id: Some(cycle_id),
        });
        self.event_bus.publish(AlarmEvent::ArrivalNotification {
            cycle_id,
            notice: ArrivalNotice::default(),
        });
        self.publish_snapshot();
    }

    fn dismiss(&mut self) -> bool {
        if self.state != AlarmState::Ringing {
            debug!("状态为 {:?}，解除操作无效", self.state);
            return false;
        }

        self.ringer.stop();
        self.reset_to_idle();
        info!("闹钟已解除");
        true
    }

    async fn cancel_arming(&mut self) -> bool {
        if self.state != AlarmState::Armed {
            debug!("状态为 {:?}，取消布防无效", self.state);
            return false;
        }

        self.stop_sampling().await;
        self.reset_to_idle();
        info!("已取消布防");
        true
    }

    async fn on_player_error(&mut self, reason: String) {
        if self.state != AlarmState::Ringing {
            debug!("非响铃状态下的播放器错误，已忽略: {}", reason);
            return;
        }

        error!("播放器运行出错，停止响铃: {}", reason);
        self.ringer.stop();
        let cycle_id = self.cycle_id;
        self.event_bus.publish(AlarmEvent::AlarmStartFailed { cycle_id, reason });

        if self.destination.is_none() {
            self.reset_to_idle();
            return;
        }

        self.state = AlarmState::Armed;
        self.start_sampling().await;
        self.event_bus.publish(AlarmEvent::StateChanged {
            state: AlarmState::Armed,
            cycle_id,
        });
        self.publish_snapshot();
    }

    fn on_permission_lost(&mut self, reason: String) {
        warn!("定位权限丢失: {}", reason);
        self.sampling = false;
        self.event_bus.publish(AlarmEvent::PermissionLost { reason });
    }

    async fn start_sampling(&mut self) {
        let Some(sender) = self.sink_sender.upgrade() else {
            warn!("没有可用的控制器Handle，跳过定位订阅");
            return;
        };

        let request = self.cycle_config.location_request();
        match self
            .provider
            .subscribe(request, LocationSink::new(sender))
            .await
        {
            Ok(()) => {
                self.sampling = true;
                info!(
                    "已开始定位: 间隔 {}ms, 最快 {}ms",
                    request.interval_ms, request.fastest_interval_ms
                );
            }
            Err(e) => match AlarmError::from(e) {
                AlarmError::PermissionLost { reason } => {
                    warn!("定位权限丢失，无法开始定位: {}", reason);
                    self.event_bus.publish(AlarmEvent::PermissionLost { reason });
                }
                other => error!("开始定位失败: {}", other),
            },
        }
    }

    async fn stop_sampling(&mut self) {
        if !self.sampling {
            return;
        }
        self.sampling = false;
        match self.provider.unsubscribe().await {
            Ok(()) => info!("已停止定位"),
            Err(e) => warn!("停止定位失败: {}", e),
        }
    }

    fn reset_to_idle(&mut self) {
        self.state = AlarmState::Idle;
        self.destination = None;
        self.distance_meters = None;
        self.cycle_id = None;
        self.event_bus.publish(AlarmEvent::StateChanged {
            state: AlarmState::Idle,
            cycle_id: None,
        });
        self.publish_snapshot();
    }

    fn publish_distance(&self, cycle_id: Uuid, distance_meters: f64, sample: LocationSample) {
        self.event_bus.publish(AlarmEvent::DistanceUpdated {
            cycle_id,
            distance_meters,
            location_text: location_text(Some(&sample)),
            sample,
        });
    }

    fn publish_snapshot(&self) -> AlarmSnapshot {
        let snapshot = AlarmSnapshot {
            state: self.state,
            destination: self.destination,
            last_sample: self.last_sample.clone(),
            distance_meters: self.distance_meters,
            cycle_id: self.cycle_id,
        };
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }
}

/// 闹钟控制器Handle
#[derive(Clone)]
pub struct AlarmHandle {
    sender: mpsc::Sender<AlarmCommand>,
    snapshot: watch::Receiver<AlarmSnapshot>,
}

impl AlarmHandle {
    /// 设置目的地
    pub async fn set_destination(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<AlarmSnapshot, AlarmError> {
        let (reply, rx) = oneshot::channel();
        let destination = Destination::new(latitude, longitude);
        self.sender
            .send(AlarmCommand::SetDestination { destination, reply })
            .await
            .map_err(|_| AlarmError::ControllerStopped)?;
        rx.await.map_err(|_| AlarmError::ControllerStopped)?
    }

    /// 解除响铃，返回是否确实解除
    ///
    /// 返回时所有振动和音量定时任务都已取消
    pub async fn dismiss(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(AlarmCommand::Dismiss { reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// 取消布防
    pub async fn cancel_arming(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .sender
            .send(AlarmCommand::CancelArming { reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// 更新配置
    pub async fn update_config(&self, config: AlarmConfig) {
        let _ = self.sender.send(AlarmCommand::UpdateConfig { config }).await;
    }

    /// 定位回调入口，交给宿主的定位服务使用
    pub fn location_sink(&self) -> LocationSink {
        LocationSink::new(self.sender.clone())
    }

    /// 上报播放器运行期错误，可在任意线程调用
    ///
    /// 邮箱已满时转为等待投递，错误不会被丢弃
    pub fn report_player_error(&self, reason: impl Into<String>) {
        let cmd = AlarmCommand::PlayerError {
            reason: reason.into(),
        };
        let cmd = match self.sender.try_send(cmd) {
            Ok(()) => return,
            Err(TrySendError::Closed(_)) => {
                warn!("播放器错误投递失败: 控制器已停止");
                return;
            }
            Err(TrySendError::Full(cmd)) => cmd,
        };

        debug!("控制器邮箱已满，等待投递播放器错误");
        let sender = self.sender.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if sender.send(cmd).await.is_err() {
                        warn!("播放器错误投递失败: 控制器已停止");
                    }
                });
            }
            Err(_) => {
                if sender.blocking_send(cmd).is_err() {
                    warn!("播放器错误投递失败: 控制器已停止");
                }
            }
        }
    }

    /// 当前状态
    pub fn current_state(&self) -> AlarmState {
        self.snapshot.borrow().state
    }

    /// 最近一次计算的距离（米）
    pub fn current_distance(&self) -> Option<f64> {
        self.snapshot.borrow().distance_meters
    }

    /// 完整状态快照
    pub fn snapshot(&self) -> AlarmSnapshot {
        self.snapshot.borrow().clone()
    }

    /// 订阅状态快照变化
    pub fn watch(&self) -> watch::Receiver<AlarmSnapshot> {
        self.snapshot.clone()
    }

    /// 健康检查
    ///
    /// 返回true表示Actor正常运行，false表示Actor无响应或已停止
    /// 超时时间为5秒
    pub async fn health_check(&self) -> bool {
        let (reply, rx) = oneshot::channel();

        if self
            .sender
            .send(AlarmCommand::HealthCheck { reply })
            .await
            .is_err()
        {
            warn!("Geofence Alarm Controller 健康检查失败: 通道已关闭");
            return false;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(5), rx).await {
            Ok(Ok(())) => {
                debug!("Geofence Alarm Controller 健康检查成功");
                true
            }
            Ok(Err(_)) => {
                warn!("Geofence Alarm Controller 健康检查失败: Actor已停止");
                false
            }
            Err(_) => {
                warn!("Geofence Alarm Controller 健康检查失败: 超时(5秒)");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{MockAudioPlayer, MockLocationProvider, MockVibrator};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const DEST: (f64, f64) = (12.9716, 77.5946);

    struct Fixture {
        handle: AlarmHandle,
        provider: Arc<MockLocationProvider>,
        player: Arc<MockAudioPlayer>,
        vibrator: Arc<MockVibrator>,
        events: broadcast::Receiver<AlarmEvent>,
    }

    impl Fixture {
        fn start(provider: MockLocationProvider) -> Self {
            Self::start_with_config(provider, AlarmConfig::default())
        }

        fn start_with_config(provider: MockLocationProvider, config: AlarmConfig) -> Self {
            let provider = Arc::new(provider);
            let player = Arc::new(MockAudioPlayer::default());
            let vibrator = Arc::new(MockVibrator::default());
            let bus = Arc::new(EventBus::new(100));
            let events = bus.subscribe();

            let (actor, handle) = GeofenceAlarmController::new(
                config,
                provider.clone(),
                player.clone(),
                vibrator.clone(),
                bus,
            );
            tokio::spawn(async move {
                actor.run().await;
            });

            Self {
                handle,
                provider,
                player,
                vibrator,
                events,
            }
        }

        /// 投递采样并等待Actor处理完
        async fn deliver(&self, latitude: f64, longitude: f64) {
            self.provider
                .sink()
                .deliver(LocationSample::new(latitude, longitude));
            assert!(self.handle.health_check().await);
        }

        async fn ring(&self) {
            self.handle.set_destination(DEST.0, DEST.1).await.unwrap();
            self.deliver(12.9720, 77.5950).await;
            assert_eq!(self.handle.current_state(), AlarmState::Ringing);
        }

        fn drain_events(&mut self) -> Vec<AlarmEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                events.push(event);
            }
            events
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_far_then_near() {
        let mut fx = Fixture::start(MockLocationProvider::default());

        let snapshot = fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        assert_eq!(snapshot.state, AlarmState::Armed);
        assert!(snapshot.cycle_id.is_some());
        assert_eq!(fx.provider.subscribes(), 1);
        assert_eq!(
            fx.provider
                .last_request
                .lock()
                .unwrap()
                .as_ref()
                .map(|r| r.interval_ms),
            Some(40_000)
        );

        fx.deliver(12.9800, 77.6000).await;
        assert_eq!(fx.handle.current_state(), AlarmState::Armed);
        let far = fx.handle.current_distance().unwrap();
        assert!(far > 1000.0 && far < 1200.0);

        let events = fx.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            AlarmEvent::DistanceUpdated { location_text, .. } if location_text == "(12.98, 77.6)"
        )));
        assert_eq!(fx.player.plays(), 0);

        fx.deliver(12.9720, 77.5950).await;
        assert_eq!(fx.handle.current_state(), AlarmState::Ringing);
        assert_eq!(fx.player.plays(), 1);
        assert_eq!(fx.vibrator.pulses(), 1);
        assert_eq!(fx.provider.unsubscribes(), 1);

        let events = fx.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            AlarmEvent::StateChanged {
                state: AlarmState::Ringing,
                ..
            }
        )));
        let arrivals: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AlarmEvent::ArrivalNotification { notice, .. } => Some(notice.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(arrivals, vec![ArrivalNotice::default()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_far_samples_keep_armed() {
        let fx = Fixture::start(MockLocationProvider::default());
        fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();

        for (lat, lon) in [(13.0, 77.6), (12.9, 77.5), (12.9740, 77.5946), (-33.86, 151.2)] {
            fx.deliver(lat, lon).await;
            assert_eq!(fx.handle.current_state(), AlarmState::Armed);
            assert!(fx.handle.current_distance().unwrap() >= 200.0);
        }
        assert_eq!(fx.player.plays(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destination_too_near_is_rejected() {
        let fx = Fixture::start(MockLocationProvider::with_last_known(LocationSample::new(
            12.9716, 77.5946,
        )));

        let result = fx.handle.set_destination(12.9717, 77.5947).await;
        match result {
            Err(AlarmError::AlreadyNearDestination {
                distance_meters,
                threshold_meters,
            }) => {
                assert!(distance_meters < 20.0);
                assert_eq!(threshold_meters, 200.0);
            }
            other => panic!("期望 AlreadyNearDestination, 实际 {:?}", other),
        }
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
        assert_eq!(fx.provider.subscribes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_known_far_sets_initial_distance() {
        let fx = Fixture::start(MockLocationProvider::with_last_known(LocationSample::new(
            12.9800, 77.6000,
        )));

        let snapshot = fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        assert_eq!(snapshot.state, AlarmState::Armed);
        assert!(snapshot.distance_meters.unwrap() > 1000.0);
        assert!(snapshot.last_sample.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_coordinate() {
        let fx = Fixture::start(MockLocationProvider::default());

        let result = fx.handle.set_destination(91.0, 10.0).await;
        assert!(matches!(result, Err(AlarmError::InvalidCoordinate { .. })));
        let result = fx.handle.set_destination(10.0, f64::NAN).await;
        assert!(matches!(result, Err(AlarmError::InvalidCoordinate { .. })));
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_side_effects() {
        let fx = Fixture::start(MockLocationProvider::default());
        fx.ring().await;

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fx.vibrator.pulses(), 2);

        assert!(fx.handle.dismiss().await);
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
        assert!(fx.handle.snapshot().destination.is_none());
        assert_eq!(fx.player.stops(), 1);
        assert_eq!(fx.player.releases(), 1);

        let volumes = fx.player.volumes().len();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fx.vibrator.pulses(), 2);
        assert_eq!(fx.player.volumes().len(), volumes);

        // 再次解除无效果
        assert!(!fx.handle.dismiss().await);
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
        assert_eq!(fx.player.stops(), 1);
        assert_eq!(fx.player.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_while_idle_is_ignored() {
        let mut fx = Fixture::start(MockLocationProvider::default());

        fx.handle.location_sink().deliver(LocationSample::new(DEST.0, DEST.1));
        assert!(fx.handle.health_check().await);

        assert_eq!(fx.handle.snapshot(), AlarmSnapshot::default());
        assert_eq!(fx.player.plays(), 0);
        assert_eq!(fx.vibrator.pulses(), 0);
        assert!(fx.drain_events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ringing_is_one_shot() {
        let fx = Fixture::start(MockLocationProvider::default());
        fx.ring().await;

        let sink = fx.provider.sink();
        sink.deliver(LocationSample::new(DEST.0, DEST.1));
        sink.deliver(LocationSample::new(12.9717, 77.5947));
        assert!(fx.handle.health_check().await);

        assert_eq!(fx.player.plays(), 1);
        assert_eq!(fx.vibrator.pulses(), 1);

        let result = fx.handle.set_destination(13.5, 78.0).await;
        assert_eq!(result, Err(AlarmError::AlarmRinging));

        // 解除后重新布防才能再次响铃
        assert!(fx.handle.dismiss().await);
        assert!(fx.handle.snapshot().cycle_id.is_none());

        fx.handle.set_destination(13.0827, 80.2707).await.unwrap();
        fx.deliver(13.0828, 80.2708).await;
        assert_eq!(fx.handle.current_state(), AlarmState::Ringing);
        assert_eq!(fx.player.plays(), 2);
        assert_eq!(fx.provider.subscribes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_stays_armed() {
        let mut fx = Fixture::start(MockLocationProvider::default());
        fx.player.fail_load.store(true, Ordering::SeqCst);

        fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        fx.deliver(12.9720, 77.5950).await;

        assert_eq!(fx.handle.current_state(), AlarmState::Armed);
        assert_eq!(fx.vibrator.pulses(), 0);
        assert_eq!(fx.provider.unsubscribes(), 0);
        assert!(fx
            .drain_events()
            .iter()
            .any(|e| matches!(e, AlarmEvent::AlarmStartFailed { .. })));

        // 仍在定位，下一次采样可以再次尝试
        fx.player.fail_load.store(false, Ordering::SeqCst);
        fx.deliver(12.9719, 77.5949).await;
        assert_eq!(fx.handle.current_state(), AlarmState::Ringing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_error_while_ringing_reverts_to_armed() {
        let mut fx = Fixture::start(MockLocationProvider::default());
        fx.ring().await;
        fx.drain_events();

        fx.handle.report_player_error("MEDIA_ERROR_SERVER_DIED");
        assert!(fx.handle.health_check().await);

        assert_eq!(fx.handle.current_state(), AlarmState::Armed);
        assert!(fx.handle.snapshot().destination.is_some());
        assert_eq!(fx.player.stops(), 1);
        assert_eq!(fx.player.releases(), 1);
        assert_eq!(fx.provider.subscribes(), 2);

        let pulses = fx.vibrator.pulses();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.vibrator.pulses(), pulses);

        let events = fx.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            AlarmEvent::AlarmStartFailed { reason, .. } if reason == "MEDIA_ERROR_SERVER_DIED"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_error_delivered_when_mailbox_full() {
        let fx = Fixture::start(MockLocationProvider::default());
        fx.ring().await;

        // 响铃期间的采样会被忽略，这里只用来占满邮箱
        let sink = fx.handle.location_sink();
        for _ in 0..80 {
            sink.deliver(LocationSample::new(12.9720, 77.5950));
        }
        fx.handle.report_player_error("MEDIA_ERROR_UNKNOWN");

        let mut watch = fx.handle.watch();
        let reverted = tokio::time::timeout(
            Duration::from_secs(5),
            watch.wait_for(|s| s.state == AlarmState::Armed),
        )
        .await;
        assert!(matches!(reverted, Ok(Ok(_))));
        assert_eq!(fx.player.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_vibration_rest_does_not_kill_controller() {
        let config = AlarmConfig {
            vibration_rest_ms: u64::MAX,
            ..AlarmConfig::default()
        };
        let fx = Fixture::start_with_config(MockLocationProvider::default(), config);
        fx.ring().await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(fx.handle.health_check().await);
        assert_eq!(fx.vibrator.pulses(), 1);

        assert!(fx.handle.dismiss().await);
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
        assert_eq!(fx.player.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_keeps_state() {
        let provider = MockLocationProvider::default();
        provider.deny_permission.store(true, Ordering::SeqCst);
        let mut fx = Fixture::start(provider);

        let snapshot = fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        assert_eq!(snapshot.state, AlarmState::Armed);
        assert!(fx
            .drain_events()
            .iter()
            .any(|e| matches!(e, AlarmEvent::PermissionLost { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_revoked_while_armed() {
        let mut fx = Fixture::start(MockLocationProvider::default());
        fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        fx.drain_events();

        fx.provider.sink().permission_lost("revoked in settings");
        assert!(fx.handle.health_check().await);

        assert_eq!(fx.handle.current_state(), AlarmState::Armed);
        let events = fx.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            AlarmEvent::PermissionLost { reason } if reason == "revoked in settings"
        )));

        // 采样已视为停止，取消布防时不再调用 unsubscribe
        assert!(fx.handle.cancel_arming().await);
        assert_eq!(fx.provider.unsubscribes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_arming() {
        let fx = Fixture::start(MockLocationProvider::default());
        assert!(!fx.handle.cancel_arming().await);

        fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        assert!(fx.handle.cancel_arming().await);
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
        assert_eq!(fx.provider.unsubscribes(), 1);

        // 空闲时采样无效
        fx.deliver(12.9720, 77.5950).await;
        assert_eq!(fx.handle.current_state(), AlarmState::Idle);
        assert_eq!(fx.player.plays(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_destination_while_armed_starts_new_cycle() {
        let fx = Fixture::start(MockLocationProvider::default());
        let first = fx.handle.set_destination(DEST.0, DEST.1).await.unwrap();
        let second = fx.handle.set_destination(13.0827, 80.2707).await.unwrap();

        assert_eq!(second.state, AlarmState::Armed);
        assert_ne!(first.cycle_id, second.cycle_id);
        assert_eq!(second.destination, Some(Destination::new(13.0827, 80.2707)));
        assert_eq!(fx.provider.subscribes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_applies_to_next_cycle() {
        let fx = Fixture::start(MockLocationProvider::with_last_known(LocationSample::new(
            12.9800, 77.6000,
        )));

        fx.handle
            .update_config(AlarmConfig {
                threshold_meters: 2000.0,
                ..AlarmConfig::default()
            })
            .await;

        let result = fx.handle.set_destination(DEST.0, DEST.1).await;
        assert!(matches!(
            result,
            Err(AlarmError::AlreadyNearDestination { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_timeout() {
        let provider = Arc::new(MockLocationProvider::default());
        let (actor, handle) = GeofenceAlarmController::new(
            AlarmConfig::default(),
            provider,
            Arc::new(MockAudioPlayer::default()),
            Arc::new(MockVibrator::default()),
            Arc::new(EventBus::new(10)),
        );

        // 不运行Actor，直接drop
        drop(actor);

        assert!(!handle.health_check().await);
        assert_eq!(
            handle.set_destination(DEST.0, DEST.1).await,
            Err(AlarmError::ControllerStopped)
        );
        assert!(!handle.dismiss().await);
    }
}
