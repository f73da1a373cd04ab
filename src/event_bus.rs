// 事件总线 - 核心向宿主UI发出的通知
//
// 实现发布/订阅模式，UI只通过事件和只读快照观察控制器
// 使用 tokio::sync::broadcast 实现高效的事件分发

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{AlarmState, ArrivalNotice, LocationSample};

/// 应用事件枚举 - 定义所有可能的系统事件
#[derive(Debug, Clone)]
pub enum AlarmEvent {
    // --- 状态事件 ---

    /// 闹钟状态变化
    StateChanged {
        state: AlarmState,
        cycle_id: Option<Uuid>,
    },

    /// 布防期间距离更新
    DistanceUpdated {
        cycle_id: Uuid,
        distance_meters: f64,
        sample: LocationSample,
        /// 可读的位置文本
        location_text: String,
    },

    /// 到达目的地，宿主应弹出一次性、自动消失的系统通知
    ArrivalNotification {
        cycle_id: Uuid,
        notice: ArrivalNotice,
    },

    // --- 错误事件 ---

    /// 定位权限丢失，需要重新请求
    PermissionLost {
        reason: String,
    },

    /// 闹钟启动失败，已退出响铃
    AlarmStartFailed {
        cycle_id: Option<Uuid>,
        reason: String,
    },

    // --- 系统事件 ---

    /// 配置更新事件
    ConfigUpdated,
}

/// 事件总线
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<AlarmEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小,建议 100-1000
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: AlarmEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
