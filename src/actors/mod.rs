// Actor模块 - 使用Actor模式管理并发状态
//
// 用Actor模式替代全局可变状态，通过消息传递实现串行化的状态变更
// 定位回调、UI操作和播放器错误都经由同一个邮箱进入控制器

pub mod alarm_controller;

pub use alarm_controller::{AlarmCommand, AlarmHandle, GeofenceAlarmController};
