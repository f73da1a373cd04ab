//! 地理计算工具
//!
//! 大圆距离（haversine）与位置文本格式化

use crate::models::{Destination, LocationSample};

/// 地球平均半径（米）
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// 计算两点之间的大圆距离（米）
///
/// # 参数
/// - `lat1`, `lon1`: 起点纬度、经度（度）
/// - `lat2`, `lon2`: 终点纬度、经度（度）
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = ((d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// 采样点到目的地的距离（米）
pub fn distance_to(sample: &LocationSample, destination: &Destination) -> f64 {
    haversine_meters(
        sample.latitude,
        sample.longitude,
        destination.latitude,
        destination.longitude,
    )
}

/// 将位置格式化为可读文本，如 "(12.9716, 77.5946)"
pub fn location_text(sample: Option<&LocationSample>) -> String {
    match sample {
        Some(s) => format!("({}, {})", s.latitude, s.longitude),
        None => "Unknown location".to_string(),
    }
}
