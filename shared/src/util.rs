/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 分钟 → 毫秒
pub fn minutes_to_millis(minutes: u32) -> i64 {
    i64::from(minutes) * 60_000
}
