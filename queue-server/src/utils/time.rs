//! 时间工具函数
//!
//! 全部时间戳统一为 `i64` Unix millis；repository 层只接收和存储 millis。

/// Current time as Unix millis
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
