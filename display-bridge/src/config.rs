//! Bridge configuration
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | API_URL | http://localhost:4000 | queue-server HTTP API |
//! | BUS_ADDR | 127.0.0.1:4100 | queue-server 事件总线 |
//! | DEVICE_ADDR | 127.0.0.1:7777 | 显示设备的 TCP 串口网关 (ser2net) |
//! | QUEUE_ID | (required) | 绑定的队列 |
//! | QUEUE_TOKEN | (empty) | 队列访问令牌 (kiosk 取号需要) |
//! | API_TOKEN | (empty) | 员工 JWT (call-next / status 需要) |
//! | BRIDGE_MODE | kiosk | kiosk \| staff — 设备 N 键的含义 |
//! | SERVING_ADVANCE | done | done \| skipped \| none — staff 模式下 N 键对当前票的处理 |
//! | RESYNC_SECS | 30 | 轮询全量状态的间隔 (at-most-once 推送的自愈回路) |

/// What the device's "next" button does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// N claims a new ticket (walk-up kiosk)
    Kiosk,
    /// N resolves the current ticket and calls the next one
    Staff,
}

/// How the staff-mode "next" button resolves the ticket being served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingAdvance {
    Done,
    Skipped,
    None,
}

impl ServingAdvance {
    pub fn as_status(self) -> Option<&'static str> {
        match self {
            ServingAdvance::Done => Some("done"),
            ServingAdvance::Skipped => Some("skipped"),
            ServingAdvance::None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub api_url: String,
    pub bus_addr: String,
    pub device_addr: String,
    pub queue_id: i64,
    pub queue_token: String,
    pub api_token: Option<String>,
    pub mode: BridgeMode,
    pub serving_advance: ServingAdvance,
    pub resync_secs: u64,
}

impl BridgeConfig {
    /// Load from environment; fails only on a missing/invalid QUEUE_ID
    pub fn from_env() -> anyhow::Result<Self> {
        let queue_id = std::env::var("QUEUE_ID")
            .map_err(|_| anyhow::anyhow!("Missing QUEUE_ID in environment"))?
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("QUEUE_ID must be a numeric queue id"))?;

        let mode = match std::env::var("BRIDGE_MODE")
            .unwrap_or_else(|_| "kiosk".into())
            .to_lowercase()
            .as_str()
        {
            "staff" => BridgeMode::Staff,
            _ => BridgeMode::Kiosk,
        };

        let serving_advance = match std::env::var("SERVING_ADVANCE")
            .unwrap_or_else(|_| "done".into())
            .to_lowercase()
            .as_str()
        {
            "skipped" => ServingAdvance::Skipped,
            "none" => ServingAdvance::None,
            _ => ServingAdvance::Done,
        };

        Ok(Self {
            api_url: std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:4000".into()),
            bus_addr: std::env::var("BUS_ADDR").unwrap_or_else(|_| "127.0.0.1:4100".into()),
            device_addr: std::env::var("DEVICE_ADDR").unwrap_or_else(|_| "127.0.0.1:7777".into()),
            queue_id,
            queue_token: std::env::var("QUEUE_TOKEN").unwrap_or_default(),
            api_token: std::env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            mode,
            serving_advance,
            resync_secs: std::env::var("RESYNC_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }
}
