//! Queue Server - 多队列取号叫号系统服务端
//!
//! # 架构概述
//!
//! - **数据库** (`db`): SQLite 连接池、每队列串行化锁、仓储层
//! - **认证** (`auth`): JWT + Argon2 员工认证
//! - **事件分发** (`message`): 队列范围的实时事件扇出 (TCP)
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! queue-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、口令哈希
//! ├── db/            # 数据库层 (仓储 + 队列锁)
//! ├── message/       # 事件分发中心
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志、时间工具
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod message;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentStaff, JwtService};
pub use core::{Config, Server, ServerState};
pub use message::{BusMessage, EventHub, EventType};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
   ____
  / __ \__  _____  __  _____
 / / / / / / / _ \/ / / / _ \
/ /_/ / /_/ /  __/ /_/ /  __/
\___\_\__,_/\___/\__,_/\___/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
