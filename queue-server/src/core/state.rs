//! 服务器状态 - 持有所有服务的单例引用
//!
//! ServerState 使用 Arc/浅拷贝共享，所有权成本极低。
//!
//! | 字段 | 类型 | 说明 |
//! |------|------|------|
//! | config | Config | 配置项 (不可变) |
//! | db | DbService | SQLite 连接池 + 队列锁 |
//! | hub | EventHub | 事件分发中心 |
//! | jwt_service | Arc<JwtService> | JWT 认证服务 |

use std::sync::Arc;

use shared::message::BusMessage;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::{DbService, repository};
use crate::message::{EventHub, HubConfig};
use crate::utils::AppError;

#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 数据库服务
    pub db: DbService,
    /// 事件分发中心
    pub hub: EventHub,
    /// JWT 认证服务
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (迁移 + 首次启动的管理账号)
    /// 3. 事件分发中心和 JWT 服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::Internal(format!("Failed to create work directory: {e}")))?;

        let db = DbService::new(&config.database_path()).await?;

        repository::account::ensure_default_admin(
            &db.pool,
            &config.admin_username,
            config.admin_password.as_deref(),
        )
        .await?;

        let hub = EventHub::from_config(HubConfig {
            tcp_listen_addr: config.bus_listen_addr(),
            channel_capacity: 1024,
        });
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

        Ok(Self {
            config: config.clone(),
            db,
            hub,
            jwt_service,
        })
    }

    /// 启动后台任务 (事件总线 TCP 监听)
    ///
    /// 必须在 `Server::run()` 之前调用
    pub fn start_background_tasks(&self) {
        let hub = self.hub.clone();
        let jwt = self.jwt_service.clone();
        tokio::spawn(async move {
            if let Err(e) = hub.start_tcp_server(jwt).await {
                tracing::error!("Event bus TCP server failed: {e}");
            }
        });
    }

    /// Publish a queue event after a committed mutation.
    ///
    /// Fire-and-forget by design: the mutation already succeeded and a
    /// delivery failure must not change its result. Dropped events heal via
    /// subscriber polling.
    pub fn publish(&self, msg: BusMessage) {
        let delivered = self.hub.publish(msg);
        tracing::trace!(delivered, "event published");
    }
}
