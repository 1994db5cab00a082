//! 服务器配置
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | WORK_DIR | /var/lib/queue-server | 工作目录 (数据库、日志) |
//! | HTTP_PORT | 4000 | HTTP API 服务端口 |
//! | BUS_TCP_PORT | 4100 | 事件总线 TCP 端口 |
//! | DATABASE_PATH | (work_dir)/database/queue.db | 数据库文件路径覆盖 |
//! | ENVIRONMENT | development | 运行环境 |
//! | ADMIN_USERNAME | admin | 首次启动创建的管理账号 |
//! | ADMIN_PASSWORD | (generated) | 管理账号初始口令 |
//!
//! JWT 相关环境变量见 [`crate::auth::JwtConfig`]。

use std::path::PathBuf;

use crate::auth::JwtConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 事件总线 TCP 端口 (订阅者直连)
    pub bus_tcp_port: u16,
    /// 数据库路径覆盖 (默认 work_dir/database/queue.db)
    pub database_path: Option<String>,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 首次启动引导的管理账号
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/queue-server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4000),
            bus_tcp_port: std::env::var("BUS_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4100),
            database_path: std::env::var("DATABASE_PATH").ok(),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            admin_username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置，常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        bus_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.bus_tcp_port = bus_tcp_port;
        config
    }

    /// Ensure the work directory layout exists
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Database file path (override or the default under work_dir)
    pub fn database_path(&self) -> String {
        match &self.database_path {
            Some(path) => path.clone(),
            None => self
                .database_dir()
                .join("queue.db")
                .to_string_lossy()
                .into_owned(),
        }
    }

    /// Listen address for the event bus TCP server
    pub fn bus_listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.bus_tcp_port)
    }
}
