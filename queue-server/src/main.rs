use queue_server::{Config, Server, ServerState, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境与配置
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 2. 日志 (work_dir/logs 存在时附加文件输出)
    config.ensure_work_dir_structure()?;
    let log_dir = config.log_dir();
    init_logger_with_file(None, log_dir.to_str());

    print_banner();
    tracing::info!("Queue server starting...");

    // 3. 初始化服务器状态
    let state = ServerState::initialize(&config)
        .await
        .map_err(|e| anyhow::anyhow!("initialization failed: {e}"))?;

    tracing::info!(
        "HTTP API on port {}, event bus on port {}",
        config.http_port,
        config.bus_tcp_port
    );

    // 4. 启动 HTTP 服务器 (Server::run 会自动启动后台任务)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {e}");
        return Err(anyhow::anyhow!("server error: {e}"));
    }

    Ok(())
}
