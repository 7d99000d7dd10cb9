use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweeper_server::server;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sweeper_server=debug".parse()?),
        )
        .init();

    // 端口可通过 PORT 环境变量覆盖
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(protocol::DEFAULT_PORT);

    info!("双人扫雷对战服务端启动中...");
    server::run(port).await
}
