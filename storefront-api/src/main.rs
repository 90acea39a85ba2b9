mod api;
mod config;
mod domain;
mod error;
mod infrastructure;
mod logging;
mod middleware;
mod server;
mod utils;

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::database::mysql::init_mysql;
use crate::logging::init_logging;
use crate::server::create_app;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    init_logging(&config)?;

    tracing::info!("Starting storefront API service");

    // 初始化数据库连接
    let db_pool = init_mysql(&config).await?;

    // 创建应用状态
    let app_state = server::AppState {
        config: config.clone(),
        db: db_pool,
    };

    // 创建并启动服务器
    let app = create_app(app_state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", &addr);

    axum::serve(listener, app).await?;
    Ok(())
}
