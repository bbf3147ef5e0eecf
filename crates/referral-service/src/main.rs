//! 推荐码数据库迁移工具
//!
//! 加载配置、连接数据库、应用内嵌的迁移并做健康检查后退出。

use anyhow::Result;
use referral_shared::{config::AppConfig, database::Database, observability};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置，失败时使用默认值
    let config = AppConfig::load("referral-service").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化可观测性
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config)?;

    info!(environment = %config.environment, "Starting referral-migrate...");

    // 3. 连接数据库并迁移
    let db = Database::connect(&config.database).await?;
    db.run_migrations(&sqlx::migrate!("./migrations")).await?;
    db.health_check().await?;

    info!("Referral schema is up to date");

    db.close().await;
    Ok(())
}
