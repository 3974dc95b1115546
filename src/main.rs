// src/main.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tidepool::{config::Config, persistence, server, store::Store};

#[tokio::main]
async fn main() -> Result<()> {
    // 日志初始化：RUST_LOG 可覆盖，默认 info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::parse();

    // 1) 建库，并在任何连接任务启动之前尝试从快照恢复
    let store = Arc::new(Store::new());
    persistence::load(&cfg.db_file, &store);

    // 2) 绑定监听端口。这是全系统唯一的致命错误
    let addr = cfg.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("tidepool server listening on {}", addr);

    // 3) 服务直到收到 ctrl-c
    tokio::select! {
        res = server::serve(listener, store.clone()) => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    // 4) 退出前整体保存快照；失败记日志，仍然正常退出
    if let Err(e) = persistence::save(&cfg.db_file, &store) {
        error!("failed to save snapshot: {}", e);
    }
    Ok(())
}
