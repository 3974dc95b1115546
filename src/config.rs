// src/config.rs

//! 命令行配置：绑定地址、端口与快照文件路径

use clap::Parser;
use std::path::PathBuf;

/// 进程启动参数
#[derive(Parser, Debug, Clone)]
#[command(name = "tidepool", about = "In-memory key-value server with TTL and snapshot persistence")]
pub struct Config {
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// 监听端口
    #[arg(long, default_value_t = 6380)]
    pub port: u16,

    /// 快照文件路径
    #[arg(long, default_value = "tidepool.db.json")]
    pub db_file: PathBuf,
}

impl Config {
    /// 拼出监听用的 host:port
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
