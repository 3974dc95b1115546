// src/server.rs

//! 网络层：
//! - 监听 TCP 连接，每个连接一个 tokio 任务
//! - 逐行读取请求，交给 protocol::dispatch 执行
//! - 把编码后的字节写回客户端
//! - QUIT 与客户端断开都只结束本连接，不影响其他连接和 Store

use anyhow::Result;
use std::io::ErrorKind;
use std::sync::Arc;

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::{info, warn};

use crate::protocol::{self, Reply};
use crate::store::Store;

/// 接受循环：不断 accept 新连接并 spawn 出一个异步任务
pub async fn serve(listener: TcpListener, store: Arc<Store>) -> Result<()> {
    loop {
        // accept() 返回 TcpStream 和客户端地址
        let (stream, peer) = listener.accept().await?;
        info!("accepted connection from {}", peer);

        // 克隆 Arc，给新任务一份引用
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, store).await {
                warn!("connection error: {}", err);
            }
        });
    }
}

/// 单个连接的处理逻辑
async fn handle_connection(stream: TcpStream, store: Arc<Store>) -> Result<()> {
    let peer = stream.peer_addr()?;
    // 把流拆成 reader / writer，reader 用 BufReader 包装以便 read_line()
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        // ----- 1) 读取一行请求 -----
        line.clear();
        match reader.read_line(&mut line).await {
            // EOF：客户端正常断开
            Ok(0) => {
                info!("{} disconnected", peer);
                break;
            }
            Ok(_) => {}
            // 粗暴断开（如 Windows 下的 RST），安静结束本任务
            Err(e) if e.kind() == ErrorKind::ConnectionReset
                   || e.kind() == ErrorKind::UnexpectedEof => {
                info!("{} disconnected", peer);
                break;
            }
            Err(e) => return Err(e.into()),
        }

        // ----- 2) 分发执行，空行不回复 -----
        let reply = match protocol::dispatch(line.trim_end(), &store) {
            None => continue,
            Some(reply) => reply,
        };

        // ----- 3) QUIT 不写任何字节，由服务端关闭连接 -----
        if reply == Reply::Quit {
            info!("{} quit", peer);
            break;
        }

        // ----- 4) 把编码后的响应写回 -----
        writer.write_all(&reply.encode()).await?;
    }

    Ok(())
}
