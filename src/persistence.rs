// src/persistence.rs

//! 快照持久化：
//! - 文件格式为 JSON 文档，两个顶层字段：data（key → 值，按 JSON 形状
//!   区分变体）与 expirations（key → 绝对毫秒时间戳）
//! - 加载是尽力而为：文件不存在不算错误；解析失败记日志并保持空库
//! - 保存每次整体覆盖：先写临时文件，再原子替换

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::store::{Store, Value};

/// 快照文件的顶层结构
#[derive(Serialize, Deserialize)]
struct Snapshot {
    data: HashMap<String, Value>,
    expirations: HashMap<String, u64>,
}

/// 启动时加载快照。任何失败都不致命：记日志，保持空库
pub fn load(path: &Path, store: &Store) {
    if !path.exists() {
        info!("snapshot {} not found, starting empty", path.display());
        return;
    }
    match read_snapshot(path) {
        Ok(snap) => {
            let count = snap.data.len();
            store.restore(snap.data, snap.expirations);
            info!("loaded {} keys from snapshot {}", count, path.display());
        }
        Err(e) => {
            warn!("failed to load snapshot {}: {}", path.display(), e);
        }
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file {:?}", path))?;
    let snap = serde_json::from_str(&raw).context("failed to parse snapshot JSON")?;
    Ok(snap)
}

/// 退出前保存快照：整体序列化，写临时文件后原子替换
pub fn save(path: &Path, store: &Store) -> Result<()> {
    let (data, expirations) = store.dump();
    let snap = Snapshot { data, expirations };
    let json = serde_json::to_string(&snap).context("failed to serialize snapshot")?;

    // 先写 .tmp 再 rename，避免写一半的快照覆盖旧文件
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write snapshot file {:?}", tmp))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace snapshot file {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::Pattern;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("snap.json");

        let store = Store::new();
        store.set("s", "v", None);
        store.set("t", "v", Some(100));
        store.hset("h", "f", "v");
        store.rpush("l", &["a".to_string(), "b".to_string()]);
        save(&path, &store)?;

        // 「重启」：新库加载同一个文件
        let restored = Store::new();
        load(&path, &restored);
        assert_eq!(restored.get("s"), Some("v".to_string()));
        assert_eq!(restored.hget("h", "f"), Some("v".to_string()));
        assert_eq!(restored.lrange("l", 0, -1), vec!["a", "b"]);
        // 过期时间一并恢复
        assert!(restored.ttl("t") > 0);
        assert_eq!(restored.ttl("s"), -1);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_not_an_error() {
        let tmp = tempdir().unwrap();
        let store = Store::new();
        load(&tmp.path().join("absent.json"), &store);
        assert_eq!(store.exists(&["any".to_string()]), 0);
    }

    #[test]
    fn test_load_malformed_file_leaves_store_empty() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("snap.json");
        fs::write(&path, "{ not json")?;

        let store = Store::new();
        load(&path, &store);
        assert!(store.keys(&Pattern::new("*").unwrap()).is_empty());
        Ok(())
    }

    #[test]
    fn test_save_overwrites_wholesale() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("snap.json");

        let store = Store::new();
        store.set("a", "1", None);
        store.set("b", "2", None);
        save(&path, &store)?;

        // 删掉一个 key 再保存，旧快照必须被整体覆盖
        store.del(&["a".to_string()]);
        save(&path, &store)?;

        let restored = Store::new();
        load(&path, &restored);
        assert_eq!(restored.get("a"), None);
        assert_eq!(restored.get("b"), Some("2".to_string()));
        Ok(())
    }
}
