// src/expire.rs

//! 惰性过期策略：
//! - 过期时间以绝对 UNIX 毫秒记录在与数据表平行的 expirations 表中
//! - 没有后台清理线程；按 key 的操作在动手前调用 remove_if_expired，
//!   发现 key 过期就地回收
//! - KEYS 这类整表操作改用 remove_all_expired 一次扫完

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::value::Value;

/// 返回当前的 UNIX 毫秒
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// 由 TTL 秒数计算绝对过期时间戳
pub fn deadline_ms(now: u64, secs: u64) -> u64 {
    now.saturating_add(secs.saturating_mul(1000))
}

/// 检查 key 是否过期，是则同时从两张表中删除
/// 返回 true 表示该 key 刚被回收
pub fn remove_if_expired(
    data: &mut HashMap<String, Value>,
    expirations: &mut HashMap<String, u64>,
    key: &str,
    now: u64,
) -> bool {
    match expirations.get(key) {
        Some(&deadline) if deadline <= now => {
            data.remove(key);
            expirations.remove(key);
            true
        }
        _ => false,
    }
}

/// 整表回收：删除所有已到期的 key
pub fn remove_all_expired(
    data: &mut HashMap<String, Value>,
    expirations: &mut HashMap<String, u64>,
    now: u64,
) {
    let expired: Vec<String> = expirations
        .iter()
        .filter(|&(_, &deadline)| deadline <= now)
        .map(|(key, _)| key.clone())
        .collect();
    for key in &expired {
        data.remove(key);
        expirations.remove(key);
    }
}
