// src/store/mod.rs

//! # 存储引擎
//!
//! `store` 模块是服务的核心：
//! - 一张 `HashMap<String, Value>` 承载全部键空间，String / Hash / List 三种变体共存
//! - 平行的 `HashMap<String, u64>` 记录绝对过期时间（UNIX 毫秒）
//! - 两张表由同一把 `Mutex` 守护；每个公开操作在持锁期间完成全部工作，
//!   持锁期间不做 I/O 也不 await，因此所有操作彼此严格可串行化
//! - 过期采用惰性回收：操作触碰哪个 key 就只检查哪个 key
//!   （KEYS 与 FLUSHDB 本来就是整表操作，属例外）
//!
//! 变体不匹配时的行为是约定死的：写入类操作（SET / HSET / LPUSH / RPUSH）
//! 破坏性重建 key，读取类操作（GET / HGET / 弹出 / 区间）一律报「无值」，
//! 绝不把一种变体按另一种解释。

pub mod value;
pub use value::Value;

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use glob::Pattern;

use crate::expire::{self, now_ms};
use value::slice_range;

/// 进程内唯一的共享可变对象；每个连接任务持 `Arc<Store>` 访问
#[derive(Default)]
pub struct Store {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Value>,
    expirations: HashMap<String, u64>,
}

impl Inner {
    /// 惰性过期检查，所有按 key 操作的统一入口
    fn reclaim(&mut self, key: &str, now: u64) -> bool {
        expire::remove_if_expired(&mut self.data, &mut self.expirations, key, now)
    }

    /// 取出 key 对应的列表；key 缺失或变体不符时重建为空列表
    fn list_entry(&mut self, key: &str) -> &mut VecDeque<String> {
        let entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(VecDeque::new()));
        if !matches!(entry, Value::List(_)) {
            *entry = Value::List(VecDeque::new());
        }
        match entry {
            Value::List(list) => list,
            _ => unreachable!("list_entry 刚刚确保了变体"),
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// GET：返回字符串值；key 缺失、已过期或持有其他变体时返回 None
    pub fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        match guard.data.get(key) {
            Some(Value::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// SET：无条件覆盖任何旧变体。
    /// ttl_secs 为 Some 且大于 0 时设置绝对过期时间，否则清除旧的过期时间
    pub fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) {
        let mut guard = self.locked();
        guard
            .data
            .insert(key.to_string(), Value::Str(value.to_string()));
        match ttl_secs {
            Some(secs) if secs > 0 => {
                let deadline = expire::deadline_ms(now_ms(), secs);
                guard.expirations.insert(key.to_string(), deadline);
            }
            _ => {
                guard.expirations.remove(key);
            }
        }
    }

    /// DEL：过期 key 就地回收但不计数，仍存活的 key 删除并计数。幂等
    pub fn del(&self, keys: &[String]) -> usize {
        let mut guard = self.locked();
        let now = now_ms();
        let mut deleted = 0;
        for key in keys {
            if guard.reclaim(key, now) {
                continue;
            }
            if guard.data.remove(key).is_some() {
                guard.expirations.remove(key);
                deleted += 1;
            }
        }
        deleted
    }

    /// EXISTS：统计存活 key 的个数，除惰性回收外不做修改
    pub fn exists(&self, keys: &[String]) -> usize {
        let mut guard = self.locked();
        let now = now_ms();
        keys.iter()
            .filter(|key| {
                guard.reclaim(key, now);
                guard.data.contains_key(key.as_str())
            })
            .count()
    }

    /// INCR / DECR 共用入口：把存储的字符串当作十进制整数加 delta。
    /// key 缺失或已过期时以 0 为基数；解析失败时报错且不改动原值
    pub fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        let base = match guard.data.get(key) {
            None => 0,
            Some(Value::Str(s)) => s
                .parse::<i64>()
                .map_err(|_| anyhow!("value is not an integer or out of range"))?,
            Some(_) => bail!("value is not an integer or out of range"),
        };
        let new = base
            .checked_add(delta)
            .ok_or_else(|| anyhow!("increment or decrement would overflow"))?;
        guard.data.insert(key.to_string(), Value::Str(new.to_string()));
        Ok(new)
    }

    /// KEYS：先整表回收过期 key，再按 glob 模式过滤。顺序不保证
    pub fn keys(&self, pattern: &Pattern) -> Vec<String> {
        let mut guard = self.locked();
        let inner = &mut *guard;
        expire::remove_all_expired(&mut inner.data, &mut inner.expirations, now_ms());
        inner
            .data
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect()
    }

    /// FLUSHDB：无条件清空两张表
    pub fn flushdb(&self) {
        let mut guard = self.locked();
        guard.data.clear();
        guard.expirations.clear();
    }

    /// HSET：key 缺失、过期或持有其他变体时重建为空 hash。
    /// 新建 field 与覆盖旧值不作区分，总是返回 1
    pub fn hset(&self, key: &str, field: &str, value: &str) -> i64 {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        let entry = guard
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()));
        if !matches!(entry, Value::Hash(_)) {
            *entry = Value::Hash(HashMap::new());
        }
        if let Value::Hash(hash) = entry {
            hash.insert(field.to_string(), value.to_string());
        }
        1
    }

    /// HGET：key 缺失、过期、非 hash 或 field 缺失时返回 None
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        match guard.data.get(key) {
            Some(Value::Hash(hash)) => hash.get(field).cloned(),
            _ => None,
        }
    }

    /// LPUSH：整块插到表头，给定的第一个值最终最靠近表头
    pub fn lpush(&self, key: &str, values: &[String]) -> usize {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        let list = guard.list_entry(key);
        for value in values.iter().rev() {
            list.push_front(value.clone());
        }
        list.len()
    }

    /// RPUSH：按给定顺序追加到表尾
    pub fn rpush(&self, key: &str, values: &[String]) -> usize {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        let list = guard.list_entry(key);
        for value in values {
            list.push_back(value.clone());
        }
        list.len()
    }

    /// LPOP：弹出表头元素；key 缺失、过期、非列表或列表为空时返回 None
    pub fn lpop(&self, key: &str) -> Option<String> {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        match guard.data.get_mut(key) {
            Some(Value::List(list)) => list.pop_front(),
            _ => None,
        }
    }

    /// RPOP：弹出表尾元素，其余同 LPOP
    pub fn rpop(&self, key: &str) -> Option<String> {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        match guard.data.get_mut(key) {
            Some(Value::List(list)) => list.pop_back(),
            _ => None,
        }
    }

    /// LRANGE：闭区间切片，负下标从尾部数起（end == -1 即到表尾），
    /// 越界收敛；key 缺失或非列表时返回空序列
    pub fn lrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        match guard.data.get(key) {
            Some(Value::List(list)) => slice_range(list, start, end),
            _ => Vec::new(),
        }
    }

    /// RRANGE：同 LRANGE 的切片，元素顺序反转
    pub fn rrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        let mut out = self.lrange(key, start, end);
        out.reverse();
        out
    }

    /// EXPIRE：为存活 key 设置过期时间；key 不存在或已过期返回 false
    pub fn expire(&self, key: &str, secs: u64) -> bool {
        let mut guard = self.locked();
        let now = now_ms();
        guard.reclaim(key, now);
        if !guard.data.contains_key(key) {
            return false;
        }
        guard
            .expirations
            .insert(key.to_string(), expire::deadline_ms(now, secs));
        true
    }

    /// TTL：-2 表示 key 不存在或已过期，-1 表示存活但无过期时间，
    /// 其余为剩余秒数（向上取整）
    pub fn ttl(&self, key: &str) -> i64 {
        let mut guard = self.locked();
        let now = now_ms();
        guard.reclaim(key, now);
        if !guard.data.contains_key(key) {
            return -2;
        }
        match guard.expirations.get(key) {
            None => -1,
            // reclaim 之后 deadline 一定在未来
            Some(&deadline) => (((deadline - now) + 999) / 1000) as i64,
        }
    }

    /// PERSIST：移除存活 key 的过期时间；确实移除了才返回 true
    pub fn persist(&self, key: &str) -> bool {
        let mut guard = self.locked();
        guard.reclaim(key, now_ms());
        guard.data.contains_key(key) && guard.expirations.remove(key).is_some()
    }

    /// 快照导出：持锁克隆两张表，供快照编解码使用
    pub fn dump(&self) -> (HashMap<String, Value>, HashMap<String, u64>) {
        let guard = self.locked();
        (guard.data.clone(), guard.expirations.clone())
    }

    /// 快照导入：整体替换当前内容，仅在进程启动时调用
    pub fn restore(&self, data: HashMap<String, Value>, expirations: HashMap<String, u64>) {
        let mut guard = self.locked();
        guard.data = data;
        guard.expirations = expirations;
    }
}
