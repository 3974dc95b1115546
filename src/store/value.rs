// src/store/value.rs

//! Value：一个 key 同一时刻只能持有的三种变体之一。
//! 快照文件用 JSON 的形状区分变体：字符串 / 对象 / 数组，
//! 所以这里用 untagged 反序列化。

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// key 持有的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// 单个文本
    Str(String),
    /// field → value 映射，field 在一个 hash 内唯一
    Hash(HashMap<String, String>),
    /// 双端列表，允许重复元素
    List(VecDeque<String>),
}

/// Python 风格切片：闭区间 end，负下标从尾部数起，越界收敛而不报错。
/// end == -1 即「到最后一个元素」。
pub fn slice_range(list: &VecDeque<String>, start: i64, end: i64) -> Vec<String> {
    let len = list.len() as i64;
    if len == 0 {
        return Vec::new();
    }
    let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
    let stop = if end < 0 { len + end } else { end.min(len - 1) };
    if start > stop {
        return Vec::new();
    }
    list.iter()
        .skip(start as usize)
        .take((stop - start + 1) as usize)
        .cloned()
        .collect()
}
