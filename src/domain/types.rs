// ==========================================
// 内容同步系统 - 核心类型定义
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 2. 标识符模型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 临时键前缀（与存储层识别新记录占位符的约定一致）
pub const TEMP_KEY_PREFIX: &str = "NEW";

// ==========================================
// TemporaryKey - 临时键
// ==========================================
// 用途: 尚未落库记录的占位符标识
// 格式: "NEW" + 十进制序号（无分隔符），如 NEW1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemporaryKey(u64);

impl TemporaryKey {
    pub fn new(serial: u64) -> Self {
        TemporaryKey(serial)
    }

    pub fn serial(&self) -> u64 {
        self.0
    }

    /// 从字符串形式解析临时键（仅用于存储/报告边界）
    ///
    /// # 返回
    /// - Some(TemporaryKey): 形如 "NEW<序号>" 的合法占位符
    /// - None: 前缀不匹配或序号非法
    pub fn parse(value: &str) -> Option<Self> {
        let serial = value.strip_prefix(TEMP_KEY_PREFIX)?;
        if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        serial.parse::<u64>().ok().map(TemporaryKey)
    }
}

impl fmt::Display for TemporaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", TEMP_KEY_PREFIX, self.0)
    }
}

// ==========================================
// RecordId - 记录标识符
// ==========================================
// 用途: 同一键位既可能是占位符也可能是最终 uid
// 红线: "是否占位符" 必须走类型匹配，禁止字符串前缀探测
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// 本轮导入中新建、尚未分配 uid 的记录
    Temporary(TemporaryKey),
    /// 存储层已分配的最终 uid
    Final(i64),
}

impl RecordId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, RecordId::Temporary(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Temporary(key) => write!(f, "{}", key),
            RecordId::Final(uid) => write!(f, "{}", uid),
        }
    }
}

impl From<TemporaryKey> for RecordId {
    fn from(key: TemporaryKey) -> Self {
        RecordId::Temporary(key)
    }
}

// ==========================================
// Severity - 消息严重级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

// ==========================================
// ReplaceOutcome - 键替换结果
// ==========================================
// 用途: 区分 "已替换" 与 "键不存在、未改动"
// 说明: 缺键是合法情况（记录可能本就持有最终 uid），不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Applied,
    KeyNotFound,
}

// ==========================================
// SyncOperation - 同步操作类别
// ==========================================
// 用途: 配置中按表禁用部分操作（如只增不删的数据源）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Insert,
    Update,
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_key_display() {
        assert_eq!(TemporaryKey::new(1).to_string(), "NEW1");
        assert_eq!(TemporaryKey::new(42).to_string(), "NEW42");
    }

    #[test]
    fn test_temporary_key_parse() {
        assert_eq!(TemporaryKey::parse("NEW1"), Some(TemporaryKey::new(1)));
        assert_eq!(TemporaryKey::parse("NEW120"), Some(TemporaryKey::new(120)));
        // 前缀大小写敏感
        assert_eq!(TemporaryKey::parse("new1"), None);
        assert_eq!(TemporaryKey::parse("NEW"), None);
        assert_eq!(TemporaryKey::parse("NEW1x"), None);
        assert_eq!(TemporaryKey::parse("42"), None);
    }

    #[test]
    fn test_record_id_is_temporary() {
        assert!(RecordId::Temporary(TemporaryKey::new(1)).is_temporary());
        assert!(!RecordId::Final(42).is_temporary());
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::Temporary(TemporaryKey::new(3)).to_string(), "NEW3");
        assert_eq!(RecordId::Final(99).to_string(), "99");
    }
}
