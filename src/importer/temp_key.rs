// ==========================================
// 内容同步系统 - 临时键注册表
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 4.1 临时键簿记
// 职责: 为尚未落库的记录签发占位符，并记录 (表, 源侧键值) → 占位符 映射
// 生命周期: 单次导入运行（引擎每次 synchronize 持有独立实例）
// ==========================================

use crate::domain::types::TemporaryKey;
use std::collections::HashMap;
use tracing::warn;

// ==========================================
// TemporaryKeyRegistry - 临时键注册表
// ==========================================
// 不变量:
// - 序号单调递增，单轮运行内签发的键永不重复
// - 同一表内，每个源侧键值至多对应一个占位符（后写覆盖）
#[derive(Debug, Default)]
pub struct TemporaryKeyRegistry {
    serial: u64,
    test_mode: bool,
    /// 表名 → (源侧键值 → 临时键)
    keys: HashMap<String, HashMap<String, TemporaryKey>>,
}

impl TemporaryKeyRegistry {
    pub fn new() -> Self {
        TemporaryKeyRegistry::default()
    }

    /// 开关测试模式
    ///
    /// 测试模式下 `reset_serial` 才会真正生效，用于在用例之间
    /// 断言精确的 NEW1, NEW2, ... 序列
    pub fn set_test_mode(&mut self, enabled: bool) {
        self.test_mode = enabled;
    }

    /// 重置序号计数器（仅测试隔离用）
    ///
    /// 正式运行中重置会导致后续签发的键与已签发键冲突，
    /// 因此非测试模式下忽略并告警
    pub fn reset_serial(&mut self) {
        if self.test_mode {
            self.serial = 0;
        } else {
            warn!("非测试模式下调用 reset_serial，已忽略");
        }
    }

    /// 签发一个新的临时键
    ///
    /// 单轮运行内保证不与任何已签发键冲突（单调计数器）
    pub fn generate_temporary_key(&mut self) -> TemporaryKey {
        self.serial += 1;
        TemporaryKey::new(self.serial)
    }

    /// 登记 key 在 table 内代表 origin_value
    ///
    /// 同一 (表, 源侧键值) 重复登记时后写覆盖，不报错:
    /// 正常管道中每个源侧键值只会被处理一次
    pub fn add_temporary_key(&mut self, origin_value: &str, key: TemporaryKey, table: &str) {
        self.keys
            .entry(table.to_string())
            .or_default()
            .insert(origin_value.to_string(), key);
    }

    /// (table, origin_value) 是否已登记占位符
    ///
    /// 用于同一轮内再次遇到相同源侧键值时避免重复建子记录
    pub fn has_temporary_key(&self, table: &str, origin_value: &str) -> bool {
        self.keys
            .get(table)
            .map(|entries| entries.contains_key(origin_value))
            .unwrap_or(false)
    }

    /// 查询 origin_value 在 table 内对应的占位符
    ///
    /// # 返回
    /// - Some(key): 已登记
    /// - None: 未登记（调用方自行决定是否构成错误，绝不伪造键）
    pub fn get_temporary_key_for_value(
        &self,
        origin_value: &str,
        table: &str,
    ) -> Option<TemporaryKey> {
        self.keys
            .get(table)
            .and_then(|entries| entries.get(origin_value))
            .copied()
    }

    /// 全量导出（表名 → (源侧键值 → 临时键)）
    ///
    /// 导入收尾阶段据此驱动占位符 → 最终 uid 的替换
    pub fn temporary_keys(&self) -> &HashMap<String, HashMap<String, TemporaryKey>> {
        &self.keys
    }
}
