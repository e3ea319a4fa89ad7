// ==========================================
// 内容同步系统 - 记录校验器实现
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 阶段 6: 校验
// 职责: 外部键 / 必填列 / 批内重复校验
// ==========================================

use crate::config::table_config::TableConfig;
use crate::domain::record::{MappedRecord, SyncViolation};
use crate::domain::types::Severity;
use crate::importer::sync_engine_trait::Validator;
use std::collections::HashSet;

pub struct RecordValidator;

impl Validator for RecordValidator {
    fn validate(&self, records: &[MappedRecord], config: &TableConfig) -> Vec<SyncViolation> {
        let mut violations = Vec::new();
        let mut seen_keys: HashSet<&str> = HashSet::new();

        for record in records {
            // 外部键缺失 → 整行剔除
            if record.external_key.is_empty() {
                violations.push(SyncViolation {
                    row_number: record.row_number,
                    external_key: None,
                    severity: Severity::Error,
                    message: format!("行 {}: 外部键缺失", record.row_number),
                    discard: true,
                });
                continue;
            }

            // 批内重复外部键: 先到先得，后出现者剔除
            if !seen_keys.insert(record.external_key.as_str()) {
                violations.push(SyncViolation {
                    row_number: record.row_number,
                    external_key: Some(record.external_key.clone()),
                    severity: Severity::Warning,
                    message: format!(
                        "行 {}: 外部键 {} 在本批内重复，已跳过",
                        record.row_number, record.external_key
                    ),
                    discard: true,
                });
                continue;
            }

            // 必填列为空（映射阶段之后仍可能因转换置空产生）
            for mapping in &config.fields {
                if mapping.required
                    && record
                        .columns
                        .get(&mapping.column)
                        .map(|v| v.is_null())
                        .unwrap_or(true)
                {
                    violations.push(SyncViolation {
                        row_number: record.row_number,
                        external_key: Some(record.external_key.clone()),
                        severity: Severity::Error,
                        message: format!(
                            "行 {}: 必填列 {} 为空",
                            record.row_number, mapping.column
                        ),
                        discard: true,
                    });
                    break;
                }
            }
        }

        violations
    }
}
