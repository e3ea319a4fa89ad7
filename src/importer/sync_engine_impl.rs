// ==========================================
// 内容同步系统 - 同步引擎实现
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 1.2 同步主流程
// 职责: 整合同步流程，从数据源到内部表
// 流程: 读取 → 映射 → 转换 → 外键解析 → 校验 → 对账 → 子记录 → 落库 → 排序刷写
// ==========================================

use crate::config::sync_config_trait::SyncConfigReader;
use crate::config::table_config::{DataType, FieldMapping, TableConfig};
use crate::domain::record::{
    CascadeDelete, ExistingRow, MappedRecord, MessageLog, PlannedChildInsert, PlannedChildUpdate,
    PlannedInsert, PlannedUpdate, ReconcilePlan, StoreOutcome, SyncReport, SyncSummary,
};
use crate::domain::types::{RecordId, Severity};
use crate::importer::children_sorting::ChildrenSortingTracker;
use crate::importer::sync_engine_trait::{
    FieldMapper, ReconcileOutcome, Reconciler, SourceReader, SyncEngine, Transformer, Validator,
};
use crate::importer::temp_key::TemporaryKeyRegistry;
use crate::repository::content_repo::ContentRepository;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 子记录排序步长（位置 i → (i+1) * 步长，留出人工插排空隙）
const SORTING_STEP: i64 = 10;

// ==========================================
// SyncEngineImpl - 同步引擎实现
// ==========================================
pub struct SyncEngineImpl<R, C>
where
    R: ContentRepository,
    C: SyncConfigReader,
{
    // 数据访问层
    repo: R,

    // 配置读取器
    config: C,

    // 管道组件
    source_reader: Box<dyn SourceReader>,
    field_mapper: Box<dyn FieldMapper>,
    transformer: Box<dyn Transformer>,
    validator: Box<dyn Validator>,
    reconciler: Box<dyn Reconciler>,
}

impl<R, C> SyncEngineImpl<R, C>
where
    R: ContentRepository,
    C: SyncConfigReader,
{
    /// 创建新的 SyncEngine 实例
    ///
    /// # 参数
    /// - repo: 内容仓储
    /// - config: 配置读取器
    /// - source_reader: 数据源读取器
    /// - field_mapper: 字段映射器
    /// - transformer: 数据转换器
    /// - validator: 记录校验器
    /// - reconciler: 对账器
    pub fn new(
        repo: R,
        config: C,
        source_reader: Box<dyn SourceReader>,
        field_mapper: Box<dyn FieldMapper>,
        transformer: Box<dyn Transformer>,
        validator: Box<dyn Validator>,
        reconciler: Box<dyn Reconciler>,
    ) -> Self {
        Self {
            repo,
            config,
            source_reader,
            field_mapper,
            transformer,
            validator,
            reconciler,
        }
    }
}

#[async_trait::async_trait]
impl<R, C> SyncEngine for SyncEngineImpl<R, C>
where
    R: ContentRepository + Send + Sync,
    C: SyncConfigReader + Send + Sync,
{
    #[instrument(skip(self), fields(run_id))]
    async fn synchronize(&self, table: &str, index: &str) -> Result<SyncReport, Box<dyn Error>> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let mut messages = MessageLog::new();

        info!(run_id = %run_id, table = %table, index = %index, "开始同步");

        // === 步骤 1: 读取配置 ===
        debug!("步骤 1: 读取配置");
        let table_config = self.config.get_table_config(table, index).await.map_err(|e| {
            error!(error = %e, "配置读取失败");
            e
        })?;

        // === 步骤 2: 读取数据源 ===
        debug!("步骤 2: 读取数据源");
        let raw_rows = self
            .source_reader
            .read_records(&table_config.source)
            .map_err(|e| {
                error!(error = %e, "数据源读取失败");
                format!("数据源读取失败: {}", e)
            })?;

        let total_rows = raw_rows.len();
        info!(total_rows = total_rows, "数据源读取完成");

        // === 步骤 3: 字段映射 ===
        debug!("步骤 3: 字段映射");
        let mut records = Vec::new();
        for (idx, row) in raw_rows.iter().enumerate() {
            match self.field_mapper.map_record(row, idx + 1, &table_config) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(row_number = idx + 1, error = %e, "字段映射失败");
                    messages.add(Severity::Error, format!("字段映射失败: {}", e));
                }
            }
        }
        info!(
            success = records.len(),
            failed = total_rows - records.len(),
            "字段映射完成"
        );

        // === 步骤 4: 数据转换 ===
        debug!("步骤 4: 数据转换");
        for record in &mut records {
            self.transform_record(record, &table_config, &mut messages);
        }
        debug!("数据转换完成");

        // === 步骤 5: 外键解析 ===
        debug!("步骤 5: 外键解析");
        self.resolve_foreign_keys(&mut records, &table_config, &mut messages)
            .await?;
        debug!("外键解析完成");

        // === 步骤 6: 校验 ===
        debug!("步骤 6: 校验");
        let violations = self.validator.validate(&records, &table_config);
        let discarded: HashSet<usize> = violations
            .iter()
            .filter(|v| v.discard)
            .map(|v| v.row_number)
            .collect();
        for violation in &violations {
            messages.add(violation.severity, violation.message.clone());
        }
        records.retain(|r| !discarded.contains(&r.row_number));
        info!(
            valid = records.len(),
            violations = violations.len(),
            "校验完成"
        );

        // === 步骤 7: 对账 ===
        debug!("步骤 7: 对账");
        let compare_columns: Vec<String> =
            table_config.fields.iter().map(|f| f.column.clone()).collect();
        let existing = self
            .repo
            .fetch_existing(&table_config.table, &table_config.external_key, &compare_columns)
            .await?;
        let outcome = self.reconciler.reconcile(&records, &existing, &table_config);
        info!(
            inserts = outcome.inserts.len(),
            updates = outcome.updates.len(),
            unchanged = outcome.unchanged.len(),
            deletes = outcome.deletes.len(),
            "对账完成"
        );

        // === 步骤 8: 子记录处理（临时键 + 排序簿记）===
        debug!("步骤 8: 子记录处理");
        // 注册表与跟踪器由本次运行独占，运行结束即弃
        let mut registry = TemporaryKeyRegistry::new();
        let mut tracker = ChildrenSortingTracker::new();

        let plan = self
            .build_plan(
                &records,
                &outcome,
                &table_config,
                &mut registry,
                &mut tracker,
                &mut messages,
            )
            .await?;

        // === 步骤 9: 落库（事务化）===
        debug!("步骤 9: 落库");
        let store_outcome = if plan.is_empty() {
            debug!("计划为空，跳过落库");
            StoreOutcome::default()
        } else {
            self.repo.apply_plan(&plan).await.map_err(|e| {
                error!(error = %e, "落库失败");
                format!("落库失败: {}", e)
            })?
        };
        info!(
            inserted = store_outcome.inserted,
            updated = store_outcome.updated,
            deleted = store_outcome.deleted,
            child_inserted = store_outcome.child_inserted,
            "落库完成"
        );

        // 占位符解析核对: 已登记但未获最终 uid 的键升级为警告
        for (key_table, origins) in registry.temporary_keys() {
            for (origin, key) in origins {
                let resolved = store_outcome
                    .new_ids
                    .get(key_table)
                    .map(|ids| ids.contains_key(key))
                    .unwrap_or(false);
                if !resolved {
                    messages.add(
                        Severity::Warning,
                        format!("占位符 {} (表 {}, 源键 {}) 未被持久化解析", key, key_table, origin),
                    );
                }
            }
        }

        // === 步骤 10: 排序刷写 ===
        if tracker.has_sorting_information() {
            debug!("步骤 10: 排序刷写");
            for (new_table, ids) in &store_outcome.new_ids {
                tracker.replace_all_new_ids(new_table, ids);
            }
            let applied = self.repo.update_sorting(tracker.sorting_information()).await?;
            debug!(applied = applied, "排序刷写完成");
            tracker.reset_sorting_information();
        } else {
            debug!("无子记录排序信息，跳过刷写");
        }

        // === 步骤 11: 构造报告 ===
        let summary = SyncSummary {
            total_rows,
            inserted: store_outcome.inserted,
            updated: store_outcome.updated,
            deleted: store_outcome.deleted,
            skipped: outcome.unchanged.len(),
            child_inserted: store_outcome.child_inserted,
            child_updated: store_outcome.child_updated,
        };
        messages.add(
            Severity::Success,
            format!(
                "表 {}: 读取 {} 行，插入 {}，更新 {}，删除 {}，跳过 {}",
                table_config.table,
                summary.total_rows,
                summary.inserted,
                summary.updated,
                summary.deleted,
                summary.skipped
            ),
        );
        if summary.child_inserted + summary.child_updated > 0 {
            messages.add(
                Severity::Success,
                format!(
                    "子记录: 插入 {}，更新 {}",
                    summary.child_inserted, summary.child_updated
                ),
            );
        }

        let elapsed = start_time.elapsed();
        info!(
            run_id = %run_id,
            elapsed_ms = elapsed.as_millis(),
            errors = messages.count(Severity::Error),
            warnings = messages.count(Severity::Warning),
            "同步完成"
        );

        Ok(SyncReport {
            run_id,
            table: table.to_string(),
            index: index.to_string(),
            summary,
            messages,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// 同步全部已登记配置（并发执行）
    async fn synchronize_all(
        &self,
    ) -> Result<Vec<Result<SyncReport, String>>, Box<dyn Error>> {
        use futures::future::join_all;

        let pairs = self.config.list_table_configs().await?;
        info!(count = pairs.len(), "开始同步全部配置");

        let tasks = pairs.into_iter().map(|(table, index)| async move {
            match self.synchronize(&table, &index).await {
                Ok(report) => {
                    info!(table = %table, index = %index, "配置同步成功");
                    Ok(report)
                }
                Err(e) => {
                    error!(table = %table, index = %index, error = %e, "配置同步失败");
                    Err(format!("配置 {}/{} 同步失败: {}", table, index, e))
                }
            }
        });

        let results = join_all(tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "全部配置同步完成"
        );

        Ok(results)
    }
}

// 辅助方法
impl<R, C> SyncEngineImpl<R, C>
where
    R: ContentRepository,
    C: SyncConfigReader,
{
    /// 对单条记录套用转换规则（含子记录）
    fn transform_record(
        &self,
        record: &mut MappedRecord,
        config: &TableConfig,
        messages: &mut MessageLog,
    ) {
        let row_number = record.row_number;
        self.transform_columns(&mut record.columns, &config.fields, row_number, messages);

        for child_config in &config.children {
            if let Some(children) = record.children.get_mut(&child_config.table) {
                for child in children {
                    self.transform_columns(
                        &mut child.columns,
                        &child_config.fields,
                        row_number,
                        messages,
                    );
                }
            }
        }
    }

    /// 按字段映射配置逐列转换
    fn transform_columns(
        &self,
        columns: &mut HashMap<String, Value>,
        fields: &[FieldMapping],
        row_number: usize,
        messages: &mut MessageLog,
    ) {
        for mapping in fields {
            let Some(value) = columns.get_mut(&mapping.column) else {
                continue;
            };

            let mut cleaned_to_empty = false;
            if let Value::String(s) = value {
                if mapping.trim || mapping.uppercase {
                    let cleaned = self.transformer.clean_text(s, mapping.uppercase);
                    *s = cleaned;
                }
                if mapping.slug {
                    let slug = self.transformer.slugify(s);
                    *s = slug;
                }
                cleaned_to_empty = mapping.trim && s.is_empty();
            }
            if cleaned_to_empty {
                *value = Value::Null;
                continue;
            }

            // 日期列统一规范化为 YYYY-MM-DD
            if mapping.data_type == DataType::Date {
                if let Value::String(s) = value {
                    match self.transformer.parse_date(s) {
                        Ok(date) => *value = Value::String(date.format("%Y-%m-%d").to_string()),
                        Err(_) => {
                            messages.add(
                                Severity::Warning,
                                format!(
                                    "行 {}: 列 {} 日期格式异常 ({})，已置空",
                                    row_number, mapping.column, s
                                ),
                            );
                            *value = Value::Null;
                        }
                    }
                }
            }
        }
    }

    /// 解析外键映射（源值 → 被引用表 uid）
    async fn resolve_foreign_keys(
        &self,
        records: &mut [MappedRecord],
        config: &TableConfig,
        messages: &mut MessageLog,
    ) -> Result<(), Box<dyn Error>> {
        // 收集全部外键映射并去重抓取
        let mut lookups: HashMap<(String, String), HashMap<String, i64>> = HashMap::new();
        let foreign_mappings: Vec<&FieldMapping> = config
            .fields
            .iter()
            .chain(config.children.iter().flat_map(|c| c.fields.iter()))
            .filter(|m| m.foreign.is_some())
            .collect();

        for mapping in &foreign_mappings {
            let Some(foreign) = &mapping.foreign else {
                continue;
            };
            let lookup_key = (foreign.table.clone(), foreign.key_column.clone());
            if !lookups.contains_key(&lookup_key) {
                let rows = self
                    .repo
                    .fetch_existing(&foreign.table, &foreign.key_column, &[])
                    .await?;
                let map = rows.into_iter().map(|(key, row)| (key, row.uid)).collect();
                lookups.insert(lookup_key, map);
            }
        }

        if lookups.is_empty() {
            return Ok(());
        }

        for record in records.iter_mut() {
            let row_number = record.row_number;
            resolve_columns(
                &mut record.columns,
                &config.fields,
                &lookups,
                row_number,
                messages,
            );
            for child_config in &config.children {
                if let Some(children) = record.children.get_mut(&child_config.table) {
                    for child in children {
                        resolve_columns(
                            &mut child.columns,
                            &child_config.fields,
                            &lookups,
                            row_number,
                            messages,
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// 由对账结果构建执行计划，并完成子记录的临时键与排序簿记
    async fn build_plan(
        &self,
        records: &[MappedRecord],
        outcome: &ReconcileOutcome,
        config: &TableConfig,
        registry: &mut TemporaryKeyRegistry,
        tracker: &mut ChildrenSortingTracker,
        messages: &mut MessageLog,
    ) -> Result<ReconcilePlan, Box<dyn Error>> {
        let mut plan = ReconcilePlan::new(&config.table);
        plan.cascades = config
            .children
            .iter()
            .map(|c| CascadeDelete {
                table: c.table.clone(),
                parent_column: c.parent_column.clone(),
            })
            .collect();
        plan.deletes = outcome.deletes.clone();

        // 主记录插入: 先为每条签发占位符
        for &idx in &outcome.inserts {
            let record = &records[idx];
            let key = registry.generate_temporary_key();
            registry.add_temporary_key(&record.external_key, key, &config.table);
            plan.inserts.push(PlannedInsert {
                id: key,
                external_key: record.external_key.clone(),
                columns: record.columns.clone(),
            });
        }

        for &(idx, uid) in &outcome.updates {
            plan.updates.push(PlannedUpdate {
                uid,
                columns: records[idx].columns.clone(),
            });
        }

        // 子记录: 插入/更新/不变的父记录都要走（排序随父批次整体重算）
        if !config.children.is_empty() {
            // 子表现有行按子表各抓一次
            let mut existing_children: HashMap<String, HashMap<String, ExistingRow>> =
                HashMap::new();
            for child_config in &config.children {
                let columns: Vec<String> =
                    child_config.fields.iter().map(|f| f.column.clone()).collect();
                let rows = self
                    .repo
                    .fetch_existing(&child_config.table, &child_config.external_key, &columns)
                    .await?;
                existing_children.insert(child_config.table.clone(), rows);
            }

            let parent_ids = parent_id_index(records, outcome, config, registry);

            for (idx, record) in records.iter().enumerate() {
                let Some(parent_id) = parent_ids.get(&idx) else {
                    continue; // 插入被禁用等情况下父记录无落点，子记录一并跳过
                };

                for child_config in &config.children {
                    let Some(children) = record.children.get(&child_config.table) else {
                        continue;
                    };
                    let Some(existing) = existing_children.get(&child_config.table) else {
                        continue;
                    };

                    for (position, child) in children.iter().enumerate() {
                        if child.external_key.is_empty() {
                            messages.add(
                                Severity::Warning,
                                format!(
                                    "行 {}: 子表 {} 存在缺失外部键的子记录，已跳过",
                                    record.row_number, child_config.table
                                ),
                            );
                            continue;
                        }

                        let sort_value = Value::from((position as i64 + 1) * SORTING_STEP);

                        match existing.get(&child.external_key) {
                            Some(existing_child) => {
                                plan.child_updates.push(PlannedChildUpdate {
                                    table: child_config.table.clone(),
                                    uid: existing_child.uid,
                                    parent_column: child_config.parent_column.clone(),
                                    parent: *parent_id,
                                    columns: child.columns.clone(),
                                });
                                if let Some(sort_field) = &child_config.sort_field {
                                    tracker.add_sorting_information(
                                        &child_config.table,
                                        RecordId::Final(existing_child.uid),
                                        sort_field,
                                        &sort_value,
                                    );
                                }
                            }
                            None => {
                                match registry
                                    .get_temporary_key_for_value(&child.external_key, &child_config.table)
                                {
                                    Some(key) => {
                                        // 同一源键在本轮内再次出现: 复用占位符，不重复建记录
                                        if let Some(sort_field) = &child_config.sort_field {
                                            tracker.add_sorting_information(
                                                &child_config.table,
                                                RecordId::Temporary(key),
                                                sort_field,
                                                &sort_value,
                                            );
                                        }
                                    }
                                    None => {
                                        let key = registry.generate_temporary_key();
                                        registry.add_temporary_key(
                                            &child.external_key,
                                            key,
                                            &child_config.table,
                                        );
                                        plan.child_inserts.push(PlannedChildInsert {
                                            table: child_config.table.clone(),
                                            id: key,
                                            external_key: child.external_key.clone(),
                                            parent_column: child_config.parent_column.clone(),
                                            parent: *parent_id,
                                            columns: child.columns.clone(),
                                        });
                                        if let Some(sort_field) = &child_config.sort_field {
                                            tracker.add_sorting_information(
                                                &child_config.table,
                                                RecordId::Temporary(key),
                                                sort_field,
                                                &sort_value,
                                            );
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(plan)
    }
}

/// 记录下标 → 父记录标识（插入 → 占位符，更新/不变 → 最终 uid）
fn parent_id_index(
    records: &[MappedRecord],
    outcome: &ReconcileOutcome,
    config: &TableConfig,
    registry: &TemporaryKeyRegistry,
) -> HashMap<usize, RecordId> {
    let mut parent_ids = HashMap::new();
    for &idx in &outcome.inserts {
        if let Some(key) =
            registry.get_temporary_key_for_value(&records[idx].external_key, &config.table)
        {
            parent_ids.insert(idx, RecordId::Temporary(key));
        }
    }
    for &(idx, uid) in &outcome.updates {
        parent_ids.insert(idx, RecordId::Final(uid));
    }
    for &(idx, uid) in &outcome.unchanged {
        parent_ids.insert(idx, RecordId::Final(uid));
    }
    parent_ids
}

/// 对一组列套用外键解析
fn resolve_columns(
    columns: &mut HashMap<String, Value>,
    fields: &[FieldMapping],
    lookups: &HashMap<(String, String), HashMap<String, i64>>,
    row_number: usize,
    messages: &mut MessageLog,
) {
    for mapping in fields {
        let Some(foreign) = &mapping.foreign else {
            continue;
        };
        let Some(value) = columns.get_mut(&mapping.column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        let lookup_key = (foreign.table.clone(), foreign.key_column.clone());
        let source_key = match &*value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };

        match lookups.get(&lookup_key).and_then(|m| m.get(&source_key)) {
            Some(uid) => *value = Value::from(*uid),
            None => {
                messages.add(
                    Severity::Warning,
                    format!(
                        "行 {}: 列 {} 外键值 {} 在表 {} 中不存在，已置空",
                        row_number, mapping.column, source_key, foreign.table
                    ),
                );
                *value = Value::Null;
            }
        }
    }
}
