// ==========================================
// 内容同步系统 - 内容仓储实现
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 5. 存储契约
// 职责: 实现同步相关数据访问（使用 rusqlite）
// 约定: 目标表以 uid INTEGER PRIMARY KEY 为主键；
//       表名/列名来自受信的同步配置，拼接前统一加引号
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::record::{ExistingRow, ReconcilePlan, StoreOutcome};
use crate::domain::types::RecordId;
use crate::repository::content_repo::ContentRepository;
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ContentRepositoryImpl
// ==========================================
pub struct ContentRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ContentRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 Repository
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 在事务中执行一批插入，返回 临时键 → uid
    fn apply_inserts_tx(
        tx: &Transaction,
        plan: &ReconcilePlan,
        outcome: &mut StoreOutcome,
    ) -> Result<(), RepositoryError> {
        for insert in &plan.inserts {
            let uid = insert_row(tx, &plan.table, &insert.columns)?;
            outcome
                .new_ids
                .entry(plan.table.clone())
                .or_default()
                .insert(insert.id, uid);
            outcome.inserted += 1;
        }
        Ok(())
    }

    /// 在事务中执行子记录插入（父链接列经占位符映射解析）
    fn apply_child_inserts_tx(
        tx: &Transaction,
        plan: &ReconcilePlan,
        outcome: &mut StoreOutcome,
    ) -> Result<(), RepositoryError> {
        for child in &plan.child_inserts {
            let parent_uid = resolve_parent(&plan.table, &child.parent, &outcome.new_ids)?;

            let mut columns = child.columns.clone();
            columns.insert(child.parent_column.clone(), Value::from(parent_uid));

            let uid = insert_row(tx, &child.table, &columns)?;
            outcome
                .new_ids
                .entry(child.table.clone())
                .or_default()
                .insert(child.id, uid);
            outcome.child_inserted += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for ContentRepositoryImpl {
    async fn fetch_existing(
        &self,
        table: &str,
        key_column: &str,
        columns: &[String],
    ) -> Result<HashMap<String, ExistingRow>, Box<dyn Error>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        // 比较列去重并保持确定性顺序
        let mut extra: Vec<&String> = columns.iter().filter(|c| c.as_str() != key_column).collect();
        extra.sort();
        extra.dedup();

        let mut select = format!("SELECT uid, {}", quote_ident(key_column));
        for column in &extra {
            select.push_str(", ");
            select.push_str(&quote_ident(column));
        }
        select.push_str(&format!(" FROM {}", quote_ident(table)));

        let mut stmt = conn.prepare(&select)?;
        let mut rows = stmt.query([])?;

        let mut existing = HashMap::new();
        while let Some(row) = rows.next()? {
            let uid: i64 = row.get(0)?;
            let key = match read_value(row, 1)? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => continue, // 外部键为空的行不参与对账
            };

            let mut row_columns = HashMap::new();
            row_columns.insert(key_column.to_string(), read_value(row, 1)?);
            for (offset, column) in extra.iter().enumerate() {
                row_columns.insert((*column).clone(), read_value(row, 2 + offset)?);
            }

            existing.insert(
                key,
                ExistingRow {
                    uid,
                    columns: row_columns,
                },
            );
        }

        Ok(existing)
    }

    async fn apply_plan(&self, plan: &ReconcilePlan) -> Result<StoreOutcome, Box<dyn Error>> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut outcome = StoreOutcome::default();

        // 1) 主记录插入（子记录解析父链接的前置条件）
        Self::apply_inserts_tx(&tx, plan, &mut outcome)?;

        // 2) 主记录更新
        for update in &plan.updates {
            update_row(&tx, &plan.table, update.uid, &update.columns)?;
            outcome.updated += 1;
        }

        // 3) 删除（先级联清理子表）
        for uid in &plan.deletes {
            for cascade in &plan.cascades {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} = ?1",
                        quote_ident(&cascade.table),
                        quote_ident(&cascade.parent_column)
                    ),
                    params![uid],
                )
                .map_err(RepositoryError::from)?;
            }
            tx.execute(
                &format!("DELETE FROM {} WHERE uid = ?1", quote_ident(&plan.table)),
                params![uid],
            )
            .map_err(RepositoryError::from)?;
            outcome.deleted += 1;
        }

        // 4) 子记录插入
        Self::apply_child_inserts_tx(&tx, plan, &mut outcome)?;

        // 5) 子记录更新
        for child in &plan.child_updates {
            let parent_uid = resolve_parent(&plan.table, &child.parent, &outcome.new_ids)?;
            let mut columns = child.columns.clone();
            columns.insert(child.parent_column.clone(), Value::from(parent_uid));
            update_row(&tx, &child.table, child.uid, &columns)?;
            outcome.child_updated += 1;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(outcome)
    }

    async fn update_sorting(
        &self,
        sorting: &HashMap<String, HashMap<RecordId, HashMap<String, i64>>>,
    ) -> Result<usize, Box<dyn Error>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut applied = 0;
        for (table, entries) in sorting {
            for (id, fields) in entries {
                let uid = match id {
                    RecordId::Final(uid) => *uid,
                    RecordId::Temporary(key) => {
                        // 占位符残留说明替换阶段遗漏，跳过该条
                        warn!(table = %table, key = %key, "排序条目仍为占位符，跳过");
                        continue;
                    }
                };

                for (field, value) in fields {
                    conn.execute(
                        &format!(
                            "UPDATE {} SET {} = ?1 WHERE uid = ?2",
                            quote_ident(table),
                            quote_ident(field)
                        ),
                        params![value, uid],
                    )
                    .map_err(RepositoryError::from)?;
                }
                applied += 1;
            }
        }

        Ok(applied)
    }

    async fn count_rows(&self, table: &str) -> Result<usize, Box<dyn Error>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// ==========================================
// SQL 辅助
// ==========================================

/// 标识符加引号（配置来自受信来源，引号防的是拼写事故而非注入）
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 单行插入，返回新 uid
fn insert_row(
    tx: &Transaction,
    table: &str,
    columns: &HashMap<String, Value>,
) -> Result<i64, RepositoryError> {
    let mut names: Vec<&String> = columns.keys().collect();
    names.sort();

    let column_list = names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholder_list = (1..=names.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list,
        placeholder_list
    );

    let values: Vec<rusqlite::types::Value> =
        names.iter().map(|n| to_sql_value(&columns[*n])).collect();

    tx.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(RepositoryError::from)?;
    Ok(tx.last_insert_rowid())
}

/// 单行更新（按 uid）
fn update_row(
    tx: &Transaction,
    table: &str,
    uid: i64,
    columns: &HashMap<String, Value>,
) -> Result<(), RepositoryError> {
    if columns.is_empty() {
        return Ok(());
    }

    let mut names: Vec<&String> = columns.keys().collect();
    names.sort();

    let assignments = names
        .iter()
        .enumerate()
        .map(|(i, n)| format!("{} = ?{}", quote_ident(n), i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE uid = ?{}",
        quote_ident(table),
        assignments,
        names.len() + 1
    );

    let mut values: Vec<rusqlite::types::Value> =
        names.iter().map(|n| to_sql_value(&columns[*n])).collect();
    values.push(rusqlite::types::Value::Integer(uid));

    tx.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(RepositoryError::from)?;
    Ok(())
}

/// 解析父记录标识（占位符经由本事务的 new_ids 映射）
fn resolve_parent(
    parent_table: &str,
    parent: &RecordId,
    new_ids: &HashMap<String, HashMap<crate::domain::types::TemporaryKey, i64>>,
) -> Result<i64, RepositoryError> {
    match parent {
        RecordId::Final(uid) => Ok(*uid),
        RecordId::Temporary(key) => new_ids
            .get(parent_table)
            .and_then(|ids| ids.get(key))
            .copied()
            .ok_or_else(|| RepositoryError::UnresolvedPlaceholder {
                table: parent_table.to_string(),
                key: key.to_string(),
            }),
    }
}

/// serde_json::Value → rusqlite 值
///
/// 布尔以 0/1 落库（SQLite 无布尔类型）
fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rusqlite::types::Value::Integer(i)
            } else {
                rusqlite::types::Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        // 数组/对象不落库（映射阶段已展开）
        other => rusqlite::types::Value::Text(other.to_string()),
    }
}

/// rusqlite 行值 → serde_json::Value
fn read_value(row: &rusqlite::Row, idx: usize) -> Result<Value, rusqlite::Error> {
    Ok(match row.get_ref(idx)? {
        rusqlite::types::ValueRef::Null => Value::Null,
        rusqlite::types::ValueRef::Integer(i) => Value::from(i),
        rusqlite::types::ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        rusqlite::types::ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).to_string()),
        rusqlite::types::ValueRef::Blob(_) => Value::Null,
    })
}
