// ==========================================
// 内容同步系统 - 配置管理器
// ==========================================
// 依据: Table_Config_Spec_v0.2.md - 2. 配置存取
// 职责: 从 sync_config 表加载/保存声明式表配置
// 存储: sync_config 表 (key = "{table}/{index}", value = TableConfig JSON)
// ==========================================

use crate::config::sync_config_trait::SyncConfigReader;
use crate::config::table_config::TableConfig;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 sync_config 表读取配置 JSON 原文
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM sync_config WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入/覆盖一份表配置
    ///
    /// # 参数
    /// - config: 表配置（key 取 "{table}/{index}"）
    pub fn save_table_config(&self, config: &TableConfig) -> Result<(), Box<dyn Error>> {
        let key = format!("{}/{}", config.table, config.index);
        let value = serde_json::to_string(config)?;

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO sync_config (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }
}

#[async_trait]
impl SyncConfigReader for ConfigManager {
    async fn get_table_config(
        &self,
        table: &str,
        index: &str,
    ) -> Result<TableConfig, Box<dyn Error>> {
        let key = format!("{}/{}", table, index);
        let raw = self
            .get_config_value(&key)?
            .ok_or_else(|| format!("同步配置不存在: {}", key))?;

        let config: TableConfig = serde_json::from_str(&raw)
            .map_err(|e| format!("同步配置解析失败 ({}): {}", key, e))?;
        Ok(config)
    }

    async fn list_table_configs(&self) -> Result<Vec<(String, String)>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key FROM sync_config ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;

        // key 形如 "{table}/{index}"；index 自身不含 '/'
        let mut pairs = Vec::new();
        for key in keys {
            match key.rsplit_once('/') {
                Some((table, index)) => pairs.push((table.to_string(), index.to_string())),
                None => pairs.push((key, "0".to_string())),
            }
        }
        Ok(pairs)
    }
}
