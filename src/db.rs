// ==========================================
// 销售发票管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键约束每连接开启）
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表，记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS store (
    store_code TEXT PRIMARY KEY,
    enterprise TEXT NOT NULL,
    address TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customer_group (
    group_code TEXT PRIMARY KEY,
    group_info TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customer (
    customer_code TEXT PRIMARY KEY,
    group_code TEXT NOT NULL REFERENCES customer_group(group_code)
);

CREATE TABLE IF NOT EXISTS product_category (
    category_code TEXT PRIMARY KEY,
    category_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    product_code TEXT PRIMARY KEY,
    category_code TEXT NOT NULL REFERENCES product_category(category_code),
    product_name TEXT NOT NULL,
    unit TEXT NOT NULL,
    unit_price TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS invoice (
    invoice_code TEXT PRIMARY KEY,
    store_code TEXT NOT NULL REFERENCES store(store_code),
    customer_code TEXT NOT NULL REFERENCES customer(customer_code),
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12)
);

CREATE TABLE IF NOT EXISTS invoice_line (
    line_id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_code TEXT NOT NULL REFERENCES invoice(invoice_code) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    product_code TEXT NOT NULL REFERENCES product(product_code),
    quantity INTEGER NOT NULL,
    subtotal TEXT NOT NULL,
    UNIQUE (invoice_code, line_no)
);

CREATE INDEX IF NOT EXISTS idx_invoice_line_product ON invoice_line(product_code);
CREATE INDEX IF NOT EXISTS idx_invoice_period ON invoice(year, month);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    file_name TEXT,
    failure_policy TEXT NOT NULL,
    amount_policy TEXT NOT NULL,
    total_rows INTEGER NOT NULL,
    accepted_rows INTEGER NOT NULL,
    rejected_rows INTEGER NOT NULL,
    inserted_rows INTEGER NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    imported_at TEXT NOT NULL
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表并写入当前 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保 schema 存在
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;

    if let Some(version) = read_schema_version(&conn)? {
        if version != CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                db_version = version,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 与程序不一致"
            );
        }
    }

    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
