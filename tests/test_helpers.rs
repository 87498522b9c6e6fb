// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、销售数据文件生成等功能
// ==========================================

#![allow(dead_code)]

use sales_invoicing::app::AppState;
use std::error::Error;
use tempfile::NamedTempFile;

/// 销售数据表头（16 列，第 10 列未使用）
pub const SALES_HEADER: [&str; 16] = [
    "企业", "门店编码", "地址", "年", "月", "发票编码", "客户分组", "分组说明", "客户编码",
    "商品类别", "备用", "商品编码", "商品名称", "单位", "数量", "金额",
];

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("路径非 UTF-8")?.to_string();

    sales_invoicing::db::open_and_init(&db_path)?;

    Ok((temp_file, db_path))
}

/// 创建测试环境（临时库 + AppState）
pub fn create_test_state() -> Result<(NamedTempFile, AppState), Box<dyn Error>> {
    sales_invoicing::logging::init_test();
    let (temp_file, db_path) = create_test_db()?;
    let state = AppState::new(db_path)?;
    Ok((temp_file, state))
}

/// 构造一行销售数据
pub struct SalesRowBuilder {
    cells: Vec<String>,
}

impl SalesRowBuilder {
    /// 默认值对应: E1 / S1 / B000000001 / G1 / C1 / P1 / PR1 / Widget，数量 3，金额 9.0
    pub fn new() -> Self {
        let cells = [
            "E1", "S1", "Addr", "2023", "5", "B000000001", "G1", "GroupInfo", "C1", "P1", "",
            "PR1", "Widget", "pcs", "3", "9.0",
        ];
        Self {
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn set(mut self, col: usize, value: &str) -> Self {
        self.cells[col] = value.to_string();
        self
    }

    pub fn store(self, code: &str) -> Self {
        self.set(1, code)
    }

    pub fn month(self, month: &str) -> Self {
        self.set(4, month)
    }

    pub fn invoice(self, code: &str) -> Self {
        self.set(5, code)
    }

    pub fn group(self, code: &str) -> Self {
        self.set(6, code)
    }

    pub fn customer(self, code: &str) -> Self {
        self.set(8, code)
    }

    pub fn product(self, code: &str) -> Self {
        self.set(11, code)
    }

    pub fn quantity(self, quantity: &str) -> Self {
        self.set(14, quantity)
    }

    pub fn amount(self, amount: &str) -> Self {
        self.set(15, amount)
    }

    pub fn build(self) -> Vec<String> {
        self.cells
    }
}

/// 写入带表头的 CSV 文件（.csv 后缀）
pub fn write_sales_csv(rows: &[Vec<String>]) -> Result<NamedTempFile, Box<dyn Error>> {
    let file = tempfile::Builder::new().suffix(".csv").tempfile()?;

    let mut writer = csv::Writer::from_path(file.path())?;
    writer.write_record(SALES_HEADER)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(file)
}

/// 文件路径转字符串
pub fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().to_string()
}
