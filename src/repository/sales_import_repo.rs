// ==========================================
// 销售发票管理系统 - 销售导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::import::{FlushReport, ImportBatch, ReconciledBatch};
use crate::domain::types::EntityKind;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// SalesImportRepository Trait
// ==========================================
// 实现者: SalesImportRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait SalesImportRepository: Send + Sync {
    // ===== 批量写入（事务化）=====

    /// 按外键顺序落库整批对账结果
    ///
    /// 顺序: 门店 → 客户分组 → 客户 → 商品类别 → 商品 → 发票 → 明细行
    /// 已存在的自然键跳过，不覆盖
    ///
    /// # 返回
    /// - Ok(FlushReport): 每类实体的写入/跳过统计
    /// - Err: 数据库错误（整个事务回滚，不留部分数据）
    async fn flush_batch(&self, batch: &ReconciledBatch) -> RepositoryResult<FlushReport>;

    // ===== 批次管理 =====

    /// 插入导入批次记录
    async fn insert_batch(&self, batch: ImportBatch) -> RepositoryResult<()>;

    /// 查询最近的导入批次（按导入时间倒序）
    async fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>>;

    // ===== 统计 =====

    /// 统计实体表记录数
    async fn count_rows(&self, entity: EntityKind) -> RepositoryResult<usize>;
}
