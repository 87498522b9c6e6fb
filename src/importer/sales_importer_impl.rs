// ==========================================
// 销售发票管理系统 - 销售数据导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 映射 → 对账 → 落库 → 记录批次
// 失败策略:
//   - ABORT_BATCH: 首个错误行即返回错误，不落库
//   - SKIP_INVALID_ROWS: 错误行记入 rejections，其余行照常落库
// ==========================================

use crate::config::{config_keys, ConfigError, ImportConfigReader};
use crate::domain::import::{ImportBatch, ImportReport, RawSalesRow, RowRejection};
use crate::domain::types::FailurePolicy;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reconciler::BatchReconciler;
use crate::importer::sales_importer_trait::{FileParser, RowMapper, SalesImporter};
use crate::repository::SalesImportRepository;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

fn config_error(key: &str) -> impl FnOnce(ConfigError) -> ImportError + '_ {
    move |e| ImportError::ConfigReadError {
        key: key.to_string(),
        message: e.to_string(),
    }
}

// ==========================================
// SalesImporterImpl - 销售数据导入器实现
// ==========================================
pub struct SalesImporterImpl<R, C>
where
    R: SalesImportRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    import_repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    row_mapper: Box<dyn RowMapper>,
}

impl<R, C> SalesImporterImpl<R, C>
where
    R: SalesImportRepository,
    C: ImportConfigReader,
{
    /// 创建新的 SalesImporter 实例
    ///
    /// # 参数
    /// - import_repo: 导入数据仓储
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    /// - row_mapper: 行映射器
    pub fn new(
        import_repo: R,
        config: C,
        file_parser: Box<dyn FileParser>,
        row_mapper: Box<dyn RowMapper>,
    ) -> Self {
        Self {
            import_repo,
            config,
            file_parser,
            row_mapper,
        }
    }

    /// 映射 → 对账 → 落库 → 记录批次
    async fn run_pipeline(
        &self,
        batch_id: String,
        rows: Vec<RawSalesRow>,
        file_name: Option<String>,
        start_time: Instant,
    ) -> ImportResult<ImportReport> {
        let failure_policy = self
            .config
            .get_failure_policy()
            .await
            .map_err(config_error(config_keys::IMPORT_FAILURE_POLICY))?;
        let amount_policy = self
            .config
            .get_amount_policy()
            .await
            .map_err(config_error(config_keys::IMPORT_AMOUNT_POLICY))?;

        let total_rows = rows.len();
        if total_rows == 0 {
            warn!(batch_id = %batch_id, "文件无数据行");
            return Err(ImportError::EmptyBatch);
        }

        // === 步骤 2-3: 映射与对账 ===
        debug!(%failure_policy, %amount_policy, "步骤 2: 映射与对账");
        let mut reconciler = BatchReconciler::new(amount_policy);
        let mut rejections: Vec<RowRejection> = Vec::new();

        for raw in &rows {
            let outcome = self
                .row_mapper
                .map_row(raw)
                .and_then(|row| reconciler.apply(&row));

            match outcome {
                Ok(()) => {}
                Err(ImportError::MalformedRow { row, field, message })
                    if failure_policy == FailurePolicy::SkipInvalidRows =>
                {
                    warn!(row, field = %field, message = %message, "隔离错误行");
                    rejections.push(RowRejection {
                        row_number: row,
                        field,
                        message,
                    });
                }
                Err(e) => {
                    error!(batch_id = %batch_id, error = %e, "数据行错误，整批中止");
                    return Err(e);
                }
            }
        }

        let batch = reconciler.finish();
        let accepted_rows = batch.lines.len();
        info!(
            accepted_rows,
            rejected_rows = rejections.len(),
            stores = batch.stores.len(),
            customers = batch.customers.len(),
            products = batch.products.len(),
            invoices = batch.invoices.len(),
            "对账完成"
        );

        // === 步骤 4: 落库 ===
        let flush = if batch.is_empty() {
            warn!(batch_id = %batch_id, "所有数据行均被隔离，跳过落库");
            Default::default()
        } else {
            debug!("步骤 4: 落库");
            self.import_repo.flush_batch(&batch).await.map_err(|e| {
                error!(batch_id = %batch_id, error = %e, "批次落库失败");
                ImportError::from(e)
            })?
        };

        let report = ImportReport {
            batch_id,
            file_name,
            failure_policy,
            amount_policy,
            total_rows,
            accepted_rows,
            rejections,
            flush,
            elapsed_time: start_time.elapsed(),
        };

        // === 步骤 5: 记录批次 ===
        // 数据已提交，批次记录失败只告警
        if let Err(e) = self
            .import_repo
            .insert_batch(ImportBatch::from_report(&report, Utc::now()))
            .await
        {
            warn!(batch_id = %report.batch_id, error = %e, "批次记录写入失败");
        }

        info!(
            batch_id = %report.batch_id,
            total_rows = report.total_rows,
            accepted_rows = report.accepted_rows,
            rejected_rows = report.rejections.len(),
            inserted = report.flush.total_inserted(),
            elapsed_ms = report.elapsed_time.as_millis() as u64,
            "导入完成"
        );

        Ok(report)
    }
}

#[async_trait::async_trait]
impl<R, C> SalesImporter for SalesImporterImpl<R, C>
where
    R: SalesImportRepository + Send + Sync,
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, file_path), fields(batch_id))]
    async fn import_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let path = file_path.as_ref();
        info!(batch_id = %batch_id, file_path = %path.display(), "开始导入销售数据");

        let has_header = self
            .config
            .get_has_header()
            .await
            .map_err(config_error(config_keys::IMPORT_HAS_HEADER))?;

        // === 步骤 1: 解析文件 ===
        debug!(has_header, "步骤 1: 解析文件");
        let rows = self.file_parser.parse_to_rows(path, has_header).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        info!(total_rows = rows.len(), "文件解析完成");

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        self.run_pipeline(batch_id, rows, file_name, start_time).await
    }

    #[instrument(skip(self, rows), fields(batch_id))]
    async fn import_rows(
        &self,
        rows: Vec<RawSalesRow>,
        file_name: Option<String>,
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        self.run_pipeline(batch_id, rows, file_name, start_time).await
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Vec<Result<ImportReport, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.into_iter().map(|path| {
            let path_str = path.as_ref().display().to_string();
            async move {
                match self.import_file(path).await {
                    Ok(report) => {
                        info!(
                            file = %path_str,
                            inserted = report.flush.total_inserted(),
                            "文件导入成功"
                        );
                        Ok(report)
                    }
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("{}: {}", path_str, e))
                    }
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}
