// ==========================================
// 销售数据导入 API 集成测试
// ==========================================
// 测试范围:
// 1. CSV / Excel 导入落库
// 2. 重复导入幂等
// 3. 失败策略: ABORT_BATCH 整批不落库 / SKIP_INVALID_ROWS 隔离错误行
// 4. 金额策略: UNIT_PRICE / LINE_TOTAL
// ==========================================

mod test_helpers;

use rust_decimal::Decimal;
use sales_invoicing::api::ApiError;
use sales_invoicing::config::config_keys;
use sales_invoicing::domain::EntityKind;
use std::str::FromStr;
use test_helpers::*;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ==========================================
// 基础导入
// ==========================================

#[tokio::test]
async fn test_import_csv_single_row_creates_all_entities() {
    let (_db, state) = create_test_state().expect("创建测试环境失败");
    let file = write_sales_csv(&[SalesRowBuilder::new().build()]).unwrap();

    let report = state
        .import_api
        .import_file(&path_of(&file))
        .await
        .expect("导入失败");

    assert_eq!(report.total_rows, 1);
    assert_eq!(report.accepted_rows, 1);
    assert!(report.rejections.is_empty());
    for entity in [
        EntityKind::Store,
        EntityKind::CustomerGroup,
        EntityKind::Customer,
        EntityKind::ProductCategory,
        EntityKind::Product,
        EntityKind::Invoice,
        EntityKind::InvoiceLine,
    ] {
        assert_eq!(report.flush.counts(entity).inserted, 1, "{:?}", entity);
    }

    let detail = state.invoice_api.get_invoice_detail("B000000001").unwrap();
    assert_eq!(detail.invoice.store_code, "S1");
    assert_eq!(detail.invoice.customer_code, "C1");
    assert_eq!(detail.invoice.year, 2023);
    assert_eq!(detail.invoice.month, 5);
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].line.quantity, 3);
    // 默认 UNIT_PRICE: 金额列即单价
    assert_eq!(detail.lines[0].unit_price, dec("9"));
    assert_eq!(detail.total_price, dec("27"));
}

#[tokio::test]
async fn test_reimport_same_file_inserts_nothing() {
    let (_db, state) = create_test_state().unwrap();
    let rows = vec![
        SalesRowBuilder::new().build(),
        SalesRowBuilder::new().product("PR2").quantity("2").amount("1.5").build(),
    ];
    let file = write_sales_csv(&rows).unwrap();

    let first = state.import_api.import_file(&path_of(&file)).await.unwrap();
    assert_eq!(first.flush.invoice_lines.inserted, 2);

    let second = state.import_api.import_file(&path_of(&file)).await.unwrap();
    assert_eq!(second.flush.total_inserted(), 0);
    assert_eq!(second.flush.invoice_lines.skipped, 2);

    let page = state.invoice_api.list_invoices(10, 0).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.invoices[0].line_count, 2);
}

#[tokio::test]
async fn test_first_occurrence_wins_within_batch() {
    let (_db, state) = create_test_state().unwrap();
    let rows = vec![
        SalesRowBuilder::new().amount("9.0").build(),
        SalesRowBuilder::new().quantity("1").amount("100").build(),
    ];
    let file = write_sales_csv(&rows).unwrap();

    state.import_api.import_file(&path_of(&file)).await.unwrap();

    let products = state.catalog_api.list_products().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].unit_price, dec("9"));

    let detail = state.invoice_api.get_invoice_detail("B000000001").unwrap();
    assert_eq!(detail.lines.len(), 2);
    assert_eq!(detail.lines[1].line.line_no, 2);
    assert_eq!(detail.lines[1].line.subtotal, dec("9"));
}

// ==========================================
// 失败策略
// ==========================================

#[tokio::test]
async fn test_abort_batch_on_non_numeric_quantity() {
    let (_db, state) = create_test_state().unwrap();
    let rows = vec![
        SalesRowBuilder::new().build(),
        SalesRowBuilder::new().product("PR2").quantity("abc").build(),
    ];
    let file = write_sales_csv(&rows).unwrap();

    let err = state
        .import_api
        .import_file(&path_of(&file))
        .await
        .expect_err("应当整批失败");

    match err {
        ApiError::MalformedRow { row, field, .. } => {
            // 表头占第 1 行
            assert_eq!(row, 3);
            assert_eq!(field, "quantity");
        }
        other => panic!("错误类型不符: {:?}", other),
    }

    assert_eq!(state.invoice_api.list_invoices(10, 0).unwrap().total, 0);
    assert!(state.catalog_api.list_stores().unwrap().is_empty());
    assert!(state.catalog_api.list_products().unwrap().is_empty());
    assert!(state.import_api.list_recent_batches(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_skip_invalid_rows_quarantines_bad_row() {
    let (_db, state) = create_test_state().unwrap();
    state
        .config_api
        .update_config(config_keys::IMPORT_FAILURE_POLICY, "SKIP_INVALID_ROWS")
        .unwrap();

    let rows = vec![
        SalesRowBuilder::new().build(),
        SalesRowBuilder::new().invoice("B000000002").month("13").build(),
        SalesRowBuilder::new().product("PR2").build(),
    ];
    let file = write_sales_csv(&rows).unwrap();

    let report = state.import_api.import_file(&path_of(&file)).await.unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.accepted_rows, 2);
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].row_number, 3);
    assert_eq!(report.rejections[0].field, "month");

    let page = state.invoice_api.list_invoices(10, 0).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.invoices[0].invoice.invoice_code, "B000000001");

    let batches = state.import_api.list_recent_batches(10).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].rejected_rows, 1);
    assert_eq!(batches[0].batch_id, report.batch_id);
}

#[tokio::test]
async fn test_line_total_policy_derives_unit_price() {
    let (_db, state) = create_test_state().unwrap();
    state
        .config_api
        .update_config(config_keys::IMPORT_AMOUNT_POLICY, "LINE_TOTAL")
        .unwrap();

    let file = write_sales_csv(&[SalesRowBuilder::new().build()]).unwrap();
    state.import_api.import_file(&path_of(&file)).await.unwrap();

    let detail = state.invoice_api.get_invoice_detail("B000000001").unwrap();
    assert_eq!(detail.lines[0].unit_price, dec("3"));
    assert_eq!(detail.lines[0].line.subtotal, dec("9"));
}

/// 单价 × 数量超出金额表示范围的行
fn overflowing_row() -> Vec<String> {
    SalesRowBuilder::new()
        .invoice("B000000002")
        .product("PR9")
        .quantity("2")
        .amount("79228162514264337593543950335")
        .build()
}

#[tokio::test]
async fn test_overflowing_subtotal_aborts_batch() {
    let (_db, state) = create_test_state().unwrap();
    let file = write_sales_csv(&[SalesRowBuilder::new().build(), overflowing_row()]).unwrap();

    let err = state
        .import_api
        .import_file(&path_of(&file))
        .await
        .expect_err("应当整批失败");

    match err {
        ApiError::MalformedRow { row, field, .. } => {
            assert_eq!(row, 3);
            assert_eq!(field, "amount");
        }
        other => panic!("错误类型不符: {:?}", other),
    }
    assert_eq!(state.invoice_api.list_invoices(10, 0).unwrap().total, 0);
    assert!(state.catalog_api.list_products().unwrap().is_empty());
}

#[tokio::test]
async fn test_overflowing_subtotal_quarantined_in_skip_mode() {
    let (_db, state) = create_test_state().unwrap();
    state
        .config_api
        .update_config(config_keys::IMPORT_FAILURE_POLICY, "SKIP_INVALID_ROWS")
        .unwrap();

    let file = write_sales_csv(&[SalesRowBuilder::new().build(), overflowing_row()]).unwrap();
    let report = state.import_api.import_file(&path_of(&file)).await.unwrap();

    assert_eq!(report.accepted_rows, 1);
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].row_number, 3);
    assert_eq!(report.rejections[0].field, "amount");

    // 被隔离的行不留下商品与发票
    let products = state.catalog_api.list_products().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product_code, "PR1");
    assert_eq!(state.invoice_api.list_invoices(10, 0).unwrap().total, 1);
}

// ==========================================
// 文件层错误与 Excel
// ==========================================

#[tokio::test]
async fn test_import_missing_file_is_invalid_input() {
    let (_db, state) = create_test_state().unwrap();

    let err = state
        .import_api
        .import_file("/nonexistent/sales.csv")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_import_header_only_file_fails() {
    let (_db, state) = create_test_state().unwrap();
    let file = write_sales_csv(&[]).unwrap();

    let result = state.import_api.import_file(&path_of(&file)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_import_xlsx_file() {
    use rust_xlsxwriter::Workbook;

    let (_db, state) = create_test_state().unwrap();
    let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, title) in SALES_HEADER.iter().enumerate() {
        sheet.write_string(0, col as u16, *title).unwrap();
    }
    let texts = [
        (0u16, "E1"),
        (1, "S9"),
        (2, "Addr"),
        (5, "B000000100"),
        (6, "G1"),
        (7, "GroupInfo"),
        (8, "C9"),
        (9, "P1"),
        (11, "PR9"),
        (12, "Gadget"),
        (13, "pcs"),
    ];
    for (col, value) in texts {
        sheet.write_string(1, col, value).unwrap();
    }
    sheet.write_number(1, 3, 2024).unwrap();
    sheet.write_number(1, 4, 2).unwrap();
    sheet.write_number(1, 14, 4).unwrap();
    sheet.write_number(1, 15, 2.5).unwrap();
    workbook.save(file.path()).unwrap();

    let report = state.import_api.import_file(&path_of(&file)).await.unwrap();
    assert_eq!(report.accepted_rows, 1);

    let detail = state.invoice_api.get_invoice_detail("B000000100").unwrap();
    assert_eq!(detail.invoice.year, 2024);
    assert_eq!(detail.invoice.month, 2);
    assert_eq!(detail.lines[0].line.quantity, 4);
    assert_eq!(detail.total_price, dec("10"));
}

#[tokio::test]
async fn test_batch_import_files_are_independent() {
    let (_db, state) = create_test_state().unwrap();
    let good = write_sales_csv(&[SalesRowBuilder::new().build()]).unwrap();
    let bad = write_sales_csv(&[SalesRowBuilder::new()
        .invoice("B000000002")
        .quantity("x")
        .build()])
    .unwrap();

    let items = state
        .import_api
        .batch_import(vec![path_of(&good), path_of(&bad)])
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(items[0].report.is_some());
    assert!(items[0].error.is_none());
    assert!(items[1].report.is_none());
    assert!(items[1].error.is_some());

    assert_eq!(state.invoice_api.list_invoices(10, 0).unwrap().total, 1);
}
