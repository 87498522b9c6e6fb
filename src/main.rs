// ==========================================
// 销售发票管理系统 - 命令行主入口
// ==========================================
// 用法:
//   sales-invoicing import <file>...
//   sales-invoicing batches [limit]
//   sales-invoicing invoices [limit] [offset]
//   sales-invoicing invoice <code>
//   sales-invoicing report <year>|products|groups|monthly <year>|export [limit] [offset]
//   sales-invoicing config [key value]
//
// 数据库路径: 环境变量 SALES_INVOICING_DB_PATH 或用户数据目录
// 结果以 JSON 输出到 stdout，日志输出到 stderr
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use sales_invoicing::app::{get_default_db_path, AppState};
use sales_invoicing::logging;
use serde::Serialize;

const USAGE: &str = "用法: sales-invoicing <import|batches|invoices|invoice|report|config> [参数...]";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let db_path = get_default_db_path();
    tracing::info!("{} v{}，使用数据库: {}", sales_invoicing::APP_NAME, sales_invoicing::VERSION, db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command.as_str() {
        "import" => {
            if rest.is_empty() {
                bail!("import 需要至少一个文件路径");
            }
            if rest.len() == 1 {
                print_json(&state.import_api.import_file(&rest[0]).await?)
            } else {
                print_json(&state.import_api.batch_import(rest.to_vec()).await?)
            }
        }
        "batches" => {
            let limit = parse_arg(rest.first(), 20usize, "limit")?;
            print_json(&state.import_api.list_recent_batches(limit).await?)
        }
        "invoices" => {
            let limit = parse_arg(rest.first(), 50i64, "limit")?;
            let offset = parse_arg(rest.get(1), 0i64, "offset")?;
            print_json(&state.invoice_api.list_invoices(limit, offset)?)
        }
        "invoice" => {
            let code = rest.first().context("invoice 需要发票编码")?;
            print_json(&state.invoice_api.get_invoice_detail(code)?)
        }
        "report" => run_report(&state, rest),
        "config" => match rest {
            [] => print_json(&state.config_api.get_config_snapshot()?),
            [key, value] => {
                state.config_api.update_config(key, value)?;
                print_json(&state.config_api.get_config_snapshot()?)
            }
            _ => bail!("config 需要 0 个或 2 个参数: [key value]"),
        },
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }
}

fn run_report(state: &AppState, rest: &[String]) -> Result<()> {
    let kind = rest.first().map(String::as_str).unwrap_or("products");
    match kind {
        "products" => print_json(&state.report_api.sales_by_product()?),
        "groups" => print_json(&state.report_api.customer_group_distribution()?),
        "monthly" => {
            let year = rest
                .get(1)
                .context("monthly 需要年份")?
                .parse::<i32>()
                .context("年份格式错误")?;
            print_json(&state.report_api.monthly_revenue(year)?)
        }
        "export" => {
            let limit = parse_arg(rest.get(1), 100i64, "limit")?;
            let offset = parse_arg(rest.get(2), 0i64, "offset")?;
            print_json(&state.report_api.invoice_export_rows(limit, offset)?)
        }
        // report <year> 等同 report monthly <year>
        other => match other.parse::<i32>() {
            Ok(year) => print_json(&state.report_api.monthly_revenue(year)?),
            Err(_) => bail!("未知报表: {}", other),
        },
    }
}

fn parse_arg<T>(arg: Option<&String>, default: T, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match arg {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("参数 {} 格式错误: {}", name, raw)),
        None => Ok(default),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
