// ==========================================
// PU 切割仓储系统 - 命令行入口
// ==========================================
// 用法:
//   pu-stock [init|status|lotes|slot <code>|history <code>|find <op> <peca>]
// 数据库路径: PU_STOCK_DB_PATH 或默认用户数据目录
// 语言: PU_STOCK_LOCALE（zh-CN / en / pt-BR）
// ==========================================

use anyhow::{bail, Context};
use pu_stock::app::{get_default_db_path, AppState};
use pu_stock::logging;

fn main() -> anyhow::Result<()> {
    logging::init();
    pu_stock::i18n::init_from_env();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", pu_stock::APP_NAME, pu_stock::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path.clone())
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("打开数据库失败: {}", db_path))?;
    let api = &state.storage_api;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("status");

    match command {
        "init" => {
            println!("{}", pu_stock::i18n::t("common.success"));
        }
        "status" => {
            let availability = api.slot_availability()?;
            println!("{}", serde_json::to_string_pretty(&availability)?);
        }
        "lotes" => {
            for lote in api.list_open_lotes()? {
                println!("{}", lote.display);
            }
        }
        "slot" => {
            let code = args.get(1).context("缺少库位编码")?;
            let units = api.slot_details(code)?;
            println!("{}", serde_json::to_string_pretty(&units)?);
        }
        "history" => {
            let code = args.get(1).context("缺少库位编码")?;
            for log in state.action_log_repo.find_by_slot(code, 50)? {
                println!(
                    "{} {} {} {}",
                    log.action_ts,
                    log.action_type,
                    log.actor,
                    log.detail.unwrap_or_default()
                );
            }
        }
        "find" => {
            let order_id = args.get(1).context("缺少工单号")?;
            let piece_type = args.get(2).context("缺少件类型")?;
            match api.find_piece(order_id, piece_type)? {
                Some(unit) => println!("{}", serde_json::to_string_pretty(&unit)?),
                None => println!("-"),
            }
        }
        other => {
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}
