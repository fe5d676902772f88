use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod rules;
mod services;
mod store;
mod utils;

use config::Settings;
use rules::RuleSet;
use services::{create_window_system, WindowKeeper};
use store::TomlStore;

#[derive(Parser, Debug)]
#[command(name = "restore-window-position")]
#[command(about = "Запоминает положение окон и восстанавливает его при повторном открытии")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Режим сухого запуска (эмулированный рабочий стол, окна не двигаются)
    #[arg(long)]
    dry_run: bool,

    /// Печатать заголовки всех открытых окон на каждом тике
    #[arg(long)]
    list_windows: bool,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    info!("Запуск restore-window-position v{}", env!("CARGO_PKG_VERSION"));

    // Без файла конфигурации работать не с чем
    let settings = Settings::load(&args.config)?;
    let store = TomlStore::open(&args.config)
        .with_context(|| format!("Не удалось открыть конфигурацию {}", args.config))?;

    let rules = RuleSet::load(&store);
    if rules.is_empty() {
        warn!("В конфигурации нет ни одной секции окна, отслеживать нечего");
    }

    if args.dry_run {
        warn!("Режим сухого запуска - реальные окна не перемещаются");
    } else {
        utils::session::check_display()?;
    }

    let system = create_window_system(args.dry_run, rules.needs_child_windows())
        .await
        .context("Оконная система недоступна")?;

    let keeper = WindowKeeper::new(&settings, rules, Box::new(store), system, args.list_windows);
    info!("Все компоненты инициализированы");

    keeper
        .run(async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
        })
        .await?;

    info!("restore-window-position завершил работу");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
