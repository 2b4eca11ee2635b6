use clap::Parser;
use regear_bot::app::{server, ForumTrigger, KeepAlive, ThreadWatcher};
use regear_bot::config::cli::{Cli, Command, RunArgs};
use regear_bot::domain::ports::ChatPlatform;
use regear_bot::utils::error::{BotError, ErrorSeverity};
use regear_bot::utils::{logger, validation::Validate};
use regear_bot::{
    AlbionClient, BotConfig, CsvWorkbook, DiscordClient, RegearEngine, RegearJob, RegearPipeline,
    RegearSettings,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting regear-bot");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => fail(e),
    };

    let result = match cli.command {
        Some(Command::Run(args)) => run_once(settings, args).await,
        Some(Command::Serve) | None => serve(settings).await,
    };

    if let Err(e) = result {
        fail(e);
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> regear_bot::Result<RegearSettings> {
    let settings = match &cli.config {
        Some(path) => {
            tracing::info!("📄 Loading settings from {}", path.display());
            RegearSettings::from_file(path)?
        }
        None => RegearSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

fn fail(e: BotError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn run_once(settings: RegearSettings, args: RunArgs) -> regear_bot::Result<()> {
    let window = args.window(settings.window_hours)?;
    let store = CsvWorkbook::open(&args.workbook)?;
    let api = AlbionClient::new(&settings.api_base_url, settings.request_timeout())?;
    let engine = RegearEngine::new(RegearPipeline::new(api, store, settings));

    let job = RegearJob {
        window,
        label: args.label,
    };
    let report = engine.run(&job).await?;

    if !report.roster_fetched {
        tracing::warn!("⚠️ Guild roster could not be fetched; no losses were recorded");
    }
    println!("✅ Regear run '{}' completed", job.label);
    println!(
        "👥 Members matched: {} (skipped: {})",
        report.members_matched, report.members_skipped
    );
    println!("📝 Rows appended: {}", report.rows_appended);
    for (item, count) in &report.statistics {
        println!("   {:>4}  {}", count, item);
    }
    Ok(())
}

async fn serve(settings: RegearSettings) -> regear_bot::Result<()> {
    // 缺少必要的環境變數時直接結束
    let config = BotConfig::from_env(settings)?;
    config.validate()?;
    tracing::debug!("Bot config: {:?}", config);

    let settings = config.settings.clone();
    let chat: Arc<dyn ChatPlatform> = Arc::new(DiscordClient::new(
        &settings.discord_api_base_url,
        &config.discord_token,
        settings.request_timeout(),
    )?);

    let store = CsvWorkbook::open(&config.workbook_dir)?;
    let api = AlbionClient::new(&settings.api_base_url, settings.request_timeout())?;
    let engine = Arc::new(RegearEngine::new(RegearPipeline::new(
        api,
        store,
        settings.clone(),
    )));
    let trigger = ForumTrigger::new(config.forum_channel_id, engine, settings.window_hours);

    let keep_alive = KeepAlive::new(config.app_url.as_deref(), settings.keep_alive_interval())?;
    tokio::spawn(keep_alive.run());

    let http = tokio::spawn({
        let chat = Arc::clone(&chat);
        let listen_addr = config.listen_addr.clone();
        async move { server::serve(&listen_addr, chat).await }
    });

    let watcher = ThreadWatcher::new(chat, config.forum_channel_id, settings.thread_poll_interval());
    let watch = watcher.run(|event| {
        trigger.handle(event);
    });

    tokio::select! {
        result = watch => result,
        joined = http => joined.map_err(|e| BotError::ProcessingError {
            message: format!("HTTP server task stopped: {}", e),
        })?,
    }
}
