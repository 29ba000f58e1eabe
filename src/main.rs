use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use webhook_console::app::presenter;
use webhook_console::config::Command;
use webhook_console::utils::error::{ConsoleError, ErrorSeverity};
use webhook_console::utils::logger::{self, LogFormat};
use webhook_console::utils::validation::Validate;
use webhook_console::{
    ActionRouter, CliConfig, ConsoleConfig, HttpTransport, Session, SystemClipboard,
    SystemLauncher, TracingStatus,
};

fn report_error(e: &ConsoleError) {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 3,
        ErrorSeverity::Critical => 4,
    }
}

fn load_config(cli: &CliConfig) -> Result<ConsoleConfig, ConsoleError> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("📋 Loading configuration from {}", path);
            ConsoleConfig::from_file(path)?
        }
        None => ConsoleConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn run_shell(router: &ActionRouter, session: &mut Session) -> Result<(), ConsoleError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    println!("Type 'help' for the list of actions, 'exit' to quit.");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }

        // 單一動作的錯誤不會結束互動模式
        match router.dispatch(session, line).await {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => report_error(&e),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = CliConfig::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    tracing::info!("Starting webhook-console");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            report_error(&e);
            std::process::exit(exit_code(e.severity()));
        }
    };

    let transport = match HttpTransport::new(config.http.timeout()) {
        Ok(transport) => transport,
        Err(e) => {
            report_error(&e);
            std::process::exit(exit_code(ErrorSeverity::Critical));
        }
    };

    let mut session = Session::new(
        config,
        Arc::new(transport),
        Arc::new(TracingStatus),
        Box::new(SystemLauncher),
        Box::new(SystemClipboard),
    );
    if let Err(e) = presenter::clear_stale_documents(&session.temp_dir).await {
        tracing::warn!("Could not clean {}: {}", session.temp_dir.display(), e);
    }
    let router = ActionRouter::new();

    let result = match cli.command {
        Command::Shell => run_shell(&router, &mut session).await,
        Command::Run { action, args } => router
            .invoke(&mut session, &action, args)
            .await
            .map(|output| println!("{}", output)),
    };

    if let Err(e) = result {
        report_error(&e);
        std::process::exit(exit_code(e.severity()));
    }
}
