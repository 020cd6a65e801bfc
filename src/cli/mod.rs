//! Command-line interface for Optima.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use console::style;
use tracing::debug;

use crate::domain::errors::{SessionError, ValidationErrors};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use commands::CommandContext;

/// Run a parsed command line and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let json = cli.json;
    let settings = match ConfigLoader::load() {
        Ok(settings) => settings,
        Err(err) => return handle_error(&err, json),
    };

    let result = match cli.command {
        Commands::Server => commands::server::execute(settings).await,
        command => {
            let _logger = match LogConfig::for_cli(&settings.logging, cli.debug)
                .and_then(|config| LoggerImpl::init(&config))
            {
                Ok(logger) => Some(logger),
                Err(e) => {
                    eprintln!("Failed to initialize logging: {e:#}");
                    None
                }
            };
            let ctx = CommandContext::new(settings, json);
            forward_interrupts(&ctx);
            dispatch(command, &ctx).await
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => handle_error(&err, json),
    }
}

async fn dispatch(command: Commands, ctx: &CommandContext) -> anyhow::Result<i32> {
    match command {
        Commands::Run(args) => commands::run::execute(args, ctx).await,
        Commands::Monitor(args) => commands::monitor::execute(args, ctx).await,
        Commands::Kill(args) => commands::kill::execute(args, ctx).await,
        Commands::Lint(args) => commands::lint::execute(args, ctx.json).await,
        Commands::Status(args) => commands::status::execute(args, ctx).await,
        Commands::Server => anyhow::bail!("`server` must be started by `optima run`"),
    }
}

/// The first Ctrl-C stops waiting or following; a second one exits.
fn forward_interrupts(ctx: &CommandContext) {
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        debug!("Interrupt received, detaching from the job");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Print an error the way the invocation asked for and pick the exit code.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> i32 {
    let code = err.downcast_ref::<SessionError>().map_or(1, SessionError::exit_code);

    if json_mode {
        let violations = err
            .downcast_ref::<SessionError>()
            .and_then(|e| match e {
                SessionError::Validation(errors) => Some(errors),
                _ => None,
            })
            .or_else(|| err.downcast_ref::<ValidationErrors>())
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "reason": e.reason }))
                    .collect::<Vec<_>>()
            });
        let mut body = serde_json::json!({
            "error": format!("{err:#}"),
            "exit_code": code,
        });
        if let Some(violations) = violations {
            body["violations"] = serde_json::Value::Array(violations);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );
    } else {
        eprintln!("{} {err:#}", style("Error:").red().bold());
    }
    code
}
