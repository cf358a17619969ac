mod cli;

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use firewatch::{GatewayError, ServerConfig, SessionGate};
use firewatch_config::Config;
use firewatch_core::{EngineApi, RemoteEngine};

use crate::cli::{Cli, Command, ConfigCommand, GlobalOpts, ServeArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), GatewayError> {
    match cli.command {
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "firewatch", &mut std::io::stdout());
            Ok(())
        }

        Command::Config(ConfigCommand::Path) => {
            let path = cli
                .global
                .config
                .clone()
                .unwrap_or_else(firewatch_config::config_path);
            println!("{}", path.display());
            Ok(())
        }

        Command::Config(ConfigCommand::Show) => {
            let config = load(&cli.global)?;
            print!("{}", config.to_redacted_toml()?);
            Ok(())
        }

        Command::Check => {
            let config = load(&cli.global)?;
            init_tracing(cli.global.verbose, cli.global.log_json || config.logging.json);
            check(&config).await
        }

        Command::Serve(args) => {
            let config = apply_overrides(load(&cli.global)?, args)?;
            init_tracing(cli.global.verbose, cli.global.log_json || config.logging.json);
            serve(&config).await
        }
    }
}

fn load(global: &GlobalOpts) -> Result<Config, GatewayError> {
    Ok(firewatch_config::load_config(global.config.as_deref())?)
}

fn apply_overrides(mut config: Config, args: ServeArgs) -> Result<Config, GatewayError> {
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(url) = args.engine_url {
        config.engine.url = url;
    }
    config.validate()?;
    Ok(config)
}

async fn check(config: &Config) -> Result<(), GatewayError> {
    let engine_config = config.engine_config()?;
    let engine = RemoteEngine::connect(&engine_config)
        .map_err(|e| GatewayError::from_engine(&engine_config.url, e))?;
    let health = engine
        .status()
        .await
        .map_err(|e| GatewayError::from_engine(&engine_config.url, e))?;

    let rendered = serde_json::to_string_pretty(&health)
        .map_err(|e| GatewayError::Io(std::io::Error::other(e)))?;
    println!("{rendered}");
    Ok(())
}

async fn serve(config: &Config) -> Result<(), GatewayError> {
    let engine_config = config.engine_config()?;
    let engine = RemoteEngine::connect(&engine_config)
        .map_err(|e| GatewayError::from_engine(&engine_config.url, e))?;

    let token = firewatch_config::resolve_api_token(&config.auth);
    if token.is_none() {
        warn!("no API token configured, session gate is open");
    }

    let server_config = ServerConfig::from_config(config)?;
    let listen = server_config.listen;
    let handle = firewatch::start(server_config, Arc::new(engine), SessionGate::new(token))
        .await
        .map_err(|source| GatewayError::Bind {
            addr: listen,
            source,
        })?;

    let stopped = handle.shutdown_token();
    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        () = stopped.cancelled() => {}
    }
    handle.shutdown().await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
