mod cli;
mod error;
mod server;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ponwatch_config::Runtime;
use ponwatch_core::{
    AcquisitionService, CacheBackend, MemoryCache, PageRequest, PortCoordinate, RedisCache,
    RedisSettings, SweepScheduler, TerminalMetrics,
};
use ponwatch_snmp::SnmpClient;

use crate::cli::{Cli, Command, LogFormat, PortArgs};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose, cli.global.log_format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let runtime = ponwatch_config::load(&cli.global.config)?.into_runtime()?;
    if matches!(cli.command, Command::CheckConfig) {
        println!(
            "{}: {} port profiles, sweep {:?} x {:?}",
            cli.global.config.display(),
            runtime.resolver.len(),
            runtime.sweep.range.boards,
            runtime.sweep.range.pons,
        );
        return Ok(());
    }

    let Runtime {
        snmp,
        cache_enabled,
        redis,
        resolver,
        acquisition,
        sweep_enabled,
        sweep,
        listen,
    } = runtime;

    let cache = connect_cache(cache_enabled, &redis).await;
    info!(cache = cache.kind(), ports = resolver.len(), "acquisition service ready");
    let service = Arc::new(AcquisitionService::new(
        SnmpClient::new(snmp),
        cache,
        resolver,
        acquisition,
    ));

    match cli.command {
        Command::Serve => {
            let metrics = Arc::new(TerminalMetrics::new()?);
            let cancel = CancellationToken::new();
            tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

            let sweeper = sweep_enabled.then(|| {
                Arc::new(SweepScheduler::new(Arc::clone(&service), Arc::clone(&metrics), sweep))
                    .spawn(cancel.clone())
            });

            let served = server::serve(listen, metrics, cancel.clone()).await;
            cancel.cancel();
            if let Some(handle) = sweeper {
                if let Err(e) = handle.await {
                    warn!(error = %e, "sweep task ended abnormally");
                }
            }
            served
        }
        Command::Port(port) => print_json(&service.list_port(coordinate(port)).await?),
        Command::Onu(args) => {
            let identity = coordinate(args.port).terminal(args.onu_id);
            print_json(&service.get_terminal(identity).await?)
        }
        Command::FreeSlots { port, refresh } => {
            let port = coordinate(port);
            let slots = if refresh {
                service.refresh_free_slots(port).await?
            } else {
                service.free_slots(port).await?
            };
            print_json(&slots)
        }
        Command::Serials(port) => print_json(&service.list_ids_with_serial(coordinate(port)).await?),
        Command::Page { port, page, size } => {
            let request = PageRequest::clamped(page, size);
            print_json(&service.list_port_paged(coordinate(port), request).await?)
        }
        Command::CheckConfig => Ok(()),
    }
}

/// Redis when enabled and reachable, otherwise the in-process store.
async fn connect_cache(enabled: bool, settings: &RedisSettings) -> CacheBackend {
    if !enabled {
        info!("redis disabled, using in-process cache");
        return CacheBackend::Memory(MemoryCache::new());
    }
    match RedisCache::connect(settings).await {
        Ok(cache) => {
            info!(host = %settings.host, port = settings.port, "connected to redis");
            CacheBackend::Redis(cache)
        }
        Err(e) => {
            warn!(error = %e, "redis unavailable, using in-process cache");
            CacheBackend::Memory(MemoryCache::new())
        }
    }
}

async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, shutting down"),
        Err(e) => {
            warn!(error = %e, "cannot listen for interrupt");
            return;
        }
    }
    cancel.cancel();
}

fn coordinate(port: PortArgs) -> PortCoordinate {
    PortCoordinate::new(port.board, port.pon)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::Output)?;
    println!("{rendered}");
    Ok(())
}
