//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod command;
mod config;
mod error;

use clap::{App, Arg};
use config::{Config, LoggingFileRotation, LoggingFmtStyle};
use ribd_routing::Master;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

fn init_tracing(config: &config::Logging) {
    // Enable logging to a file.
    let file = config.file.enabled.then(|| {
        let file_appender = match config.file.rotation {
            LoggingFileRotation::Never => {
                rolling::never(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Hourly => {
                rolling::hourly(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Daily => {
                rolling::daily(&config.file.dir, &config.file.name)
            }
        };

        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(false)
            .with_thread_ids(config.file.fmt.show_thread_id)
            .with_file(config.file.fmt.show_source)
            .with_line_number(config.file.fmt.show_source)
            .with_ansi(config.file.fmt.colors);
        let layer = match config.file.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    // Enable logging to stdout. Command output goes to stdout too, so the
    // log events are written to stderr.
    let stdout = config.stdout.enabled.then(|| {
        let log_level_filter = LevelFilter::from_level(tracing::Level::TRACE);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(config.stdout.fmt.show_thread_id)
            .with_file(config.stdout.fmt.show_source)
            .with_line_number(config.stdout.fmt.show_source)
            .with_ansi(config.stdout.fmt.colors);
        let layer = match config.stdout.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(log_level_filter)
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("ribd=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file)
        .with(stdout)
        .init();
}

// Builds the RIB manager from the daemon configuration, attaching the VRFs
// and interfaces known at startup.
fn init_master(config: &Config) -> Master {
    let mut master = Master::new(config.rib_config());

    for vrf in &config.vrfs {
        master.vrf_add(&vrf.name, vrf.table);
        if let Some(id) = vrf.id
            && let Err(error) = master.vrf_enable(&vrf.name, id)
        {
            error.log();
        }
    }
    for iface in &config.interfaces {
        if let Err(error) = master.interface_add(
            &iface.vrf,
            &iface.name,
            iface.ifindex,
            &iface.addresses,
        ) {
            error.log();
        }
    }

    master
}

// Executes the commands of the startup configuration file.
fn load_startup_config(master: &mut Master, path: &str) {
    let config = match std::fs::read_to_string(path) {
        Ok(config) => config,
        Err(error) => {
            error!(%path, %error, "failed to load startup configuration");
            return;
        }
    };

    for line in config.lines().filter_map(command::normalize_input_line) {
        if let Err(error) = command::execute(master, &line) {
            warn!(command = %line, "invalid startup configuration command");
            error.log();
        }
    }
}

fn signal_listener() -> mpsc::Receiver<()> {
    let (signal_tx, signal_rx) = mpsc::channel(1);

    tokio::task::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).unwrap();
        let mut sigterm = signal(SignalKind::terminate()).unwrap();

        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT");
                let _ = signal_tx.send(()).await;
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                let _ = signal_tx.send(()).await;
            }
        }
    });

    signal_rx
}

// Reads commands from stdin, one per line, until EOF or a termination
// signal.
async fn run(mut master: Master, mut signal_rx: mpsc::Receiver<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(error) => {
                        error!(%error, "failed to read command");
                        break;
                    }
                };
                let Some(line) = command::normalize_input_line(&line) else {
                    continue;
                };

                let output = match command::execute(&mut master, &line) {
                    Ok(output) => output,
                    Err(error) => {
                        error.log();
                        format!("{}\n", error.cli_message())
                    }
                };
                if let Err(error) = stdout.write_all(output.as_bytes()).await {
                    error!(%error, "failed to write command output");
                    break;
                }
                let _ = stdout.flush().await;
            }
            _ = signal_rx.recv() => break,
        }
    }
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let matches = App::new("RIB manager daemon")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    // Read configuration file.
    let config_file = matches.value_of("config");
    let config = Config::load(config_file);

    // Initialize tracing.
    init_tracing(&config.logging);

    // Initialize the RIB manager.
    let mut master = init_master(&config);
    if let Some(path) = &config.startup_config {
        load_startup_config(&mut master, path);
    }

    // We're ready to go!
    info!("starting up");

    // Main loop.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(async {
            let signal_rx = signal_listener();
            run(master, signal_rx).await;
        });

    info!("exiting");
}
