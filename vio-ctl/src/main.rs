//! # VIO Controller
//!
//! Command line controller for the Analog Way VIO 4K.
//!
//! ## Overview
//!
//! Connects to the VIO, waits for the connection handshake and then either sends a
//! single action given on the command line or reads actions from stdin, one per line,
//! until stdin is closed or Ctrl-C is pressed.
mod actions;

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use tokio::io::{AsyncBufReadExt, BufReader};
use vio_client::{
    LogHost,
    link::{Builder, DeviceLink},
};
use vio_protocol::DEFAULT_PORT;

use crate::actions::{ActionCommand, ActionLine};

#[derive(Parser)]
#[command(about = "Controller for the Analog Way VIO 4K", long_about=None)]
struct Args {
    #[arg(long, default_value = "192.168.2.140", help = "IP address of the VIO")]
    host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "VIO 4K", help = "Name used in messages")]
    label: String,

    #[arg(long, help = "Connect timeout in milliseconds")]
    connect_timeout_ms: Option<u64>,

    #[arg(
        long,
        default_value = "500",
        help = "How long to wait for responses in milliseconds"
    )]
    settle_ms: u64,

    #[clap(subcommand)]
    action: Option<ActionCommand>,
}

/// Handles everything the device sends during `duration`.
async fn settle(link: &mut DeviceLink<LogHost>, duration: Duration) {
    let _ = tokio::time::timeout(duration, async {
        // stop once the connection is gone
        while let Ok(1..) = link.poll().await {}
    })
    .await;
}

async fn execute(link: &mut DeviceLink<LogHost>, action: &ActionCommand) -> Result<(), Box<dyn Error>> {
    let command = action.command()?;
    if !link.send(command.clone()).await {
        return Err(format!("Could not send '{}'", command).into());
    }
    log::info!("Sent '{}'", command);
    Ok(())
}

async fn interactive(link: &mut DeviceLink<LogHost>) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ActionLine::parse_line(&line) {
                    Ok(action) => {
                        if let Err(err) = execute(link, &action).await {
                            log::error!("{}", err);
                        }
                    }
                    Err(err) => {
                        let _ = err.print();
                    }
                }
            }
            chunk = link.read_chunk() => {
                // read errors are reported by the link itself
                if let Ok(chunk) = chunk {
                    link.on_bytes(&chunk).await;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Parsed arguments: host={}, port={}", args.host, args.port);

    let mut builder = Builder::new()
        .host(args.host.as_str())
        .port(args.port)
        .label(args.label.as_str());
    if let Some(timeout) = args.connect_timeout_ms {
        builder = builder.connect_timeout(Duration::from_millis(timeout));
    }
    let mut link = builder.build(LogHost);
    let settle_time = Duration::from_millis(args.settle_ms);

    link.connect().await?;
    settle(&mut link, settle_time).await;
    if !link.is_connected() {
        return Err(format!("{} closed the connection during the handshake", args.label).into());
    }
    if let Some(model) = link.identity().model_name() {
        log::info!("Connected to {}", model);
    }

    match args.action {
        Some(action) => {
            execute(&mut link, &action).await?;
            settle(&mut link, settle_time).await;
        }
        None => interactive(&mut link).await?,
    }

    link.destroy().await;
    Ok(())
}
