//! Start node: report every start trigger to the finish node

use anyhow::Result;
use finishline::{
    Clock, SensorBackend, SensorPoller, SystemClock, TimerConfig, send_start_timestamp,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli::StartArgs;

pub async fn run(config: TimerConfig, args: &StartArgs) -> Result<()> {
    config.validate()?;
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    if config.sensor.backend == SensorBackend::Simulated {
        return run_manual(args, &cancel).await;
    }

    let (sensor, _) = SensorPoller::from_config(&config.sensor, Arc::new(SystemClock))?;
    info!(target = %args.target, pin = config.sensor.pin, "Start node armed");

    loop {
        let Some(timestamp) = sensor.wait_for_trip(&cancel).await? else { break };
        send(args, timestamp).await;
        if args.once {
            break;
        }
        if sensor.wait_for_release(&cancel).await?.is_none() {
            break;
        }
    }
    Ok(())
}

/// Without hardware, every Enter on stdin is a start.
async fn run_manual(args: &StartArgs, cancel: &CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Press Enter to send a start to {}", args.target);

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        if line.is_none() {
            break;
        }
        send(args, SystemClock.now()).await;
        if args.once {
            break;
        }
    }
    Ok(())
}

async fn send(args: &StartArgs, timestamp: f64) {
    match send_start_timestamp(args.target, timestamp).await {
        Ok(()) => info!(timestamp, "Start sent"),
        Err(e) => error!("Start not delivered: {}", e),
    }
}
