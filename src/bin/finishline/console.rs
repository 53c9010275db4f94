//! Interactive console for the finish node
//!
//! Reads operator commands from stdin and prints race events on stdout:
//!
//! ```text
//! start <name>   begin an attempt
//! stop           cancel the attempt in progress
//! load <path>    load a leaderboard file and keep saving to it
//! reset          wipe the leaderboard (asks for confirmation)
//! show           print the leaderboard
//! trip           trigger the simulated finish sensor
//! quit           exit
//! ```

use anyhow::Result;
use finishline::{
    Finishline, Level, RaceCommand, RaceEvent, RenderedRow, SimulatedPin, TimerConfig,
};
use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, warn};

const HELP: &str = "commands: start <name> | stop | load <path> | reset | show | trip | quit";

pub async fn run(config: TimerConfig) -> Result<()> {
    let active_level = config.sensor.active_level;
    let node = Finishline::launch(&config)?;
    let timekeeper = node.timekeeper;
    let mut events = Box::pin(timekeeper.events());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    print_table(&timekeeper.refresh());
    println!("Listening for the start node on {}", config.signal.socket_addr());
    println!("{}", HELP);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                timekeeper.cancel();
                break;
            }
            Some(event) = events.next() => print_event(&event),
            line = input.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
                let command = match verb {
                    "start" => RaceCommand::StartRequested { competitor: rest.to_string() },
                    "stop" | "cancel" => RaceCommand::CancelRequested,
                    "load" => RaceCommand::ManualLoadRequested { path: rest.trim().into() },
                    "reset" => {
                        if !confirm(&mut input).await? {
                            println!("Reset aborted");
                            continue;
                        }
                        RaceCommand::ResetRequested
                    }
                    "show" => {
                        print_table(&timekeeper.refresh());
                        continue;
                    }
                    "trip" => {
                        trip(node.simulated_pin.as_ref(), active_level);
                        continue;
                    }
                    "quit" | "exit" => break,
                    _ => {
                        println!("{}", HELP);
                        continue;
                    }
                };
                // Failures are printed from the event stream
                if let Err(e) = timekeeper.handle(command) {
                    debug!("Command rejected: {}", e);
                }
            }
        }
    }

    Ok(())
}

async fn confirm(input: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
    println!("Delete the whole leaderboard? [y/N]");
    let answer = input.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "si" | "s"))
}

fn trip(pin: Option<&SimulatedPin>, active_level: Level) {
    let Some(pin) = pin else {
        warn!("'trip' only works with the simulated sensor (--simulate)");
        return;
    };
    pin.set_level(active_level);
    let pin = pin.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        pin.set_level(active_level.inverted());
    });
}

fn print_event(event: &RaceEvent) {
    match event {
        RaceEvent::RaceStatusChanged(state) => println!("[race] {}", state),
        RaceEvent::LeaderboardUpdated(rows) => print_table(rows),
        RaceEvent::ValidationFailed(reason) => println!("[rejected] {}", reason),
        RaceEvent::Warning(message) => println!("[warning] {}", message),
    }
}

fn print_table(rows: &[RenderedRow]) {
    println!(
        "{:>3}   {:<20} {:>10} {:>10} {:>10}",
        "Pos", "Competitor", "Time (s)", "Prev.", "1st"
    );
    for row in rows {
        println!("{}", row);
    }
    if rows.is_empty() {
        println!("  (no times yet)");
    }
}
