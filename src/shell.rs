// Line-oriented stand-in for the menu: one word per command on stdin

use anyhow::Result;
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::sentinel::Sentinel;

const USAGE: &str = "Commands: capture | pause | video | check | status | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Capture,
    Pause,
    Video,
    Check,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "capture" | "start" => Some(Command::Capture),
            "pause" | "stop" => Some(Command::Pause),
            "video" | "timelapse" => Some(Command::Video),
            "check" => Some(Command::Check),
            "status" => Some(Command::Status),
            "help" | "?" => Some(Command::Help),
            "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

// Dispatches commands until `quit` or end of input, then stops capturing.
pub async fn run<R>(sentinel: &Sentinel, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("{}", USAGE);

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(command) = Command::parse(&line) else {
            println!("Unknown command: {}", line.trim());
            println!("{}", USAGE);
            continue;
        };

        debug!("Shell command {:?}", command);
        match command {
            Command::Capture => sentinel.start(),
            Command::Pause => sentinel.stop(),
            Command::Video => {
                sentinel.build_timelapses();
            }
            Command::Check => {
                sentinel.check_now();
            }
            Command::Status => {
                let status = sentinel.status();
                println!(
                    "capturing: {}, distracted: {}, escalation checks: {}",
                    status.capturing, status.distracted, status.escalating
                );
            }
            Command::Help => println!("{}", USAGE),
            Command::Quit => break,
        }
    }

    sentinel.stop();
    Ok(())
}
