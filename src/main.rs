use std::io::stdin;
use std::path::PathBuf;
use std::time::SystemTime;

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use crate::board::Board;
use crate::uci::UciInterface;

mod board;
mod evaluate;
mod move_generator;
mod moves;
mod perft;
mod search;
mod uci;

#[derive(Parser)]
#[command(version, about = "A UCI chess engine")]
struct Cli {
    /// Verbosity of the log file
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    #[arg(long, default_value = "okapi-chess.log")]
    log_file: PathBuf,

    /// Run a perft to this depth from the starting position and exit
    #[arg(long)]
    perft: Option<u8>,
}

fn main() {
    let cli = Cli::parse();

    setup_logging(&cli);
    log_panics::init();

    if let Some(depth) = cli.perft {
        let board = Board::starting_position();
        for d in 1..=depth {
            board.run_perft(d, false);
        }
        return;
    }

    info!("OkapiChess started");

    let mut uci = UciInterface::default();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                uci.process_command(trimmed);
            }
            Err(err) => {
                error!("Failed to read from stdin: {err}");
                break;
            }
        }
    }

    debug!("stdin closed, exiting");
}

fn setup_logging(cli: &Cli) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(cli.log_level)
        .chain(std::io::stderr());

    match fern::log_file(&cli.log_file) {
        Ok(file) => dispatch = dispatch.chain(file),
        Err(err) => eprintln!("failed to open the log file {}: {err}", cli.log_file.display()),
    }

    if let Err(err) = dispatch.apply() {
        eprintln!("failed to initialize logging: {err}");
    }
}
