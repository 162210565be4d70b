mod alias;
mod builtin;
mod compiler;
mod error;
mod eval;
mod fd;
mod global;
mod history;
mod job;
mod parser;
mod search;
mod settings;
mod tilde;
mod types;


use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::LevelFilter;
use nix::sys::signal::{self, SigHandler};

use builtin::Flow;
use global::State;
use job::ForkLauncher;
use settings::{Settings, SETTINGS_FILE};

/// Interactive shell with pipes, redirection, aliases and builtins.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
	/// Settings file read at startup and written at exit
	/// [default: psh.toml in the starting directory].
	#[arg(long, short)]
	config: Option<PathBuf>,

	/// Log debug output to stderr.
	#[arg(long, short)]
	verbose: bool,
}

fn init_logging(verbose: bool) {
	let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
	let mut builder = env_logger::Builder::from_env(Env::new().filter_or("PSH_LOG", default_level.as_str()));
	builder.format_timestamp_millis();
	let _ = builder.try_init();
}

fn ignore_job_signals() {
	for &sig in job::SHELL_IGNORED.iter() {
		if let Err(e) = unsafe { signal::signal(sig, SigHandler::SigIgn) } {
			log::warn!("cannot ignore {}: {}", sig, e);
		}
	}
}

/// `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
	let mut buf: Vec<u8> = vec![];
	if input.read_until(b'\n', &mut buf)? == 0 {
		return Ok(None);
	}
	let line = String::from_utf8_lossy(&buf);
	Ok(Some(line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_owned()))
}

/// Replaces a `cmd\\` line with its best history match once the user
/// confirms it.
fn complete_from_history<R: BufRead>(state: &State, line: &str, input: &mut R) -> io::Result<Option<String>> {
	let candidate = match state.history.complete(line.trim_end()) {
		Some(c) => c.to_owned(),
		None => {
			println!("No matching command found.");
			return Ok(None);
		},
	};
	print!("Execute: {}\n(Press enter to accept, any other key + enter to cancel)", candidate);
	io::stdout().flush()?;
	match read_line(input)? {
		Some(ref answer) if answer.is_empty() => Ok(Some(candidate)),
		_ => {
			println!("Command canceled.");
			Ok(None)
		},
	}
}

fn repl(state: &mut State, interactive: bool) -> io::Result<()> {
	let stdin = io::stdin();
	let mut input = stdin.lock();
	loop {
		if interactive {
			print!("{} ", state.prompt);
			io::stdout().flush()?;
		}
		let line = match read_line(&mut input)? {
			Some(line) => line,
			None => {
				if interactive {
					println!();
				}
				return Ok(());
			},
		};
		let line = if history::wants_completion(&line) {
			match complete_from_history(state, &line, &mut input)? {
				Some(line) => line,
				None => continue,
			}
		} else {
			line
		};

		state.history.push(line.as_str());
		match eval::eval(state, ForkLauncher, &line) {
			Ok(Flow::Exit) => return Ok(()),
			Ok(Flow::Continue) => {},
			Err(e) => eprintln!("psh: {}", e),
		}
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	let interactive = io::stdin().is_terminal();
	if interactive {
		ignore_job_signals();
	}

	let settings_path = match cli.config {
		Some(path) => path,
		None => env::current_dir().context("cannot determine the starting directory")?.join(SETTINGS_FILE),
	};
	let settings = Settings::load(&settings_path).unwrap_or_else(|e| {
		log::warn!("using default settings: {}", e);
		Settings::default()
	});

	let mut state = State::new(settings, interactive);
	if interactive {
		println!("Welcome to psh...");
	}
	let result = repl(&mut state, interactive).context("reading input");

	if let Err(e) = state.settings().save(&settings_path) {
		log::warn!("settings not saved: {}", e);
	}
	state.group.terminate();
	result
}
