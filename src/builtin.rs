use std::env;
use std::io::Write;

use crate::error::BuiltinError;
use crate::global::State;
use crate::history::COMPLETION_MARKER;

/// What the read-eval loop should do after a command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow { Continue, Exit }

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Builtin { Alias, Bye, Cd, Clear, Help, History, Prev, Pwd, Set, Unalias }

const ALL: &'static [Builtin] = &[
	Builtin::Alias, Builtin::Bye, Builtin::Cd, Builtin::Clear, Builtin::Help,
	Builtin::History, Builtin::Prev, Builtin::Pwd, Builtin::Set, Builtin::Unalias,
];

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"alias" => Some(Builtin::Alias),
		"bye" => Some(Builtin::Bye),
		"cd" => Some(Builtin::Cd),
		"clear" => Some(Builtin::Clear),
		"help" => Some(Builtin::Help),
		"history" => Some(Builtin::History),
		"prev" => Some(Builtin::Prev),
		"pwd" => Some(Builtin::Pwd),
		"set" => Some(Builtin::Set),
		"unalias" => Some(Builtin::Unalias),
		_ => None,
	}
}

type BuiltinResult = Result<Flow, BuiltinError>;

fn usage_error(b: Builtin) -> BuiltinError {
	BuiltinError::new(format!("Invalid usage. See help {} for usage.", b.name()))
}

fn io_error(e: std::io::Error) -> BuiltinError {
	BuiltinError::new(format!("write failed: {}", e))
}

impl Builtin {
	pub fn name(self) -> &'static str {
		match self {
			Builtin::Alias => "alias",
			Builtin::Bye => "bye",
			Builtin::Cd => "cd",
			Builtin::Clear => "clear",
			Builtin::Help => "help",
			Builtin::History => "history",
			Builtin::Prev => "prev",
			Builtin::Pwd => "pwd",
			Builtin::Set => "set",
			Builtin::Unalias => "unalias",
		}
	}

	pub fn usage(self) -> &'static str {
		match self {
			Builtin::Cd => "cd usage:\n\
				cd: changes directory to the current user's home.\n\
				cd directory_name: changes directory to directory_name if it exists.",
			Builtin::Bye => "bye usage:\n\
				bye: exits the shell cleanly.",
			Builtin::Alias | Builtin::Unalias => "alias & unalias usage:\n\
				alias: prints the aliases of this session.\n\
				alias word=\"val\": makes word run val.\n\
				unalias word: removes the alias word.",
			Builtin::Set => "set usage:\n\
				set: prints the current PATH and prompt.\n\
				set path directory_name...: appends directories to PATH.\n\
				set prompt val: sets the shell prompt to val.",
			Builtin::Pwd => "pwd usage:\n\
				pwd: prints the current working directory.",
			Builtin::Clear => "clear usage:\n\
				clear: clears the terminal.",
			Builtin::History | Builtin::Prev => "history & prev usage:\n\
				history: prints the command history of this session.\n\
				prev: prints the previously entered command.",
			Builtin::Help => "help usage:\n\
				help: prints general usage.\n\
				help name: prints usage of the builtin name.",
		}
	}

	/// Runs in the shell process itself, writing to `out`.
	pub fn run(self, state: &mut State, argv: &[String], out: &mut dyn Write) -> BuiltinResult {
		let args = if argv.is_empty() { argv } else { &argv[1..] };
		match self {
			Builtin::Alias => alias(state, args, out),
			Builtin::Unalias => unalias(state, args),
			Builtin::Bye => Ok(Flow::Exit),
			Builtin::Cd => cd(args, out),
			Builtin::Clear => {
				out.write_all(b"\x1b[2J\x1b[H").map_err(io_error)?;
				Ok(Flow::Continue)
			},
			Builtin::Help => help(args, out),
			Builtin::History => {
				for entry in state.history.entries() {
					writeln!(out, "{}", entry).map_err(io_error)?;
				}
				Ok(Flow::Continue)
			},
			Builtin::Prev => {
				if let Some(prev) = state.history.previous() {
					writeln!(out, "{}", prev).map_err(io_error)?;
				}
				Ok(Flow::Continue)
			},
			Builtin::Pwd => {
				let cwd = env::current_dir().map_err(|e| BuiltinError::new(format!("pwd: {}", e)))?;
				writeln!(out, "{}", cwd.display()).map_err(io_error)?;
				Ok(Flow::Continue)
			},
			Builtin::Set => set(state, args, out),
		}
	}
}

fn cd(args: &[String], out: &mut dyn Write) -> BuiltinResult {
	let target = match args.len() {
		0 => match env::var("HOME") {
			Ok(home) => home,
			Err(_) => return Err(BuiltinError::new("HOME is not set.")),
		},
		1 => args[0].clone(),
		_ => return Err(usage_error(Builtin::Cd)),
	};
	if env::set_current_dir(&target).is_err() {
		return Err(BuiltinError::new("Failed to find new path."));
	}
	let cwd = env::current_dir().map_err(|e| BuiltinError::new(format!("cd: {}", e)))?;
	env::set_var("PWD", &cwd);
	writeln!(out, "Changed directory to: {}", cwd.display()).map_err(io_error)?;
	Ok(Flow::Continue)
}

fn alias(state: &mut State, args: &[String], out: &mut dyn Write) -> BuiltinResult {
	if args.is_empty() {
		for (name, value) in state.aliases.iter() {
			writeln!(out, "Alias: {}\tCommand: {}", name, value).map_err(io_error)?;
		}
		return Ok(Flow::Continue);
	}
	// the line was split on whitespace, so a quoted value may span arguments
	let definition = args.join(" ");
	let (name, value) = match definition.split_once('=') {
		Some((_, value)) if value.contains('=') => return Err(usage_error(Builtin::Alias)),
		Some(pair) => pair,
		None => return Err(usage_error(Builtin::Alias)),
	};
	let value: String = value.chars().filter(|&c| c != '"' && c != '\'').collect();
	state.aliases.add(name.trim(), &value)?;
	Ok(Flow::Continue)
}

fn unalias(state: &mut State, args: &[String]) -> BuiltinResult {
	if args.len() != 1 {
		return Err(usage_error(Builtin::Unalias));
	}
	if state.aliases.remove(&args[0]) {
		Ok(Flow::Continue)
	} else {
		Err(BuiltinError::new("Alias not on alias list."))
	}
}

fn set(state: &mut State, args: &[String], out: &mut dyn Write) -> BuiltinResult {
	match args.first().map(|s| s.as_str()) {
		None => {
			writeln!(out, "path: {}", env::var("PATH").unwrap_or_default()).map_err(io_error)?;
			writeln!(out, "prompt: {}", state.prompt).map_err(io_error)?;
		},
		Some("path") if args.len() > 1 => {
			for dir in &args[1..] {
				state.add_to_path(dir);
			}
		},
		Some("prompt") if args.len() == 2 => {
			state.prompt = args[1].clone();
		},
		_ => return Err(usage_error(Builtin::Set)),
	}
	Ok(Flow::Continue)
}

fn help(args: &[String], out: &mut dyn Write) -> BuiltinResult {
	match args.len() {
		1 => match match_builtin(&args[0]) {
			Some(b) => writeln!(out, "{}", b.usage()).map_err(io_error)?,
			None => return Err(BuiltinError::new("Command not found")),
		},
		_ => {
			writeln!(out, "psh accepts commands of the form:\n \
				cmd [arg]* [ | cmd [arg]*]* [ < file1] [ > file2]\n\n\
				psh expands a leading ~ as follows:\n\
				~ -> /path/to/home/currentuser\n\
				~word -> /path/to/home/word\n\
				~/word -> /path/to/home/currentuser/word\n\n\
				psh completes cmd{} to the longest match in the session history, \
				then asks for confirmation before running it.\n\n\
				psh has the following built in commands:", COMPLETION_MARKER).map_err(io_error)?;
			let names: Vec<&str> = ALL.iter().map(|b| b.name()).collect();
			writeln!(out, "{}\n\nSee help cmd_name for more usage.", names.join(" ")).map_err(io_error)?;
		},
	}
	Ok(Flow::Continue)
}
