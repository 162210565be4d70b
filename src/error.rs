use std::io;

use thiserror::Error;

/// Malformed line, rejected before anything is compiled.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum SyntaxError {
	#[error("empty command line")]
	Empty,
	#[error("more than one '{0}' redirection")]
	DuplicateRedirect(char),
	#[error("adjacent '|' with no command between them")]
	AdjacentPipes,
	#[error("input redirection must come before output redirection")]
	RedirectOrder,
	#[error("'|' must come before any redirection")]
	PipeAfterRedirect,
	#[error("'|' directly next to a redirection")]
	PipeTouchesRedirect,
	#[error("line cannot begin or end with '{0}'")]
	DanglingToken(char),
	#[error("no command given")]
	NoCommand,
	#[error("null command in pipeline")]
	EmptyStage,
	#[error("'{0}' has no file name")]
	MissingTarget(char),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum CompileError {
	#[error("builtin '{0}' cannot be piped or redirected")]
	RedirectedBuiltin(String),
	#[error("command resolves to nothing")]
	EmptyCommand,
}

#[derive(Debug, Error)]
pub enum ResourceError {
	#[error("failed to create pipe: {0}")]
	Pipe(#[source] nix::Error),
	#[error("could not open input file {path}: {source}")]
	OpenInput { path: String, #[source] source: io::Error },
	#[error("could not open output file {path}: {source}")]
	OpenOutput { path: String, #[source] source: io::Error },
	/// The compiler asked for a pipe the wiring never allocated, or one
	/// already handed to another stage.
	#[error("internal error: stage {stage} has no pipe {index}")]
	MissingPipe { stage: usize, index: isize },
	#[error("internal error: stage {stage} redirects to an unnamed file")]
	MissingFile { stage: usize },
	#[error("argument of '{0}' contains a nul byte")]
	NulInArgument(String),
	#[error("failed to fork {program}: {source}")]
	Fork { program: String, #[source] source: nix::Error },
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BuiltinError(pub String);

impl BuiltinError {
	pub fn new<S: Into<String>>(msg: S) -> BuiltinError {
		BuiltinError(msg.into())
	}
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("settings I/O on {path}: {source}")]
	Io { path: String, #[source] source: io::Error },
	#[error("malformed settings file: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("cannot serialize settings: {0}")]
	Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum ShellError {
	#[error("Invalid input: {0}. See help for usage.")]
	Syntax(#[from] SyntaxError),
	#[error("{0}")]
	Compile(#[from] CompileError),
	#[error("{0}")]
	Resource(#[from] ResourceError),
	#[error("{0}")]
	Builtin(#[from] BuiltinError),
}

pub type Result<T> = std::result::Result<T, ShellError>;
