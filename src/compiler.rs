use crate::error::{CompileError, ShellError};
use crate::parser::{self, Segments};
use crate::types::{CommandSpec, IoKind, Pipeline};

/// The session services the compiler leans on.
pub trait Context {
	fn is_builtin(&self, name: &str) -> bool;
	/// Must terminate for every input; cycles are refused when aliases are
	/// defined.
	fn expand_alias(&self, name: &str) -> String;
	fn expand_tilde(&self, arg: &str) -> String;
}

fn io_kinds(i: usize, n: usize, has_input: bool, has_output: bool) -> (IoKind, IoKind) {
	let first = i == 0;
	let last = i + 1 == n;
	let input = if !first {
		IoKind::Pipe
	} else if has_input {
		IoKind::File
	} else {
		IoKind::Stdio
	};
	let output = if !last {
		IoKind::Pipe
	} else if has_output {
		IoKind::File
	} else {
		IoKind::Stdio
	};
	(input, output)
}

fn compile_stage<C: Context>(ctx: &C, text: &str, input: IoKind, output: IoKind) -> Result<CommandSpec, CompileError> {
	let mut argv: Vec<String> = text.split_whitespace().map(|arg| ctx.expand_tilde(arg)).collect();
	if argv.is_empty() {
		return Err(CompileError::EmptyCommand);
	}

	let expanded = ctx.expand_alias(&argv[0]);
	let mut head: Vec<String> = expanded.split_whitespace().map(String::from).collect();
	let name = match head.first() {
		Some(name) => name.clone(),
		None => return Err(CompileError::EmptyCommand),
	};
	head.extend(argv.drain(1..));
	let argv = head;

	let is_builtin = ctx.is_builtin(&name);
	if is_builtin && !(input == IoKind::Stdio && output == IoKind::Stdio) {
		return Err(CompileError::RedirectedBuiltin(name));
	}
	Ok(CommandSpec { name: name, argv: argv, is_builtin: is_builtin, input: input, output: output })
}

/// Assigns I/O kinds by position and resolves each stage's command.
pub fn compile_segments<C: Context>(ctx: &C, segments: &Segments) -> Result<Pipeline, CompileError> {
	let n = segments.stages.len();
	let has_input = segments.input_file.is_some();
	let has_output = segments.output_file.is_some();

	let mut stages = Vec::with_capacity(n);
	for (i, text) in segments.stages.iter().enumerate() {
		let (input, output) = io_kinds(i, n, has_input, has_output);
		stages.push(compile_stage(ctx, text, input, output)?);
	}
	Ok(Pipeline {
		stages: stages,
		input_file: segments.input_file.map(String::from),
		output_file: segments.output_file.map(String::from),
	})
}

pub fn compile<C: Context>(ctx: &C, line: &str) -> Result<Pipeline, ShellError> {
	let segments = parser::parse(line)?;
	let pipeline = compile_segments(ctx, &segments)?;
	log::debug!("compiled {:?}", pipeline);
	Ok(pipeline)
}
