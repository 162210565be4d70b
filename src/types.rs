/// Where a stage's input or output comes from before any descriptor exists.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IoKind { Stdio, Pipe, File }

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommandSpec {
	pub name: String,
	/// `argv[0]` is always `name`.
	pub argv: Vec<String>,
	pub is_builtin: bool,
	pub input: IoKind,
	pub output: IoKind,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline {
	pub stages: Vec<CommandSpec>,
	pub input_file: Option<String>,
	pub output_file: Option<String>,
}

impl Pipeline {
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn pipe_count(&self) -> usize {
		self.stages.len().saturating_sub(1)
	}
}
