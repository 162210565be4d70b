use std::fs;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd;

use crate::error::ResourceError;
use crate::types::{IoKind, Pipeline};

/// rw-r--r--, before umask.
const OUTPUT_MODE: u32 = 0o644;

/// One side of a stage's standard streams. The owned variants close on drop,
/// so whoever holds the endpoint is the only one responsible for it.
#[derive(Debug)]
pub enum Endpoint {
	Stdin,
	Stdout,
	Pipe(OwnedFd),
	File(OwnedFd),
}

impl Endpoint {
	pub fn raw(&self) -> RawFd {
		match *self {
			Endpoint::Stdin => libc::STDIN_FILENO,
			Endpoint::Stdout => libc::STDOUT_FILENO,
			Endpoint::Pipe(ref fd) | Endpoint::File(ref fd) => fd.as_raw_fd(),
		}
	}

	/// True for the shell's own stdin/stdout, which a child already inherits.
	pub fn is_inherited(&self) -> bool {
		match *self {
			Endpoint::Stdin | Endpoint::Stdout => true,
			_ => false,
		}
	}
}

#[derive(Debug)]
pub struct StageIo {
	pub input: Endpoint,
	pub output: Endpoint,
}

/// `N-1` pipes for `N` stages. Each end can be taken exactly once.
struct PipeSet {
	ends: Vec<(Option<OwnedFd>, Option<OwnedFd>)>,
}

impl PipeSet {
	/// All or nothing: pipes created before a failure are closed as the
	/// partial set drops.
	fn allocate(n: usize) -> Result<PipeSet, ResourceError> {
		let mut ends = Vec::with_capacity(n);
		for _ in 0 .. n {
			let (r, w) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ResourceError::Pipe)?;
			ends.push((Some(r), Some(w)));
		}
		Ok(PipeSet { ends: ends })
	}

	fn slot(&mut self, stage: usize, index: isize) -> Result<&mut (Option<OwnedFd>, Option<OwnedFd>), ResourceError> {
		if index < 0 {
			return Err(ResourceError::MissingPipe { stage: stage, index: index });
		}
		self.ends.get_mut(index as usize).ok_or(ResourceError::MissingPipe { stage: stage, index: index })
	}

	fn take_read(&mut self, stage: usize, index: isize) -> Result<OwnedFd, ResourceError> {
		self.slot(stage, index)?.0.take().ok_or(ResourceError::MissingPipe { stage: stage, index: index })
	}

	fn take_write(&mut self, stage: usize, index: isize) -> Result<OwnedFd, ResourceError> {
		self.slot(stage, index)?.1.take().ok_or(ResourceError::MissingPipe { stage: stage, index: index })
	}
}

fn open_input(path: &str) -> Result<OwnedFd, ResourceError> {
	fs::OpenOptions::new()
		.read(true)
		.open(path)
		.map(OwnedFd::from)
		.map_err(|e| ResourceError::OpenInput { path: path.to_owned(), source: e })
}

fn open_output(path: &str) -> Result<OwnedFd, ResourceError> {
	fs::OpenOptions::new()
		.write(true)
		.create(true)
		.truncate(true)
		.mode(OUTPUT_MODE)
		.open(path)
		.map(OwnedFd::from)
		.map_err(|e| ResourceError::OpenOutput { path: path.to_owned(), source: e })
}

/// Resolves a concrete descriptor pair for every stage. On error every
/// descriptor opened so far is closed before returning.
pub fn wire(pipeline: &Pipeline) -> Result<Vec<StageIo>, ResourceError> {
	let mut pipes = PipeSet::allocate(pipeline.pipe_count())?;
	let mut wired = Vec::with_capacity(pipeline.len());

	for (i, stage) in pipeline.stages.iter().enumerate() {
		let index = i as isize;
		let input = match stage.input {
			IoKind::Stdio => Endpoint::Stdin,
			IoKind::File => match pipeline.input_file {
				Some(ref path) => Endpoint::File(open_input(path)?),
				None => return Err(ResourceError::MissingFile { stage: i }),
			},
			IoKind::Pipe => Endpoint::Pipe(pipes.take_read(i, index - 1)?),
		};
		let output = match stage.output {
			IoKind::Stdio => Endpoint::Stdout,
			IoKind::File => match pipeline.output_file {
				Some(ref path) => Endpoint::File(open_output(path)?),
				None => return Err(ResourceError::MissingFile { stage: i }),
			},
			IoKind::Pipe => Endpoint::Pipe(pipes.take_write(i, index)?),
		};
		log::debug!("stage {} ({}): in={} out={}", i, stage.name, input.raw(), output.raw());
		wired.push(StageIo { input: input, output: output });
	}
	Ok(wired)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;
	use std::fs::File;
	use std::io::{Read, Write};
	use crate::types::CommandSpec;
	use serial_test::serial;

	fn command(name: &str, input: IoKind, output: IoKind) -> CommandSpec {
		CommandSpec {
			name: name.to_owned(),
			argv: vec![name.to_owned()],
			is_builtin: false,
			input: input,
			output: output,
		}
	}

	fn pipeline(stages: Vec<CommandSpec>) -> Pipeline {
		Pipeline { stages: stages, input_file: None, output_file: None }
	}

	#[test]
	#[serial]
	fn three_stages_use_two_pipes() {
		let p = pipeline(vec![
			command("a", IoKind::Stdio, IoKind::Pipe),
			command("b", IoKind::Pipe, IoKind::Pipe),
			command("c", IoKind::Pipe, IoKind::Stdio),
		]);
		let io = wire(&p).unwrap();
		assert_eq!(io.len(), 3);
		assert!(io[0].input.is_inherited());
		assert!(io[2].output.is_inherited());

		let owned: Vec<RawFd> = io.iter()
			.flat_map(|s| vec![&s.input, &s.output])
			.filter(|e| !e.is_inherited())
			.map(|e| e.raw())
			.collect();
		assert_eq!(owned.len(), 4);
		let distinct: HashSet<RawFd> = owned.iter().cloned().collect();
		assert_eq!(distinct.len(), 4);
	}

	#[test]
	#[serial]
	fn adjacent_stages_share_a_channel() {
		let p = pipeline(vec![
			command("a", IoKind::Stdio, IoKind::Pipe),
			command("b", IoKind::Pipe, IoKind::Stdio),
		]);
		let mut io = wire(&p).unwrap();
		let second = io.pop().unwrap();
		let first = io.pop().unwrap();
		let mut writer = match first.output {
			Endpoint::Pipe(fd) => File::from(fd),
			other => panic!("{:?}", other),
		};
		let mut reader = match second.input {
			Endpoint::Pipe(fd) => File::from(fd),
			other => panic!("{:?}", other),
		};
		writer.write_all(b"through").unwrap();
		drop(writer);
		let mut got = String::new();
		reader.read_to_string(&mut got).unwrap();
		assert_eq!(got, "through");
	}

	#[test]
	#[serial]
	fn redirection_files() {
		let dir = tempfile::tempdir().unwrap();
		let input = dir.path().join("in.txt");
		let output = dir.path().join("out.txt");
		fs::write(&input, "data").unwrap();
		fs::write(&output, "stale contents").unwrap();

		let mut p = pipeline(vec![command("cat", IoKind::File, IoKind::File)]);
		p.input_file = Some(input.display().to_string());
		p.output_file = Some(output.display().to_string());
		let io = wire(&p).unwrap();
		match (&io[0].input, &io[0].output) {
			(&Endpoint::File(_), &Endpoint::File(_)) => {},
			other => panic!("{:?}", other),
		}
		assert_eq!(fs::metadata(&output).unwrap().len(), 0);
	}

	#[test]
	#[serial]
	fn missing_input_file_names_it() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("absent.txt").display().to_string();
		let mut p = pipeline(vec![
			command("cat", IoKind::File, IoKind::Pipe),
			command("wc", IoKind::Pipe, IoKind::Stdio),
		]);
		p.input_file = Some(missing.clone());
		match wire(&p) {
			Err(ResourceError::OpenInput { path, .. }) => assert_eq!(path, missing),
			other => panic!("{:?}", other),
		}
	}

	#[test]
	#[serial]
	fn out_of_range_pipe_is_internal_error() {
		let p = pipeline(vec![command("a", IoKind::Pipe, IoKind::Stdio)]);
		match wire(&p) {
			Err(ResourceError::MissingPipe { stage: 0, index: -1 }) => {},
			other => panic!("{:?}", other),
		}
		let p = pipeline(vec![command("a", IoKind::Stdio, IoKind::Pipe)]);
		match wire(&p) {
			Err(ResourceError::MissingPipe { stage: 0, index: 0 }) => {},
			other => panic!("{:?}", other),
		}
	}
}
