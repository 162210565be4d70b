use std::collections::VecDeque;

use nix::sys::wait::WaitStatus;

use crate::builtin::Flow;
use crate::compiler;
use crate::error::{Result, ShellError};
use crate::fd::{self, StageIo};
use crate::global::State;
use crate::job::{Launched, Launcher, ProcessHandle, WaitStatusExt};
use crate::types::Pipeline;

/// Drives one compiled pipeline: wires it, launches stages left to right and
/// reaps every child it launched. Reaping also happens on drop, so a
/// supervisor abandoned halfway never leaves zombies behind.
pub struct Supervisor<'a, L: Launcher> {
	state: &'a mut State,
	launcher: L,
	pipeline: Pipeline,
	/// Descriptor pairs for stages not launched yet. Empty until wired.
	pending: VecDeque<StageIo>,
	wired: bool,
	next: usize,
	halted: bool,
	launched: Vec<ProcessHandle>,
	statuses: Vec<WaitStatus>,
}

impl<'a, L: Launcher> Supervisor<'a, L> {
	pub fn new(state: &'a mut State, launcher: L, pipeline: Pipeline) -> Supervisor<'a, L> {
		Supervisor {
			state: state,
			launcher: launcher,
			pipeline: pipeline,
			pending: VecDeque::new(),
			wired: false,
			next: 0,
			halted: false,
			launched: vec![],
			statuses: vec![],
		}
	}

	pub fn has_next(&self) -> bool {
		!self.halted && self.next < self.pipeline.len()
	}

	fn halt(&mut self) {
		self.halted = true;
		// closes the descriptors of stages that will never run, so launched
		// neighbours see end-of-file or a broken pipe instead of hanging
		self.pending.clear();
	}

	/// Launches the next stage. The first call wires the whole pipeline.
	/// After an error nothing further is launched.
	pub fn exec_next(&mut self) -> Result<Flow> {
		if !self.has_next() {
			return Ok(Flow::Continue);
		}
		if !self.wired {
			self.wired = true;
			match fd::wire(&self.pipeline) {
				Ok(io) => self.pending = io.into(),
				Err(e) => {
					self.halt();
					return Err(e.into());
				},
			}
		}
		let io = match self.pending.pop_front() {
			Some(io) => io,
			None => {
				self.halt();
				return Ok(Flow::Continue);
			},
		};

		let stage = &self.pipeline.stages[self.next];
		match self.launcher.launch(self.state, stage, io) {
			Ok(Launched::Process(handle)) => {
				self.launched.push(handle);
				self.next += 1;
				Ok(Flow::Continue)
			},
			Ok(Launched::Builtin(flow)) => {
				self.next += 1;
				Ok(flow)
			},
			Err(e) => {
				log::debug!("stage {} ({}) failed to launch: {}", self.next, stage.name, e);
				self.halt();
				Err(e)
			},
		}
	}

	/// Waits on every launched child exactly once, in launch order.
	/// Calling it again returns the same statuses.
	pub fn finish(&mut self) -> &[WaitStatus] {
		self.halt();
		let reaped = !self.launched.is_empty();
		for handle in self.launched.drain(..) {
			let program = handle.program().to_owned();
			let pid = handle.pid();
			match self.launcher.wait(handle) {
				Ok(status) => {
					log::debug!("{} ({}) finished: {:?}, code {}", program, pid, status, status.code());
					self.statuses.push(status);
				},
				Err(e) => log::warn!("waiting on {} ({}): {}", program, pid, e),
			}
		}
		if reaped {
			self.state.group.reclaim_terminal();
		}
		&self.statuses
	}

	#[cfg(test)]
	pub fn launched_count(&self) -> usize {
		self.launched.len()
	}
}

impl<'a, L: Launcher> Drop for Supervisor<'a, L> {
	fn drop(&mut self) {
		self.finish();
	}
}

/// Compiles and runs one input line. The pipeline is fully reaped before
/// this returns, including when launching failed partway.
pub fn eval<L: Launcher>(state: &mut State, launcher: L, line: &str) -> Result<Flow> {
	let pipeline = compiler::compile(&*state, line)?;
	let mut supervisor = Supervisor::new(state, launcher, pipeline);
	let mut flow = Flow::Continue;
	let mut failure: Option<ShellError> = None;
	while supervisor.has_next() {
		match supervisor.exec_next() {
			Ok(Flow::Exit) => flow = Flow::Exit,
			Ok(Flow::Continue) => {},
			Err(e) => {
				failure = Some(e);
				break;
			},
		}
	}
	supervisor.finish();
	match failure {
		Some(e) => Err(e),
		None => Ok(flow),
	}
}
