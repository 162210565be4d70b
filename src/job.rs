use std::ffi::CString;
use std::io::{self, Write};
use std::os::raw::c_char;
use std::os::unix::io::{BorrowedFd, RawFd};
use std::ptr;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{self, killpg, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::builtin::{self, Flow};
use crate::error::{BuiltinError, ResourceError, ShellError};
use crate::fd::{Endpoint, StageIo};
use crate::global::State;
use crate::search::{self, SearchPath};
use crate::types::CommandSpec;

pub const NOT_EXECUTABLE_STATUS: i32 = 126;
pub const NOT_FOUND_STATUS: i32 = 127;

/// Signals the interactive shell ignores.
pub const SHELL_IGNORED: [Signal; 4] = [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP, Signal::SIGTTOU];
/// Reset to their defaults in every child. SIGPIPE is ignored by the Rust
/// runtime and would otherwise survive `execv`.
const CHILD_DEFAULTS: [Signal; 5] = [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP, Signal::SIGTTOU, Signal::SIGPIPE];

pub trait WaitStatusExt {
	fn code(&self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn code(&self) -> i32 {
		match *self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
			_ => 0,
		}
	}
}

/// The one process group every child of this session joins. Created from
/// the first child and signalled as a whole at teardown.
#[derive(Debug)]
pub struct ProcessGroup {
	id: Option<Pid>,
	/// Hand the terminal to the group while it runs. Only meaningful when
	/// stdin is a terminal the shell controls.
	interactive: bool,
}

impl ProcessGroup {
	pub fn new(interactive: bool) -> ProcessGroup {
		ProcessGroup { id: None, interactive: interactive }
	}

	pub fn id(&self) -> Option<Pid> {
		self.id
	}

	/// Child side of the handshake: join the group, or lead a new one if
	/// the group is gone, then take the terminal for it. Must run while
	/// stdin is still the shell's and SIGTTOU is still ignored.
	fn join(&self) {
		let target = self.id.unwrap_or(Pid::from_raw(0));
		if unistd::setpgid(Pid::from_raw(0), target).is_err() {
			let _ = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
		}
		if self.interactive {
			let stdin = unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) };
			let _ = unistd::tcsetpgrp(stdin, unistd::getpgrp());
		}
	}

	/// Parent side. Both sides call `setpgid` so the child is placed before
	/// either of them proceeds, whichever runs first.
	fn adopt(&mut self, child: Pid) {
		let target = self.id.unwrap_or(child);
		let placed = match unistd::setpgid(child, target) {
			Err(Errno::EPERM) if self.id.is_some() => unistd::setpgid(child, child),
			r => r,
		};
		if let Err(e) = placed {
			log::debug!("setpgid({}, {}) from parent: {}", child, target, e);
		}
		match unistd::getpgid(Some(child)) {
			Ok(actual) if actual == unistd::getpgrp() => {
				log::warn!("child {} stayed in the shell's process group", child);
			},
			Ok(actual) => {
				if self.id != Some(actual) {
					if let Some(old) = self.id {
						log::debug!("process group {} has no members left, {} leads {}", old, child, actual);
					}
					self.id = Some(actual);
				}
			},
			Err(e) => log::debug!("getpgid({}): {}", child, e),
		}
	}

	fn give_terminal(&self) {
		if let (true, Some(id)) = (self.interactive, self.id) {
			if let Err(e) = unistd::tcsetpgrp(io::stdin(), id) {
				log::debug!("tcsetpgrp({}): {}", id, e);
			}
		}
	}

	pub fn reclaim_terminal(&self) {
		if self.interactive {
			if let Err(e) = unistd::tcsetpgrp(io::stdin(), unistd::getpgrp()) {
				log::debug!("reclaiming terminal: {}", e);
			}
		}
	}

	/// Kills every process still in the group. Used once, at shell exit.
	pub fn terminate(&mut self) {
		if let Some(id) = self.id.take() {
			log::debug!("killing process group {}", id);
			match killpg(id, Signal::SIGKILL) {
				Ok(()) | Err(Errno::ESRCH) => {},
				Err(e) => log::warn!("killpg({}): {}", id, e),
			}
		}
	}
}

/// A forked, not yet reaped child. Consumed by `Launcher::wait`.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessHandle {
	pid: Pid,
	program: String,
}

impl ProcessHandle {
	pub fn new(pid: Pid, program: &str) -> ProcessHandle {
		ProcessHandle { pid: pid, program: program.to_owned() }
	}

	pub fn pid(&self) -> Pid {
		self.pid
	}

	pub fn program(&self) -> &str {
		&self.program
	}
}

#[derive(Debug)]
pub enum Launched {
	Builtin(Flow),
	Process(ProcessHandle),
}

/// Starts one stage. Takes ownership of the stage's descriptors; whatever the
/// outcome, the shell's copies are closed when this returns.
pub trait Launcher {
	fn launch(&mut self, state: &mut State, stage: &CommandSpec, io: StageIo) -> Result<Launched, ShellError>;
	fn wait(&mut self, handle: ProcessHandle) -> nix::Result<WaitStatus>;
}

/// Everything the child needs, prepared before `fork` so the child does not
/// allocate.
struct ExecPlan {
	paths: Vec<CString>,
	_argv: Vec<CString>,
	argv_ptrs: Vec<*const c_char>,
	not_found: Vec<u8>,
	not_executable: Vec<u8>,
	bad_redirect: Vec<u8>,
}

impl ExecPlan {
	fn new(stage: &CommandSpec) -> Result<ExecPlan, ResourceError> {
		let nul = |_| ResourceError::NulInArgument(stage.name.clone());
		let argv: Vec<CString> = stage.argv.iter()
			.map(|a| CString::new(a.as_str()))
			.collect::<Result<_, _>>()
			.map_err(nul)?;
		let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|a| a.as_ptr()).collect();
		argv_ptrs.push(ptr::null());
		let paths: Vec<CString> = SearchPath::from_env().candidates(&stage.name).iter()
			.map(|p| search::to_cstring(p))
			.collect::<Result<_, _>>()
			.map_err(nul)?;
		log::debug!("{}: candidates {:?}", stage.name, paths);
		Ok(ExecPlan {
			paths: paths,
			_argv: argv,
			argv_ptrs: argv_ptrs,
			not_found: format!("psh: command not found: {}\n", stage.name).into_bytes(),
			not_executable: format!("psh: cannot execute: {}\n", stage.name).into_bytes(),
			bad_redirect: format!("psh: cannot redirect {}\n", stage.name).into_bytes(),
		})
	}
}

fn child_exit(msg: &[u8], status: i32) -> ! {
	unsafe {
		libc::write(libc::STDERR_FILENO, msg.as_ptr() as *const libc::c_void, msg.len());
		libc::_exit(status)
	}
}

/// Puts `from` on `onto` and closes the original.
fn install(from: &Endpoint, onto: RawFd) -> nix::Result<()> {
	if from.is_inherited() {
		return Ok(());
	}
	let raw = from.raw();
	if raw == onto {
		fcntl(raw, FcntlArg::F_SETFD(FdFlag::empty()))?;
		return Ok(());
	}
	unistd::dup2(raw, onto)?;
	unistd::close(raw)
}

fn exec_child(group: &ProcessGroup, plan: &ExecPlan, io: &StageIo) -> ! {
	group.join();
	if install(&io.input, libc::STDIN_FILENO).is_err() || install(&io.output, libc::STDOUT_FILENO).is_err() {
		child_exit(&plan.bad_redirect, NOT_EXECUTABLE_STATUS);
	}
	for &sig in CHILD_DEFAULTS.iter() {
		let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
	}

	let mut found = false;
	for path in &plan.paths {
		unsafe { libc::execv(path.as_ptr(), plan.argv_ptrs.as_ptr()) };
		match Errno::last() {
			Errno::ENOENT | Errno::ENOTDIR => {},
			_ => found = true,
		}
	}
	if found {
		child_exit(&plan.not_executable, NOT_EXECUTABLE_STATUS)
	} else {
		child_exit(&plan.not_found, NOT_FOUND_STATUS)
	}
}

/// Forks and execs `stage` with `io` as its stdin/stdout.
pub fn spawn(group: &mut ProcessGroup, stage: &CommandSpec, io: StageIo) -> Result<ProcessHandle, ResourceError> {
	let plan = ExecPlan::new(stage)?;
	let _ = io::stdout().flush();
	let _ = io::stderr().flush();

	match unsafe { unistd::fork() } {
		Err(e) => Err(ResourceError::Fork { program: stage.name.clone(), source: e }),
		Ok(ForkResult::Child) => exec_child(group, &plan, &io),
		Ok(ForkResult::Parent { child }) => {
			group.adopt(child);
			group.give_terminal();
			log::debug!("launched {} as {} in group {:?}", stage.name, child, group.id());
			// the child holds its own copies now; closing ours is what lets
			// the next reader see end-of-file
			drop(io);
			Ok(ProcessHandle::new(child, &stage.name))
		},
	}
}

/// Builtins run in-process; everything else is forked.
pub struct ForkLauncher;

impl Launcher for ForkLauncher {
	fn launch(&mut self, state: &mut State, stage: &CommandSpec, io: StageIo) -> Result<Launched, ShellError> {
		if stage.is_builtin {
			drop(io);
			let b = match builtin::match_builtin(&stage.name) {
				Some(b) => b,
				None => return Err(BuiltinError::new(format!("{}: not a builtin", stage.name)).into()),
			};
			let stdout = io::stdout();
			let mut out = stdout.lock();
			let flow = b.run(state, &stage.argv, &mut out)?;
			let _ = out.flush();
			return Ok(Launched::Builtin(flow));
		}
		let handle = spawn(&mut state.group, stage, io)?;
		Ok(Launched::Process(handle))
	}

	fn wait(&mut self, handle: ProcessHandle) -> nix::Result<WaitStatus> {
		loop {
			match waitpid(handle.pid, None) {
				Err(Errno::EINTR) => continue,
				r => return r,
			}
		}
	}
}
