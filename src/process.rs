// Copyright 2026 Octave Online LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::limits;
use crate::Error;
use crate::ExitOutcome;
use crate::SUPERVISOR_FAILURE;
use libc::c_char;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::sys::signal::killpg;
use nix::sys::signal::Signal;
use nix::unistd::fork;
use nix::unistd::setpgid;
use nix::unistd::ForkResult;
use nix::unistd::Pid;
use std::ffi::CString;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::process;
use std::ptr;

/// The argument vector of the target command, ready for `execvp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(Vec<CString>);

impl CommandLine {
	/// # Examples
	///
	/// ```
	/// use limitrun::CommandLine;
	///
	/// let cmd = CommandLine::new("echo", ["hello", "world"]).unwrap();
	/// assert_eq!(cmd.program().to_str(), Ok("echo"));
	/// assert!(CommandLine::new("a\0b", Vec::<String>::new()).is_err());
	/// ```
	pub fn new<I>(program: impl AsRef<OsStr>, args: I) -> Result<Self, Error>
	where
		I: IntoIterator,
		I::Item: AsRef<OsStr>,
	{
		let mut argv = vec![to_cstring(program.as_ref())?];
		for arg in args {
			argv.push(to_cstring(arg.as_ref())?);
		}
		Ok(Self(argv))
	}

	pub fn program(&self) -> &CString {
		&self.0[0]
	}

	pub fn argv(&self) -> &[CString] {
		&self.0
	}

	/// NULL-terminated pointer array for `execvp`, borrowing from `self`.
	fn exec_argv(&self) -> Vec<*const c_char> {
		self.0.iter().map(|arg| arg.as_ptr()).chain([ptr::null()]).collect()
	}
}

fn to_cstring(s: &OsStr) -> Result<CString, Error> {
	CString::new(s.as_bytes()).map_err(|_| Error::Command(s.to_string_lossy().into_owned()))
}

/// The one child of this supervisor, leader of its own process group.
#[derive(Debug)]
pub struct ChildProcess {
	pid: Pid,
}

impl ChildProcess {
	/// Forks a child that moves into a new process group, applies
	/// [`limits::LIMITS`] and replaces itself with `command`.
	///
	/// Only the parent returns from this function.
	pub fn spawn(command: &CommandLine) -> Result<Self, Error> {
		let argv = command.exec_argv();
		// SAFETY: the supervisor is single-threaded. In the child only the
		// diagnostics on failure paths allocate.
		match unsafe { fork() }.map_err(Error::launch("fork"))? {
			ForkResult::Child => exec_child(command, &argv),
			ForkResult::Parent { child } => {
				// Either this or the child's own call wins; the loser sees EACCES or
				// a no-op.
				let _ = setpgid(child, child);
				log::debug!("forked child {child}");
				Ok(Self { pid: child })
			}
		}
	}

	pub fn pid(&self) -> Pid {
		self.pid
	}

	/// Sends `signal` to the direct child only.
	pub fn signal(&self, signal: Signal) -> nix::Result<()> {
		kill(self.pid, signal)
	}

	/// Blocks until the child terminates.
	///
	/// A failed wait is logged and yields [`ExitOutcome::Indeterminate`]; the
	/// returned [`Reaped`] still allows the group sweep.
	pub fn wait(self) -> Reaped {
		let outcome = loop {
			let mut status: libc::c_int = 0;
			// Raw status: `WaitStatus` has no room for real-time signals.
			// SAFETY: `status` is a valid out pointer.
			match Errno::result(unsafe { libc::waitpid(self.pid.as_raw(), &mut status, 0) }) {
				Ok(_) if libc::WIFEXITED(status) => break ExitOutcome::Exited(libc::WEXITSTATUS(status)),
				Ok(_) if libc::WIFSIGNALED(status) => break ExitOutcome::Signaled(libc::WTERMSIG(status)),
				Ok(_) => log::debug!("ignoring child state change {status:#x}"),
				Err(Errno::EINTR) => continue,
				Err(err) => {
					log::error!("waitpid({}): {err}", self.pid);
					break ExitOutcome::Indeterminate;
				}
			}
		};
		log::debug!("reaped child {}: {outcome:?}", self.pid);
		Reaped {
			pgid: self.pid,
			outcome,
		}
	}
}

/// A child that has been waited for. Its process group may still hold
/// descendants until [`Reaped::kill_group`] runs.
#[derive(Debug)]
#[must_use = "the child's process group must be swept with kill_group"]
pub struct Reaped {
	pgid: Pid,
	outcome: ExitOutcome,
}

impl Reaped {
	/// Sends SIGKILL to the whole process group and returns how the child
	/// ended. An already empty group is not an error.
	pub fn kill_group(self) -> ExitOutcome {
		match killpg(self.pgid, Signal::SIGKILL) {
			Ok(()) => log::debug!("swept process group {}", self.pgid),
			Err(Errno::ESRCH) => {}
			Err(err) => log::error!("kill(-{}): {err}", self.pgid),
		}
		self.outcome
	}
}

fn exec_child(command: &CommandLine, argv: &[*const c_char]) -> ! {
	let pid = Pid::from_raw(0);
	if let Err(err) = setpgid(pid, pid) {
		log::error!("setpgid: {err}");
		process::exit(SUPERVISOR_FAILURE);
	}
	if let Err(err) = limits::apply_all() {
		log::error!("{err}");
		process::exit(SUPERVISOR_FAILURE);
	}
	// SAFETY: `argv` is NULL-terminated and points into `command`, which
	// outlives this call.
	unsafe { libc::execvp(argv[0], argv.as_ptr()) };
	log::error!("{}: {}", command.program().to_string_lossy(), Errno::last().desc());
	process::exit(SUPERVISOR_FAILURE)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_command_line() {
		let cmd = CommandLine::new("sh", ["-c", "exit 3"]).unwrap();
		let argv: Vec<&str> = cmd.argv().iter().map(|s| s.to_str().unwrap()).collect();
		assert_eq!(argv, ["sh", "-c", "exit 3"]);
		assert!(matches!(
			CommandLine::new("sh", ["bad\0arg"]),
			Err(Error::Command(s)) if s == "bad\0arg"
		));
	}

	#[test]
	fn test_spawn_and_wait() {
		let cmd = CommandLine::new("sh", ["-c", "exit 3"]).unwrap();
		let child = ChildProcess::spawn(&cmd).unwrap();
		assert_eq!(child.wait().kill_group(), ExitOutcome::Exited(3));
	}

	#[test]
	fn test_signal_child() {
		let cmd = CommandLine::new("sleep", ["30"]).unwrap();
		let child = ChildProcess::spawn(&cmd).unwrap();
		child.signal(Signal::SIGKILL).unwrap();
		assert_eq!(child.wait().kill_group(), ExitOutcome::Signaled(libc::SIGKILL));
	}

	#[test]
	fn test_realtime_signal() {
		let cmd = CommandLine::new("sh", ["-c", "kill -35 $$; sleep 30"]).unwrap();
		let child = ChildProcess::spawn(&cmd).unwrap();
		assert_eq!(child.wait().kill_group(), ExitOutcome::Signaled(35));
	}

	#[test]
	fn test_exec_argv() {
		let cmd = CommandLine::new("echo", ["a", "b"]).unwrap();
		let argv = cmd.exec_argv();
		assert_eq!(argv.len(), 4);
		assert_eq!(argv[0], cmd.program().as_ptr());
		assert!(argv[3].is_null());
	}

	#[test]
	fn test_exec_failure() {
		let cmd = CommandLine::new("/no/such/binary", Vec::<&str>::new()).unwrap();
		let child = ChildProcess::spawn(&cmd).unwrap();
		assert_eq!(child.wait().kill_group(), ExitOutcome::Exited(127));
	}
}
