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

//! Wall-clock deadline for the child, driven by `alarm(2)`.
//!
//! The handler only reads a pid that was stored before it was installed, so
//! it needs no locking and does not allocate.

use crate::ChildProcess;
use crate::Error;
use crate::SUPERVISOR_FAILURE;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::sys::signal::sigaction;
use nix::sys::signal::SaFlags;
use nix::sys::signal::SigAction;
use nix::sys::signal::SigHandler;
use nix::sys::signal::SigSet;
use nix::sys::signal::Signal;
use nix::unistd::alarm;
use nix::unistd::Pid;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

/// Pid targeted by the alarm handler. Zero means unset.
static TARGET: AtomicI32 = AtomicI32::new(0);

/// Stores `pid` as the handler's target. The cell can be written once; storing
/// the same pid again is accepted.
pub(crate) fn set_target(pid: Pid) -> bool {
	match TARGET.compare_exchange(0, pid.as_raw(), Ordering::SeqCst, Ordering::SeqCst) {
		Ok(_) => true,
		Err(current) => current == pid.as_raw(),
	}
}

extern "C" fn on_alarm(_: libc::c_int) {
	preserving_errno(kill_target);
}

/// Runs `f` and restores `errno` afterwards, so the interrupted code never
/// sees a value set by the handler.
fn preserving_errno(f: impl FnOnce()) {
	let saved = Errno::last_raw();
	f();
	Errno::set_raw(saved);
}

fn kill_target() {
	let pid = TARGET.load(Ordering::SeqCst);
	if pid <= 0 {
		return;
	}
	match kill(Pid::from_raw(pid), Signal::SIGKILL) {
		Ok(()) | Err(Errno::ESRCH) => {}
		Err(err) => {
			write_stderr(b"error: timeout kill: ");
			write_stderr(err.desc().as_bytes());
			write_stderr(b"\n");
			// SAFETY: `_exit` is async-signal-safe.
			unsafe { libc::_exit(SUPERVISOR_FAILURE) };
		}
	}
}

fn write_stderr(msg: &[u8]) {
	// SAFETY: `write` is async-signal-safe and `msg` is a valid buffer.
	unsafe { libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len()) };
}

/// A pending alarm that kills the child when it fires. Dropping it cancels
/// the alarm.
#[derive(Debug)]
pub struct Deadline {
	seconds: u32,
}

impl Deadline {
	/// Arms a deadline of `seconds` for `child`. Returns `None` when `seconds`
	/// is zero, which disables the deadline.
	pub fn arm(child: &ChildProcess, seconds: u32) -> Result<Option<Self>, Error> {
		if seconds == 0 {
			return Ok(None);
		}
		if !set_target(child.pid()) {
			return Err(Error::Setup {
				op: "arm deadline",
				source: Errno::EBUSY,
			});
		}
		let action = SigAction::new(SigHandler::Handler(on_alarm), SaFlags::SA_RESTART, SigSet::empty());
		// SAFETY: `on_alarm` only performs async-signal-safe calls.
		unsafe { sigaction(Signal::SIGALRM, &action) }.map_err(Error::setup("sigaction(SIGALRM)"))?;
		alarm::set(seconds);
		log::debug!("deadline armed: {seconds}s for child {}", child.pid());
		Ok(Some(Self { seconds }))
	}

	pub fn seconds(&self) -> u32 {
		self.seconds
	}
}

impl Drop for Deadline {
	fn drop(&mut self) {
		alarm::cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_target_write_once() {
		assert!(set_target(Pid::from_raw(4242)));
		assert!(set_target(Pid::from_raw(4242)));
		assert!(!set_target(Pid::from_raw(4343)));
		assert_eq!(TARGET.load(Ordering::SeqCst), 4242);
	}

	#[test]
	fn test_errno_restored() {
		Errno::set_raw(libc::EAGAIN);
		preserving_errno(|| {
			Errno::set_raw(libc::ESRCH);
		});
		assert_eq!(Errno::last(), Errno::EAGAIN);
	}
}
