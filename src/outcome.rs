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

use crate::SUPERVISOR_FAILURE;
use std::fmt;

/// How the child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
	/// Exited normally with this code.
	Exited(i32),
	/// Terminated by this signal number. Real-time signals are kept as is.
	Signaled(i32),
	/// The wait failed and no status is available.
	Indeterminate,
}

impl ExitOutcome {
	/// The exit code this program should return.
	///
	/// # Examples
	///
	/// ```
	/// use limitrun::ExitOutcome;
	///
	/// assert_eq!(ExitOutcome::Exited(3).exit_code(), 3);
	/// assert_eq!(ExitOutcome::Signaled(9).exit_code(), 9);
	/// assert_eq!(ExitOutcome::Signaled(35).exit_code(), 35);
	/// assert_eq!(ExitOutcome::Indeterminate.exit_code(), 127);
	/// ```
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::Exited(code) => *code,
			Self::Signaled(signal) => *signal,
			Self::Indeterminate => SUPERVISOR_FAILURE,
		}
	}

	/// The line reported on stderr, if any.
	pub fn notice(&self) -> Option<Notice> {
		match self {
			Self::Signaled(signal) => Some(Notice(*signal)),
			_ => None,
		}
	}
}

/// `Killed (N)` line for a child that died by signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice(i32);

impl fmt::Display for Notice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Killed ({})", self.0)
	}
}

#[test]
fn test_outcome() {
	let killed = ExitOutcome::Signaled(libc::SIGKILL);
	assert_eq!(killed.exit_code(), 9);
	assert_eq!(killed.notice().map(|n| n.to_string()).as_deref(), Some("Killed (9)"));

	let segv = ExitOutcome::Signaled(libc::SIGSEGV);
	assert_eq!(segv.exit_code(), 11);
	assert_eq!(segv.notice().map(|n| n.to_string()).as_deref(), Some("Killed (11)"));

	// Real-time signals have no named constant.
	let rt = ExitOutcome::Signaled(35);
	assert_eq!(rt.exit_code(), 35);
	assert_eq!(rt.notice().map(|n| n.to_string()).as_deref(), Some("Killed (35)"));

	assert_eq!(ExitOutcome::Exited(0).exit_code(), 0);
	assert_eq!(ExitOutcome::Exited(1).notice(), None);
	assert_eq!(ExitOutcome::Exited(127).exit_code(), 127);
	assert_eq!(ExitOutcome::Indeterminate.exit_code(), 127);
	assert_eq!(ExitOutcome::Indeterminate.notice(), None);
}
