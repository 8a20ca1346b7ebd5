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

use nix::errno::Errno;
use thiserror::Error;

/// Exit code reserved for failures of the supervisor itself.
pub const SUPERVISOR_FAILURE: i32 = 127;

/// Failures that stop the supervisor before the child's fate is known.
#[derive(Debug, Error)]
pub enum Error {
	/// An argument for the target command cannot be passed to `execvp`.
	#[error("argument {0:?} contains an interior NUL byte")]
	Command(String),

	/// A system call needed to prepare supervision failed.
	#[error("{op}: {source}")]
	Setup { op: &'static str, source: Errno },

	/// The child could not be created.
	#[error("{op}: {source}")]
	Launch { op: &'static str, source: Errno },
}

impl Error {
	pub(crate) fn setup(op: &'static str) -> impl FnOnce(Errno) -> Self {
		move |source| Self::Setup { op, source }
	}

	pub(crate) fn launch(op: &'static str) -> impl FnOnce(Errno) -> Self {
		move |source| Self::Launch { op, source }
	}

	/// Every supervisor-level failure shares one exit code.
	pub fn exit_code(&self) -> i32 {
		SUPERVISOR_FAILURE
	}
}

#[test]
fn test_error_display() {
	let err = Error::setup("sigaction(SIGALRM)")(Errno::EINVAL);
	assert_eq!(err.to_string(), "sigaction(SIGALRM): EINVAL: Invalid argument");
	assert_eq!(err.exit_code(), 127);
	let err = Error::Command("a\0b".to_string());
	assert_eq!(err.to_string(), r#"argument "a\0b" contains an interior NUL byte"#);
}
