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

use crate::ChildProcess;
use crate::CommandLine;
use crate::Deadline;
use crate::Error;
use crate::ExitOutcome;
use nix::sys::signal::Signal;

/// One supervised run: a deadline in seconds (zero for none) and a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
	pub seconds: u32,
	pub command: CommandLine,
}

/// Runs the command to completion and returns how it ended.
///
/// Every process left in the child's process group is killed before this
/// returns, whether or not the deadline fired.
pub fn supervise(invocation: &Invocation) -> Result<ExitOutcome, Error> {
	let child = ChildProcess::spawn(&invocation.command)?;
	let deadline = match Deadline::arm(&child, invocation.seconds) {
		Ok(deadline) => deadline,
		Err(err) => {
			let _ = child.signal(Signal::SIGKILL);
			let _ = child.wait().kill_group();
			return Err(err);
		}
	};
	let reaped = child.wait();
	if let Some(deadline) = deadline {
		log::debug!("cancelling {}s deadline", deadline.seconds());
	}
	Ok(reaped.kill_group())
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::unistd::Pid;
	use std::time::Duration;
	use std::time::Instant;

	#[test]
	fn test_arm_failure_kills_child() {
		// The pid cell is write-once, so pointing it elsewhere makes arming fail
		// after the fork. 4242 matches the deadline tests.
		let _ = crate::deadline::set_target(Pid::from_raw(4242));
		let invocation = Invocation {
			seconds: 1,
			command: CommandLine::new("sleep", ["30"]).unwrap(),
		};
		let start = Instant::now();
		let result = supervise(&invocation);
		assert!(
			matches!(result, Err(Error::Setup { op: "arm deadline", .. })),
			"{result:?}"
		);
		assert_eq!(result.unwrap_err().exit_code(), 127);
		// `supervise` only returns after reaping, so a prompt return means the
		// sleep was killed rather than waited out.
		assert!(start.elapsed() < Duration::from_secs(10), "{:?}", start.elapsed());
	}

	#[test]
	fn test_no_deadline() {
		let invocation = Invocation {
			seconds: 0,
			command: CommandLine::new("sh", ["-c", "exit 7"]).unwrap(),
		};
		assert_eq!(supervise(&invocation).unwrap(), ExitOutcome::Exited(7));
	}
}
