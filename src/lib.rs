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

//! This package runs a command under a fixed set of resource limits and an optional wall-clock deadline.
//!
//! It is designed for test harnesses that launch untrusted or flaky binaries. The command runs in its own process group with:
//!
//! - address space and file size capped at 2 GiB,
//! - core dumps disabled,
//! - at most 128 open files and 1024 processes.
//!
//! When the deadline passes the command is killed. After the command ends, anything still running in its process group is killed as well. The exit code of the command (or the number of the signal that killed it) becomes the exit code of `limitrun`; 127 is reserved for failures of `limitrun` itself.

mod deadline;
mod error;
pub mod limits;
mod outcome;
mod process;
mod supervisor;

pub use deadline::Deadline;
pub use error::Error;
pub use error::SUPERVISOR_FAILURE;
pub use outcome::ExitOutcome;
pub use outcome::Notice;
pub use process::ChildProcess;
pub use process::CommandLine;
pub use process::Reaped;
pub use supervisor::supervise;
pub use supervisor::Invocation;
