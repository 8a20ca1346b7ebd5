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

//! The fixed set of resource ceilings applied to the target command.

use crate::Error;
use libc::rlim_t;
use nix::sys::resource::getrlimit;
use nix::sys::resource::setrlimit;
use nix::sys::resource::Resource;

const TWO_GIB: rlim_t = 2 * 1024 * 1024 * 1024;

/// Ceilings in the order they are applied.
pub const LIMITS: [Limit; 5] = [
	Limit::new(Resource::RLIMIT_AS, "RLIMIT_AS", TWO_GIB),
	Limit::new(Resource::RLIMIT_CORE, "RLIMIT_CORE", 0),
	Limit::new(Resource::RLIMIT_FSIZE, "RLIMIT_FSIZE", TWO_GIB),
	Limit::new(Resource::RLIMIT_NOFILE, "RLIMIT_NOFILE", 128),
	Limit::new(Resource::RLIMIT_NPROC, "RLIMIT_NPROC", 1024),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
	pub resource: Resource,
	pub name: &'static str,
	pub ceiling: rlim_t,
}

/// What to do with one resource given the values currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
	/// Install these soft and hard values.
	Apply { soft: rlim_t, hard: rlim_t },
	/// The hard value in effect is below the ceiling and cannot be raised.
	Skip { hard: rlim_t },
}

impl Limit {
	pub const fn new(resource: Resource, name: &'static str, ceiling: rlim_t) -> Self {
		Self {
			resource,
			name,
			ceiling,
		}
	}

	/// # Examples
	///
	/// ```
	/// use limitrun::limits::Adjustment;
	/// use limitrun::limits::LIMITS;
	///
	/// let nofile = LIMITS[3];
	/// assert_eq!(nofile.adjust(1024, 4096), Adjustment::Apply { soft: 128, hard: 128 });
	/// assert_eq!(nofile.adjust(64, 64), Adjustment::Skip { hard: 64 });
	/// ```
	pub fn adjust(&self, soft: rlim_t, hard: rlim_t) -> Adjustment {
		if hard < self.ceiling {
			return Adjustment::Skip { hard };
		}
		Adjustment::Apply {
			soft: soft.min(self.ceiling),
			hard: self.ceiling,
		}
	}

	/// Applies this ceiling to the current process.
	///
	/// A hard value already below the ceiling is left alone with a warning.
	/// Failing to read or write the limit is an error.
	pub fn apply(&self) -> Result<Adjustment, Error> {
		let (soft, hard) = getrlimit(self.resource).map_err(Error::setup("getrlimit"))?;
		let adjustment = self.adjust(soft, hard);
		match adjustment {
			Adjustment::Apply { soft, hard } => {
				setrlimit(self.resource, soft, hard).map_err(Error::setup("setrlimit"))?;
			}
			Adjustment::Skip { hard } => {
				log::warn!(
					"{}: requested value {} exceeds max value {}",
					self.name,
					self.ceiling,
					hard
				);
			}
		}
		Ok(adjustment)
	}
}

/// Applies every entry of [`LIMITS`], stopping at the first hard failure.
pub fn apply_all() -> Result<(), Error> {
	for limit in LIMITS.iter() {
		limit.apply()?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_table() {
		assert_eq!(TWO_GIB, 2147483648);
		let table: Vec<(&str, rlim_t)> = LIMITS.iter().map(|l| (l.name, l.ceiling)).collect();
		assert_eq!(
			table,
			vec![
				("RLIMIT_AS", TWO_GIB),
				("RLIMIT_CORE", 0),
				("RLIMIT_FSIZE", TWO_GIB),
				("RLIMIT_NOFILE", 128),
				("RLIMIT_NPROC", 1024),
			]
		);
	}

	#[test]
	fn test_adjust_clamps_soft() {
		let limit = Limit::new(Resource::RLIMIT_NOFILE, "RLIMIT_NOFILE", 128);
		assert_eq!(limit.adjust(1024, 1024), Adjustment::Apply { soft: 128, hard: 128 });
		assert_eq!(limit.adjust(32, 1024), Adjustment::Apply { soft: 32, hard: 128 });
		assert_eq!(limit.adjust(128, 128), Adjustment::Apply { soft: 128, hard: 128 });
	}

	#[test]
	fn test_adjust_unlimited() {
		let limit = Limit::new(Resource::RLIMIT_AS, "RLIMIT_AS", TWO_GIB);
		assert_eq!(
			limit.adjust(libc::RLIM_INFINITY, libc::RLIM_INFINITY),
			Adjustment::Apply { soft: TWO_GIB, hard: TWO_GIB }
		);
	}

	#[test]
	fn test_adjust_never_raises_hard() {
		let limit = Limit::new(Resource::RLIMIT_NPROC, "RLIMIT_NPROC", 1024);
		assert_eq!(limit.adjust(100, 512), Adjustment::Skip { hard: 512 });
		assert_eq!(limit.adjust(0, 0), Adjustment::Skip { hard: 0 });
	}

	#[test]
	fn test_adjust_zero_ceiling() {
		let limit = Limit::new(Resource::RLIMIT_CORE, "RLIMIT_CORE", 0);
		assert_eq!(limit.adjust(0, libc::RLIM_INFINITY), Adjustment::Apply { soft: 0, hard: 0 });
		assert_eq!(limit.adjust(0, 0), Adjustment::Apply { soft: 0, hard: 0 });
	}

	// Lowering the core limit is always permitted, so this is safe to run in
	// the test process.
	#[test]
	fn test_apply_core() {
		let limit = Limit::new(Resource::RLIMIT_CORE, "RLIMIT_CORE", 0);
		assert_eq!(limit.apply().unwrap(), Adjustment::Apply { soft: 0, hard: 0 });
		assert_eq!(getrlimit(Resource::RLIMIT_CORE).unwrap(), (0, 0));
	}
}
