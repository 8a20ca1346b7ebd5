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

use clap::CommandFactory;
use clap::Parser;
use limitrun::CommandLine;
use limitrun::Error;
use limitrun::Invocation;
use limitrun::SUPERVISOR_FAILURE;
use log::Level;
use std::ffi::OsString;
use std::io::Write;
use std::process;

#[derive(Parser, Debug)]
#[command(
	about = "Runs a command under fixed resource limits, killing its process group after a timeout",
	disable_help_flag = true,
	disable_version_flag = true
)]
struct Cli {
	/// Seconds the command may run before it is killed. 0 disables the timeout.
	#[arg(value_parser = parse_seconds)]
	seconds: u32,

	/// The command to run, looked up in PATH.
	#[arg(allow_hyphen_values(true))]
	cmd: OsString,

	/// Arguments to the command.
	#[arg(trailing_var_arg(true), allow_hyphen_values(true))]
	args: Vec<OsString>,
}

impl Cli {
	fn invocation(&self) -> Result<Invocation, Error> {
		Ok(Invocation {
			seconds: self.seconds,
			command: CommandLine::new(&self.cmd, &self.args)?,
		})
	}
}

fn parse_seconds(input: &str) -> Result<u32, String> {
	if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
		return Err(format!("cannot parse integer '{input}'"));
	}
	input.parse().map_err(|_| format!("'{input}' is out of range"))
}

fn init_logger() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
		.format(|buf, record| {
			let level = match record.level() {
				Level::Error => "error",
				Level::Warn => "warning",
				Level::Info => "info",
				Level::Debug => "debug",
				Level::Trace => "trace",
			};
			writeln!(buf, "{level}: {}", record.args())
		})
		.init();
}

fn main() {
	let args = match Cli::try_parse() {
		Ok(args) => args,
		Err(err) => {
			let _ = err.print();
			if !err.to_string().contains("Usage:") {
				eprintln!("\n{}", Cli::command().render_usage());
			}
			process::exit(SUPERVISOR_FAILURE);
		}
	};
	init_logger();
	let code = match args.invocation().and_then(|invocation| limitrun::supervise(&invocation)) {
		Ok(outcome) => {
			if let Some(notice) = outcome.notice() {
				eprintln!("{notice}");
			}
			outcome.exit_code()
		}
		Err(err) => {
			log::error!("{err}");
			err.exit_code()
		}
	};
	process::exit(code)
}

#[test]
fn test_cli() {
	fn cli(input: &str) -> Result<Cli, clap::error::ErrorKind> {
		Cli::try_parse_from(shlex::split(input).unwrap()).map_err(|e| e.kind())
	}
	insta::assert_debug_snapshot!(cli("limitrun"), @r###"
	Err(
	    MissingRequiredArgument,
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun 5"), @r###"
	Err(
	    MissingRequiredArgument,
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun 5x echo"), @r###"
	Err(
	    ValueValidation,
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun --help"), @r###"
	Err(
	    UnknownArgument,
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun 0 echo hello"), @r###"
	Ok(
	    Cli {
	        seconds: 0,
	        cmd: "echo",
	        args: [
	            "hello",
	        ],
	    },
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun 2 sleep 10"), @r###"
	Ok(
	    Cli {
	        seconds: 2,
	        cmd: "sleep",
	        args: [
	            "10",
	        ],
	    },
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun 5 false"), @r###"
	Ok(
	    Cli {
	        seconds: 5,
	        cmd: "false",
	        args: [],
	    },
	)
	"###);
}

#[test]
fn test_cli_passes_flags_through() {
	fn cli(input: &str) -> Result<Cli, clap::error::ErrorKind> {
		Cli::try_parse_from(shlex::split(input).unwrap()).map_err(|e| e.kind())
	}
	insta::assert_debug_snapshot!(cli("limitrun 5 ls -l --help"), @r###"
	Ok(
	    Cli {
	        seconds: 5,
	        cmd: "ls",
	        args: [
	            "-l",
	            "--help",
	        ],
	    },
	)
	"###);
	insta::assert_debug_snapshot!(cli("limitrun 5 sh -c 'exit 3'"), @r###"
	Ok(
	    Cli {
	        seconds: 5,
	        cmd: "sh",
	        args: [
	            "-c",
	            "exit 3",
	        ],
	    },
	)
	"###);
}

#[test]
fn test_parse_seconds() {
	assert_eq!(parse_seconds("0"), Ok(0));
	assert_eq!(parse_seconds("30"), Ok(30));
	assert_eq!(parse_seconds("007"), Ok(7));
	assert_eq!(parse_seconds("4294967295"), Ok(u32::MAX));
	assert_eq!(parse_seconds("5x"), Err("cannot parse integer '5x'".to_string()));
	assert!(parse_seconds("").is_err());
	assert!(parse_seconds("+5").is_err());
	assert!(parse_seconds(" 5").is_err());
	assert!(parse_seconds("-1").is_err());
	assert!(parse_seconds("4294967296").is_err());
}
