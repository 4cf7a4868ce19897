use std::path::PathBuf;
use std::time::Duration;

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};

use crate::{Calibration, ConfigError, USAGE_EXIT_CODE};

pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Command line of the `atmoslog` binary. `-h` is handled by hand because usage has to exit with
/// status 1.
#[derive(Parser, Debug)]
#[command(name = "atmoslog", version, about = "Atmospheric data logger")]
#[command(disable_help_flag = true)]
pub struct Args {
    /// Daemonize (send program to the background), requires -l
    #[arg(short = 'd')]
    pub daemonize: bool,

    /// Help/show options
    #[arg(short = 'h', action = ArgAction::SetTrue)]
    pub help: bool,

    /// Log interval in seconds
    #[arg(
        short = 'i',
        value_name = "INTERVAL",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Log to file, rewritten on every reading
    #[arg(short = 'l', value_name = "LOGFILE")]
    pub log_file: Option<PathBuf>,

    /// Offset (calibration adjustment) added to the temperature
    #[arg(short = 'o', value_name = "OFFSET", allow_negative_numbers = true)]
    pub offset: Option<f32>,

    /// Enable verbose/debug logging
    #[arg(short = 'v')]
    pub verbose: bool,
}

impl Args {
    pub fn usage() -> String {
        Args::command().render_help().to_string()
    }
}

/// Validated settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub interval: Duration,
    pub log_file: Option<PathBuf>,
    pub calibration: Calibration,
    pub verbose: bool,
    pub daemonize: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if args.daemonize {
            if args.verbose {
                return Err(ConfigError::VerboseWithDaemon);
            }
            if args.log_file.is_none() {
                return Err(ConfigError::DaemonWithoutLogFile);
            }
        }

        Ok(Self {
            interval: Duration::from_secs(args.interval),
            log_file: args.log_file,
            calibration: Calibration::with_offset(args.offset.unwrap_or(0.0)),
            verbose: args.verbose,
            daemonize: args.daemonize,
        })
    }
}

/// Outcome of reading the command line: either a validated configuration or a message to print
/// and a status to exit with.
#[derive(Debug, PartialEq)]
pub enum Startup {
    Run(Config),
    Exit {
        message: String,
        to_stdout: bool,
        code: u8,
    },
}

impl Startup {
    pub fn from_cmdline<I, T>(cmdline: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = match Args::try_parse_from(cmdline) {
            Ok(args) => args,
            Err(e) if e.kind() == ErrorKind::DisplayVersion => {
                return Startup::Exit {
                    message: e.to_string(),
                    to_stdout: true,
                    code: 0,
                }
            }
            Err(e) => {
                return Startup::Exit {
                    message: format!("{}\n{}", e, Args::usage()),
                    to_stdout: false,
                    code: USAGE_EXIT_CODE,
                }
            }
        };
        if args.help {
            return Startup::Exit {
                message: Args::usage(),
                to_stdout: true,
                code: USAGE_EXIT_CODE,
            };
        }

        match Config::from_args(args) {
            Ok(config) => Startup::Run(config),
            Err(e) => Startup::usage_error(e),
        }
    }

    pub fn usage_error(error: impl std::fmt::Display) -> Self {
        Startup::Exit {
            message: format!("error: {}\n\n{}", error, Args::usage()),
            to_stdout: false,
            code: USAGE_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("atmoslog").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(parse(&[]).unwrap()).unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.log_file, None);
        assert_eq!(config.calibration, Calibration::default());
        assert!(!config.verbose);
        assert!(!config.daemonize);
    }

    #[test]
    fn test_all_options() {
        let args = parse(&["-d", "-i", "60", "-l", "/tmp/atmos.log", "-o", "-1.25"]).unwrap();
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/atmos.log")));
        assert_eq!(config.calibration.offset, -1.25);
        assert_eq!(config.calibration.scale, 1.0);
        assert!(config.daemonize);
    }

    #[test]
    fn test_help_flag() {
        let args = parse(&["-h"]).unwrap();
        assert!(args.help);
        assert!(Args::usage().contains("-l <LOGFILE>"));
    }

    #[test]
    fn test_daemon_requires_log_file() {
        let args = parse(&["-d"]).unwrap();
        assert_eq!(
            Config::from_args(args),
            Err(ConfigError::DaemonWithoutLogFile)
        );
    }

    #[test]
    fn test_daemon_excludes_verbose() {
        let args = parse(&["-d", "-v", "-l", "out.log"]).unwrap();
        assert_eq!(Config::from_args(args), Err(ConfigError::VerboseWithDaemon));
    }

    #[test]
    fn test_huge_interval_is_accepted() {
        let config = Config::from_args(parse(&["-i", "18446744073709551615"]).unwrap()).unwrap();
        assert_eq!(config.interval, Duration::from_secs(u64::MAX));

        let shutdown = crate::monitor::Shutdown::new();
        shutdown.request(15);
        assert!(shutdown.sleep(config.interval));
    }

    fn startup(args: &[&str]) -> Startup {
        Startup::from_cmdline(std::iter::once("atmoslog").chain(args.iter().copied()))
    }

    fn exit_code(startup: Startup) -> Option<u8> {
        match startup {
            Startup::Run(_) => None,
            Startup::Exit { code, .. } => Some(code),
        }
    }

    #[test]
    fn test_startup_exit_codes() {
        assert_eq!(exit_code(startup(&["-h"])), Some(1));
        assert_eq!(exit_code(startup(&["-x"])), Some(1));
        assert_eq!(exit_code(startup(&["-i", "0"])), Some(1));
        assert_eq!(exit_code(startup(&["-d"])), Some(1));
        assert_eq!(exit_code(startup(&["-d", "-v", "-l", "out.log"])), Some(1));
        assert_eq!(exit_code(startup(&["-V"])), Some(0));
        assert_eq!(exit_code(startup(&["-i", "5", "-o", "0.5"])), None);
    }

    #[test]
    fn test_startup_messages() {
        match startup(&["-h"]) {
            Startup::Exit {
                message, to_stdout, ..
            } => {
                assert!(to_stdout);
                assert!(message.contains("-i <INTERVAL>"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match startup(&["-d"]) {
            Startup::Exit {
                message, to_stdout, ..
            } => {
                assert!(!to_stdout);
                assert!(message.starts_with("error: you also need to use the -l option"));
                assert!(message.contains("-l <LOGFILE>"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_usage_errors() {
        for args in [
            &["-x"][..],
            &["-i"],
            &["-i", "abc"],
            &["-i", "0"],
            &["-l"],
            &["-o"],
            &["-o", "warm"],
        ] {
            assert!(parse(args).is_err(), "{args:?} should not parse");
        }
    }
}
