use std::process::ExitCode;

use atmoslog::config::{Config, Startup};
use atmoslog::monitor::{self, Shutdown};
use atmoslog::output::Sink;
use atmoslog::{daemon, logging, signal_exit_code, Sensor};
use tracing::{error, info};

fn exit(startup: Startup) -> ExitCode {
    match startup {
        Startup::Exit {
            message,
            to_stdout,
            code,
        } => {
            if to_stdout {
                print!("{}", message);
            } else {
                eprint!("{}", message);
            }
            ExitCode::from(code)
        }
        Startup::Run(_) => ExitCode::SUCCESS,
    }
}

fn main() -> ExitCode {
    let config = match Startup::from_cmdline(std::env::args_os()) {
        Startup::Run(config) => config,
        startup => return exit(startup),
    };
    if let Err(e) = logging::setup_logging(config.verbose) {
        return exit(Startup::usage_error(e));
    }

    match run(&config) {
        Ok(signal) => ExitCode::from(signal_exit_code(signal)),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Returns the signal that ended the loop. The sensor is dropped, and thereby torn down, before
/// this returns on every path.
fn run(config: &Config) -> atmoslog::Result<i32> {
    // forking has to happen before libusb spawns any threads
    if config.daemonize {
        daemon::daemonize()?;
    }

    let shutdown = Shutdown::new();
    daemon::install_signal_handlers(&shutdown)?;

    let sensor = Sensor::open(config.verbose)?;
    info!("sensor ready, logging every {:?}", config.interval);

    let sink = Sink::new(config.log_file.clone());
    monitor::run(
        &sensor,
        &config.calibration,
        &sink,
        config.interval,
        &shutdown,
    )
}
