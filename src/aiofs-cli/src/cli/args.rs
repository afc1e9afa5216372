use aiofs::{Config, DEFAULT_QUEUE_DEPTH, DEFAULT_WORKERS, Executor, sys};
use clap::{ArgAction, Args};
use eyre::Context;

/// Configures the verbosity of the builtin logger.
#[derive(Clone, Copy, Debug, Args)]
pub struct Verbosity {
    /// Configures the log verbosity of aiofs.
    ///
    /// `-v` is Debug, `-vv` is Trace.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Verbosity {
    /// Configures the global logger based on the settings.
    pub fn setup(self) {
        let level = self.log_level();
        simple_logger::init_with_level(level).unwrap();
    }

    fn log_level(self) -> log::Level {
        match self.verbose {
            0 => log::Level::Info,
            1 => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}

/// Configures the executor which carries out file I/O.
#[derive(Clone, Copy, Debug, Args)]
pub struct ExecutorArgs {
    /// The number of I/O worker threads.
    ///
    /// `-1` spawns one worker per CPU.
    #[clap(
        long,
        env = "AIOFS_WORKER_THREADS",
        default_value_t = DEFAULT_WORKERS,
        allow_negative_numbers = true,
        global = true
    )]
    pub workers: isize,

    /// The number of operations that may be queued before callers
    /// start waiting for the workers.
    #[clap(
        long,
        env = "AIOFS_QUEUE_DEPTH",
        default_value_t = DEFAULT_QUEUE_DEPTH,
        global = true
    )]
    pub queue_depth: usize,

    /// Caps the number of workers at the open file limit of the
    /// process.
    #[clap(long, global = true)]
    pub cap_to_file_limit: bool,
}

impl ExecutorArgs {
    /// Starts an executor with the configured settings.
    pub fn build(self) -> eyre::Result<Executor> {
        let mut config = Config {
            workers: self.workers,
            queue_depth: self.queue_depth,
        };

        if self.cap_to_file_limit {
            let limit = sys::open_file_limit().context("failed to query the open file limit")?;
            let limit = isize::try_from(limit).unwrap_or(isize::MAX);

            let requested = match config.workers {
                -1 => sys::hardware_parallelism() as isize,
                n => n,
            };
            if requested > limit {
                log::warn!("Capping {requested} workers at the open file limit of {limit}");
                config.workers = limit;
            }
        }

        Executor::with_config(config).context("failed to start the executor")
    }
}
