use std::sync::Mutex;

use aiofs::{Error, Executor};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Capture {
    warnings: Mutex<Vec<String>>,
}

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.warnings
                .lock()
                .unwrap()
                .push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: Capture = Capture {
    warnings: Mutex::new(Vec::new()),
};

fn clamp_warnings() -> usize {
    LOGGER
        .warnings
        .lock()
        .unwrap()
        .iter()
        .filter(|w| w.contains("less than 1"))
        .count()
}

// The logger is process-global, so everything lives in one test.
#[test]
fn invalid_sizes_warn_and_clamp() -> Result<(), Error> {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Warn);

    let ex = Executor::new(2, 4)?;
    assert_eq!(clamp_warnings(), 0);

    assert_eq!(ex.set_size(0)?, 1);
    assert_eq!(clamp_warnings(), 1);

    assert_eq!(ex.set_size(-4)?, 1);
    assert_eq!(clamp_warnings(), 2);

    assert_eq!(ex.set_size(-1)?, aiofs::sys::hardware_parallelism());
    assert_eq!(clamp_warnings(), 2);

    Ok(())
}
