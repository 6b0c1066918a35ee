use simplelog::*;
use std::fs::File;

/// Initialize the global logger: terminal output and, optionally, a copy into `log_file`.
/// Calling it twice is harmless, the second call is ignored
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    if let Some(filename) = log_file {
        match File::create(filename) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file {}: {}", filename, e),
        }
    }

    let _ = CombinedLogger::init(loggers);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice() {
        init_logger(LevelFilter::Warn, None);
        init_logger(LevelFilter::Debug, None);
        log::warn!("logger initialized");
    }
}
