use crate::config::LoggingConfig;
use simplelog::*;
use std::fs::File;
use std::path::Path;

pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_level(&config.level);
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if config.file {
        // Ensure data/logs directory exists
        let log_dir = Path::new("data/logs");
        if !log_dir.exists() {
            std::fs::create_dir_all(log_dir)?;
        }

        let log_file = File::create(log_dir.join("form_autofill.log"))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), log_file));
    }

    CombinedLogger::init(loggers)?;

    Ok(())
}

fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level(" warning "), LevelFilter::Warn);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }
}
