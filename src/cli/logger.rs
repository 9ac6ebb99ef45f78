// Logging setup for the CLI
use std::io::Write;

/// Initialize the logger. Log lines go to stderr so stdout stays CSV only.
pub fn init_logger(verbose: bool, quiet: bool) {
    // RUST_LOG set by the user wins over the flags
    if std::env::var("RUST_LOG").is_ok() {
        return env_logger::init();
    }

    let default_level = if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(default_level).format(|buf, record| {
        if record.level() >= log::Level::Debug {
            writeln!(buf, "[{}] {}", record.level(), record.args())
        } else {
            writeln!(buf, "{}", record.args())
        }
    });

    if !quiet {
        let own_level = if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        builder.filter_module("almatoolkit", own_level);
    }

    if verbose {
        builder.filter_module("reqwest", log::LevelFilter::Info);
        builder.filter_module("hyper", log::LevelFilter::Info);
        builder.filter_module("h2", log::LevelFilter::Info);
        builder.filter_module("tokio", log::LevelFilter::Info);
    }

    builder.init();
}
