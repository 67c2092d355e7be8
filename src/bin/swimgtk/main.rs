use gui::app;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use stm8_swim_gtk::consts::DEFAULT_LOG_LEVEL;

mod clap_def;
mod core;
mod event;
mod gui;

fn main() -> Result<(), String> {
    // init clap app
    let args = clap_def::parse_and_validate();

    // init logger
    logger_init(args.verbose as i32 - args.quiet as i32);

    // start app
    app::run(&args).map_err(|err| err.to_string())
}

fn logger_init(relative_verbosity: i32) {
    use log::LevelFilter::*;

    let level = match DEFAULT_LOG_LEVEL + relative_verbosity {
        0 => Error,
        1 => Warn,
        2 => Info,
        3 => Debug,
        4.. => Trace,
        _ => return, // negative == disable logging
    };
    let config = ConfigBuilder::new().set_thread_level(Debug).build();
    if let Err(err) = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Failed to initialise logger: {}", err);
    }
}
