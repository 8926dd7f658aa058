use fern::{Dispatch, InitError};
use log::{Level, LevelFilter};
use std::{io, path::Path};
use yansi::Color;

pub fn setup_logging(filter: LevelFilter, debuglog: Option<&Path>) -> Result<(), InitError> {
    let (dispatch, unopened) = dispatch(filter, debuglog);
    dispatch.apply()?;

    // The console still logs when the debug log cannot be written.
    if let Some(why) = unopened {
        warn!("debug log disabled: {}", why);
    }

    Ok(())
}

/// Builds the console dispatch, with the debug log chained if it could be opened.
fn dispatch(filter: LevelFilter, debuglog: Option<&Path>) -> (Dispatch, Option<io::Error>) {
    let console = Dispatch::new()
        .level(filter)
        .format(|out, message, record| {
            let color = match record.level() {
                Level::Trace => Color::Cyan.style().bold(),
                Level::Debug => Color::Blue.style().bold(),
                Level::Error => Color::Red.style().bold(),
                Level::Warn => Color::Yellow.style().bold(),
                Level::Info => Color::Green.style().bold(),
            };

            out.finish(format_args!(" {} {}", color.paint(record.level()), message))
        })
        .chain(io::stderr());

    let mut dispatch = Dispatch::new()
        // Exclude logs for crates that we use
        .level(LevelFilter::Off)
        // Include only the logs for this crate
        .level_for("system_upgrade", LevelFilter::Debug)
        .chain(console);

    let file = match debuglog.map(fern::log_file).transpose() {
        Ok(file) => file,
        Err(why) => return (dispatch, Some(why)),
    };

    if let Some(file) = file {
        dispatch = dispatch.chain(
            Dispatch::new()
                .level(LevelFilter::Debug)
                .format(|out, message, record| {
                    out.finish(format_args!("{:<5} {}: {}", record.level(), record.target(), message))
                })
                .chain(file),
        );
    }

    (dispatch, None)
}
