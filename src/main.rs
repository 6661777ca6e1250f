//! Bookwright - rich-text book editor
//!
//! Keeps a list of recent books, creates new book folders and edits their
//! HTML documents in a formatted editor.

mod app;
mod core;
mod document;
mod ui;

use std::path::PathBuf;

use app::{BookwrightApp, StartScreen};
use crate::core::config::AppConfig;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
Usage: bookwright [OPTIONS] [FILE]

Without FILE the welcome screen lists recent books.

Options:
  --editor     Start in the editor (on FILE, or an empty document)
  --verbose    Log debug messages
  -h, --help   Print this help
  -V, --version
";

/// What the command line asks for
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run { start: StartScreen, verbose: bool },
    Help,
    Version,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
    let mut editor = false;
    let mut verbose = false;
    let mut file: Option<PathBuf> = None;

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--editor" => editor = true,
            "--verbose" => verbose = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option {}", flag)),
            path => {
                if file.is_some() {
                    return Err(format!("unexpected argument {}", path));
                }
                file = Some(PathBuf::from(path));
            }
        }
    }

    let start = if editor || file.is_some() {
        StartScreen::Editor(file)
    } else {
        StartScreen::Welcome
    };
    Ok(Command::Run { start, verbose })
}

fn main() -> eframe::Result<()> {
    let (start, verbose) = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run { start, verbose }) => (start, verbose),
        Ok(Command::Help) => {
            print!("{}", USAGE);
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("bookwright {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Err(e) => {
            eprintln!("bookwright: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    // Initialize logging
    let level = if verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(level)
        .init();

    tracing::info!("Starting Bookwright...");

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {}", e);
        AppConfig::default()
    });

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.ui.window_width, config.ui.window_height])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Bookwright"),
        ..Default::default()
    };

    eframe::run_native(
        "Bookwright",
        native_options,
        Box::new(move |cc| Ok(Box::new(BookwrightApp::new(cc, config, start)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_shows_welcome() {
        assert_eq!(
            parse_args(args(&[])),
            Ok(Command::Run {
                start: StartScreen::Welcome,
                verbose: false
            })
        );
    }

    #[test]
    fn test_file_argument_opens_editor() {
        assert_eq!(
            parse_args(args(&["book.html"])),
            Ok(Command::Run {
                start: StartScreen::Editor(Some(PathBuf::from("book.html"))),
                verbose: false
            })
        );
        assert_eq!(
            parse_args(args(&["--editor", "--verbose"])),
            Ok(Command::Run {
                start: StartScreen::Editor(None),
                verbose: true
            })
        );
    }

    #[test]
    fn test_help_and_bad_options() {
        assert_eq!(parse_args(args(&["--help"])), Ok(Command::Help));
        assert_eq!(parse_args(args(&["-V"])), Ok(Command::Version));
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["a.html", "b.html"])).is_err());
    }
}
