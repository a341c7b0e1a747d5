//! # snipsync
//!
//! Replays a recorded snippet session.  The scenario file (by default `scenario.json`) gives a
//! buffer, the tree of nodes made by expanding a snippet and a list of edits.  Every edit is
//! applied to the buffer, dispatched to the tree and settled, and then the final buffer, tree and
//! tabstop order are printed.

#![deny(missing_docs)]

mod config;
mod scenario;

use std::path::{Path, PathBuf};

use snipsync::{settle, InvariantError, LineBuffer};

use crate::config::Config;
use crate::scenario::Scenario;

fn main() {
    let config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Initialise the logging and startup
    pretty_env_logger::formatted_builder()
        .filter_level(config.log_level)
        .init();
    log::info!("Starting up...");

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("scenario.json"), PathBuf::from);
    if let Err(e) = run(&path, &config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(path: &Path, config: &Config) -> Result<(), Error> {
    let scenario = Scenario::load_json_file(path)?;
    let mut buf = LineBuffer::from_text(&scenario.buffer);
    let mut tree = scenario.build_tree()?;
    log::info!(
        "Loaded {} nodes and {} edits from {}",
        tree.len(),
        scenario.edits.len(),
        path.display()
    );

    if config.materialize {
        let writes = tree.materialize(&mut buf)?;
        log::debug!("Materializing the snippet took {} write(s)", writes);
    }
    settle::converge(&mut tree, &mut buf, config.max_settle_sweeps)?;

    for (i, cmd) in scenario.edits.iter().enumerate() {
        if !buf.apply(cmd) {
            log::warn!("Skipping edit #{} ({}): it doesn't fit the buffer", i, cmd);
            continue;
        }
        log::debug!("Edit #{}: {}", i, cmd);
        tree.dispatch(cmd)?;
        if config.check_invariants {
            tree.check_invariants()?;
        }
        settle::converge(&mut tree, &mut buf, config.max_settle_sweeps)?;
    }

    println!("{}", buf.text());
    println!();
    println!("{}", tree.tree_view(&buf));
    println!();
    for (number, id) in tree.tabstop_order() {
        println!("${} = {}", number, tree.describe(id, &buf));
    }
    Ok(())
}

/// Everything that can stop a replay
#[derive(Debug)]
enum Error {
    Scenario(scenario::Error),
    Tree(snipsync::Error),
    Invariant(InvariantError),
}

impl From<scenario::Error> for Error {
    fn from(e: scenario::Error) -> Self {
        Error::Scenario(e)
    }
}

impl From<snipsync::Error> for Error {
    fn from(e: snipsync::Error) -> Self {
        Error::Tree(e)
    }
}

impl From<InvariantError> for Error {
    fn from(e: InvariantError) -> Self {
        Error::Invariant(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Scenario(e) => write!(f, "{}", e),
            Error::Tree(e) => write!(f, "{}", e),
            Error::Invariant(e) => write!(f, "Tree became inconsistent: {}", e),
        }
    }
}
