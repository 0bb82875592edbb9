// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod logger;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueHint};

/// Summarizes the result files written by the decay tester.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// Enables verbose logging
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Writes a copy of every file with an additional `average` column into this directory
    #[clap(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    augment: Option<PathBuf>,
    /// Draws a bar chart of every file into this directory
    #[clap(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    chart: Option<PathBuf>,
    /// Result files to summarize
    #[clap(required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,
}

fn main() {
    let args = Args::parse();
    logger::init(args.verbose);

    if let Err(err) = run(&args) {
        log::error!("{err:?}");
        process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    for (i, path) in args.files.iter().enumerate() {
        log::debug!("processing {}", path.display());
        let file = decay_report::load(path)?;

        let mut out = String::new();
        decay_report::render(&file, &mut out)?;
        if i > 0 {
            println!();
        }
        println!("{}", path.display());
        print!("{out}");

        if let Some(dir) = &args.augment {
            let output = decay_report::augment_file(path, dir)?;
            log::info!("wrote {}", output.display());
        }

        if let Some(dir) = &args.chart {
            let output = decay_report::chart::chart_file(&file, path, dir)?;
            log::info!("wrote {}", output.display());
        }
    }

    Ok(())
}
