// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Command-line tool that reconstructs the artifact embedded in a JPEG XL file.
//!
//! ```text
//! reconstruct <INPUT> <ARTIFACT> <ICC> [--initial-capacity N] [--max-capacity N] [-v]
//! ```
//!
//! Exit code 0 on success, 1 on any load, decode or write failure. Errors go
//! to stderr.

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use jxl_reconstruct::{
    Artifact, ContainerEngine, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY, DecodeEventLoop, DriverOptions,
    ResultSink,
};

#[derive(Parser)]
#[command(name = "reconstruct", version, about = "Reconstruct the artifact embedded in a JPEG XL file")]
struct Cli {
    /// JPEG XL file to read.
    input: PathBuf,

    /// Where to write the reconstructed artifact.
    artifact: PathBuf,

    /// Where to write the ICC profile, if the file carries one.
    icc: PathBuf,

    /// Size of the first output window in bytes.
    #[arg(long, default_value_t = DEFAULT_INITIAL_CAPACITY)]
    initial_capacity: usize,

    /// Largest output buffer in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_CAPACITY)]
    max_capacity: usize,

    /// Log decoder events and buffer growth.
    #[arg(short, long)]
    verbose: bool,
}

/// Writes a finished artifact and its profile to disk.
struct FileSink {
    artifact_path: PathBuf,
    icc_path: PathBuf,
}

impl ResultSink for FileSink {
    type Error = anyhow::Error;

    fn accept(&mut self, artifact: Artifact) -> anyhow::Result<()> {
        fs::write(&self.artifact_path, &artifact.bytes)
            .with_context(|| format!("failed to write {}", self.artifact_path.display()))?;

        match &artifact.color_profile {
            Some(profile) => fs::write(&self.icc_path, profile)
                .with_context(|| format!("failed to write {}", self.icc_path.display()))?,
            None => log::warn!(
                "no color profile reported; {} was not written",
                self.icc_path.display()
            ),
        }

        println!(
            "Reconstructed {} bytes ({}x{}) into {}",
            artifact.bytes.len(),
            artifact.width,
            artifact.height,
            self.artifact_path.display()
        );
        log::debug!(
            "output buffer: {} bytes after {} growth steps",
            artifact.stats.capacity,
            artifact.stats.growth_count
        );
        Ok(())
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let input = fs::read(&cli.input).with_context(|| format!("failed to read {}", cli.input.display()))?;

    let options = DriverOptions::default()
        .with_initial_capacity(cli.initial_capacity)
        .with_max_capacity(cli.max_capacity);
    let mut sink = FileSink {
        artifact_path: cli.artifact,
        icc_path: cli.icc,
    };

    DecodeEventLoop::with_options(ContainerEngine::new(), options)
        .run_into(&input, &mut sink)
        .with_context(|| format!("failed to reconstruct {}", cli.input.display()))
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprint!("{}", e);
            process::exit(1);
        }
    };

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
