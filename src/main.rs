/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;
use log::info;

const EXIT_FATAL: i32 = 1;
const EXIT_EMISSION: i32 = 2;
const EXIT_CONFIG: i32 = 3;

#[derive(clap::Args)]
struct GenerateArgs {
    #[clap(long, value_parser)]
    seed: Option<u64>,
    #[clap(long, value_parser)]
    class_name: Option<String>,
    /// Overrides one knob, as NAME=VALUE. May be repeated.
    #[clap(long, value_parser)]
    knob: Vec<String>,
    /// Where to write the class. Defaults to stdout.
    #[clap(short, long, value_parser)]
    output: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Command {
    Generate(GenerateArgs),
    /// Prints every knob with its default value and range.
    ListKnobs,
}

#[derive(clap::Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

fn exit_code(err: &jvmfuzz::FuzzError) -> i32 {
    if err.is_fatal() {
        return EXIT_FATAL;
    }
    match err {
        jvmfuzz::FuzzError::Emission { .. } => EXIT_EMISSION,
        jvmfuzz::FuzzError::UnknownKnob(_) | jvmfuzz::FuzzError::InvalidKnobValue { .. } => {
            EXIT_CONFIG
        }
        _ => EXIT_FATAL,
    }
}

fn exit_on_error(err: jvmfuzz::FuzzError) -> ! {
    let code = exit_code(&err);
    match code {
        EXIT_EMISSION => error!("Could not emit the generated class: {}", err),
        EXIT_CONFIG => error!("Invalid configuration: {}", err),
        _ => error!("Generator bug: {}", err),
    }
    process::exit(code)
}

fn to_config(args: &GenerateArgs) -> jvmfuzz::Result<jvmfuzz::Config> {
    let knobs = jvmfuzz::Knobs::from_assignments(args.knob.iter().map(String::as_str))?;
    let class_name = args
        .class_name
        .clone()
        .unwrap_or_else(|| jvmfuzz::Config::default().class_name);
    Ok(jvmfuzz::Config::new(&class_name, knobs))
}

fn generate(args: GenerateArgs) -> jvmfuzz::Result<()> {
    let config = to_config(&args)?;
    let seed = args.seed.unwrap_or_else(rand::random::<u64>);
    let program = jvmfuzz::gen_program(seed, &config)?;
    let source = program.to_java_source()?;
    match args.output {
        None => println!("{}", source),
        Some(filepath) => {
            if let Err(err) = fs::write(&filepath, source) {
                error!(
                    "Error: \"{}\" while attempting to write to {}",
                    err,
                    filepath.display()
                );
                process::exit(EXIT_FATAL)
            }
            info!("Wrote {} to {}", config.class_name, filepath.display());
        }
    }
    Ok(())
}

fn list_knobs() {
    for knob in jvmfuzz::ALL_KNOBS {
        println!(
            "{:<28} default {:>3}  range {}..={}",
            knob.name(),
            knob.default_value(),
            knob.min_value(),
            knob.max_value()
        );
    }
}

fn main() {
    env_logger::init();
    let args = Cli::parse();
    match args.command {
        Command::Generate(generate_args) => {
            if let Err(err) = generate(generate_args) {
                exit_on_error(err)
            }
        }
        Command::ListKnobs => list_knobs(),
    }
}
