use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use commit_graph::cli::{self, Args};
use commit_graph::observability::init_logging;

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("Error reading commits from stdin: {e}");
        return ExitCode::FAILURE;
    }

    match cli::run(&args, &input) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error writing output: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
