//! Mechanical gates for the brick workflow.
//!
//! Each subcommand is one independent checkpoint. Exit codes are stable:
//! 0 when the gate passes, 1 for a policy violation, 2 for configuration or
//! tooling failures. `brickgate test` passes a failing command's own exit code
//! through.

use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};

use brickgate::completion::run_completion_gate;
use brickgate::contract::print_contract;
use brickgate::exit_codes;
use brickgate::io::paths::Workflow;
use brickgate::io::process::SystemRunner;
use brickgate::io::snapshot::BaselineError;
use brickgate::logging;
use brickgate::packet::build_packet;
use brickgate::scope::{run_scope_check, snapshot_init};
use brickgate::test_gate::run_test_gate;

#[derive(Parser)]
#[command(
    name = "brickgate",
    version,
    about = "Scope, test and completion gates for contract-driven changes"
)]
struct Cli {
    /// Workflow root holding the contract, state and artifacts.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run TEST_COMMAND from the context document and record the outcome.
    Test,
    /// Check that every changed file is listed in the contract's FILES section.
    Scope {
        /// Record the snapshot baseline for non-git roots and exit.
        #[arg(long)]
        snapshot_init: bool,
    },
    /// Run the completion gate against the reviewer verdict.
    State {
        /// Request completion of the current brick.
        #[arg(long)]
        complete: bool,
    },
    /// Print the parsed brick contract.
    Contract,
    /// Assemble the reviewer packet (runs the test gate).
    Packet,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            exit_codes::CONFIG
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    if let Command::State { complete: false } = cli.command {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "only --complete is supported")
            .exit();
    }
    let workflow = Workflow::open(&cli.root)?;
    match cli.command {
        Command::Test => cmd_test(&workflow),
        Command::Scope { snapshot_init } => Ok(cmd_scope(&workflow, snapshot_init)),
        Command::State { .. } => cmd_state(&workflow),
        Command::Contract => {
            print!("{}", print_contract(&workflow)?);
            Ok(exit_codes::OK)
        }
        Command::Packet => cmd_packet(&workflow),
    }
}

fn cmd_test(workflow: &Workflow) -> Result<i32> {
    let outcome = run_test_gate(workflow)?;
    for line in outcome.report_lines() {
        println!("{line}");
    }
    Ok(outcome.exit_code)
}

/// Tooling failures are reported on stdout with the scope output.
fn cmd_scope(workflow: &Workflow, init: bool) -> i32 {
    let result = if init {
        snapshot_init(workflow).map(|path| {
            println!("SNAPSHOT_INIT_OK: {path}");
            exit_codes::OK
        })
    } else {
        run_scope_check(workflow).map(|report| {
            for line in report.report_lines() {
                println!("{line}");
            }
            report.exit_code()
        })
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<BaselineError>() {
                Some(baseline) => println!("ERROR: {baseline}"),
                None => println!("ERROR: {err:#}"),
            }
            exit_codes::CONFIG
        }
    }
}

fn cmd_state(workflow: &Workflow) -> Result<i32> {
    let outcome = run_completion_gate(workflow)?;
    println!("{}", outcome.report_line());
    Ok(outcome.exit_code())
}

fn cmd_packet(workflow: &Workflow) -> Result<i32> {
    let runner = SystemRunner::from_config(&workflow.config.test);
    let report = build_packet(workflow, &runner)?;
    for line in report.report_lines() {
        println!("{line}");
    }
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scope_snapshot_init_with_root() {
        let cli = Cli::parse_from(["brickgate", "scope", "--snapshot-init", "--root", "/tmp/w"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/w"));
        assert!(matches!(
            cli.command,
            Command::Scope {
                snapshot_init: true
            }
        ));
    }

    #[test]
    fn parse_state_complete() {
        let cli = Cli::parse_from(["brickgate", "state", "--complete"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert!(matches!(cli.command, Command::State { complete: true }));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["brickgate", "deploy"]).is_err());
    }
}
