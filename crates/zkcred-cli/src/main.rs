//! # zkcred CLI entry point
//!
//! Parses arguments, sets up tracing, and dispatches to subcommand
//! handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zkcred_cli::demo::{run_demo, DemoArgs};
use zkcred_cli::ids::{run_ids, IdsArgs};

/// zkcred: privacy-preserving credential lifecycle toolkit.
///
/// Runs issuance, proof, and revocation scenarios against an in-process
/// ledger, and renders canonical ledger ids.
#[derive(Parser, Debug)]
#[command(name = "zkcred", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scenario through issue, prove, revoke, and re-prove.
    Demo(DemoArgs),

    /// Render or parse schema, credential definition, and registry ids.
    Ids(IdsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let result = match cli.command {
        Commands::Demo(args) => run_demo(&args),
        Commands::Ids(args) => run_ids(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_demo_defaults() {
        let cli = Cli::try_parse_from(["zkcred", "demo"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(!cli.log_json);
        match cli.command {
            Commands::Demo(args) => {
                assert!(args.scenario.is_none());
                assert!(!args.json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_demo_with_scenario() {
        let cli =
            Cli::try_parse_from(["zkcred", "-vv", "demo", "license.yaml", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Demo(args) => {
                assert_eq!(args.scenario, Some(PathBuf::from("license.yaml")));
                assert!(args.json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_ids_render() {
        let cli = Cli::try_parse_from([
            "zkcred", "ids", "--did", "did:sov:abc", "--name", "passport", "--version", "1.0",
            "--seq-no", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Ids(args) => {
                assert_eq!(args.seq_no, Some(7));
                assert_eq!(args.tag, "default");
                assert_eq!(args.registry_tag, "default");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ids_needs_components_or_parse() {
        assert!(Cli::try_parse_from(["zkcred", "ids", "--did", "did:sov:abc"]).is_err());
        assert!(Cli::try_parse_from(["zkcred", "ids", "--parse", "did:sov:abc:2:n:1"]).is_ok());
        assert!(Cli::try_parse_from([
            "zkcred", "ids", "--parse", "x", "--did", "did:sov:abc"
        ])
        .is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["zkcred", "demo", "--log-json", "-v"]).unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn no_subcommand_errors() {
        assert!(Cli::try_parse_from(["zkcred"]).is_err());
    }
}
