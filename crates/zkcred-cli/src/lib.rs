//! # zkcred-cli — Command-Line Driver
//!
//! Runs the credential lifecycle end to end against an in-process ledger
//! and renders canonical artifact identifiers.
//!
//! ## Subcommands
//!
//! - `zkcred demo [scenario.yaml]`: issue, prove, verify, revoke, and
//!   re-verify. Without a file, a built-in employee-credential scenario
//!   runs.
//! - `zkcred ids`: print the schema, credential definition, and
//!   revocation registry ids for a set of components.
//!
//! ```bash
//! zkcred demo
//! zkcred -v demo scenarios/license.yaml --json
//! zkcred ids --did did:sov:issuer1 --name passport --version 1.0 --seq-no 12
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers return an exit code.
//! - Handlers delegate to the library crates. No lifecycle logic here.

pub mod demo;
pub mod ids;
pub mod scenario;
