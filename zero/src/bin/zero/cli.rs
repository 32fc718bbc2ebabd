use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};
use zero::params::{DEFAULT_DEGREE_LOG, DEFAULT_EXPAND_FACTOR};

#[derive(Parser)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// FRI settings overriding the ones of the params file.
#[derive(Args, Debug)]
pub(crate) struct FriArgs {
    /// Number of FRI queries.
    #[arg(long, env = "ZERO_BIN_LAMBDA")]
    pub(crate) lambda: Option<usize>,
    /// Proof-of-work difficulty before the queries are drawn.
    #[arg(long, env = "ZERO_BIN_GRINDING_BITS")]
    pub(crate) grinding_bits: Option<u32>,
    /// Comma separated folding steps, e.g. `3,3,2,1`.
    #[arg(long, env = "ZERO_BIN_STEP_LIST", value_delimiter = ',')]
    pub(crate) step_list: Option<Vec<usize>>,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Executes the blocks of a trace file and writes a proof of the
    /// resulting witness.
    Prove {
        /// JSON file with the blocks to execute.
        #[arg(long, env = "ZERO_BIN_TRACE", value_hint = ValueHint::FilePath)]
        trace: PathBuf,
        /// Parameters written by `setup`.
        #[arg(long, env = "ZERO_BIN_PARAMS", value_hint = ValueHint::FilePath)]
        params: PathBuf,
        /// Where to write the proof.
        #[arg(long, env = "ZERO_BIN_PROOF", value_hint = ValueHint::FilePath)]
        proof: PathBuf,
        #[command(flatten)]
        fri: FriArgs,
    },
    /// Checks a proof against the blocks of a trace file.
    Verify {
        #[arg(long, env = "ZERO_BIN_TRACE", value_hint = ValueHint::FilePath)]
        trace: PathBuf,
        #[arg(long, env = "ZERO_BIN_PARAMS", value_hint = ValueHint::FilePath)]
        params: PathBuf,
        #[arg(long, env = "ZERO_BIN_PROOF", value_hint = ValueHint::FilePath)]
        proof: PathBuf,
    },
    /// Writes a params file.
    Setup {
        #[arg(long, env = "ZERO_BIN_PARAMS", value_hint = ValueHint::FilePath)]
        params: PathBuf,
        /// Log of the number of trace rows.
        #[arg(long, env = "ZERO_BIN_DEGREE_LOG", default_value_t = DEFAULT_DEGREE_LOG)]
        degree_log: usize,
        /// Log of the blow-up of the evaluation domain.
        #[arg(long, env = "ZERO_BIN_EXPAND_FACTOR", default_value_t = DEFAULT_EXPAND_FACTOR)]
        expand_factor: usize,
        #[command(flatten)]
        fri: FriArgs,
    },
}
