//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::ingest::PairPolicy;

#[derive(Parser)]
#[command(
    name = "kviz",
    about = "Reconstruct a timeline model from a kernel ktrace binary",
    after_help = "\
EXAMPLES:
    kviz trace.ktrace                         Load and summarize
    kviz --text --limit 64 trace.ktrace       Decode the first 2 KiB to stderr
    kviz --stats --export out.json trace.ktrace"
)]
pub struct Args {
    /// Trace file to ingest
    pub trace: PathBuf,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Echo a human-readable decode line per record to stderr
    #[arg(long)]
    pub text: bool,

    /// Stop after N 32-byte units
    #[arg(long, value_name = "N")]
    pub limit: Option<u64>,

    /// Print a category summary to stderr at EOF
    #[arg(long)]
    pub stats: bool,

    /// Export the finalized model as Chrome trace JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Flow-pairing backlog rule
    #[arg(long, value_enum, default_value = "drop-on-backlog")]
    pub pair_policy: PairPolicy,
}
