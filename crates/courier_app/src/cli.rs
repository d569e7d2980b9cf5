use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(about = "Publish markdown articles to note.com through its editor")]
pub struct Cli {
    /// Configuration file (ron). Defaults to ./courier.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run the browser without a window.
    #[arg(long, global = true)]
    pub headless: bool,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish backup files, one article per file, in the given order
    Post {
        /// Article backup in `# title` / `**Tags:**` / `---` format
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Cover image attached to every article
        #[arg(long)]
        image: Option<PathBuf>,

        /// Price in yen; 0 publishes for free
        #[arg(long)]
        price: Option<u32>,

        /// Seconds to wait between two articles
        #[arg(long)]
        interval: Option<u64>,

        /// Publish again even if the ledger lists the file
        #[arg(long)]
        force: bool,
    },

    /// Log in once and report whether it worked
    TestLogin,
}
