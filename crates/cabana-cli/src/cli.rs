use std::path::PathBuf;

use cabana_core::{Category, Collection};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "cabana")]
#[command(about = "Votes, quotes and anonymous complaints for the cabana party")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Join the party under a display name
    Join {
        /// Display name (case-sensitive)
        name: Vec<String>,
    },
    /// Show who is using this device
    Whoami,
    /// Forget the display name on this device
    Logout,
    /// List everyone who joined
    Participants {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Vote for a candidate in a category
    Vote {
        /// Category code (MFP, CRINGE, DJ, ...)
        category: Category,
        /// Candidate name
        candidate: Vec<String>,
    },
    /// Take back your vote in a category
    Unvote {
        /// Category code
        category: Category,
    },
    /// Show vote counts
    Leaderboard {
        /// Only this category (all categories when omitted)
        category: Option<Category>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Quote wall
    Wall {
        #[command(subcommand)]
        command: WallCommands,
    },
    /// File an anonymous complaint with the manager
    Complain {
        /// Complaint text
        text: Vec<String>,
    },
    /// List filed complaints and the manager's replies
    Complaints {
        /// Number of complaints to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Roast a participant
    Roast {
        /// Who to roast
        name: Vec<String>,
    },
    /// Spin the dare wheel
    Dare,
    /// Print a collection every time it changes, until Ctrl-C
    Watch {
        /// participants, votes, quotes or complaints
        collection: Collection,
    },
    /// Show connection and configuration status
    Status,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum WallCommands {
    /// Pin a quote to the wall
    Add {
        /// Who said it
        #[arg(short, long)]
        author: String,
        /// What they said
        text: Vec<String>,
    },
    /// Show the wall, newest first
    List {
        /// Number of quotes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
