use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskmgr",
    version,
    about = "Task list, calendar and countdowns backed by a local key-value file"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task
    Add(AddArgs),
    /// Change title, description, priority or due date
    Edit(EditArgs),
    /// Flip a task between active and completed
    Toggle { id: String },
    /// Delete a task permanently
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    /// List tasks through a filter
    List {
        /// all, active, completed, high, medium or low
        #[arg(long, short = 'f')]
        filter: Option<String>,
    },
    /// Show a month grid with task markers
    Calendar(CalendarArgs),
    /// Show totals and completion rate
    Stats,
    /// Run live countdowns for the listed tasks
    Watch {
        #[arg(long, short = 'f')]
        filter: Option<String>,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Delete every task
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short = 'd', conflicts_with = "no_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub no_description: bool,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// YYYY-MM-DD
    #[arg(long, conflicts_with = "no_due")]
    pub due: Option<String>,

    #[arg(long)]
    pub no_due: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CalendarArgs {
    /// YYYY-MM; defaults to the current month
    #[arg(long, short = 'm')]
    pub month: Option<String>,

    /// Move this many months from the shown month (negative goes back)
    #[arg(long, allow_hyphen_values = true)]
    pub shift: Option<i32>,

    /// YYYY-MM-DD; lists every task due that day
    #[arg(long, short = 's')]
    pub select: Option<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};

    #[test]
    fn parses_add_with_flags() {
        let cli = GlobalCli::parse_from([
            "taskmgr", "-vv", "add", "Pay rent", "--priority", "high", "--due", "2026-10-20",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.title, "Pay rent");
        assert_eq!(args.priority.as_deref(), Some("high"));
        assert_eq!(args.due.as_deref(), Some("2026-10-20"));
    }

    #[test]
    fn edit_rejects_conflicting_due_flags() {
        let parsed = GlobalCli::try_parse_from([
            "taskmgr", "edit", "1", "--due", "2026-10-20", "--no-due",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn calendar_accepts_negative_shift() {
        let cli = GlobalCli::parse_from(["taskmgr", "calendar", "--shift", "-2"]);
        let Command::Calendar(args) = cli.command else {
            panic!("expected calendar");
        };
        assert_eq!(args.shift, Some(-2));
    }
}
