use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agenda", about = "Agenda task storage and pomodoro annotations", version)]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.agenda/agenda.db]
    #[arg(long, env = "AGENDA_DB", global = true)]
    pub db: Option<String>,

    /// Path to the config file [default: ~/.agenda/config.toml]
    #[arg(long, env = "AGENDA_CONFIG", global = true)]
    pub config: Option<String>,

    /// Storage mode (local, logseq) [default: from config, else local]
    #[arg(long, env = "AGENDA_MODE", global = true)]
    pub mode: Option<String>,

    /// Logseq HTTP API token
    #[arg(long, env = "AGENDA_LOGSEQ_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Log storage activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List tasks
    List {
        /// Display as tree
        #[arg(long)]
        tree: bool,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show task details
    Show {
        /// Task id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Task id (generated for local storage; assigned by the host in logseq mode)
        #[arg(long)]
        id: Option<String>,
        /// Task description
        #[arg(short, long)]
        desc: Option<String>,
        /// Start date (ISO-8601)
        #[arg(long)]
        start: Option<String>,
        /// End date (ISO-8601)
        #[arg(long)]
        end: Option<String>,
        /// Priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Parent task id
        #[arg(long)]
        parent: Option<String>,
    },

    /// Edit a task
    Edit {
        /// Task id
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        desc: Option<String>,
        /// New start date (ISO-8601)
        #[arg(long)]
        start: Option<String>,
        /// New end date (ISO-8601)
        #[arg(long)]
        end: Option<String>,
        /// New priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// New parent task id
        #[arg(long)]
        parent: Option<String>,
    },

    /// Mark a task as done
    Done {
        /// Task id
        id: String,
    },

    /// Reopen a completed task
    Reopen {
        /// Task id
        id: String,
    },

    /// Remove a task
    Rm {
        /// Task id
        id: String,
    },

    /// Write local data to a timestamped JSON backup
    Export {
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: String,
    },

    /// Replace local data with a JSON backup
    Import {
        /// Backup file
        file: String,
    },

    /// Copy every task from one storage mode to another
    Migrate {
        /// Source mode
        #[arg(long)]
        from: String,
        /// Destination mode
        #[arg(long)]
        to: String,
    },

    /// Print the public ICS URL from local settings
    #[command(name = "share-url")]
    ShareUrl,

    /// Pomodoro annotations
    #[command(subcommand)]
    Pomo(PomoCommand),
}

#[derive(Subcommand)]
pub enum PomoCommand {
    /// Show sessions recorded in a text
    Show {
        /// Block text
        text: String,
        /// Text format (markdown, org)
        #[arg(short, long, default_value = "markdown")]
        format: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a text with a session appended
    Add {
        /// Block text
        text: String,
        #[command(flatten)]
        session: SessionArgs,
        /// Text format (markdown, org)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Print a text without its annotation
    Strip {
        /// Block text
        text: String,
        /// Text format (markdown, org)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Append a session to a Logseq block
    Record {
        /// Block uuid
        uuid: String,
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(clap::Args)]
pub struct SessionArgs {
    /// Session length in seconds
    #[arg(short, long)]
    pub length: i64,
    /// Session start [default: now, as epoch milliseconds]
    #[arg(long)]
    pub start: Option<i64>,
    /// Record an interrupted (partial) session
    #[arg(long)]
    pub partial: bool,
    /// Interruption remark
    #[arg(long, requires = "partial")]
    pub remark: Option<String>,
}
