//! CLI argument definitions for Cairn.

use clap::{Parser, Subcommand};

/// Cairn - a task manager built around renegotiating overdue work.
///
/// Run `cairn` with no command for a grouped view of today. Start a new
/// data directory with `cairn system init`.
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(author, version, about = "A task manager for people who renegotiate with their day", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Keep data under <path> instead of the platform data directory.
    /// Can also be set via the CAIRN_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "CAIRN_DATA_DIR")]
    pub data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Category management commands
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Saved view commands (named filter sets)
    View {
        #[command(subcommand)]
        command: ViewCommands,
    },

    /// Outcome management commands (longer-horizon goals)
    Outcome {
        #[command(subcommand)]
        command: OutcomeCommands,
    },

    /// Commitment management commands (recurring promises toward an outcome)
    Commitment {
        #[command(subcommand)]
        command: CommitmentCommands,
    },

    /// Renegotiate an overdue task instead of letting it rot
    ///
    /// Without --preview this applies the chosen action immediately.
    /// Use --preview first to see available actions and split suggestions.
    Renegotiate {
        /// Task ID (e.g., cn-a1b2)
        task: String,

        /// Action to take
        #[arg(long, value_parser = ["reschedule", "split", "park", "drop"])]
        action: Option<String>,

        /// Why the task did not happen as planned
        #[arg(long, value_parser = ["too_big", "wrong_time", "blocked", "lost_interest", "other"])]
        reason: Option<String>,

        /// Free-text explanation, required with --reason other
        #[arg(long)]
        note: Option<String>,

        /// One-tap reschedule target
        #[arg(long, value_parser = ["tomorrow", "next_week"], conflicts_with = "date")]
        pick: Option<String>,

        /// Custom reschedule date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Sub-step title for split (repeat for each step; omit to use suggestions)
        #[arg(long = "step")]
        steps: Vec<String>,

        /// Estimated total minutes, used to size split steps
        #[arg(long)]
        estimate: Option<u32>,

        /// Show available actions and split suggestions without applying anything
        #[arg(long)]
        preview: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Start the HTTP API server (requires 'server' feature)
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "CAIRN_PORT", default_value = "4277")]
        port: u16,

        /// Host address to bind to (use 0.0.0.0 for network access)
        #[arg(long, env = "CAIRN_HOST", default_value = "127.0.0.1")]
        host: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    Add {
        /// Task title
        title: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Due time (HH:MM, 24-hour)
        #[arg(long)]
        time: Option<String>,

        /// Priority
        #[arg(long, value_parser = ["low", "medium", "high"])]
        priority: Option<String>,

        /// Category ID (e.g., cnc-a1b2)
        #[arg(long)]
        category: Option<String>,

        /// Outcome ID this task contributes to (e.g., cno-a1b2)
        #[arg(long)]
        outcome: Option<String>,

        /// Repeat cadence, making the task recurring
        #[arg(long, value_parser = ["daily", "weekly", "monthly", "weekdays"])]
        repeat: Option<String>,

        /// Last date recurrence may land on (YYYY-MM-DD, with --repeat)
        #[arg(long)]
        until: Option<String>,
    },

    /// List tasks grouped into due-date buckets
    List {
        /// Filter by status (comma-separated)
        #[arg(long)]
        status: Option<String>,

        /// Filter by category ID; "none" matches uncategorized tasks
        #[arg(long)]
        category: Option<String>,

        /// Filter by priority (comma-separated)
        #[arg(long)]
        priority: Option<String>,

        /// Filter by due bucket
        #[arg(long, value_parser = ["overdue", "today", "tomorrow", "this_week", "next_week", "no_date"])]
        due: Option<String>,

        /// Only recurring tasks (or only one-off tasks with --recurring false)
        #[arg(long)]
        recurring: Option<bool>,

        /// Apply a saved view's filters (by view ID or name)
        #[arg(long)]
        view: Option<String>,

        /// Sort order inside each bucket (overrides the configured default)
        #[arg(long, value_parser = ["manual", "due_date", "created_date"])]
        sort: Option<String>,

        /// Flat list without bucket grouping
        #[arg(long)]
        flat: bool,
    },

    /// Show task details with renegotiation history
    Show {
        /// Task ID (e.g., cn-a1b2)
        id: String,
    },

    /// Update a task
    ///
    /// Fields accept "none" to clear: --due none, --priority none,
    /// --category none, --outcome none, --repeat none.
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New status
        #[arg(long, value_parser = ["active", "done", "dropped", "skipped"])]
        status: Option<String>,

        /// New due date (YYYY-MM-DD, or "none" to clear)
        #[arg(long)]
        due: Option<String>,

        /// New due time (HH:MM, or "none" to clear)
        #[arg(long)]
        time: Option<String>,

        /// New priority
        #[arg(long, value_parser = ["low", "medium", "high", "none"])]
        priority: Option<String>,

        /// New category ID ("none" moves the task to uncategorized)
        #[arg(long)]
        category: Option<String>,

        /// New outcome ID ("none" detaches)
        #[arg(long)]
        outcome: Option<String>,

        /// New manual-sort position
        #[arg(long)]
        position: Option<i64>,

        /// New repeat cadence ("none" stops recurrence)
        #[arg(long, value_parser = ["daily", "weekly", "monthly", "weekdays", "none"])]
        repeat: Option<String>,

        /// Last date recurrence may land on (YYYY-MM-DD, with --repeat)
        #[arg(long)]
        until: Option<String>,
    },

    /// Mark a task done (a recurring task spawns its next occurrence)
    Done {
        /// Task ID
        id: String,
    },

    /// Skip a recurring occurrence without doing it (resets the streak)
    Skip {
        /// Task ID
        id: String,
    },

    /// Drop a task (kept for history, hidden from lists)
    Drop {
        /// Task ID
        id: String,
    },

    /// Reassign manual-sort positions from an explicit ID order
    Reorder {
        /// Task IDs in the desired order
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Category subcommands
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Create a new category
    Add {
        /// Category name
        name: String,

        /// Display color (CSS-style, e.g., "#7c9a72")
        #[arg(long)]
        color: Option<String>,

        /// Display icon name
        #[arg(long)]
        icon: Option<String>,
    },

    /// List categories
    List,

    /// Delete a category (refused while active tasks still use it)
    Rm {
        /// Category ID (e.g., cnc-a1b2)
        id: String,
    },
}

/// Saved view subcommands
#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// List saved views, system views first
    List,

    /// Save the given filter query as a named view
    ///
    /// The query uses the same keys the filter bar produces, e.g.
    /// "statuses=active&due=today" or "categories=cnc-a1b2,none".
    Save {
        /// View name (at most 30 characters)
        name: String,

        /// Filter query string
        query: String,
    },

    /// Remove a saved view (system views cannot be removed)
    Rm {
        /// View ID
        id: String,
    },
}

/// Outcome subcommands
#[derive(Subcommand, Debug)]
pub enum OutcomeCommands {
    /// Create a new outcome
    Add {
        /// Outcome title
        title: String,

        /// Detailed description
        #[arg(long)]
        description: Option<String>,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,
    },

    /// List outcomes
    List,

    /// Show outcome details with its active tasks and commitments
    Show {
        /// Outcome ID (e.g., cno-a1b2)
        id: String,
    },

    /// Update an outcome ("none" clears --description and --target)
    Update {
        /// Outcome ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description ("none" clears)
        #[arg(long)]
        description: Option<String>,

        /// New target date (YYYY-MM-DD, or "none" to clear)
        #[arg(long)]
        target: Option<String>,

        /// New status
        #[arg(long, value_parser = ["active", "achieved", "abandoned"])]
        status: Option<String>,
    },

    /// Delete an outcome (refused while active tasks or commitments reference it)
    Rm {
        /// Outcome ID
        id: String,
    },
}

/// Commitment subcommands
#[derive(Subcommand, Debug)]
pub enum CommitmentCommands {
    /// Create a new commitment toward an outcome
    Add {
        /// Outcome ID the commitment supports (e.g., cno-a1b2)
        outcome: String,

        /// Commitment title
        title: String,

        /// Free-text cadence (e.g., "3x per week")
        #[arg(long)]
        cadence: Option<String>,
    },

    /// List commitments
    List {
        /// Filter by outcome ID
        #[arg(long)]
        outcome: Option<String>,
    },

    /// Delete a commitment
    Rm {
        /// Commitment ID (e.g., cnm-a1b2)
        id: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key (output-format, sort-mode)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (output-format, sort-mode)
        key: String,
        /// Configuration value
        value: String,
    },

    /// List all configuration values
    List,
}

/// System administration subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize the cairn data directory
    Init,
}
