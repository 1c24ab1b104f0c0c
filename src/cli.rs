//! CLI argument definitions for clickup.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "clickup")]
#[command(version)]
#[command(about = "ClickUp from the terminal", long_about = None)]
#[command(
    after_help = "GETTING STARTED:\n    clickup auth login          Authenticate with a personal token or OAuth\n    clickup space select        Pick the default space\n    clickup status set \"in review\"  Move the task named in your branch"
)]
pub struct Cli {
    /// Suppress all non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug details to stderr (CLICKUP_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in, log out and inspect the stored credential
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Change or list task statuses
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },
    /// Link GitHub pull requests, branches and commits to a task
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },
    /// View and search tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Add and read task comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },
    /// Show the sprints of the space and the current sprint's board
    Sprint {
        #[command(subcommand)]
        command: SprintCommands,
    },
    /// Show recent comments that @mention you
    ///
    /// ClickUp has no public inbox API, so this scans the comments of
    /// recently updated tasks for your username.
    Inbox {
        /// How many days back to search
        #[arg(long, default_value_t = clickup::inbox::DEFAULT_DAYS)]
        days: u32,
        /// Maximum number of tasks to scan for mentions
        #[arg(long, default_value_t = clickup::inbox::DEFAULT_TASK_LIMIT)]
        limit: usize,
        /// Print mentions as JSON
        #[arg(long)]
        json: bool,
    },
    /// List spaces and pick the default one
    Space {
        #[command(subcommand)]
        command: SpaceCommands,
    },
    /// Read and change configuration values
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion script
    Completion {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Show version and build information
    Version,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Authenticate with ClickUp
    ///
    /// Without flags, prompts for a personal API token. With --oauth, opens
    /// the browser and waits for the redirect on a local port (needs
    /// CLICKUP_CLIENT_ID and CLICKUP_CLIENT_SECRET).
    Login {
        /// Read a personal API token from stdin
        #[arg(long, conflicts_with = "oauth")]
        with_token: bool,
        /// Log in through the browser
        #[arg(long)]
        oauth: bool,
    },
    /// Remove the stored credential
    Logout,
    /// Show who you are logged in as
    Status,
}

#[derive(Subcommand)]
pub enum StatusCommands {
    /// Set the status of a task; the name is matched fuzzily
    Set {
        /// Target status, e.g. "review" for "in review"
        status: String,
        /// Task ID (defaults to the one in the branch name)
        task: Option<String>,
    },
    /// List the statuses available in a space
    List {
        /// Space ID (defaults to the configured space)
        #[arg(long)]
        space: Option<String>,
    },
}

/// Task and repository selection shared by the link commands.
#[derive(Args, Debug, Clone, Default)]
pub struct LinkTarget {
    /// Task ID (defaults to the one in the branch name)
    #[arg(long)]
    pub task: Option<String>,
    /// GitHub repository as owner/repo (defaults to the origin remote)
    #[arg(long)]
    pub repo: Option<String>,
}

#[derive(Subcommand)]
pub enum LinkCommands {
    /// Link a pull request to a task
    Pr {
        /// PR number (defaults to the PR of the current branch)
        number: Option<u64>,
        #[command(flatten)]
        target: LinkTarget,
    },
    /// Link the current branch to a task
    Branch {
        #[command(flatten)]
        target: LinkTarget,
    },
    /// Link a commit to a task
    Commit {
        /// Commit to link (defaults to HEAD)
        sha: Option<String>,
        #[command(flatten)]
        target: LinkTarget,
    },
    /// Write the task into the PR body and link the PR to the task
    Sync {
        /// PR number (defaults to the PR of the current branch)
        number: Option<u64>,
        #[command(flatten)]
        target: LinkTarget,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Show a task
    View {
        /// Task ID (defaults to the one in the branch name)
        task: Option<String>,
        /// Print the raw task as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search tasks by name, optionally in comments too
    Search {
        query: String,
        /// Also look for the query in task comments (slower)
        #[arg(long)]
        comments: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Add a comment to a task
    ///
    /// Without a body, or with --editor, opens the editor from the config
    /// (or $VISUAL / $EDITOR) to write it.
    Add {
        /// Task ID (defaults to the one in the branch name)
        task: Option<String>,
        /// Comment text
        body: Option<String>,
        /// Write the comment in your editor, starting from BODY
        #[arg(short, long)]
        editor: bool,
    },
    /// List the comments on a task
    List {
        /// Task ID (defaults to the one in the branch name)
        task: Option<String>,
        /// Print comments as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SprintCommands {
    /// List the sprints in the sprint folder
    List {
        /// Sprint folder ID; remembered for later runs
        #[arg(long)]
        folder: Option<String>,
        /// Print sprints as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the running sprint's tasks grouped by status
    Current {
        /// Sprint folder ID; remembered for later runs
        #[arg(long)]
        folder: Option<String>,
        /// Print the sprint and its tasks as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SpaceCommands {
    /// List the spaces of the workspace
    List,
    /// Choose the default space
    Select {
        /// Space ID; prompts when omitted
        id: Option<String>,
        /// Only use this space inside the current directory
        #[arg(long)]
        directory: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the path of the configuration file
    Path,
}
