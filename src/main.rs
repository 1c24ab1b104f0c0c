//! CLI entry point for clickup.

mod cli;
mod cmd;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use std::io;
use tracing_subscriber::EnvFilter;

use clickup::api::ApiError;
use clickup::auth::Session;
use clickup::config::Config;
use clickup::ui::colors;

use cli::{
    AuthCommands, Cli, Commands, CommentCommands, ConfigCommands, LinkCommands, SpaceCommands,
    SprintCommands, StatusCommands, TaskCommands,
};

/// Environment variable holding `tracing` filter directives.
const LOG_ENV: &str = "CLICKUP_LOG";

/// Exit status when the user has to log in (again).
const EXIT_AUTH: i32 = 4;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    if cli.quiet {
        std::env::set_var("CLICKUP_QUIET", "1");
    }
    init_logging(cli.verbose);

    let mut session = match Config::load() {
        Ok(config) => Session::new(config),
        Err(e) => {
            eprintln!("{} {:#}", colors::error("error:"), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, &mut session) {
        std::process::exit(report(&e, &session));
    }
}

/// Print the error and pick the exit status.
fn report(err: &anyhow::Error, session: &Session) -> i32 {
    let api_error = err.chain().find_map(|cause| cause.downcast_ref::<ApiError>());
    match api_error {
        Some(api) if api.requires_login() => {
            if matches!(api, ApiError::AuthExpired { .. }) {
                if let Err(e) = session.invalidate() {
                    tracing::warn!(error = %e, "could not clear stored credentials");
                }
            }
            eprintln!("{} {}", colors::error("error:"), api);
            EXIT_AUTH
        }
        _ => {
            eprintln!("{} {:#}", colors::error("error:"), err);
            1
        }
    }
}

fn run(command: Commands, session: &mut Session) -> Result<()> {
    match command {
        Commands::Auth { command } => match command {
            AuthCommands::Login { with_token, oauth } => {
                cmd::auth::cmd_login(session, with_token, oauth)
            }
            AuthCommands::Logout => cmd::auth::cmd_logout(session),
            AuthCommands::Status => cmd::auth::cmd_status(session),
        },
        Commands::Status { command } => match command {
            StatusCommands::Set { status, task } => {
                cmd::status::cmd_status_set(session, &status, task.as_deref())
            }
            StatusCommands::List { space } => cmd::status::cmd_status_list(session, space.as_deref()),
        },
        Commands::Link { command } => match command {
            LinkCommands::Pr { number, target } => cmd::link::cmd_link_pr(session, number, &target),
            LinkCommands::Branch { target } => cmd::link::cmd_link_branch(session, &target),
            LinkCommands::Commit { sha, target } => {
                cmd::link::cmd_link_commit(session, sha.as_deref(), &target)
            }
            LinkCommands::Sync { number, target } => {
                cmd::link::cmd_link_sync(session, number, &target)
            }
        },
        Commands::Task { command } => match command {
            TaskCommands::View { task, json } => cmd::task::cmd_task_view(session, task.as_deref(), json),
            TaskCommands::Search {
                query,
                comments,
                json,
            } => cmd::task::cmd_task_search(session, &query, comments, json),
        },
        Commands::Comment { command } => match command {
            CommentCommands::Add { task, body, editor } => {
                cmd::comment::cmd_comment_add(session, task.as_deref(), body.as_deref(), editor)
            }
            CommentCommands::List { task, json } => {
                cmd::comment::cmd_comment_list(session, task.as_deref(), json)
            }
        },
        Commands::Sprint { command } => match command {
            SprintCommands::List { folder, json } => {
                cmd::sprint::cmd_sprint_list(session, folder.as_deref(), json)
            }
            SprintCommands::Current { folder, json } => {
                cmd::sprint::cmd_sprint_current(session, folder.as_deref(), json)
            }
        },
        Commands::Inbox { days, limit, json } => cmd::inbox::cmd_inbox(session, days, limit, json),
        Commands::Space { command } => match command {
            SpaceCommands::List => cmd::space::cmd_space_list(session),
            SpaceCommands::Select { id, directory } => {
                cmd::space::cmd_space_select(session, id.as_deref(), directory)
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => cmd::config::cmd_config_get(session, &key),
            ConfigCommands::Set { key, value } => cmd::config::cmd_config_set(session, &key, &value),
            ConfigCommands::Path => cmd::config::cmd_config_path(),
        },
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "clickup", &mut io::stdout());
            Ok(())
        }
        Commands::Version => {
            println!(
                "clickup {} ({}, built {})",
                env!("CARGO_PKG_VERSION"),
                env!("GIT_SHA"),
                env!("BUILD_DATE")
            );
            Ok(())
        }
    }
}
