//! # clickup - ClickUp from the terminal
//!
//! Library half of the `clickup` CLI. Everything that talks to ClickUp,
//! GitHub or git lives here; the binary only parses arguments and prints.
//!
//! ## Modules
//!
//! - [`api`] - HTTP transport with rate limiting, typed ClickUp operations
//! - [`auth`] - credential storage, OAuth login, the per-run [`auth::Session`]
//! - [`config`] - `config.yml` and per-directory defaults
//! - [`taskid`] - task IDs in branch names and user input
//! - [`status_match`] - fuzzy resolution of status names
//! - [`link_block`] - idempotent link blocks inside markdown documents
//! - [`links`] - where a link goes: task description, custom field, PR body
//! - [`fanout`] - bounded concurrent requests under a deadline
//! - [`search`] and [`inbox`] - workspace scans built on [`fanout`]
//! - [`sprint`] - sprint folders, the current sprint and its task board
//! - [`git`] and [`github`] - local repository and `gh` CLI access
//! - [`ui`] - colours and text formatting shared by the commands
//!
//! ## Example
//!
//! ```no_run
//! use clickup::api::ClickUpClient;
//! use clickup::taskid::parse_user_input;
//!
//! let client = ClickUpClient::with_token("pk_123");
//! let task = client.get_task(&parse_user_input("CU-86d1u2bz4")).expect("task");
//! println!("{} is {}", task.name, task.status.status);
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod fanout;
pub mod git;
pub mod github;
pub mod inbox;
pub mod link_block;
pub mod links;
pub mod search;
pub mod sprint;
pub mod status_match;
pub mod taskid;
pub mod ui;
