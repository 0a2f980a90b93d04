use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::task::Filter;

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "A small client for your to-do list")]
pub struct Cli {
    /// Use a different config file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the to-do API.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in to an existing account.
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored login.
    Logout,
    /// Print tasks.
    List {
        #[arg(long, short, default_value = "all")]
        status: Filter,
    },
    /// Create a task.
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Change the title or description of a task.
    Edit {
        id: i64,
        #[arg(long, short)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Flip a task between pending and completed.
    Toggle { id: i64 },
    /// Delete a task.
    Rm {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Open the interactive dashboard (default).
    Dashboard,
}
