use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use taskdeck::cli::{Cli, Command};
use taskdeck::config::{self, Config, API_URL_ENV};
use taskdeck::task::{validate_description, validate_title};
use taskdeck::ui::{self, Exit};
use taskdeck::{CredentialStore, Dashboard, FileCredentialStore, Filter, HttpTaskClient, Task, TaskApi};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The dashboard owns the screen, so its logs go to a file instead of stderr.
fn init_tracing(log_file: Option<PathBuf>) {
    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Dashboard);

    let interactive = matches!(command, Command::Dashboard);
    let log_file = if interactive {
        Some(config::data_dir().map_or_else(|| PathBuf::from("taskdeck.log"), |d| d.join("taskdeck.log")))
    } else {
        None
    };
    init_tracing(log_file);

    let config_path = cli.config.or_else(config::default_config_path);
    let config = match config_path {
        Some(path) => config::load_config(&path)?,
        None => Config::default(),
    }
    .with_overrides(std::env::var(API_URL_ENV).ok(), cli.api_url);
    tracing::debug!("Using API at {}", config.api_url);

    let store: Arc<dyn CredentialStore> = match config.credentials_path() {
        Some(path) => Arc::new(FileCredentialStore::new(path)),
        None => {
            tracing::warn!("No data directory available, logins will not be kept");
            Arc::new(FileCredentialStore::unavailable())
        }
    };
    let client = HttpTaskClient::new(&config.api_url, store);

    match command {
        Command::Signup {
            email,
            name,
            password,
        } => {
            let user = client.signup(&email, &password, &name).await?;
            println!("Welcome, {}! You are signed in as {}.", user.name, user.email);
        }
        Command::Signin { email, password } => {
            let user = client.signin(&email, &password).await?;
            println!("Signed in as {}.", user.email);
        }
        Command::Logout => {
            client.logout();
            println!("Logged out.");
        }
        Command::List { status } => cmd_list(&client, status).await?,
        Command::Add { title, description } => {
            let title = validate_title(&title)?;
            if let Some(description) = &description {
                validate_description(description)?;
            }
            let task = client.create_task(&title, description.as_deref()).await?;
            println!("Created task #{}: {}", task.id, task.title);
        }
        Command::Edit {
            id,
            title,
            description,
        } => {
            let title = title.as_deref().map(validate_title).transpose()?;
            if let Some(description) = &description {
                validate_description(description)?;
            }
            if title.is_none() && description.is_none() {
                anyhow::bail!("Nothing to change, pass --title and/or --description");
            }
            let task = client
                .update_task(id, title.as_deref(), description.as_deref())
                .await?;
            println!("Updated task #{}: {}", task.id, task.title);
        }
        Command::Toggle { id } => {
            let task = client.toggle_complete(id).await?;
            let state = if task.completed { "completed" } else { "pending" };
            println!("Task #{} is now {}.", task.id, state);
        }
        Command::Rm { id, yes } => {
            if !yes && !confirm(&format!("Are you sure you want to delete task #{}?", id))? {
                println!("Aborted.");
                return Ok(());
            }
            client.delete_task(id).await?;
            println!("Deleted task #{}.", id);
        }
        Command::Dashboard => run_dashboard(client).await?,
    }

    Ok(())
}

async fn cmd_list(client: &HttpTaskClient, status: Filter) -> Result<()> {
    let tasks = client.list_tasks(status).await?;
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    for task in &tasks {
        print_task(task);
    }
    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    println!("[{}] #{:<5} {}", mark, task.id, task.title);
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        println!("           {}", description);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read confirmation")?;
    Ok(matches!(input.trim(), "y" | "Y" | "yes"))
}

async fn run_dashboard(client: HttpTaskClient) -> Result<()> {
    let store = client.credential_store();
    if store.read().is_none() {
        anyhow::bail!("Not signed in. Run `taskdeck signin --email <email>` first.");
    }

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut board = Dashboard::new(client, store);
    let result = ui::run_app(&mut terminal, &mut board).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match result? {
        Exit::Quit => {}
        Exit::SignedOut => {
            println!("You are signed out. Run `taskdeck signin --email <email>` to continue.")
        }
    }
    Ok(())
}
