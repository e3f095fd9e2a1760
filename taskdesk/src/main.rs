//! Command-line client for the TaskDesk task API.
//!
//! Each invocation runs one command against the configured API and prints
//! the result followed by any notices. The session persists between runs.
//!
//! ```bash
//! taskdesk --base-url http://127.0.0.1:4000 login user@gmail.com --password 'Secret1!'
//! taskdesk tasks add "Buy milk" --description "2 litres"
//! taskdesk tasks list
//! taskdesk tasks delete 4 --yes
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use taskdesk::account::{LoginForm, ProfileForm, SignupForm};
use taskdesk::app::App;
use taskdesk::backend::ImageUpload;
use taskdesk::backend::http::HttpBackend;
use taskdesk::config::{CliArgs, ClientConfig};
use taskdesk::error::ClientError;
use taskdesk::session::{CredentialStore, FileCredentialStore, View};
use taskdesk::validate::FieldErrors;
use taskdesk_proto::task::{Task, TaskId};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(version, about = "Command-line client for the TaskDesk task API")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with an email, phone number or username.
    Login {
        /// Email, ten-digit phone number or username.
        identifier: String,
        /// Password (prompted for when omitted).
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Register a new account.
    Signup {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Login handle.
        #[arg(long)]
        username: String,
        /// Email address.
        #[arg(long)]
        email: String,
        /// Ten-digit phone number.
        #[arg(long)]
        phone: String,
        /// Password (prompted for when omitted).
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Avatar image (JPEG, PNG or WEBP).
        #[arg(long)]
        avatar: PathBuf,
    },
    /// Forget the stored session.
    Logout,
    /// Show the cached user of the stored session.
    Whoami,
    /// View or change the profile.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Manage tasks.
    #[command(subcommand)]
    Tasks(TaskCommand),
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Fetch and print the profile.
    Show,
    /// Change name, phone or avatar.
    Update {
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// New phone number.
        #[arg(long)]
        phone: Option<String>,
        /// New avatar image.
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Delete the account.
    Delete {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// List all tasks.
    List,
    /// Show one task.
    Show {
        /// Task id.
        id: TaskId,
    },
    /// Create a task.
    Add {
        /// Task title.
        title: String,
        /// Optional description.
        #[arg(long)]
        description: Option<String>,
        /// Use the dedicated create view instead of the dashboard form.
        #[arg(long)]
        page: bool,
    },
    /// Change a task's title or description.
    Edit {
        /// Task id.
        id: TaskId,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// Use the dedicated edit view instead of inline editing.
        #[arg(long)]
        page: bool,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: TaskId,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());

    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(base_url = %config.base_url, "taskdesk starting");

    let backend = match HttpBackend::new(config.base_url.clone(), config.request_timeout) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let credentials: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
    let mut app = App::new(backend, credentials.clone(), config.auth_failure_policy);

    let result = run(&mut app, credentials.as_ref(), &config, cli.command).await;

    for notice in app.drain_notices() {
        println!("{notice}");
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(errors) = e.field_errors() {
                print_field_errors(errors);
            }
            if app.view() == View::Login && !matches!(e, ClientError::Validation(_)) {
                println!("-> {}", View::Login);
            }
            tracing::info!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs go to a file so stdout carries only command output. Returns a
/// [`WorkerGuard`] that must be held until shutdown to flush buffered lines.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdesk.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(
    app: &mut App<HttpBackend>,
    credentials: &dyn CredentialStore,
    config: &ClientConfig,
    command: Command,
) -> Result<(), ClientError> {
    match command {
        Command::Login {
            identifier,
            password,
        } => {
            let password = password_or_prompt(password);
            let form = LoginForm {
                identifier,
                password,
            };
            let user = app.login(&form).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::Signup {
            name,
            username,
            email,
            phone,
            password,
            avatar,
        } => {
            let password = password_or_prompt(password);
            let form = SignupForm {
                name,
                username,
                email,
                phone,
                confirm_password: password.clone(),
                password,
                profile_image: read_image(&avatar),
            };
            app.signup(&form).await?;
            println!("-> {}", app.view());
        }
        Command::Logout => {
            app.logout()?;
            println!("-> {}", app.view());
        }
        Command::Whoami => match credentials.read() {
            Some(session) => println!("{} <{}>", session.user.name, session.user.email),
            None => println!("not signed in"),
        },
        Command::Profile(cmd) => run_profile(app, config, cmd).await?,
        Command::Tasks(cmd) => run_tasks(app, cmd).await?,
    }
    Ok(())
}

async fn run_profile(
    app: &mut App<HttpBackend>,
    config: &ClientConfig,
    command: ProfileCommand,
) -> Result<(), ClientError> {
    if app.navigate(View::Profile).await != View::Profile {
        return Err(ClientError::AuthRequired);
    }
    match command {
        ProfileCommand::Show => {
            if let Some(user) = app.profile() {
                println!("Name:     {}", user.name);
                if let Some(username) = &user.username {
                    println!("Username: {username}");
                }
                println!("Email:    {}", user.email);
                println!("Phone:    {}", user.phone);
                if let Some(url) = user.avatar_url(config.base_url.as_str()) {
                    println!("Avatar:   {url}");
                }
            }
        }
        ProfileCommand::Update {
            name,
            phone,
            avatar,
        } => {
            let Some(current) = app.profile().cloned() else {
                return Err(ClientError::AuthRequired);
            };
            let mut form = ProfileForm::from_user(&current);
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(phone) = phone {
                form.phone = phone;
            }
            form.profile_image = avatar.as_deref().and_then(read_image);
            app.update_profile(&form).await?;
        }
        ProfileCommand::Delete { yes } => {
            app.request_account_deletion();
            let prompt = app.account_gate().prompt().unwrap_or_default().to_string();
            if yes || confirm(&prompt) {
                app.confirm_account_deletion().await?;
                println!("-> {}", app.view());
            } else {
                app.cancel_account_deletion();
            }
        }
    }
    Ok(())
}

async fn run_tasks(app: &mut App<HttpBackend>, command: TaskCommand) -> Result<(), ClientError> {
    let entry = match &command {
        TaskCommand::Show { id } => View::EditTask(*id),
        TaskCommand::Add { page: true, .. } => View::CreateTask,
        TaskCommand::Edit { id, page: true, .. } => View::EditTask(*id),
        _ => View::Dashboard,
    };
    if app.navigate(entry).await != entry {
        return Err(ClientError::AuthRequired);
    }
    match command {
        TaskCommand::List => print_tasks(app.tasks()),
        TaskCommand::Show { id } => {
            let page = app.loaded_edit_page(id)?;
            println!("#{} {}", page.id(), page.title);
            if !page.description.is_empty() {
                println!("    {}", page.description);
            }
        }
        TaskCommand::Add {
            title, description, ..
        } => {
            app.create_task(&title, description.as_deref()).await?;
            print_tasks(app.tasks());
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            page: true,
        } => {
            let page = app.loaded_edit_page(id)?;
            if let Some(title) = title {
                page.set_title(title);
            }
            if let Some(description) = description {
                page.description = description;
            }
            app.save_edit_page().await?;
            tracing::debug!(%id, "saved through edit view");
            print_tasks(app.tasks());
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            page: false,
        } => {
            if !app.begin_edit(id) {
                return Err(ClientError::TaskUnavailable(id));
            }
            if let Some(title) = title {
                app.editor_mut().set_title(title);
            }
            if let Some(description) = description {
                app.editor_mut().set_description(description);
            }
            app.commit_edit().await?;
            print_tasks(app.tasks());
        }
        TaskCommand::Delete { id, yes } => {
            app.request_delete(id);
            let prompt = app.task_gate().prompt().unwrap_or_default().to_string();
            if yes || confirm(&prompt) {
                app.confirm_delete().await?;
                print_tasks(app.tasks());
            } else {
                app.cancel_delete();
            }
        }
    }
    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet.");
        return;
    }
    for task in tasks {
        println!(
            "#{:<4} {}  ({})",
            task.id,
            task.title,
            task.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            println!("      {description}");
        }
    }
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        println!("  {field}: {message}");
    }
}

fn read_image(path: &Path) -> Option<ImageUpload> {
    match ImageUpload::from_path(path) {
        Ok(image) => Some(image),
        Err(e) => {
            eprintln!("could not read {}: {e}", path.display());
            None
        }
    }
}

fn password_or_prompt(password: Option<String>) -> String {
    password.unwrap_or_else(|| read_line("Password: ").unwrap_or_default())
}

/// Asks a yes/no question on stdin; anything but `y`/`yes` is a no.
fn confirm(prompt: &str) -> bool {
    read_line(&format!("{prompt} [y/N] "))
        .is_some_and(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line.trim_end_matches(['\r', '\n']).to_string())
}
