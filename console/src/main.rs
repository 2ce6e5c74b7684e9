//! Maintenance console for the unmet-demand registry store.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::service::{AccessType, AuthService, UserService};
use auth_service_lib::AuthSystem;
use common::AppResult;
use demand_service_lib::{DemandManager, DemandService};
use domain::{CreateUser, Password, UserRole};

#[derive(Parser)]
#[command(name = "recetas")]
#[command(about = "Maintenance console for the unmet-demand registry")]
struct Cli {
    /// Directory holding the persisted entries
    #[arg(long, env = "RECETAS_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every user record
    Users,
    /// Log in and keep the session
    Login {
        username: String,
        password: String,
        /// Require an administrator account
        #[arg(long, conflicts_with = "center")]
        admin: bool,
        /// Require a user of this center
        #[arg(long)]
        center: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the current session
    Whoami,
    /// Create a user as the current session
    CreateUser {
        username: String,
        password: String,
        role: UserRole,
        center: String,
    },
    /// Delete a user by id as the current session
    DeleteUser { id: String },
    /// Per-facility demand summary visible to the current session
    Summary,
    /// Drop all users and the session, then seed the default administrator
    Reset,
    /// Print the legacy digest of a password
    Digest { password: String },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), "command failed");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    if let Commands::Digest { password } = &cli.command {
        println!("{}", Password::legacy_digest(password));
        return Ok(());
    }

    let config = AuthServiceConfig::from_env().with_data_dir(cli.data_dir);
    let system = AuthSystem::open(config)?;
    let auth = system.auth();
    let users = system.users();

    match cli.command {
        Commands::Users => {
            for user in users.list_all()? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    user.id,
                    user.username,
                    user.role,
                    user.center,
                    if user.active { "active" } else { "inactive" }
                );
            }
        }
        Commands::Login {
            username,
            password,
            admin,
            center,
        } => {
            let session = match (admin, center) {
                (true, _) => auth.login_as(&username, &password, AccessType::Admin)?,
                (false, Some(center)) => auth.login_as(&username, &password, AccessType::Center(center))?,
                (false, None) => auth.login(&username, &password)?,
            };
            println!("logged in as {} ({}, {})", session.username, session.role, session.center);
        }
        Commands::Logout => match auth.logout()? {
            Some(username) => println!("logged out {}", username),
            None => println!("no active session"),
        },
        Commands::Whoami => match auth.current() {
            Some(session) => println!(
                "{} ({}, {}) since {}",
                session.username, session.role, session.center, session.login_at
            ),
            None => println!("not logged in"),
        },
        Commands::CreateUser {
            username,
            password,
            role,
            center,
        } => {
            let user = users.create_user(CreateUser::new(username, password, role, center))?;
            println!("created {} ({})", user.username, user.id);
        }
        Commands::DeleteUser { id } => {
            let removed = users.delete_user(&id)?;
            println!("deleted {} ({})", removed.username, removed.id);
        }
        Commands::Summary => {
            let demands = DemandManager::for_system(&system);
            for facility in demands.summary()? {
                println!(
                    "{}\trecords={}\trequested={}\tavailable={}\tunmet={}\tcoverage={}%",
                    facility.facility,
                    facility.records,
                    facility.total_requested,
                    facility.total_available,
                    facility.total_unmet,
                    facility.average_coverage
                );
            }
        }
        Commands::Reset => {
            system.bootstrap().reset()?;
            println!("system reset; default administrator restored");
        }
        // Needs no store; handled before opening it
        Commands::Digest { .. } => {}
    }

    Ok(())
}
