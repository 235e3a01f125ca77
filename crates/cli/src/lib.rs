pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "reqflow",
    about = "Reqflow operator CLI",
    long_about = "Apply migrations, register users, and inspect configuration for the requisition approval service.",
    after_help = "Examples:\n  reqflow migrate\n  reqflow create-user --name Bob --email bob@example.com --role supervisor --department Engineering\n  reqflow config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Register a user who can submit or review requisitions")]
    CreateUser {
        #[arg(long, help = "Display name used in signoffs and notifications")]
        name: String,
        #[arg(long, help = "Login email; must be unique")]
        email: String,
        #[arg(long, help = "One of staff, supervisor, owner, admin")]
        role: String,
        #[arg(long, help = "Department; required for staff and supervisors")]
        department: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::CreateUser { name, email, role, department } => {
            commands::create_user::run(commands::create_user::CreateUserArgs {
                name,
                email,
                role,
                department,
            })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
