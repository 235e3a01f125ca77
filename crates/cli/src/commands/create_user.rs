use chrono::Utc;
use reqflow_core::domain::user::{Role, User, UserId};
use reqflow_db::{connect_with_config, migrations, SqlUserRepository, UserRepository};
use uuid::Uuid;

use crate::commands::{prepare, CommandResult};

#[derive(Clone, Debug)]
pub struct CreateUserArgs {
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
}

pub fn run(args: CreateUserArgs) -> CommandResult {
    let user = match validate(args) {
        Ok(user) => user,
        Err(message) => return CommandResult::failure("create-user", "invalid_input", message, 2),
    };

    let (config, runtime) = match prepare("create-user") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let users = SqlUserRepository::new(pool.clone());
        let outcome = async {
            let existing = users
                .find_by_email(&user.email)
                .await
                .map_err(|error| ("persistence", error.to_string(), 7u8))?;
            if existing.is_some() {
                return Err((
                    "duplicate_user",
                    format!("a user with email `{}` already exists", user.email),
                    6u8,
                ));
            }
            users.save(user.clone()).await.map_err(|error| ("persistence", error.to_string(), 7u8))
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(()) => CommandResult::success(
            "create-user",
            format!("created {} `{}` ({})", user.role, user.email, user.id.0),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("create-user", error_class, message, exit_code)
        }
    }
}

fn validate(args: CreateUserArgs) -> Result<User, String> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }

    let email = args.email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(format!("`{email}` is not a valid email address"));
    }

    let role = Role::parse(&args.role).ok_or_else(|| {
        format!("unknown role `{}`; expected staff, supervisor, owner or admin", args.role.trim())
    })?;

    let department =
        args.department.as_deref().map(str::trim).filter(|value| !value.is_empty());
    if role.requires_department() && department.is_none() {
        return Err(format!("a department is required for the {role} role"));
    }

    Ok(User {
        id: UserId(Uuid::new_v4().to_string()),
        name: name.to_string(),
        email: email.to_string(),
        role,
        department: department.map(str::to_string),
        created_at: Utc::now(),
    })
}
