use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use reqflow_core::domain::user::{Role, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, role, department, created_at
             FROM app_user
             WHERE email = ? COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_first_by_role(
        &self,
        role: Role,
        department: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let row = match department {
            Some(department) => {
                sqlx::query(
                    "SELECT id, name, email, role, department, created_at
                     FROM app_user
                     WHERE role = ? AND department = ?
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT 1",
                )
                .bind(role.as_str())
                .bind(department.trim())
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, name, email, role, department, created_at
                     FROM app_user
                     WHERE role = ?
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT 1",
                )
                .bind(role.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(user_from_row).transpose()
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO app_user (id, name, email, role, department, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                role = excluded.role,
                department = excluded.department",
        )
        .bind(&user.id.0)
        .bind(&user.name)
        .bind(user.email.trim())
        .bind(user.role.as_str())
        .bind(user.department.as_deref())
        .bind(user.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown user role `{role_raw}`")))?;
    let created_raw = row.try_get::<String, _>("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp in `created_at`: `{created_raw}` ({error})"))
        })?;

    Ok(User {
        id: UserId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role,
        department: row.try_get("department")?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use reqflow_core::domain::user::{Role, User, UserId};

    use super::SqlUserRepository;
    use crate::migrations;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn user(id: &str, name: &str, role: Role, department: Option<&str>, age_minutes: i64) -> User {
        User {
            id: UserId(id.to_string()),
            name: name.to_string(),
            email: format!("{}@corp.test", name.to_ascii_lowercase()),
            role,
            department: department.map(str::to_string),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn find_by_email_ignores_case() {
        let repo = SqlUserRepository::new(setup_pool().await);
        repo.save(user("u-1", "Alice", Role::Staff, Some("Engineering"), 0)).await.expect("save");

        let found = repo.find_by_email("ALICE@corp.test").await.expect("find").expect("present");
        assert_eq!(found.role, Role::Staff);
        assert_eq!(found.department.as_deref(), Some("Engineering"));
        assert!(repo.find_by_email("nobody@corp.test").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn supervisor_lookup_is_department_scoped_and_stable() {
        let repo = SqlUserRepository::new(setup_pool().await);
        repo.save(user("u-1", "Bob", Role::Supervisor, Some("Engineering"), 10)).await.expect("save");
        repo.save(user("u-2", "Bea", Role::Supervisor, Some("Engineering"), 5)).await.expect("save");
        repo.save(user("u-3", "Dana", Role::Supervisor, Some("Finance"), 20)).await.expect("save");

        let engineering = repo
            .find_first_by_role(Role::Supervisor, Some("Engineering"))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(engineering.name, "Bob");

        assert!(repo
            .find_first_by_role(Role::Supervisor, Some("Legal"))
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_by_store() {
        let repo = SqlUserRepository::new(setup_pool().await);
        repo.save(user("u-1", "Alice", Role::Staff, Some("Engineering"), 0)).await.expect("save");

        let duplicate = repo.save(user("u-2", "Alice", Role::Staff, Some("Finance"), 0)).await;
        assert!(duplicate.is_err());
    }
}
