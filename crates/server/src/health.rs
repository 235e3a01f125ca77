use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use reqflow_core::config::{EmailConfig, EmailProvider};
use reqflow_db::{migrations, probe, DbPool};
use serde::Serialize;
use tracing::{error, info, warn};

/// What `/health` inspects: the pool, the applied schema and the mail route.
#[derive(Clone)]
pub struct Readiness {
    db_pool: DbPool,
    email_provider: EmailProvider,
    email_route: String,
}

impl Readiness {
    pub fn new(db_pool: DbPool, email: &EmailConfig) -> Self {
        let email_route = match email.provider {
            EmailProvider::Http => email.api_url.clone(),
            EmailProvider::Log => "log only".to_string(),
        };
        Self { db_pool, email_provider: email.provider, email_route }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub status: &'static str,
    pub checks: Vec<Check>,
    pub checked_at: String,
}

pub fn router(readiness: Readiness) -> Router {
    Router::new().route("/health", get(health)).with_state(readiness)
}

pub async fn spawn(bind_address: &str, port: u16, readiness: Readiness) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint listening"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(readiness)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint stopped"
            );
        }
    });

    Ok(())
}

pub async fn health(State(readiness): State<Readiness>) -> (StatusCode, Json<Report>) {
    let database = match probe(&readiness.db_pool).await {
        Ok(()) => Check { name: "database", ok: true, detail: "reachable".to_string() },
        Err(error) => Check { name: "database", ok: false, detail: error.to_string() },
    };

    // No schema lookup against an unreachable database.
    let schema = if database.ok {
        match migrations::pending_versions(&readiness.db_pool).await {
            Ok(pending) if pending.is_empty() => {
                Check { name: "schema", ok: true, detail: "all migrations applied".to_string() }
            }
            Ok(pending) => Check {
                name: "schema",
                ok: false,
                detail: format!("pending migration versions: {pending:?}"),
            },
            Err(error) => Check { name: "schema", ok: false, detail: error.to_string() },
        }
    } else {
        Check { name: "schema", ok: false, detail: "database unreachable".to_string() }
    };

    let email = Check {
        name: "email",
        ok: true,
        detail: format!("{:?} provider via {}", readiness.email_provider, readiness.email_route),
    };

    let checks = vec![database, schema, email];
    let failing: Vec<&str> =
        checks.iter().filter(|check| !check.ok).map(|check| check.name).collect();
    let ready = failing.is_empty();
    if !ready {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            failing = ?failing,
            "readiness check failed"
        );
    }

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let report = Report {
        status: if ready { "ready" } else { "degraded" },
        checks,
        checked_at: Utc::now().to_rfc3339(),
    };
    (status_code, Json(report))
}
