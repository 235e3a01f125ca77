use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use reqflow_core::domain::query::{RequisitionFilter, RequisitionQuery};
use reqflow_core::domain::requisition::{
    Cancellation, FieldUpdate, NewRequisition, Rejection, Requisition, RequisitionId,
    RequisitionStatus, RequisitionUpdate, Signoff,
};

use super::{RepositoryError, RequisitionRepository};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT
    id,
    item_name,
    quantity,
    unit_cost,
    reason,
    employee_id,
    requester_name,
    requester_email,
    department,
    status,
    created_at,
    supervisor_approved_by,
    supervisor_approved_email,
    supervisor_approved_at,
    owner_approved_by,
    owner_approved_email,
    owner_approved_at,
    rejection_reason,
    rejected_by,
    rejected_email,
    rejected_at,
    canceled_by,
    canceled_at
 FROM requisition";

pub struct SqlRequisitionRepository {
    pool: DbPool,
}

impl SqlRequisitionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RequisitionRepository for SqlRequisitionRepository {
    async fn create(&self, requisition: NewRequisition) -> Result<Requisition, RepositoryError> {
        let created =
            requisition.into_requisition(RequisitionId(Uuid::new_v4().to_string()), Utc::now());

        sqlx::query(
            "INSERT INTO requisition (
                id,
                item_name,
                quantity,
                unit_cost,
                reason,
                employee_id,
                requester_name,
                requester_email,
                department,
                status,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id.0)
        .bind(&created.item_name)
        .bind(i64::from(created.quantity))
        .bind(created.unit_cost.to_string())
        .bind(&created.reason)
        .bind(created.employee_id.as_deref())
        .bind(&created.requester_name)
        .bind(&created.requester_email)
        .bind(created.department.as_deref())
        .bind(created.status.as_str())
        .bind(timestamp(created.created_at))
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(
        &self,
        id: &RequisitionId,
    ) -> Result<Option<Requisition>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(requisition_from_row).transpose()
    }

    async fn update(
        &self,
        id: &RequisitionId,
        update: &RequisitionUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE requisition SET ");
        {
            let mut set = builder.separated(", ");
            push_signoff(
                &mut set,
                &update.audit.supervisor_approval,
                ["supervisor_approved_by", "supervisor_approved_email", "supervisor_approved_at"],
            );
            push_signoff(
                &mut set,
                &update.audit.owner_approval,
                ["owner_approved_by", "owner_approved_email", "owner_approved_at"],
            );
            match &update.audit.rejection {
                FieldUpdate::Keep => {}
                FieldUpdate::Set(rejection) => {
                    set.push("rejection_reason = ").push_bind_unseparated(rejection.reason.clone());
                    set.push("rejected_by = ").push_bind_unseparated(rejection.name.clone());
                    set.push("rejected_email = ").push_bind_unseparated(rejection.email.clone());
                    set.push("rejected_at = ").push_bind_unseparated(timestamp(rejection.at));
                }
                FieldUpdate::Unset => {
                    for column in ["rejection_reason", "rejected_by", "rejected_email", "rejected_at"]
                    {
                        set.push(format!("{column} = NULL"));
                    }
                }
            }
            match &update.audit.cancellation {
                FieldUpdate::Keep => {}
                FieldUpdate::Set(cancellation) => {
                    set.push("canceled_by = ").push_bind_unseparated(cancellation.name.clone());
                    set.push("canceled_at = ").push_bind_unseparated(timestamp(cancellation.at));
                }
                FieldUpdate::Unset => {
                    set.push("canceled_by = NULL");
                    set.push("canceled_at = NULL");
                }
            }
            set.push("status = ").push_bind_unseparated(update.status.as_str());
        }
        builder.push(" WHERE id = ").push_bind(id.0.clone());
        builder.push(" AND status = ").push_bind(update.expected_status.as_str());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn query(&self, query: &RequisitionQuery) -> Result<Vec<Requisition>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        for filter in &query.filters {
            match filter {
                RequisitionFilter::RequesterEmail(email) => {
                    builder
                        .push(" AND requester_email = ")
                        .push_bind(email.trim().to_owned())
                        .push(" COLLATE NOCASE");
                }
                RequisitionFilter::Department(department) => {
                    builder.push(" AND department = ").push_bind(department.clone());
                }
                RequisitionFilter::StatusIn(statuses) if statuses.is_empty() => {
                    builder.push(" AND 0");
                }
                RequisitionFilter::StatusIn(statuses) => {
                    builder.push(" AND status IN (");
                    let mut list = builder.separated(", ");
                    for status in statuses {
                        list.push_bind(status.as_str());
                    }
                    builder.push(")");
                }
            }
        }

        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(requisition_from_row).collect()
    }
}

fn push_signoff(
    set: &mut sqlx::query_builder::Separated<'_, '_, Sqlite, &'static str>,
    update: &FieldUpdate<Signoff>,
    [by, email, at]: [&str; 3],
) {
    match update {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(signoff) => {
            set.push(format!("{by} = ")).push_bind_unseparated(signoff.name.clone());
            set.push(format!("{email} = ")).push_bind_unseparated(signoff.email.clone());
            set.push(format!("{at} = ")).push_bind_unseparated(timestamp(signoff.at));
        }
        FieldUpdate::Unset => {
            set.push(format!("{by} = NULL"));
            set.push(format!("{email} = NULL"));
            set.push(format!("{at} = NULL"));
        }
    }
}

/// Fixed-width UTC timestamps keep lexical and chronological order aligned.
fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn requisition_from_row(row: SqliteRow) -> Result<Requisition, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = RequisitionStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown requisition status `{status_raw}`"))
    })?;

    let unit_cost_raw = row.try_get::<String, _>("unit_cost")?;
    let unit_cost = unit_cost_raw.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid unit_cost `{unit_cost_raw}` ({error})"))
    })?;

    let quantity = row.try_get::<i64, _>("quantity")?;
    let quantity = u32::try_from(quantity).map_err(|_| {
        RepositoryError::Decode(format!("invalid value for `quantity`: {quantity}"))
    })?;

    Ok(Requisition {
        id: RequisitionId(row.try_get("id")?),
        item_name: row.try_get("item_name")?,
        quantity,
        unit_cost,
        reason: row.try_get("reason")?,
        employee_id: row.try_get("employee_id")?,
        requester_name: row.try_get("requester_name")?,
        requester_email: row.try_get("requester_email")?,
        department: row.try_get("department")?,
        status,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        supervisor_approval: signoff_from_row(
            &row,
            ["supervisor_approved_by", "supervisor_approved_email", "supervisor_approved_at"],
        )?,
        owner_approval: signoff_from_row(
            &row,
            ["owner_approved_by", "owner_approved_email", "owner_approved_at"],
        )?,
        rejection: rejection_from_row(&row)?,
        cancellation: cancellation_from_row(&row)?,
    })
}

fn signoff_from_row(row: &SqliteRow, [by, email, at]: [&str; 3]) -> Result<Option<Signoff>, RepositoryError> {
    let name = row.try_get::<Option<String>, _>(by)?;
    let Some(name) = name else {
        return Ok(None);
    };
    Ok(Some(Signoff {
        name,
        email: row.try_get::<Option<String>, _>(email)?.unwrap_or_default(),
        at: parse_required_timestamp(at, row.try_get(at)?)?,
    }))
}

fn rejection_from_row(row: &SqliteRow) -> Result<Option<Rejection>, RepositoryError> {
    let reason = row.try_get::<Option<String>, _>("rejection_reason")?;
    let Some(reason) = reason else {
        return Ok(None);
    };
    Ok(Some(Rejection {
        reason,
        name: row.try_get::<Option<String>, _>("rejected_by")?.unwrap_or_default(),
        email: row.try_get::<Option<String>, _>("rejected_email")?.unwrap_or_default(),
        at: parse_required_timestamp("rejected_at", row.try_get("rejected_at")?)?,
    }))
}

fn cancellation_from_row(row: &SqliteRow) -> Result<Option<Cancellation>, RepositoryError> {
    let name = row.try_get::<Option<String>, _>("canceled_by")?;
    let Some(name) = name else {
        return Ok(None);
    };
    Ok(Some(Cancellation {
        name,
        at: parse_required_timestamp("canceled_at", row.try_get("canceled_at")?)?,
    }))
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

fn parse_required_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<DateTime<Utc>, RepositoryError> {
    let value = value.ok_or_else(|| RepositoryError::Decode(format!("`{column}` is missing")))?;
    parse_timestamp(column, value)
}
