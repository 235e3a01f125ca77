use std::sync::Arc;

use chrono::Utc;
use reqflow_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use reqflow_core::config::AppConfig;
use reqflow_core::domain::query::Page;
use reqflow_core::domain::requisition::{
    Requisition, RequisitionId, RequisitionStatus, SubmissionInput,
};
use reqflow_core::domain::user::Actor;
use reqflow_core::errors::ApplicationError;
use reqflow_core::notify::{EmailTemplates, NotificationPlan, Notifier, Recipient};
use reqflow_core::workflow::{AccessGuard, View, ViewComposer, WorkflowEngine};
use reqflow_db::{RepositoryError, RequisitionRepository, ReviewerDirectory, UserRepository};
use tracing::{error, info, warn};

/// Orchestrates the workflow engine against storage and the notifier.
#[derive(Clone)]
pub struct RequisitionService {
    engine: WorkflowEngine,
    views: ViewComposer,
    requisitions: Arc<dyn RequisitionRepository>,
    users: Arc<dyn UserRepository>,
    directory: ReviewerDirectory,
    notifier: Arc<dyn Notifier>,
    templates: EmailTemplates,
    audit: Arc<dyn AuditSink>,
    dashboard_url: String,
}

pub struct ServiceDeps {
    pub requisitions: Arc<dyn RequisitionRepository>,
    pub users: Arc<dyn UserRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub templates: EmailTemplates,
    pub audit: Arc<dyn AuditSink>,
}

impl RequisitionService {
    pub fn new(config: &AppConfig, deps: ServiceDeps) -> Self {
        let guard = AccessGuard::new(config.workflow.admin_department.clone());
        Self {
            engine: WorkflowEngine::new(guard.clone()),
            views: ViewComposer::new(
                guard,
                config.workflow.default_page_size,
                config.workflow.max_page_size,
            ),
            directory: ReviewerDirectory::new(deps.users.clone()),
            requisitions: deps.requisitions,
            users: deps.users,
            notifier: deps.notifier,
            templates: deps.templates,
            audit: deps.audit,
            dashboard_url: config.email.dashboard_url.clone(),
        }
    }

    /// Looks up the caller named by the identity header. `None` for unknown emails.
    pub async fn resolve_actor(
        &self,
        email: &str,
        correlation_id: &str,
    ) -> Result<Option<Actor>, ApplicationError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(|error| persistence_failure(error, correlation_id, "user.lookup"))?;
        Ok(user.map(Actor::from))
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        input: &SubmissionInput,
        correlation_id: &str,
    ) -> Result<Requisition, ApplicationError> {
        let plan = self.engine.plan_submission(actor, input)?;

        let requisition = self
            .requisitions
            .create(plan.requisition)
            .await
            .map_err(|error| persistence_failure(error, correlation_id, "requisition.create"))?;

        let context =
            AuditContext::new(Some(requisition.id.clone()), correlation_id, actor.email.clone());
        self.audit.emit(
            context
                .event("requisition.submitted", AuditCategory::Submission, AuditOutcome::Success)
                .with_metadata("status", requisition.status.as_str())
                .with_metadata("role", actor.role.as_str()),
        );
        info!(
            event_name = "requisition.submitted",
            correlation_id,
            requisition_id = %requisition.id,
            actor = %actor.email,
            status = requisition.status.as_str(),
            "requisition submitted"
        );

        if let Some(plan) = plan.notification {
            self.dispatch(plan, &requisition, &context).await;
        }

        Ok(requisition)
    }

    pub async fn transition(
        &self,
        actor: &Actor,
        id: &RequisitionId,
        requested: RequisitionStatus,
        rejection_reason: Option<&str>,
        correlation_id: &str,
    ) -> Result<Requisition, ApplicationError> {
        let current = self
            .requisitions
            .find_by_id(id)
            .await
            .map_err(|error| persistence_failure(error, correlation_id, "requisition.load"))?
            .ok_or_else(|| ApplicationError::NotFound(id.0.clone()))?;

        let context = AuditContext::new(Some(id.clone()), correlation_id, actor.email.clone());
        let plan = self.engine.plan_transition_with_audit(
            actor,
            &current,
            requested,
            rejection_reason,
            Utc::now(),
            self.audit.as_ref(),
            &context,
        )?;

        let applied = self
            .requisitions
            .update(id, &plan.update)
            .await
            .map_err(|error| persistence_failure(error, correlation_id, "requisition.update"))?;
        if !applied {
            warn!(
                event_name = "requisition.transition_conflict",
                correlation_id,
                requisition_id = %id,
                actor = %actor.email,
                expected = plan.update.expected_status.as_str(),
                "requisition changed before the transition was written"
            );
            return Err(ApplicationError::Conflict {
                id: id.0.clone(),
                expected: plan.update.expected_status,
            });
        }

        let mut updated = current;
        updated.apply(&plan.update);
        info!(
            event_name = "requisition.transitioned",
            correlation_id,
            requisition_id = %id,
            actor = %actor.email,
            from = plan.rule.from.as_str(),
            to = plan.rule.to.as_str(),
            "requisition transitioned"
        );

        if let Some(notification) = plan.notification {
            self.dispatch(notification, &updated, &context).await;
        }

        Ok(updated)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        view: View,
        page: Option<i64>,
        limit: Option<i64>,
        correlation_id: &str,
    ) -> Result<Page<Requisition>, ApplicationError> {
        let plan = self.views.compose(actor, view, page, limit)?;
        let rows = self
            .requisitions
            .query(&plan.query)
            .await
            .map_err(|error| persistence_failure(error, correlation_id, "requisition.query"))?;
        Ok(self.views.finish(rows, &plan))
    }

    /// Never fails the caller: every outcome ends up in the log and the audit trail.
    async fn dispatch(
        &self,
        plan: NotificationPlan,
        requisition: &Requisition,
        context: &AuditContext,
    ) {
        let kind = plan.kind.as_str();
        let recipient = match plan.recipient {
            Recipient::Requester => Some(requisition.requester_email.clone()),
            Recipient::Reviewer(role) => {
                match self.directory.find_reviewer(role, requisition.department.as_deref()).await
                {
                    Ok(found) => {
                        if found.is_none() {
                            warn!(
                                event_name = "notification.reviewer_missing",
                                correlation_id = %context.correlation_id,
                                requisition_id = %requisition.id,
                                reviewer_role = role.as_str(),
                                department = requisition.department.as_deref().unwrap_or("none"),
                                "no reviewer found; requisition stays pending without a notification"
                            );
                            self.audit.emit(
                                context
                                    .event(
                                        "notification.skipped",
                                        AuditCategory::Notification,
                                        AuditOutcome::Rejected,
                                    )
                                    .with_metadata("kind", kind)
                                    .with_metadata("reviewer_role", role.as_str()),
                            );
                        }
                        found
                    }
                    Err(error) => {
                        self.record_failure(context, requisition, kind, error.to_string());
                        return;
                    }
                }
            }
        };
        let Some(to) = recipient else {
            return;
        };

        let notification =
            match self.templates.compose(plan.kind, requisition, to, &self.dashboard_url) {
                Ok(notification) => notification,
                Err(error) => {
                    self.record_failure(context, requisition, kind, error.to_string());
                    return;
                }
            };
        match self.notifier.send(&notification).await {
            Ok(()) => {
                info!(
                    event_name = "notification.sent",
                    correlation_id = %context.correlation_id,
                    requisition_id = %requisition.id,
                    kind,
                    to = %notification.to,
                    "notification sent"
                );
                self.audit.emit(
                    context
                        .event("notification.sent", AuditCategory::Notification, AuditOutcome::Success)
                        .with_metadata("kind", kind)
                        .with_metadata("to", notification.to.clone()),
                );
            }
            Err(error) => self.record_failure(context, requisition, kind, error.to_string()),
        }
    }

    fn record_failure(
        &self,
        context: &AuditContext,
        requisition: &Requisition,
        kind: &str,
        error: String,
    ) {
        warn!(
            event_name = "notification.failed",
            correlation_id = %context.correlation_id,
            requisition_id = %requisition.id,
            kind,
            error = %error,
            "notification dispatch failed"
        );
        self.audit.emit(
            context
                .event("notification.failed", AuditCategory::Notification, AuditOutcome::Failed)
                .with_metadata("kind", kind)
                .with_metadata("error", error),
        );
    }
}

fn persistence_failure(
    error: RepositoryError,
    correlation_id: &str,
    operation: &'static str,
) -> ApplicationError {
    error!(
        event_name = "system.storage.error",
        correlation_id,
        operation,
        error = %error,
        "storage operation failed"
    );
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use reqflow_core::audit::{AuditOutcome, InMemoryAuditSink};
    use reqflow_core::config::AppConfig;
    use reqflow_core::domain::query::RequisitionQuery;
    use reqflow_core::domain::requisition::{
        NewRequisition, Requisition, RequisitionId, RequisitionStatus, RequisitionUpdate,
        SubmissionInput,
    };
    use reqflow_core::domain::user::{Actor, Role, User, UserId};
    use reqflow_core::errors::{ApplicationError, DomainError};
    use reqflow_core::notify::{EmailTemplates, NotifyError, RecordingNotifier};
    use reqflow_core::workflow::View;
    use reqflow_db::{
        InMemoryRequisitionRepository, InMemoryUserRepository, RepositoryError,
        RequisitionRepository, UserRepository,
    };
    use rust_decimal::Decimal;

    use super::{RequisitionService, ServiceDeps};

    pub(crate) struct Harness {
        pub service: RequisitionService,
        pub requisitions: Arc<InMemoryRequisitionRepository>,
        pub notifier: RecordingNotifier,
        pub audit: InMemoryAuditSink,
    }

    pub(crate) fn alice() -> Actor {
        Actor::new("alice@example.com", "Alice", Role::Staff, Some("Engineering"))
    }

    pub(crate) fn bob() -> Actor {
        Actor::new("bob@example.com", "Bob", Role::Supervisor, Some("Engineering"))
    }

    pub(crate) fn carol() -> Actor {
        Actor::new("carol@example.com", "Carol", Role::Owner, None)
    }

    fn dave() -> Actor {
        Actor::new("dave@example.com", "Dave", Role::Staff, Some("Sales"))
    }

    fn user(actor: &Actor, age_minutes: i64) -> User {
        User {
            id: UserId(format!("user-{}", actor.name.to_lowercase())),
            name: actor.name.clone(),
            email: actor.email.clone(),
            role: actor.role,
            department: actor.department.clone(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    pub(crate) async fn harness_with(notifier: RecordingNotifier) -> Harness {
        let users = Arc::new(InMemoryUserRepository::default());
        for (index, actor) in [alice(), bob(), carol(), dave()].iter().enumerate() {
            users.save(user(actor, 10 - index as i64)).await.expect("seed user");
        }
        let requisitions = Arc::new(InMemoryRequisitionRepository::default());
        let audit = InMemoryAuditSink::default();

        let service = RequisitionService::new(
            &AppConfig::default(),
            ServiceDeps {
                requisitions: requisitions.clone(),
                users,
                notifier: Arc::new(notifier.clone()),
                templates: EmailTemplates::embedded().expect("templates"),
                audit: Arc::new(audit.clone()),
            },
        );
        Harness { service, requisitions, notifier, audit }
    }

    pub(crate) async fn harness() -> Harness {
        harness_with(RecordingNotifier::default()).await
    }

    pub(crate) fn laptop() -> SubmissionInput {
        SubmissionInput {
            item_name: Some("Laptop".to_string()),
            quantity: Some(1),
            unit_cost: Some(Decimal::new(1000, 0)),
            ..SubmissionInput::default()
        }
    }

    fn event_types(harness: &Harness) -> Vec<String> {
        harness.audit.events().into_iter().map(|event| event.event_type).collect()
    }

    #[tokio::test]
    async fn staff_submission_waits_for_department_supervisor() {
        let harness = harness().await;

        let created =
            harness.service.submit(&alice(), &laptop(), "cid-a").await.expect("submit");

        assert_eq!(created.status, RequisitionStatus::PendingSupervisorReview);
        assert_eq!(created.department.as_deref(), Some("Engineering"));
        assert_eq!(created.reason, "No reason provided.");
        let sent = harness.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@example.com");
        assert_eq!(sent[0].subject, "ACTION REQUIRED: New Requisition from Alice");
        assert_eq!(event_types(&harness), vec!["requisition.submitted", "notification.sent"]);
    }

    #[tokio::test]
    async fn supervisor_submission_skips_to_owner_review() {
        let harness = harness().await;

        let created = harness.service.submit(&bob(), &laptop(), "cid-b").await.expect("submit");

        assert_eq!(created.status, RequisitionStatus::PendingOwnerReview);
        let sent = harness.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "carol@example.com");
    }

    #[tokio::test]
    async fn owner_submission_is_approved_without_notification() {
        let harness = harness().await;

        let created =
            harness.service.submit(&carol(), &laptop(), "cid-c").await.expect("submit");

        assert_eq!(created.status, RequisitionStatus::Approved);
        assert!(created.supervisor_approval.is_none());
        assert!(created.owner_approval.is_none());
        assert!(harness.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn supervisor_approval_records_signoff_and_notifies_owner() {
        let harness = harness().await;
        let created = harness.service.submit(&alice(), &laptop(), "cid-1").await.expect("submit");

        let updated = harness
            .service
            .transition(&bob(), &created.id, RequisitionStatus::ApprovedBySupervisor, None, "cid-d")
            .await
            .expect("approve");

        assert_eq!(updated.status, RequisitionStatus::ApprovedBySupervisor);
        let signoff = updated.supervisor_approval.as_ref().expect("signoff");
        assert_eq!(signoff.name, "Bob");
        assert_eq!(signoff.email, "bob@example.com");
        assert_eq!(updated.audit_branch_count(), 1);

        let stored = harness
            .requisitions
            .find_by_id(&created.id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(stored, updated);

        let sent = harness.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to, "carol@example.com");
        assert_eq!(sent[1].subject, "FINAL APPROVAL NEEDED: Laptop");
    }

    #[tokio::test]
    async fn owner_final_approval_notifies_requester() {
        let harness = harness().await;
        let created = harness.service.submit(&alice(), &laptop(), "cid-1").await.expect("submit");
        harness
            .service
            .transition(&bob(), &created.id, RequisitionStatus::ApprovedBySupervisor, None, "cid-2")
            .await
            .expect("supervisor approve");

        let approved = harness
            .service
            .transition(&carol(), &created.id, RequisitionStatus::Approved, None, "cid-3")
            .await
            .expect("owner approve");

        assert_eq!(approved.status, RequisitionStatus::Approved);
        assert!(approved.supervisor_approval.is_some());
        assert_eq!(approved.owner_approval.as_ref().map(|s| s.name.as_str()), Some("Carol"));
        let last = harness.notifier.sent().pop().expect("notification");
        assert_eq!(last.to, "alice@example.com");
        assert_eq!(last.subject, "APPROVED: Laptop is Ready for Fulfillment");
    }

    #[tokio::test]
    async fn supervisor_cannot_approve_own_requisition() {
        let harness = harness().await;
        let created = harness.service.submit(&bob(), &laptop(), "cid-1").await.expect("submit");

        let error = harness
            .service
            .transition(&bob(), &created.id, RequisitionStatus::ApprovedBySupervisor, None, "cid-e")
            .await
            .expect_err("self approval must fail");

        assert!(matches!(error, ApplicationError::Domain(DomainError::Forbidden(_))));
        let stored =
            harness.requisitions.find_by_id(&created.id).await.expect("load").expect("present");
        assert_eq!(stored.status, RequisitionStatus::PendingOwnerReview);
        assert!(event_types(&harness).contains(&"requisition.transition_rejected".to_string()));
    }

    #[tokio::test]
    async fn requester_cancels_once_and_second_cancel_fails() {
        let harness = harness().await;
        let created = harness.service.submit(&alice(), &laptop(), "cid-1").await.expect("submit");

        let canceled = harness
            .service
            .transition(&alice(), &created.id, RequisitionStatus::Canceled, None, "cid-f1")
            .await
            .expect("cancel");
        assert_eq!(canceled.status, RequisitionStatus::Canceled);
        assert_eq!(canceled.cancellation.as_ref().map(|c| c.name.as_str()), Some("Alice"));
        assert_eq!(harness.notifier.sent().len(), 1, "cancel notifies nobody");

        let error = harness
            .service
            .transition(&alice(), &created.id, RequisitionStatus::Canceled, None, "cid-f2")
            .await
            .expect_err("second cancel");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn rejection_without_reason_leaves_record_untouched() {
        let harness = harness().await;
        let created = harness.service.submit(&alice(), &laptop(), "cid-1").await.expect("submit");

        let error = harness
            .service
            .transition(&bob(), &created.id, RequisitionStatus::RejectedBySupervisor, Some("  "), "c")
            .await
            .expect_err("reason required");

        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
        let stored =
            harness.requisitions.find_by_id(&created.id).await.expect("load").expect("present");
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn rejection_notifies_requester_with_reason() {
        let harness = harness().await;
        let created = harness.service.submit(&alice(), &laptop(), "cid-1").await.expect("submit");

        let rejected = harness
            .service
            .transition(
                &bob(),
                &created.id,
                RequisitionStatus::RejectedBySupervisor,
                Some("Over budget"),
                "cid-r",
            )
            .await
            .expect("reject");

        assert_eq!(rejected.rejection.as_ref().map(|r| r.reason.as_str()), Some("Over budget"));
        let last = harness.notifier.sent().pop().expect("notification");
        assert_eq!(last.to, "alice@example.com");
        assert!(last.html_body.contains("Over budget"));
        assert!(last.html_body.contains("Supervisor"));
    }

    #[tokio::test]
    async fn unknown_requisition_is_not_found() {
        let harness = harness().await;

        let error = harness
            .service
            .transition(
                &bob(),
                &RequisitionId("missing".to_string()),
                RequisitionStatus::ApprovedBySupervisor,
                None,
                "cid",
            )
            .await
            .expect_err("missing");

        assert_eq!(error, ApplicationError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn missing_reviewer_keeps_submission_and_records_skip() {
        let harness = harness().await;

        let created = harness.service.submit(&dave(), &laptop(), "cid-s").await.expect("submit");

        assert_eq!(created.status, RequisitionStatus::PendingSupervisorReview);
        assert!(harness.notifier.sent().is_empty());
        assert_eq!(event_types(&harness), vec!["requisition.submitted", "notification.skipped"]);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_submission() {
        let harness =
            harness_with(RecordingNotifier::failing(NotifyError::Transport("down".into()))).await;

        let created = harness.service.submit(&alice(), &laptop(), "cid").await.expect("submit");

        assert_eq!(harness.requisitions.len().await, 1);
        assert_eq!(created.status, RequisitionStatus::PendingSupervisorReview);
        let failed = harness
            .audit
            .events()
            .into_iter()
            .find(|event| event.event_type == "notification.failed")
            .expect("failure audited");
        assert_eq!(failed.outcome, AuditOutcome::Failed);
    }

    #[tokio::test]
    async fn overflowing_total_cost_is_rejected_before_anything_is_stored() {
        let harness = harness().await;
        let input =
            SubmissionInput { quantity: Some(2), unit_cost: Some(Decimal::MAX), ..laptop() };

        let error =
            harness.service.submit(&alice(), &input, "cid").await.expect_err("total overflows");

        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
        assert_eq!(harness.requisitions.len().await, 0);
        assert!(harness.notifier.sent().is_empty());

        let listed =
            harness.service.list(&carol(), View::All, None, None, "cid").await.expect("list");
        assert!(listed.items.is_empty());
    }

    #[tokio::test]
    async fn listing_paginates_own_submissions_newest_first() {
        let harness = harness().await;
        for index in 0..3 {
            let input = SubmissionInput {
                item_name: Some(format!("Item {index}")),
                ..laptop()
            };
            harness.service.submit(&alice(), &input, "cid").await.expect("submit");
        }

        let first = harness
            .service
            .list(&alice(), View::MySubmissions, Some(1), Some(2), "cid")
            .await
            .expect("page 1");
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].item_name, "Item 2");
        assert!(first.meta.has_next_page);
        assert!(!first.meta.has_prev_page);

        let second = harness
            .service
            .list(&alice(), View::MySubmissions, Some(2), Some(2), "cid")
            .await
            .expect("page 2");
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].item_name, "Item 0");
        assert!(!second.meta.has_next_page);
        assert!(second.meta.has_prev_page);
    }

    #[tokio::test]
    async fn supervisor_action_queue_is_department_scoped() {
        let harness = harness().await;
        harness.service.submit(&alice(), &laptop(), "cid").await.expect("engineering");
        harness.service.submit(&dave(), &laptop(), "cid").await.expect("sales");

        let queue =
            harness.service.list(&bob(), View::Action, None, None, "cid").await.expect("queue");

        assert_eq!(queue.items.len(), 1);
        assert_eq!(queue.items[0].requester_email, "alice@example.com");
    }

    #[tokio::test]
    async fn oversized_limit_is_a_validation_error() {
        let harness = harness().await;

        let error = harness
            .service
            .list(&carol(), View::All, None, Some(101), "cid")
            .await
            .expect_err("limit too large");

        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
    }

    /// Reads succeed but every write reports that the status moved underneath.
    struct StaleWrites(InMemoryRequisitionRepository);

    #[async_trait]
    impl RequisitionRepository for StaleWrites {
        async fn create(&self, requisition: NewRequisition) -> Result<Requisition, RepositoryError> {
            self.0.create(requisition).await
        }

        async fn find_by_id(
            &self,
            id: &RequisitionId,
        ) -> Result<Option<Requisition>, RepositoryError> {
            self.0.find_by_id(id).await
        }

        async fn update(
            &self,
            _id: &RequisitionId,
            _update: &RequisitionUpdate,
        ) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn query(
            &self,
            query: &RequisitionQuery,
        ) -> Result<Vec<Requisition>, RepositoryError> {
            self.0.query(query).await
        }
    }

    struct BrokenStorage;

    #[async_trait]
    impl RequisitionRepository for BrokenStorage {
        async fn create(&self, _: NewRequisition) -> Result<Requisition, RepositoryError> {
            Err(RepositoryError::Decode("disk on fire".to_string()))
        }

        async fn find_by_id(&self, _: &RequisitionId) -> Result<Option<Requisition>, RepositoryError> {
            Err(RepositoryError::Decode("disk on fire".to_string()))
        }

        async fn update(
            &self,
            _: &RequisitionId,
            _: &RequisitionUpdate,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Decode("disk on fire".to_string()))
        }

        async fn query(&self, _: &RequisitionQuery) -> Result<Vec<Requisition>, RepositoryError> {
            Err(RepositoryError::Decode("disk on fire".to_string()))
        }
    }

    fn service_over(requisitions: Arc<dyn RequisitionRepository>) -> RequisitionService {
        RequisitionService::new(
            &AppConfig::default(),
            ServiceDeps {
                requisitions,
                users: Arc::new(InMemoryUserRepository::default()),
                notifier: Arc::new(RecordingNotifier::default()),
                templates: EmailTemplates::embedded().expect("templates"),
                audit: Arc::new(InMemoryAuditSink::default()),
            },
        )
    }

    #[tokio::test]
    async fn stale_status_write_is_a_conflict() {
        let service = service_over(Arc::new(StaleWrites(InMemoryRequisitionRepository::default())));
        let created = service.submit(&alice(), &laptop(), "cid").await.expect("submit");

        let error = service
            .transition(&alice(), &created.id, RequisitionStatus::Canceled, None, "cid")
            .await
            .expect_err("conflict");

        assert_eq!(
            error,
            ApplicationError::Conflict {
                id: created.id.0.clone(),
                expected: RequisitionStatus::PendingSupervisorReview,
            }
        );
    }

    #[tokio::test]
    async fn storage_failure_fails_the_operation() {
        let service = service_over(Arc::new(BrokenStorage));

        let error = service.submit(&alice(), &laptop(), "cid").await.expect_err("storage down");

        assert!(matches!(error, ApplicationError::Persistence(_)));
    }
}
