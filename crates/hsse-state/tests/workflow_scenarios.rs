//! # End-to-End Workflow Scenarios
//!
//! Drives complete audits, permits, licenses and corrective actions through
//! the public aggregate API with a fixed clock, checking the verification
//! gate, record gating by parent status and overdue evaluation.

use hsse_core::{ActorId, Clock, FindingType, FixedClock, Severity, Timestamp};
use hsse_state::{
    FindingStatus, NewCorrectiveAction, NewFinding, NewWorkflow, Workflow, WorkflowError,
    WorkflowKind, WorkflowStatus,
};

fn test_clock() -> FixedClock {
    FixedClock::at(Timestamp::parse("2025-01-09T07:30:00Z").unwrap())
}

fn actor(name: &str) -> ActorId {
    ActorId::new(name).unwrap()
}

fn create(kind: WorkflowKind, clock: &dyn Clock) -> Workflow {
    Workflow::create(
        NewWorkflow {
            id: None,
            kind,
            number: format!("{}-2025-001", kind.as_str().to_uppercase()),
            title: "Refinery unit 3".to_string(),
        },
        clock,
    )
    .unwrap()
}

#[test]
fn test_audit_major_finding_requires_verification_before_close() {
    let clock = test_clock();
    let mut audit = create(WorkflowKind::Audit, &clock);

    audit
        .schedule(Timestamp::parse_date_or_time("2025-01-10").unwrap(), &clock)
        .unwrap();
    clock.advance_days(1);
    audit.start(&clock).unwrap();

    let finding = audit
        .add_finding(
            NewFinding::new(
                "pressure relief valve overdue for test",
                FindingType::NonConformance,
                Severity::Major,
            ),
            &clock,
        )
        .unwrap();
    audit
        .complete(
            "one major non-conformance",
            Some("extend PRV test programme".to_string()),
            &clock,
        )
        .unwrap();
    assert_eq!(audit.status(), WorkflowStatus::Completed);

    audit.resolve_finding(finding, &clock).unwrap();

    let err = audit
        .close_finding(finding, actor("auditor"), None, &clock)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PrematureClosure { .. }));
    assert_eq!(audit.finding(finding).unwrap().status(), FindingStatus::Resolved);

    audit
        .verify_finding(finding, actor("verifier"), Some("test certificate seen".into()), &clock)
        .unwrap();
    audit
        .close_finding(finding, actor("auditor"), None, &clock)
        .unwrap();
    assert_eq!(audit.finding(finding).unwrap().status(), FindingStatus::Closed);
}

#[test]
fn test_lower_severity_findings_close_directly_after_resolve() {
    let clock = test_clock();
    let mut audit = create(WorkflowKind::Inspection, &clock);
    audit.schedule(clock.now(), &clock).unwrap();

    for severity in [Severity::Negligible, Severity::Minor, Severity::Moderate] {
        let id = audit
            .add_finding(
                NewFinding::new("housekeeping", FindingType::Observation, severity),
                &clock,
            )
            .unwrap();
        audit.resolve_finding(id, &clock).unwrap();
        audit
            .close_finding(id, actor("inspector"), None, &clock)
            .unwrap();
    }
    assert!(audit
        .findings()
        .iter()
        .all(|f| f.status() == FindingStatus::Closed));
}

#[test]
fn test_gated_severities_cannot_skip_verification() {
    let clock = test_clock();
    let mut audit = create(WorkflowKind::Audit, &clock);
    audit.schedule(clock.now(), &clock).unwrap();

    for severity in [Severity::Major, Severity::Critical, Severity::Catastrophic] {
        let id = audit
            .add_finding(
                NewFinding::new("gas detector fault", FindingType::NonConformance, severity),
                &clock,
            )
            .unwrap();
        audit.resolve_finding(id, &clock).unwrap();
        assert!(matches!(
            audit.close_finding(id, actor("lead"), None, &clock),
            Err(WorkflowError::PrematureClosure { requires_verification: true, .. })
        ));
    }
}

#[test]
fn test_complete_on_fresh_draft_fails_for_every_variant() {
    let clock = test_clock();
    for kind in WorkflowKind::all() {
        let mut wf = create(*kind, &clock);
        let err = wf.complete("summary", None, &clock).unwrap_err();
        assert!(
            matches!(
                err,
                WorkflowError::InvalidTransition { from: "DRAFT", to: "COMPLETED", .. }
            ),
            "{kind}: {err}"
        );
        assert_eq!(wf.status(), WorkflowStatus::Draft);
    }
}

#[test]
fn test_work_permit_hazards_gated_on_schedule() {
    let clock = test_clock();
    let mut permit = create(WorkflowKind::WorkPermit, &clock);

    let err = permit
        .add_hazard("hot work near fuel lines", Severity::Critical, &clock)
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidState { state: "DRAFT", .. }
    ));
    assert!(permit.items().is_empty());

    permit.schedule(clock.now().plus_days(2), &clock).unwrap();
    permit
        .add_hazard("hot work near fuel lines", Severity::Critical, &clock)
        .unwrap();
    assert_eq!(permit.items().len(), 1);
}

#[test]
fn test_license_activation_chain() {
    let clock = test_clock();
    let mut license = create(WorkflowKind::License, &clock);

    license.submit(&clock).unwrap();
    license
        .approve(actor("regulator"), Some(clock.now().plus_days(365)), &clock)
        .unwrap();
    license.activate(&clock).unwrap();
    license.suspend("inspection backlog", &clock).unwrap();
    assert_eq!(license.status(), WorkflowStatus::Suspended);

    let err = license.activate(&clock).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition {
            from: "SUSPENDED",
            to: "ACTIVE",
            ..
        }
    ));
    assert_eq!(license.status(), WorkflowStatus::Suspended);
}

#[test]
fn test_corrective_action_overdue_until_completed() {
    let clock = test_clock();
    let mut incident = create(WorkflowKind::SecurityIncident, &clock);
    incident.submit(&clock).unwrap();

    let yesterday = clock.now().plus_days(-1);
    let action = incident
        .add_corrective_action(
            NewCorrectiveAction {
                id: None,
                description: "rotate compromised badge codes".to_string(),
                responsible_party: actor("security-office"),
                due_date: Some(yesterday),
                priority: Some(hsse_core::Priority::High),
                finding_id: None,
            },
            &clock,
        )
        .unwrap();
    assert!(incident.action(action).unwrap().is_overdue(clock.now()));

    incident
        .complete_action(action, actor("security-office"), None, &clock)
        .unwrap();
    let done = incident.action(action).unwrap();
    assert_eq!(done.due_date(), yesterday);
    assert!(!done.is_overdue(clock.now()));
    clock.advance_days(30);
    assert!(!done.is_overdue(clock.now()));
}

#[test]
fn test_persisted_workflow_reloads_identically() {
    let clock = test_clock();
    let mut audit = create(WorkflowKind::Audit, &clock);
    audit.schedule(clock.now(), &clock).unwrap();
    audit.start(&clock).unwrap();
    let finding = audit
        .add_finding(
            NewFinding::new("eyewash station dry", FindingType::CriticalNonConformance, Severity::Minor),
            &clock,
        )
        .unwrap();
    audit.resolve_finding(finding, &clock).unwrap();

    let json = serde_json::to_string_pretty(&audit).unwrap();
    let reloaded: Workflow = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded, audit);
    assert!(reloaded.finding(finding).unwrap().awaiting_verification());
}

#[test]
fn test_resolved_incident_can_still_be_cancelled_or_rejected() {
    let clock = test_clock();
    let resolved = || {
        let mut incident = create(WorkflowKind::SecurityIncident, &clock);
        incident.submit(&clock).unwrap();
        incident.start(&clock).unwrap();
        incident.resolve("intruder escorted off site", &clock).unwrap();
        assert_eq!(incident.status(), WorkflowStatus::Resolved);
        assert!(!incident.is_terminal());
        incident
    };

    let mut cancelled = resolved();
    cancelled.cancel("logged against the wrong site", &clock).unwrap();
    assert_eq!(cancelled.status(), WorkflowStatus::Cancelled);
    assert!(cancelled.actual_end_at().is_some());

    let mut rejected = resolved();
    rejected.reject("not a security event", &clock).unwrap();
    assert_eq!(rejected.status(), WorkflowStatus::Rejected);

    for withdrawn in [cancelled, rejected] {
        let json = serde_json::to_string(&withdrawn).unwrap();
        let reloaded: Workflow = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, withdrawn);
        assert!(matches!(
            reloaded.clone().close(None, &clock),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }
}
