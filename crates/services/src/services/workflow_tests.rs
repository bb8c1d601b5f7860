//! Tests for the workflow engine against an in-memory store

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            approval::{Approval, ApprovalState, CreateApproval, ResolveApproval},
            artifact::{Artifact, CreateArtifact},
            event_log::{EventFilter, EventLog, EventResult},
            mission::{CreateMission, Mission, UpdateMission},
            project::{CreateProject, Project},
            status::{Risk, WorkStatus},
            task::{CreateTask, Task, UpdateTask},
        },
        test_utils::setup_test_pool,
    };
    use futures::{FutureExt, StreamExt};
    use sqlx::SqlitePool;

    use crate::services::{
        events::EventService,
        validation::ValidationError,
        workflow::{WorkflowEngine, WorkflowError},
    };

    async fn engine() -> (WorkflowEngine, SqlitePool) {
        let pool = setup_test_pool().await;
        let engine = WorkflowEngine::new(DBService::from_pool(pool.clone()), EventService::default());
        (engine, pool)
    }

    async fn all_events(pool: &SqlitePool) -> Vec<EventLog> {
        EventLog::query(pool, &EventFilter::default())
            .await
            .expect("query events")
    }

    async fn project(engine: &WorkflowEngine) -> Project {
        engine
            .create_project(CreateProject {
                name: "Board".into(),
                actor: None,
            })
            .await
            .expect("create project")
    }

    async fn mission(engine: &WorkflowEngine, project_id: &str) -> Mission {
        engine
            .create_mission(CreateMission {
                project_id: project_id.to_string(),
                title: "Launch".into(),
                ..Default::default()
            })
            .await
            .expect("create mission")
    }

    async fn request(engine: &WorkflowEngine, mission_id: &str, title: &str) -> Approval {
        engine
            .request_approval(CreateApproval {
                mission_id: Some(mission_id.to_string()),
                title: title.to_string(),
                ..Default::default()
            })
            .await
            .expect("request approval")
    }

    #[tokio::test]
    async fn create_project_records_one_event_with_default_actor() {
        let (engine, pool) = engine().await;
        let mut feed = engine.subscribe();

        let project = project(&engine).await;

        let events = all_events(&pool).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "project.create");
        assert_eq!(events[0].actor, "FILIPE");
        assert_eq!(events[0].result, EventResult::Ok);
        assert_eq!(events[0].project_id.as_deref(), Some(project.id.as_str()));

        let live = feed.next().await.expect("live event");
        assert_eq!(live.id, events[0].id);
    }

    #[tokio::test]
    async fn project_name_bounds() {
        let (engine, pool) = engine().await;

        for name in [String::new(), "x".repeat(121)] {
            let err = engine
                .create_project(CreateProject { name, actor: None })
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(ValidationError::Length { .. })));
        }
        assert!(all_events(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn mission_status_must_be_in_vocabulary() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;

        let doing = engine
            .create_mission(CreateMission {
                project_id: project.id.clone(),
                title: "Doing one".into(),
                status: Some("Doing".into()),
                ..Default::default()
            })
            .await
            .expect("Doing is valid");
        assert_eq!(doing.status, WorkStatus::Doing);

        let err = engine
            .create_mission(CreateMission {
                project_id: project.id.clone(),
                title: "Bad".into(),
                status: Some("InProgress".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::InvalidStatus { .. })
        ));

        let err = engine
            .update_mission(
                &doing.id,
                UpdateMission {
                    status: Some("Finished".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        // project.create + mission.create only
        assert_eq!(all_events(&pool).await.len(), 2);
    }

    #[tokio::test]
    async fn create_mission_round_trips_through_listing() {
        let (engine, _pool) = engine().await;
        let project = project(&engine).await;

        engine
            .create_mission(CreateMission {
                project_id: project.id.clone(),
                title: "T".into(),
                objective: Some("O".into()),
                status: Some("Backlog".into()),
                risk: Some("low".into()),
                cost_usd: Some(1.5),
                actor: None,
            })
            .await
            .expect("create mission");

        let listed = engine.list_missions(None).await.expect("list");
        assert!(listed.iter().any(|m| m.title == "T"
            && m.objective == "O"
            && m.status == WorkStatus::Backlog
            && m.risk == Risk::Low
            && m.cost_usd == Some(1.5)));
    }

    #[tokio::test]
    async fn create_mission_for_unknown_project_is_not_found() {
        let (engine, pool) = engine().await;
        let err = engine
            .create_mission(CreateMission {
                project_id: "proj_missing".into(),
                title: "Orphan".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("project")));
        assert!(all_events(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn non_finite_cost_is_rejected() {
        let (engine, _pool) = engine().await;
        let project = project(&engine).await;
        let err = engine
            .create_mission(CreateMission {
                project_id: project.id,
                title: "Costly".into(),
                cost_usd: Some(f64::NAN),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::NonFiniteCost)
        ));
    }

    #[tokio::test]
    async fn update_mission_merges_only_supplied_fields() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let created = engine
            .create_mission(CreateMission {
                project_id: project.id.clone(),
                title: "Launch".into(),
                objective: Some("Ship it".into()),
                risk: Some("high".into()),
                cost_usd: Some(2.0),
                ..Default::default()
            })
            .await
            .expect("create");

        let updated = engine
            .update_mission(
                &created.id,
                UpdateMission {
                    status: Some("Review".into()),
                    cost_usd: Some(None),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.title, "Launch");
        assert_eq!(updated.objective, "Ship it");
        assert_eq!(updated.risk, Risk::High);
        assert_eq!(updated.status, WorkStatus::Review);
        assert_eq!(updated.cost_usd, None);
        assert!(updated.updated_at > created.updated_at);

        let stored = engine.get_mission(&created.id).await.expect("get");
        assert_eq!(stored.status, WorkStatus::Review);
        assert_eq!(stored.cost_usd, None);

        let latest = &all_events(&pool).await[0];
        assert_eq!(latest.action, "mission.update");
        assert_eq!(latest.actor, "ALFRED");
        assert_eq!(latest.message, "\"Launch\": Backlog → Review");
    }

    #[tokio::test]
    async fn update_unknown_mission_is_not_found() {
        let (engine, pool) = engine().await;
        let err = engine
            .update_mission("msn_missing", UpdateMission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("mission")));
        assert!(all_events(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn task_changes_bump_parent_mission() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let first = mission(&engine, &project.id).await;
        let second = mission(&engine, &project.id).await;

        // second is newest until a task lands on first
        assert_eq!(engine.list_missions(None).await.unwrap()[0].id, second.id);

        let task = engine
            .create_task(
                &first.id,
                CreateTask {
                    title: "Write copy".into(),
                    critical: Some(true),
                    ..Default::default()
                },
            )
            .await
            .expect("create task");
        assert_eq!(task.status, WorkStatus::Backlog);
        assert!(task.critical);

        let missions = engine.list_missions(Some(project.id.clone())).await.unwrap();
        assert_eq!(missions[0].id, first.id);

        let created = &all_events(&pool).await[0];
        assert_eq!(created.action, "task.create");
        assert_eq!(created.actor, "FILIPE");
        assert_eq!(created.mission_id.as_deref(), Some(first.id.as_str()));
        assert_eq!(created.task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(created.project_id.as_deref(), Some(project.id.as_str()));

        let before = engine.get_mission(&first.id).await.unwrap().updated_at;
        let updated = engine
            .update_task(
                &task.id,
                UpdateTask {
                    status: Some("Done".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update task");
        assert_eq!(updated.status, WorkStatus::Done);
        assert_eq!(updated.title, "Write copy");
        assert!(updated.critical);
        assert!(engine.get_mission(&first.id).await.unwrap().updated_at > before);

        let event = &all_events(&pool).await[0];
        assert_eq!(event.action, "task.update");
        assert_eq!(event.actor, "ALFRED");
        assert_eq!(event.project_id.as_deref(), Some(project.id.as_str()));
    }

    #[tokio::test]
    async fn task_for_unknown_mission_is_not_found() {
        let (engine, _pool) = engine().await;
        let err = engine
            .create_task(
                "msn_missing",
                CreateTask {
                    title: "Nowhere".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("mission")));

        let err = engine
            .update_task("tsk_missing", UpdateTask::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("task")));
    }

    #[tokio::test]
    async fn approval_without_target_fails_and_logs_nothing() {
        let (engine, pool) = engine().await;
        let err = engine
            .request_approval(CreateApproval {
                mission_id: Some("   ".into()),
                title: "Deploy".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingTarget)
        ));
        assert!(all_events(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn approval_on_task_resolves_mission_and_project_for_event() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        let task = engine
            .create_task(
                &mission.id,
                CreateTask {
                    title: "Pay vendor".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let approval = engine
            .request_approval(CreateApproval {
                task_id: Some(task.id.clone()),
                title: "Release payment".into(),
                ..Default::default()
            })
            .await
            .expect("request");
        assert_eq!(approval.state, ApprovalState::Requested);
        assert_eq!(approval.requested_by, "ALFRED");
        assert_eq!(approval.mission_id, None);

        let event = &all_events(&pool).await[0];
        assert_eq!(event.action, "approval.request");
        assert_eq!(event.project_id.as_deref(), Some(project.id.as_str()));
        assert_eq!(event.mission_id.as_deref(), Some(mission.id.as_str()));
        assert_eq!(event.task_id.as_deref(), Some(task.id.as_str()));

        let err = engine
            .request_approval(CreateApproval {
                task_id: Some("tsk_missing".into()),
                title: "Ghost".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("task")));
    }

    #[tokio::test]
    async fn approving_twice_is_a_conflict() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        let approval = request(&engine, &mission.id, "Deploy").await;

        let approved = engine
            .approve_approval(&approval.id, ResolveApproval::default())
            .await
            .expect("approve");
        assert_eq!(approved.state, ApprovalState::Approved);
        let approved_at = approved.approved_at.expect("approvedAt set");
        let events_after_approve = all_events(&pool).await.len();
        assert_eq!(all_events(&pool).await[0].actor, "FILIPE");

        let err = engine
            .approve_approval(&approval.id, ResolveApproval::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
        let err = engine
            .reject_approval(&approval.id, ResolveApproval::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let stored = Approval::find_by_id(&pool, &approval.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, ApprovalState::Approved);
        assert_eq!(stored.approved_at, Some(approved_at));
        assert_eq!(all_events(&pool).await.len(), events_after_approve);
    }

    #[tokio::test]
    async fn reject_is_terminal() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        let approval = request(&engine, &mission.id, "Spend budget").await;

        let rejected = engine
            .reject_approval(
                &approval.id,
                ResolveApproval {
                    actor: Some("ops".into()),
                },
            )
            .await
            .expect("reject");
        assert_eq!(rejected.state, ApprovalState::Rejected);
        assert_eq!(rejected.approved_at, None);

        let event = &all_events(&pool).await[0];
        assert_eq!(event.action, "approval.reject");
        assert_eq!(event.actor, "ops");

        let err = engine
            .approve_approval(&approval.id, ResolveApproval::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let err = engine
            .approve_approval("apv_missing", ResolveApproval::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("approval")));
    }

    #[tokio::test]
    async fn ok_execute_drains_pending_then_records_noop() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        let older = request(&engine, &mission.id, "First").await;
        let newer = request(&engine, &mission.id, "Second").await;

        let first = engine.ok_execute(&mission.id, None).await.expect("first");
        assert_eq!(first.result, EventResult::Ok);
        let first_approved = first.approval.expect("approval");
        // Most recently updated pending approval goes first.
        assert_eq!(first_approved.id, newer.id);
        let still_pending = Approval::find_by_id(&pool, &older.id).await.unwrap().unwrap();
        assert_eq!(still_pending.state, ApprovalState::Requested);

        let second = engine.ok_execute(&mission.id, None).await.expect("second");
        assert_eq!(second.approval.map(|a| a.id), Some(older.id.clone()));

        let events_before_noop = all_events(&pool).await.len();
        let mut feed = engine.subscribe();
        let third = engine.ok_execute(&mission.id, None).await.expect("third");
        assert_eq!(third.result, EventResult::Noop);
        assert!(third.approval.is_none());

        let events = all_events(&pool).await;
        assert_eq!(events.len(), events_before_noop + 1);
        assert_eq!(events[0].action, "approval.ok_execute");
        assert_eq!(events[0].result, EventResult::Noop);
        assert_eq!(events[0].actor, "ALFRED");
        assert_eq!(events[1].action, "approval.approve");
        assert_eq!(feed.next().await.map(|e| e.id), Some(events[0].id.clone()));

        let approvals = engine.list_approvals(&mission.id).await.unwrap();
        assert!(approvals.iter().all(|a| a.state == ApprovalState::Approved));
    }

    #[tokio::test]
    async fn ok_execute_on_unknown_mission_is_not_found() {
        let (engine, pool) = engine().await;
        let err = engine.ok_execute("msn_missing", None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("mission")));
        assert!(all_events(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn artifacts_validate_and_link() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;

        let artifact = engine
            .create_artifact(CreateArtifact {
                mission_id: Some(mission.id.clone()),
                task_id: None,
                title: "Brief".into(),
                kind: "doc".into(),
                reference: "https://example.com/brief".into(),
                actor: None,
            })
            .await
            .expect("create artifact");
        assert_eq!(
            engine.list_artifacts(&mission.id).await.unwrap()[0].id,
            artifact.id
        );
        let event = &all_events(&pool).await[0];
        assert_eq!(event.action, "artifact.create");
        assert_eq!(event.actor, "ALFRED");

        let err = engine
            .create_artifact(CreateArtifact {
                mission_id: None,
                task_id: None,
                title: "Loose".into(),
                kind: "link".into(),
                reference: "x".into(),
                actor: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingTarget)
        ));

        let err = engine
            .create_artifact(CreateArtifact {
                mission_id: Some(mission.id.clone()),
                task_id: None,
                title: "Weird".into(),
                kind: "k".repeat(41),
                reference: "x".into(),
                actor: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn deleting_a_project_keeps_history() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        let task = engine
            .create_task(
                &mission.id,
                CreateTask {
                    title: "Child".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let approval = request(&engine, &mission.id, "Gate").await;
        let events_before = all_events(&pool).await.len();

        engine
            .delete_project(&project.id, None)
            .await
            .expect("delete project");

        assert!(Project::find_by_id(&pool, &project.id).await.unwrap().is_none());
        assert!(Mission::find_by_id(&pool, &mission.id).await.unwrap().is_none());
        assert!(Task::find_by_id(&pool, &task.id).await.unwrap().is_none());

        let orphan = Approval::find_by_id(&pool, &approval.id)
            .await
            .unwrap()
            .expect("approval row kept");
        assert_eq!(orphan.mission_id, None);

        let events = all_events(&pool).await;
        assert_eq!(events.len(), events_before + 1);
        assert_eq!(events[0].action, "project.delete");
        assert!(
            events
                .iter()
                .any(|e| e.mission_id.as_deref() == Some(mission.id.as_str()))
        );

        // A dangling approval can still be resolved.
        let approved = engine
            .approve_approval(&approval.id, ResolveApproval::default())
            .await
            .expect("approve orphan");
        assert_eq!(approved.state, ApprovalState::Approved);

        let err = engine.delete_project(&project.id, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("project")));
    }

    #[tokio::test]
    async fn seed_demo_is_one_event() {
        let (engine, pool) = engine().await;
        let mut feed = engine.subscribe();

        let seeded = engine.seed_demo(None).await.expect("seed");

        let mission = engine.get_mission(&seeded.mission_id).await.unwrap();
        assert_eq!(mission.project_id, seeded.project_id);
        assert_eq!(mission.status, WorkStatus::Doing);
        assert_eq!(mission.risk, Risk::Medium);
        assert_eq!(mission.cost_usd, Some(0.5));

        let tasks = engine.list_tasks(&mission.id).await.unwrap();
        assert_eq!(tasks.len(), 4);
        let critical: Vec<_> = tasks.iter().filter(|t| t.critical).collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].status, WorkStatus::NeedsInfo);

        let approvals = engine.list_approvals(&mission.id).await.unwrap();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].state, ApprovalState::Requested);

        let events = all_events(&pool).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "seed.demo");
        assert_eq!(events[0].actor, "ALFRED");
        assert_eq!(feed.next().await.map(|e| e.action), Some("seed.demo".into()));
    }

    #[tokio::test]
    async fn event_filters_and_limits() {
        let (engine, _pool) = engine().await;
        let a = project(&engine).await;
        let b = project(&engine).await;
        mission(&engine, &a.id).await;
        mission(&engine, &a.id).await;

        let scoped = engine
            .list_events(EventFilter {
                project_id: Some(a.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(scoped.len(), 3);

        let only_b = engine
            .list_events(EventFilter {
                project_id: Some(b.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_b.len(), 1);

        let limited = engine
            .list_events(EventFilter {
                limit: Some(2),
                project_id: Some(String::new()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].action, "mission.create");
    }

    #[tokio::test]
    async fn artifacts_survive_task_listing_unaffected() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        engine
            .create_artifact(CreateArtifact {
                mission_id: Some(mission.id.clone()),
                task_id: None,
                title: "Spec".into(),
                kind: "link".into(),
                reference: "https://example.com".into(),
                actor: Some("FILIPE".into()),
            })
            .await
            .unwrap();

        engine.delete_project(&project.id, None).await.unwrap();
        let rows: Vec<Artifact> = sqlx::query_as("SELECT * FROM artifacts")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mission_id, None);
    }

    #[tokio::test]
    async fn null_title_in_patch_is_rejected() {
        let (engine, pool) = engine().await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        let task = engine
            .create_task(
                &mission.id,
                CreateTask {
                    title: "Draft".into(),
                    ..Default::default()
                },
            )
            .await
            .expect("create task");
        let events_before = all_events(&pool).await.len();

        let patch: UpdateMission = serde_json::from_str(r#"{"title": null}"#).unwrap();
        let err = engine.update_mission(&mission.id, patch).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::NullField("title"))
        ));

        let patch: UpdateTask = serde_json::from_str(r#"{"title": null}"#).unwrap();
        let err = engine.update_task(&task.id, patch).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::NullField("title"))
        ));

        assert_eq!(engine.get_mission(&mission.id).await.unwrap().title, "Launch");
        assert_eq!(all_events(&pool).await.len(), events_before);

        let patch: UpdateMission = serde_json::from_str(r#"{"title": "Relaunch"}"#).unwrap();
        let renamed = engine.update_mission(&mission.id, patch).await.expect("rename");
        assert_eq!(renamed.title, "Relaunch");
    }

    #[tokio::test]
    async fn failed_event_append_rolls_back_the_change() {
        let (engine, pool) = engine().await;
        let existing = project(&engine).await;
        let mission = mission(&engine, &existing.id).await;
        let mut feed = engine.subscribe();

        sqlx::query(
            "CREATE TRIGGER reject_events BEFORE INSERT ON event_logs \
             BEGIN SELECT RAISE(ABORT, 'event log unavailable'); END",
        )
        .execute(&pool)
        .await
        .expect("install trigger");

        let err = engine
            .create_project(CreateProject {
                name: "Doomed".into(),
                actor: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(_)));

        let err = engine
            .update_mission(
                &mission.id,
                UpdateMission {
                    status: Some("Done".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(_)));

        let projects = Project::find_all(&pool).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, existing.id);
        let stored = engine.get_mission(&mission.id).await.unwrap();
        assert_eq!(stored.status, WorkStatus::Backlog);
        assert_eq!(stored.updated_at, mission.updated_at);
        assert_eq!(all_events(&pool).await.len(), 2);

        // Nothing was broadcast and the observer is still connected.
        assert!(feed.next().now_or_never().is_none());
        assert_eq!(engine.events().subscriber_count(), 1);
    }

    async fn file_engine(dir: &tempfile::TempDir) -> (WorkflowEngine, SqlitePool) {
        let db = DBService::new(&dir.path().join("board.sqlite"))
            .await
            .expect("open file store");
        let pool = db.pool.clone();
        (WorkflowEngine::new(db, EventService::default()), pool)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_all_apply() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (engine, pool) = file_engine(&dir).await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let engine = engine.clone();
                let id = mission.id.clone();
                tokio::spawn(async move {
                    engine
                        .update_mission(
                            &id,
                            UpdateMission {
                                title: Some(Some(format!("t{i}"))),
                                ..Default::default()
                            },
                        )
                        .await
                })
            })
            .collect();

        let mut titles = Vec::new();
        for handle in handles {
            let updated = handle.await.expect("join").expect("update");
            titles.push(updated.title);
        }
        assert_eq!(titles.len(), 40);

        let updates = EventLog::query(
            &pool,
            &EventFilter {
                mission_id: Some(mission.id.clone()),
                limit: Some(500),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == "mission.update")
        .count();
        assert_eq!(updates, 40);

        // Last write wins: the stored title is one of the submitted ones.
        let stored = engine.get_mission(&mission.id).await.unwrap();
        assert!(titles.contains(&stored.title));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn double_ok_execute_approves_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (engine, _pool) = file_engine(&dir).await;
        let project = project(&engine).await;
        let mission = mission(&engine, &project.id).await;
        request(&engine, &mission.id, "Deploy").await;

        let (a, b) = tokio::join!(
            engine.ok_execute(&mission.id, None),
            engine.ok_execute(&mission.id, None)
        );
        let mut results = vec![a.expect("first").result, b.expect("second").result];
        results.sort_by_key(|r| r.to_string());
        assert_eq!(results, vec![EventResult::Noop, EventResult::Ok]);
    }
}
