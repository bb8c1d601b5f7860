//! Workflow engine: every mutation of the board goes through here.
//!
//! Each operation validates its input before touching storage, then applies
//! the entity change and appends exactly one event inside a single
//! transaction. The event is broadcast to live observers only after the
//! commit succeeds.

use chrono::{DateTime, Duration, Utc};
use db::{
    DBService,
    models::{
        approval::{Approval, ApprovalState, CreateApproval, ResolveApproval},
        artifact::{Artifact, CreateArtifact},
        event_log::{EventFilter, EventLog, EventResult, NewEvent},
        mission::{CreateMission, Mission, UpdateMission},
        project::{CreateProject, Project},
        status::{Risk, WorkStatus},
        task::{CreateTask, Task, UpdateTask},
    },
};
use serde::Serialize;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use thiserror::Error;
use ts_rs::TS;

use super::{
    actors::{self, actor_or},
    events::{EventService, Subscription},
    validation::{
        self, ARTIFACT_KIND_MAX, ARTIFACT_REF_MAX, EntityKind, PROJECT_NAME_MAX, TITLE_MAX,
        ValidationError,
    },
};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Result of the OK EXECUTAR action on a mission.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OkExecuteOutcome {
    pub result: EventResult,
    pub approval: Option<Approval>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub project_id: String,
    pub mission_id: String,
}

/// Entity ids an approval or artifact event is linked to.
struct Link {
    project_id: Option<String>,
    mission_id: Option<String>,
    task_id: Option<String>,
}

/// `updatedAt` must move forward on every write, even when the clock has not.
fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[derive(Clone)]
pub struct WorkflowEngine {
    db: DBService,
    events: EventService,
}

impl WorkflowEngine {
    pub fn new(db: DBService, events: EventService) -> Self {
        Self { db, events }
    }

    pub fn events(&self) -> &EventService {
        &self.events
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Append `event`, commit, then fan it out. Nothing is broadcast when the
    /// commit fails.
    async fn finish(
        &self,
        mut tx: Transaction<'static, Sqlite>,
        event: NewEvent,
    ) -> Result<EventLog, WorkflowError> {
        let event = EventLog::append(&mut *tx, event).await?;
        tx.commit().await?;

        tracing::info!(
            action = %event.action,
            actor = %event.actor,
            result = %event.result,
            project_id = ?event.project_id,
            mission_id = ?event.mission_id,
            task_id = ?event.task_id,
            "{}",
            event.message
        );
        self.events.broadcast(&event);
        Ok(event)
    }

    // Reads

    pub async fn list_projects(&self) -> Result<Vec<Project>, WorkflowError> {
        Ok(Project::find_all(&self.db.pool).await?)
    }

    pub async fn list_missions(
        &self,
        project_id: Option<String>,
    ) -> Result<Vec<Mission>, WorkflowError> {
        let missions = match validation::normalize_id(project_id) {
            Some(project_id) => Mission::find_by_project_id(&self.db.pool, &project_id).await?,
            None => Mission::find_all(&self.db.pool).await?,
        };
        Ok(missions)
    }

    pub async fn get_mission(&self, id: &str) -> Result<Mission, WorkflowError> {
        Mission::find_by_id(&self.db.pool, id)
            .await?
            .ok_or(WorkflowError::NotFound("mission"))
    }

    pub async fn list_tasks(&self, mission_id: &str) -> Result<Vec<Task>, WorkflowError> {
        Ok(Task::find_by_mission_id(&self.db.pool, mission_id).await?)
    }

    pub async fn list_approvals(&self, mission_id: &str) -> Result<Vec<Approval>, WorkflowError> {
        Ok(Approval::find_by_mission_id(&self.db.pool, mission_id).await?)
    }

    pub async fn list_artifacts(&self, mission_id: &str) -> Result<Vec<Artifact>, WorkflowError> {
        Ok(Artifact::find_by_mission_id(&self.db.pool, mission_id).await?)
    }

    pub async fn list_events(&self, filter: EventFilter) -> Result<Vec<EventLog>, WorkflowError> {
        let filter = EventFilter {
            limit: filter.limit,
            project_id: validation::normalize_id(filter.project_id),
            mission_id: validation::normalize_id(filter.mission_id),
            task_id: validation::normalize_id(filter.task_id),
        };
        Ok(EventLog::query(&self.db.pool, &filter).await?)
    }

    // Projects

    pub async fn create_project(&self, input: CreateProject) -> Result<Project, WorkflowError> {
        validation::validate_text("name", &input.name, PROJECT_NAME_MAX)?;
        let actor = actor_or(input.actor, actors::HUMAN);

        let mut tx = self.db.begin_write().await?;
        let project = Project::new(input.name);
        Project::create(&mut *tx, &project).await?;

        let event = NewEvent::new(actor, "project.create")
            .message(format!("Created project: {}", project.name))
            .project(Some(project.id.clone()));
        self.finish(tx, event).await?;
        Ok(project)
    }

    /// Missions and tasks go with the project; approvals, artifacts and the
    /// event history stay.
    pub async fn delete_project(
        &self,
        id: &str,
        actor: Option<String>,
    ) -> Result<(), WorkflowError> {
        let actor = actor_or(actor, actors::HUMAN);

        let mut tx = self.db.begin_write().await?;
        let project = Project::find_by_id(&mut *tx, id)
            .await?
            .ok_or(WorkflowError::NotFound("project"))?;
        Project::delete(&mut *tx, id).await?;

        let event = NewEvent::new(actor, "project.delete")
            .message(format!("Deleted project: {}", project.name))
            .project(Some(project.id));
        self.finish(tx, event).await?;
        Ok(())
    }

    // Missions

    pub async fn create_mission(&self, input: CreateMission) -> Result<Mission, WorkflowError> {
        validation::validate_text("title", &input.title, TITLE_MAX)?;
        let status =
            validation::validate_optional_status(EntityKind::Mission, input.status.as_deref())?
                .unwrap_or_default();
        let risk = input
            .risk
            .as_deref()
            .map(validation::validate_risk)
            .transpose()?
            .unwrap_or_default();
        let cost_usd = validation::validate_cost(input.cost_usd)?;
        let actor = actor_or(input.actor, actors::HUMAN);

        let mut tx = self.db.begin_write().await?;
        if Project::find_by_id(&mut *tx, &input.project_id).await?.is_none() {
            return Err(WorkflowError::NotFound("project"));
        }

        let mission = Mission::new(
            input.project_id,
            input.title,
            input.objective.unwrap_or_default(),
            status,
            risk,
            cost_usd,
        );
        Mission::create(&mut *tx, &mission).await?;

        let event = NewEvent::new(actor, "mission.create")
            .message(format!(
                "Created mission: \"{}\" ({})",
                mission.title, mission.status
            ))
            .project(Some(mission.project_id.clone()))
            .mission(Some(mission.id.clone()));
        self.finish(tx, event).await?;
        Ok(mission)
    }

    /// Merge the supplied fields onto the stored mission. Unsupplied fields
    /// keep their value; `updatedAt` always advances.
    pub async fn update_mission(
        &self,
        id: &str,
        patch: UpdateMission,
    ) -> Result<Mission, WorkflowError> {
        let title = validation::validate_patch_text("title", patch.title, TITLE_MAX)?;
        let status =
            validation::validate_optional_status(EntityKind::Mission, patch.status.as_deref())?;
        let risk: Option<Risk> = patch
            .risk
            .as_deref()
            .map(validation::validate_risk)
            .transpose()?;
        if let Some(cost) = patch.cost_usd {
            validation::validate_cost(cost)?;
        }
        let actor = actor_or(patch.actor, actors::SYSTEM_AGENT);

        let mut tx = self.db.begin_write().await?;
        let current = Mission::find_by_id(&mut *tx, id)
            .await?
            .ok_or(WorkflowError::NotFound("mission"))?;

        let mut mission = current.clone();
        if let Some(title) = title {
            mission.title = title;
        }
        if let Some(objective) = patch.objective {
            mission.objective = objective.unwrap_or_default();
        }
        if let Some(status) = status {
            mission.status = status;
        }
        if let Some(risk) = risk {
            mission.risk = risk;
        }
        if let Some(cost_usd) = patch.cost_usd {
            mission.cost_usd = cost_usd;
        }
        mission.updated_at = advance(current.updated_at);
        Mission::update(&mut *tx, &mission).await?;

        let message = if mission.status != current.status {
            format!(
                "\"{}\": {} → {}",
                mission.title, current.status, mission.status
            )
        } else {
            format!("\"{}\": updated", mission.title)
        };
        let event = NewEvent::new(actor, "mission.update")
            .message(message)
            .project(Some(mission.project_id.clone()))
            .mission(Some(mission.id.clone()));
        self.finish(tx, event).await?;
        Ok(mission)
    }

    // Tasks

    pub async fn create_task(
        &self,
        mission_id: &str,
        input: CreateTask,
    ) -> Result<Task, WorkflowError> {
        validation::validate_text("title", &input.title, TITLE_MAX)?;
        let status = validation::validate_optional_status(EntityKind::Task, input.status.as_deref())?
            .unwrap_or_default();
        let actor = actor_or(input.actor, actors::HUMAN);

        let mut tx = self.db.begin_write().await?;
        let mission = Mission::find_by_id(&mut *tx, mission_id)
            .await?
            .ok_or(WorkflowError::NotFound("mission"))?;

        let task = Task::new(
            mission.id.clone(),
            input.title,
            input.description.unwrap_or_default(),
            status,
            input.critical.unwrap_or(false),
        );
        Task::create(&mut *tx, &task).await?;
        Mission::touch(&mut *tx, &mission.id, advance(mission.updated_at)).await?;

        let event = NewEvent::new(actor, "task.create")
            .message(format!("\"{}\": new task → {}", mission.title, task.title))
            .project(Some(mission.project_id))
            .mission(Some(mission.id))
            .task(Some(task.id.clone()));
        self.finish(tx, event).await?;
        Ok(task)
    }

    pub async fn update_task(&self, id: &str, patch: UpdateTask) -> Result<Task, WorkflowError> {
        let title = validation::validate_patch_text("title", patch.title, TITLE_MAX)?;
        let status =
            validation::validate_optional_status(EntityKind::Task, patch.status.as_deref())?;
        let actor = actor_or(patch.actor, actors::SYSTEM_AGENT);

        let mut tx = self.db.begin_write().await?;
        let current = Task::find_by_id(&mut *tx, id)
            .await?
            .ok_or(WorkflowError::NotFound("task"))?;
        let mission = Mission::find_by_id(&mut *tx, &current.mission_id)
            .await?
            .ok_or(WorkflowError::NotFound("mission"))?;

        let mut task = current.clone();
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description.unwrap_or_default();
        }
        if let Some(status) = status {
            task.status = status;
        }
        if let Some(critical) = patch.critical {
            task.critical = critical;
        }
        task.updated_at = advance(current.updated_at);
        Task::update(&mut *tx, &task).await?;
        Mission::touch(&mut *tx, &mission.id, advance(mission.updated_at)).await?;

        let message = if task.status != current.status {
            format!(
                "\"{}\": task \"{}\" {} → {}",
                mission.title, task.title, current.status, task.status
            )
        } else {
            format!("\"{}\": task \"{}\" updated", mission.title, task.title)
        };
        let event = NewEvent::new(actor, "task.update")
            .message(message)
            .project(Some(mission.project_id))
            .mission(Some(mission.id))
            .task(Some(task.id.clone()));
        self.finish(tx, event).await?;
        Ok(task)
    }

    // Approvals

    pub async fn request_approval(
        &self,
        input: CreateApproval,
    ) -> Result<Approval, WorkflowError> {
        let mission_id = validation::normalize_id(input.mission_id);
        let task_id = validation::normalize_id(input.task_id);
        validation::require_target(&mission_id, &task_id)?;
        validation::validate_text("title", &input.title, TITLE_MAX)?;
        let requested_by = actor_or(input.requested_by, actors::SYSTEM_AGENT);
        let actor = actor_or(input.actor, actors::SYSTEM_AGENT);

        let mut tx = self.db.begin_write().await?;
        let link = resolve_target(&mut tx, mission_id.as_deref(), task_id.as_deref()).await?;

        let approval = Approval::new(mission_id, task_id, input.title, requested_by);
        Approval::create(&mut *tx, &approval).await?;

        let event = NewEvent::new(actor, "approval.request")
            .message(format!("Approval requested → {}", approval.title))
            .project(link.project_id)
            .mission(link.mission_id)
            .task(link.task_id);
        self.finish(tx, event).await?;
        Ok(approval)
    }

    pub async fn approve_approval(
        &self,
        id: &str,
        input: ResolveApproval,
    ) -> Result<Approval, WorkflowError> {
        self.resolve_approval(id, ApprovalState::Approved, input.actor)
            .await
    }

    pub async fn reject_approval(
        &self,
        id: &str,
        input: ResolveApproval,
    ) -> Result<Approval, WorkflowError> {
        self.resolve_approval(id, ApprovalState::Rejected, input.actor)
            .await
    }

    async fn resolve_approval(
        &self,
        id: &str,
        state: ApprovalState,
        actor: Option<String>,
    ) -> Result<Approval, WorkflowError> {
        let actor = actor_or(actor, actors::HUMAN);

        let mut tx = self.db.begin_write().await?;
        let current = Approval::find_by_id(&mut *tx, id)
            .await?
            .ok_or(WorkflowError::NotFound("approval"))?;
        let (approval, event) = resolve_in_tx(&mut tx, current, state, actor).await?;
        self.finish(tx, event).await?;
        Ok(approval)
    }

    /// OK EXECUTAR: approve the mission's first pending approval, where
    /// "first" is the most recently updated one. With nothing pending the
    /// outcome is a recorded noop, not an error.
    pub async fn ok_execute(
        &self,
        mission_id: &str,
        actor: Option<String>,
    ) -> Result<OkExecuteOutcome, WorkflowError> {
        let mut tx = self.db.begin_write().await?;
        let mission = Mission::find_by_id(&mut *tx, mission_id)
            .await?
            .ok_or(WorkflowError::NotFound("mission"))?;

        match Approval::find_first_requested(&mut *tx, &mission.id).await? {
            Some(pending) => {
                let actor = actor_or(actor, actors::HUMAN);
                let (approval, event) =
                    resolve_in_tx(&mut tx, pending, ApprovalState::Approved, actor).await?;
                self.finish(tx, event).await?;
                Ok(OkExecuteOutcome {
                    result: EventResult::Ok,
                    approval: Some(approval),
                })
            }
            None => {
                let actor = actor_or(actor, actors::SYSTEM_AGENT);
                let event = NewEvent::new(actor, "approval.ok_execute")
                    .result(EventResult::Noop)
                    .message(format!("\"{}\": no pending approval", mission.title))
                    .project(Some(mission.project_id))
                    .mission(Some(mission.id));
                self.finish(tx, event).await?;
                Ok(OkExecuteOutcome {
                    result: EventResult::Noop,
                    approval: None,
                })
            }
        }
    }

    // Artifacts

    pub async fn create_artifact(
        &self,
        input: CreateArtifact,
    ) -> Result<Artifact, WorkflowError> {
        let mission_id = validation::normalize_id(input.mission_id);
        let task_id = validation::normalize_id(input.task_id);
        validation::require_target(&mission_id, &task_id)?;
        validation::validate_text("title", &input.title, TITLE_MAX)?;
        validation::validate_text("kind", &input.kind, ARTIFACT_KIND_MAX)?;
        validation::validate_text("ref", &input.reference, ARTIFACT_REF_MAX)?;
        let actor = actor_or(input.actor, actors::SYSTEM_AGENT);

        let mut tx = self.db.begin_write().await?;
        let link = resolve_target(&mut tx, mission_id.as_deref(), task_id.as_deref()).await?;

        let artifact = Artifact::new(mission_id, task_id, input.title, input.kind, input.reference);
        Artifact::create(&mut *tx, &artifact).await?;

        let event = NewEvent::new(actor, "artifact.create")
            .message(format!("Attached {} → {}", artifact.kind, artifact.title))
            .project(link.project_id)
            .mission(link.mission_id)
            .task(link.task_id);
        self.finish(tx, event).await?;
        Ok(artifact)
    }

    // Demo data

    /// Populate a small demo workspace in one transaction, recorded as a
    /// single `seed.demo` event.
    pub async fn seed_demo(&self, actor: Option<String>) -> Result<SeedSummary, WorkflowError> {
        let actor = actor_or(actor, actors::SYSTEM_AGENT);

        let mut tx = self.db.begin_write().await?;
        let project = Project::new("Demo Workspace".to_string());
        Project::create(&mut *tx, &project).await?;

        let mission = Mission::new(
            project.id.clone(),
            "Kickoff: define the MVP".to_string(),
            "Pin down the target user, value proposition, MVP scope and a prioritized backlog."
                .to_string(),
            WorkStatus::Doing,
            Risk::Medium,
            Some(0.5),
        );
        Mission::create(&mut *tx, &mission).await?;

        let tasks = [
            (
                "Define persona and primary pain",
                "Who is user one? What hurts? What do they gain?",
                WorkStatus::Doing,
                false,
            ),
            (
                "Write the value proposition in one sentence",
                "Promise, mechanism, evidence",
                WorkStatus::Backlog,
                false,
            ),
            (
                "Decide MVP scope",
                "List what is explicitly out of scope",
                WorkStatus::Backlog,
                false,
            ),
            (
                "Sensitive data checklist",
                "Decide what the MVP must not collect",
                WorkStatus::NeedsInfo,
                true,
            ),
        ];
        for (title, description, status, critical) in tasks {
            let task = Task::new(
                mission.id.clone(),
                title.to_string(),
                description.to_string(),
                status,
                critical,
            );
            Task::create(&mut *tx, &task).await?;
        }

        let approval = Approval::new(
            Some(mission.id.clone()),
            None,
            "Approve MVP scope before build starts".to_string(),
            actors::SYSTEM_AGENT.to_string(),
        );
        Approval::create(&mut *tx, &approval).await?;

        let event = NewEvent::new(actor, "seed.demo")
            .message("Seeded demo workspace")
            .project(Some(project.id.clone()))
            .mission(Some(mission.id.clone()));
        self.finish(tx, event).await?;

        Ok(SeedSummary {
            project_id: project.id,
            mission_id: mission.id,
        })
    }
}

/// Check that every supplied target exists and work out the ids the event
/// should carry. The project is found by walking task → mission → project,
/// falling back to the supplied mission.
async fn resolve_target(
    conn: &mut SqliteConnection,
    mission_id: Option<&str>,
    task_id: Option<&str>,
) -> Result<Link, WorkflowError> {
    let mission = match mission_id {
        Some(id) => Some(
            Mission::find_by_id(&mut *conn, id)
                .await?
                .ok_or(WorkflowError::NotFound("mission"))?,
        ),
        None => None,
    };
    let task = match task_id {
        Some(id) => Some(
            Task::find_by_id(&mut *conn, id)
                .await?
                .ok_or(WorkflowError::NotFound("task"))?,
        ),
        None => None,
    };
    let task_mission = match &task {
        Some(task) => Mission::find_by_id(&mut *conn, &task.mission_id).await?,
        None => None,
    };

    Ok(Link {
        project_id: task_mission
            .as_ref()
            .or(mission.as_ref())
            .map(|m| m.project_id.clone()),
        mission_id: mission_id
            .map(str::to_string)
            .or_else(|| task.as_ref().map(|t| t.mission_id.clone())),
        task_id: task.map(|t| t.id),
    })
}

/// Same as [`resolve_target`] but tolerant of targets that have since been
/// deleted; resolving an approval never fails on a dangling reference.
async fn link_for(conn: &mut SqliteConnection, approval: &Approval) -> Result<Link, sqlx::Error> {
    let task = match &approval.task_id {
        Some(id) => Task::find_by_id(&mut *conn, id).await?,
        None => None,
    };
    let mission_id = approval
        .mission_id
        .clone()
        .or_else(|| task.as_ref().map(|t| t.mission_id.clone()));
    let lookup = task.as_ref().map(|t| t.mission_id.clone()).or(mission_id.clone());
    let project_id = match lookup {
        Some(id) => Mission::find_by_id(&mut *conn, &id)
            .await?
            .map(|m| m.project_id),
        None => None,
    };

    Ok(Link {
        project_id,
        mission_id,
        task_id: approval.task_id.clone(),
    })
}

/// Move `current` out of `requested`. Terminal approvals are a conflict and
/// are left untouched.
async fn resolve_in_tx(
    conn: &mut SqliteConnection,
    current: Approval,
    state: ApprovalState,
    actor: String,
) -> Result<(Approval, NewEvent), WorkflowError> {
    if current.state.is_terminal() {
        return Err(WorkflowError::Conflict(format!(
            "approval is already {}",
            current.state
        )));
    }

    let updated_at = advance(current.updated_at);
    let approved_at = (state == ApprovalState::Approved).then_some(updated_at);
    let changed = Approval::resolve(&mut *conn, &current.id, state, approved_at, updated_at).await?;
    if changed == 0 {
        return Err(WorkflowError::Conflict(
            "approval is no longer requested".to_string(),
        ));
    }

    let approval = Approval {
        state,
        approved_at,
        updated_at,
        ..current
    };
    let link = link_for(&mut *conn, &approval).await?;
    let (action, verb) = match state {
        ApprovalState::Approved => ("approval.approve", "Approved"),
        _ => ("approval.reject", "Rejected"),
    };
    let event = NewEvent::new(actor, action)
        .message(format!("{verb} → {}", approval.title))
        .project(link.project_id)
        .mission(link.mission_id)
        .task(link.task_id);
    Ok((approval, event))
}
