use std::{fs, path::PathBuf};

use anyhow::Context;
use db::models::{
    approval::{Approval, ApprovalState, CreateApproval, ResolveApproval},
    artifact::{Artifact, CreateArtifact},
    event_log::{EventFilter, EventLog, EventResult},
    mission::{CreateMission, Mission, UpdateMission},
    project::{CreateProject, Project},
    status::{Risk, WorkStatus},
    task::{CreateTask, Task, UpdateTask},
};
use services::services::workflow::{OkExecuteOutcome, SeedSummary};
use ts_rs::TS;
use utils::response::{Ack, ErrorBody};

fn shared_types() -> Vec<String> {
    vec![
        WorkStatus::decl(),
        Risk::decl(),
        Project::decl(),
        CreateProject::decl(),
        Mission::decl(),
        CreateMission::decl(),
        UpdateMission::decl(),
        Task::decl(),
        CreateTask::decl(),
        UpdateTask::decl(),
        ApprovalState::decl(),
        Approval::decl(),
        CreateApproval::decl(),
        ResolveApproval::decl(),
        Artifact::decl(),
        CreateArtifact::decl(),
        EventResult::decl(),
        EventLog::decl(),
        EventFilter::decl(),
        OkExecuteOutcome::decl(),
        SeedSummary::decl(),
        ErrorBody::decl(),
        Ack::decl(),
    ]
}

fn main() -> anyhow::Result<()> {
    let out = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).context("creating shared/")?;
    }

    let mut contents = String::from(
        "// This file was generated by `cargo run --bin generate_types`. Do not edit.\n\n",
    );
    for decl in shared_types() {
        contents.push_str("export ");
        contents.push_str(&decl);
        contents.push_str("\n\n");
    }

    fs::write(&out, contents).with_context(|| format!("writing {}", out.display()))?;
    println!("Wrote {}", out.display());
    Ok(())
}
