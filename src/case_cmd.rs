use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use caseflow::{LogQuery, UpdateOutcome, UpdateRequest};
use caseflow_core::model::{CaseId, CaseRecord};

use crate::app::{ActorArgs, App, Status, read_json};
use crate::render;

#[derive(Subcommand)]
pub enum CaseCommands {
    /// Create a case from a JSON record
    ///
    /// The file holds a case object with camelCase fields and an `id`.
    /// The case starts at version 1 with a `create` audit entry.
    Create {
        /// Path to the case JSON
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Show the current state of a case
    Show {
        /// Case id
        id: CaseId,
    },

    /// Apply an update request
    ///
    /// The request file is `{"payload": {...}, "meta": {"baseVersion": N,
    /// "baseSnapshot": {...}, "dirtyFields": [...], "resolveMode": "merge"}}`.
    /// Without `meta` the update is written without a version check.
    /// Exits with status 2 if the update conflicts.
    Update {
        /// Case id
        id: CaseId,

        /// Path to the update request JSON
        #[arg(long)]
        request: PathBuf,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Show the audit trail, newest first
    Log {
        /// Case id
        id: CaseId,

        /// Maximum entries to show
        #[arg(long)]
        limit: Option<usize>,

        /// Entries to skip from the newest
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

pub fn run(app: &App, cmd: CaseCommands) -> Result<Status> {
    match cmd {
        CaseCommands::Create { file, actor } => {
            let record: CaseRecord = read_json(&file)?;
            let (record, log) = app
                .coordinator
                .create(&actor.actor(), record)
                .context("Failed to create case")?;
            let outcome = UpdateOutcome::Updated {
                record,
                log,
                merged: None,
            };
            app.emit(&outcome, || render::outcome(&outcome))?;
            Ok(Status::Success)
        }
        CaseCommands::Show { id } => {
            let record = app.coordinator.get(id)?;
            app.emit(&record, || render::record(&record))?;
            Ok(Status::Success)
        }
        CaseCommands::Update { id, request, actor } => {
            let request: UpdateRequest = read_json(&request)?;
            let outcome = app
                .coordinator
                .update(id, &actor.actor(), &request)
                .with_context(|| format!("Failed to update case {id}"))?;
            app.emit(&outcome, || render::outcome(&outcome))?;
            Ok(status_of(&outcome))
        }
        CaseCommands::Log { id, limit, offset } => {
            let page = app.coordinator.change_log(id, LogQuery { limit, offset })?;
            app.emit(&page, || render::log_page(&page))?;
            Ok(Status::Success)
        }
    }
}

pub const fn status_of(outcome: &UpdateOutcome) -> Status {
    match outcome {
        UpdateOutcome::Conflict(_) => Status::Conflict,
        UpdateOutcome::Updated { .. } | UpdateOutcome::Unchanged { .. } => Status::Success,
    }
}
