use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use caseflow_core::model::{CaseHearing, CaseId};

use crate::app::{ActorArgs, App, Status, read_json};
use crate::case_cmd::status_of;
use crate::render;

#[derive(Subcommand)]
pub enum HearingCommands {
    /// List the trial stages a new hearing may be recorded for
    Stages {
        /// Case id
        id: CaseId,
    },

    /// Record a hearing, replacing any earlier hearing at the same stage
    ///
    /// Fails if the hearing's trial stage skips an unrecorded earlier stage.
    /// Exits with status 2 if someone else changed the hearings meanwhile.
    Upsert {
        /// Case id
        id: CaseId,

        /// Path to the hearing JSON (`trialStage`, `hearingTime`, ...)
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        actor: ActorArgs,
    },
}

pub fn run(app: &App, cmd: HearingCommands) -> Result<Status> {
    match cmd {
        HearingCommands::Stages { id } => {
            let availability = app.coordinator.stage_availability(id)?;
            app.emit(&availability, || render::stages(&availability))?;
            Ok(Status::Success)
        }
        HearingCommands::Upsert { id, file, actor } => {
            let hearing: CaseHearing = read_json(&file)?;
            let outcome = app
                .coordinator
                .upsert_hearing(id, &actor.actor(), hearing)
                .with_context(|| format!("Failed to record hearing for case {id}"))?;
            app.emit(&outcome, || render::outcome(&outcome))?;
            Ok(status_of(&outcome))
        }
    }
}
