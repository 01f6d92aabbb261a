use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;

use caseflow::config::{CONFIG_FILE, CaseflowConfig, StoreBackend};
use caseflow::format::OutputFormat;
use caseflow::{CaseStore, CaseUpdateCoordinator, CoordinatorOptions, FileStore};
use caseflow_core::model::{Actor, Role};

/// Coordinator over whichever backend the config selected.
pub type Coordinator = CaseUpdateCoordinator<Box<dyn CaseStore>>;

/// Outcome of a command, mapped to the process exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Nothing was written because of a conflict.
    Conflict,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => Self::SUCCESS,
            Status::Conflict => Self::from(2),
        }
    }
}

/// The acting staff member, from flags or the environment.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// User id of the person making the change
    #[arg(long, env = "CASEFLOW_ACTOR_ID")]
    pub actor_id: String,

    /// Display name of the person making the change
    #[arg(long, env = "CASEFLOW_ACTOR_NAME")]
    pub actor_name: String,

    /// Role: admin, lawyer, assistant, or sales
    #[arg(long, env = "CASEFLOW_ACTOR_ROLE")]
    pub actor_role: Role,
}

impl ActorArgs {
    pub fn actor(&self) -> Actor {
        Actor::new(&self.actor_id, &self.actor_name, self.actor_role)
    }
}

/// Everything a command needs: the coordinator and the output format.
pub struct App {
    pub coordinator: Coordinator,
    pub format: OutputFormat,
}

impl App {
    /// Load config and open the configured store.
    pub fn open(
        config_path: Option<&Path>,
        store_override: Option<&Path>,
        format: OutputFormat,
    ) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        let mut config = CaseflowConfig::load(config_path)?;
        if let Some(path) = store_override {
            config.store.backend = StoreBackend::File;
            config.store.path = path.to_owned();
        }

        // Each invocation is its own process, so a memory store would forget
        // every write before the next command could see it.
        if config.store.backend == StoreBackend::Memory {
            bail!(
                "the memory backend keeps nothing between caseflow invocations; \
                 it is only for embedding the library and for tests.\n  \
                 To fix: set `backend = \"file\"` under [store] in {}, or pass --store <dir>",
                config_path.display()
            );
        }
        let store: Box<dyn CaseStore> = Box::new(
            FileStore::open(&config.store.path).with_context(|| {
                format!("Failed to open store at {}", config.store.path.display())
            })?,
        );
        tracing::debug!(backend = %config.store.backend, path = %config.store.path.display(), "store opened");

        Ok(Self {
            coordinator: CaseUpdateCoordinator::with_options(
                store,
                CoordinatorOptions::from(&config),
            ),
            format,
        })
    }

    /// Print `data` as JSON, or `text` for the text format.
    pub fn emit<T: Serialize>(&self, data: &T, text: impl FnOnce() -> String) -> Result<()> {
        println!("{}", self.format.render(data, text)?);
        Ok(())
    }
}

/// Read and parse a JSON file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
