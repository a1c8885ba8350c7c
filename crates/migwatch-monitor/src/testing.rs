use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use migwatch_core::{MigrationStat, StatSource, TransportError};

/// `StatSource` that replays a fixed script. Once the script runs out the
/// last entry is repeated, like a daemon whose state no longer changes.
#[derive(Clone)]
pub struct ScriptedSource {
    inner: Arc<Mutex<Script>>,
}

struct Script {
    steps: VecDeque<Result<MigrationStat, String>>,
    last: Option<Result<MigrationStat, String>>,
    names: Vec<String>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Result<MigrationStat, String>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                steps: steps.into(),
                last: None,
                names: Vec::new(),
            })),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().names.len()
    }

    pub fn requested_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().names.clone()
    }
}

#[async_trait]
impl StatSource for ScriptedSource {
    async fn get_migration_stat(&self, name: &str) -> Result<MigrationStat, TransportError> {
        let mut script = self.inner.lock().unwrap();
        script.names.push(name.to_string());
        let step = match script.steps.pop_front() {
            Some(step) => step,
            None => script.last.clone().expect("script is empty"),
        };
        script.last = Some(step.clone());
        step.map_err(TransportError::Remote)
    }
}
