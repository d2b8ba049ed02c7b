//! # Script resolution.
//!
//! Scripts live as files under one root directory; a task names one by
//! relative path. A missing or unreadable file is a [`FlumeError::Runtime`];
//! the task fails, the supplier keeps going.

use std::path::PathBuf;

use crate::engine::ScriptBody;
use crate::error::FlumeError;

/// Loads script bodies from the configured scripts root.
#[derive(Debug, Clone)]
pub struct ScriptRepo {
    root: PathBuf,
}

impl ScriptRepo {
    /// Creates a repository rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads the script body named by `name`.
    pub async fn load(&self, name: &str) -> Result<ScriptBody, FlumeError> {
        let path = self.root.join(name);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            FlumeError::runtime(format!(
                "script file '{}' is missing or unreadable: {e}",
                path.display()
            ))
        })?;
        Ok(ScriptBody {
            name: name.to_string(),
            text,
        })
    }
}
