//! JSON file state adapter.
//!
//! One `<TICKER>_state.json` per ticker under a state directory. Saves write
//! a temp file in the same directory and rename it over the old record, so a
//! crash mid-save leaves the prior state readable.

use crate::domain::error::TrendwatchError;
use crate::domain::state::MonitorState;
use crate::ports::state_port::StatePort;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileStateAdapter {
    dir: PathBuf,
}

impl FileStateAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn state_path(&self, ticker: &str) -> PathBuf {
        self.dir
            .join(format!("{}_state.json", ticker.replace('$', "")))
    }

    fn io_err(path: &Path, e: impl std::fmt::Display) -> TrendwatchError {
        TrendwatchError::StateIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl StatePort for FileStateAdapter {
    fn load(&self, ticker: &str) -> Result<Option<MonitorState>, TrendwatchError> {
        let path = self.state_path(ticker);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(&path, e)),
        };
        let state = serde_json::from_str(&content).map_err(|e| Self::io_err(&path, e))?;
        Ok(Some(state))
    }

    fn save(&self, state: &MonitorState) -> Result<(), TrendwatchError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_err(&self.dir, e))?;

        let path = self.state_path(&state.ticker);
        let tmp = path.with_extension("json.tmp");
        let content =
            serde_json::to_string_pretty(state).map_err(|e| Self::io_err(&path, e))?;
        fs::write(&tmp, content).map_err(|e| Self::io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_err(&path, e))?;
        Ok(())
    }
}
