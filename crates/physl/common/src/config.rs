// PhySL
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Runtime configuration for compiling and evaluating PhySL programs

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyslConfig {
    /// Maximum nesting of function invocations before evaluation fails
    pub max_recursion_depth: usize,
    /// Deadline for a whole evaluation, `None` disables it
    pub eval_timeout_ms: Option<u64>,
    /// Evaluate parallel constructs inline instead of spawning tasks
    pub direct_execution: bool,
    /// Default filter handed to the tracing subscriber
    pub log_filter: String,
    /// Codename used in diagnostics when none is given explicitly
    pub codename: String,
}

impl Default for PhyslConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 512,
            eval_timeout_ms: None,
            direct_execution: false,
            log_filter: "info".to_string(),
            codename: "<unknown>".to_string(),
        }
    }
}

impl PhyslConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML configuration file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Defaults overridden by `PHYSL_*` environment variables
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply `PHYSL_*` environment overrides on top of this configuration
    pub fn merge_env(mut self) -> Self {
        if let Ok(depth) = std::env::var("PHYSL_MAX_RECURSION_DEPTH") {
            match depth.parse::<usize>() {
                Ok(depth) => self.max_recursion_depth = depth,
                Err(_) => warn!("Invalid PHYSL_MAX_RECURSION_DEPTH '{}', using {}", depth, self.max_recursion_depth),
            }
        }

        if let Ok(timeout) = std::env::var("PHYSL_EVAL_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(0) => self.eval_timeout_ms = None,
                Ok(ms) => self.eval_timeout_ms = Some(ms),
                Err(_) => warn!("Invalid PHYSL_EVAL_TIMEOUT_MS '{}', ignoring", timeout),
            }
        }

        if let Ok(direct) = std::env::var("PHYSL_DIRECT_EXECUTION") {
            self.direct_execution = matches!(direct.as_str(), "1" | "true" | "yes");
        }

        if let Ok(filter) = std::env::var("PHYSL_LOG") {
            self.log_filter = filter;
        }

        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_direct_execution(mut self, direct: bool) -> Self {
        self.direct_execution = direct;
        self
    }

    pub fn with_codename(mut self, codename: impl Into<String>) -> Self {
        self.codename = codename.into();
        self
    }

    pub fn eval_timeout(&self) -> Option<Duration> {
        self.eval_timeout_ms.map(Duration::from_millis)
    }
}
