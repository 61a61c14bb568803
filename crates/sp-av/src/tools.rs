//! External tool detection and management.
//!
//! A tool can be found through several [`ToolSource`]s tried in a fixed
//! priority order: an explicitly configured path, the `PATH` lookup, and
//! then any extra search directories. The [`ToolRegistry`] caches what was
//! found for the rest of the crate.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// One place a tool executable may be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// A path given in configuration.
    Configured(PathBuf),
    /// Search `PATH` with [`which::which`].
    SearchPath,
    /// Look for the executable inside a directory.
    Directory(PathBuf),
}

impl ToolSource {
    /// Resolve `name` through this source.
    ///
    /// Returns a short reason on failure so the caller can report every
    /// attempt.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, String> {
        match self {
            Self::Configured(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(format!("{} does not exist", path.display()))
                }
            }
            Self::SearchPath => which::which(name).map_err(|e| e.to_string()),
            Self::Directory(dir) => which::which_in(name, Some(dir), dir)
                .map_err(|_| format!("{name} not found in {}", dir.display())),
        }
    }
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured(p) => write!(f, "configured path {}", p.display()),
            Self::SearchPath => write!(f, "PATH"),
            Self::Directory(d) => write!(f, "directory {}", d.display()),
        }
    }
}

/// Ordered sources for `name` according to the tools config.
pub fn sources_for(name: &str, tools_config: &sp_core::config::ToolsConfig) -> Vec<ToolSource> {
    let configured = match name {
        "ffmpeg" => tools_config.ffmpeg_path.as_ref(),
        "ffprobe" => tools_config.ffprobe_path.as_ref(),
        _ => None,
    };

    let mut sources = Vec::with_capacity(tools_config.search_dirs.len() + 2);
    if let Some(p) = configured {
        sources.push(ToolSource::Configured(p.clone()));
    }
    sources.push(ToolSource::SearchPath);
    sources.extend(
        tools_config
            .search_dirs
            .iter()
            .cloned()
            .map(ToolSource::Directory),
    );
    sources
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output, if available.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover the known tools, taking the first source that resolves.
    /// Tools that are not found are silently omitted.
    pub fn discover(tools_config: &sp_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let found = sources_for(name, tools_config)
                .iter()
                .find_map(|source| source.resolve(name).ok());
            if let Some(path) = found {
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Register a tool path directly.
    pub fn with_tool(mut self, name: impl Into<String>, path: PathBuf) -> Self {
        self.tools.insert(name.into(), path);
        self
    }

    /// Path for the given tool, or [`sp_core::Error::Tool`] if it was not
    /// found during discovery.
    pub fn require(&self, name: &str) -> sp_core::Result<&Path> {
        self.tools.get(name).map(PathBuf::as_path).ok_or_else(|| {
            sp_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
