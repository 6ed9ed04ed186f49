// config.rs - Pipeline configuration and input validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::tools::Tool;

pub const MERGED_FILE: &str = "merged_subdomains.txt";
pub const ALIVE_FILE: &str = "alive_subdomains.txt";
pub const REPORT_FILE: &str = "final_report.txt";
pub const REPORT_JSON_FILE: &str = "final_report.json";
pub const METRICS_FILE: &str = "scan_metrics.json";

/// Directory brute-forcer used for the per-host fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Buster {
    #[default]
    Ffuf,
    Gobuster,
}

impl Buster {
    pub fn tool(self) -> Tool {
        match self {
            Buster::Ffuf => Tool::Ffuf,
            Buster::Gobuster => Tool::Gobuster,
        }
    }
}

impl TryFrom<Tool> for Buster {
    type Error = Error;

    fn try_from(tool: Tool) -> Result<Self> {
        match tool {
            Tool::Ffuf => Ok(Buster::Ffuf),
            Tool::Gobuster => Ok(Buster::Gobuster),
            other => Err(Error::UnsupportedTool(format!("{} cannot brute-force directories", other))),
        }
    }
}

/// Accepts any known tool name; only ffuf and gobuster convert.
impl FromStr for Buster {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<Tool>()?.try_into()
    }
}

impl fmt::Display for Buster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool().binary())
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Shared slot count for dirbusting and port-scan tasks
    pub workers: usize,
    /// Where every artifact of the run is written
    pub output_dir: PathBuf,
    pub buster: Buster,
    /// Also write the report as JSON
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            output_dir: PathBuf::from("."),
            buster: Buster::Ffuf,
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Tools that must answer before any enumeration starts.
    pub fn required_tools(&self) -> Vec<Tool> {
        vec![
            Tool::Amass,
            Tool::Sublist3r,
            Tool::Httpx,
            self.buster.tool(),
            Tool::Nmap,
        ]
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn enumeration_output(&self, tool: Tool, domain: &str) -> PathBuf {
        self.artifact(&format!("{}_{}.txt", tool.binary(), safe_file_stem(domain)))
    }

    pub fn dns_output(&self, host: &str) -> PathBuf {
        self.artifact(&format!("dns_{}.txt", safe_file_stem(host)))
    }

    pub fn dirbusting_output(&self, host: &str) -> PathBuf {
        self.artifact(&format!("dirbusting_{}.txt", safe_file_stem(host)))
    }

    pub fn portscan_output(&self, host: &str) -> PathBuf {
        self.artifact(&format!("nmap_{}.txt", safe_file_stem(host)))
    }
}

/// Replaces every character outside `[A-Za-z0-9-]` with `_`.
///
/// Validated hostnames never contain `_`, so distinct hosts map to distinct
/// stems.
pub fn safe_file_stem(host: &str) -> String {
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Startup checks that must pass before any collaborator is invoked.
pub fn validate_inputs(domain: &str, wordlist: &Path, config: &PipelineConfig) -> Result<()> {
    if domain.trim().is_empty() {
        return Err(Error::InvalidInput("root domain must not be empty".to_string()));
    }
    if !wordlist.is_file() {
        return Err(Error::InvalidInput(format!(
            "wordlist file {} does not exist",
            wordlist.display()
        )));
    }
    if config.workers == 0 || config.workers > Semaphore::MAX_PERMITS {
        return Err(Error::InvalidInput(format!(
            "--workers must be between 1 and {}",
            Semaphore::MAX_PERMITS
        )));
    }
    Ok(())
}
