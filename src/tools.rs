// tools.rs - Tool availability checks and installation
// Purpose: make sure every collaborator answers before the scan starts,
//          installing the missing ones with their fixed install recipe

use colored::*;
use std::fmt;
use std::io;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::runner::{CommandRunner, Invocation};

/// The fixed set of collaborators this pipeline knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Amass,
    Sublist3r,
    Httpx,
    Ffuf,
    Gobuster,
    Nmap,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Amass,
        Tool::Sublist3r,
        Tool::Httpx,
        Tool::Ffuf,
        Tool::Gobuster,
        Tool::Nmap,
    ];

    pub fn binary(self) -> &'static str {
        match self {
            Tool::Amass => "amass",
            Tool::Sublist3r => "sublist3r",
            Tool::Httpx => "httpx",
            Tool::Ffuf => "ffuf",
            Tool::Gobuster => "gobuster",
            Tool::Nmap => "nmap",
        }
    }

    /// Arguments of the cheapest invocation that exits 0 when the tool works.
    pub fn probe_args(self) -> &'static [&'static str] {
        match self {
            Tool::Amass => &["-version"],
            Tool::Sublist3r => &["-h"],
            Tool::Httpx => &["-version"],
            Tool::Ffuf => &["-V"],
            Tool::Gobuster => &["version"],
            Tool::Nmap => &["--version"],
        }
    }

    /// Ordered install steps; each step is `[program, args...]`.
    pub fn install_steps(self) -> &'static [&'static [&'static str]] {
        match self {
            Tool::Amass => &[&["sudo", "apt-get", "install", "amass", "-y"]],
            Tool::Sublist3r => &[&["python3", "-m", "pip", "install", "sublist3r"]],
            Tool::Httpx => &[
                &["sudo", "apt-get", "install", "golang", "-y"],
                &["go", "install", "github.com/projectdiscovery/httpx/cmd/httpx@latest"],
            ],
            Tool::Ffuf => &[&["sudo", "apt-get", "install", "ffuf", "-y"]],
            Tool::Gobuster => &[&["sudo", "apt-get", "install", "gobuster", "-y"]],
            Tool::Nmap => &[&["sudo", "apt-get", "install", "nmap", "-y"]],
        }
    }

    pub fn probe(self) -> Invocation {
        Invocation::new(self.binary(), self.probe_args().iter().copied())
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.binary().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedTool(s.to_string()))
    }
}

/// Outcome of a successful availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    AlreadyInstalled,
    Installed,
}

/// Probes `tool` and installs it when the probe fails.
///
/// Installation runs privileged package-manager commands and is therefore
/// environment-mutating; it only succeeds if the tool answers afterwards.
pub async fn ensure_tool(
    runner: &dyn CommandRunner,
    log: &ProgressTracker,
    tool: Tool,
) -> Result<Availability> {
    match probe_tool(runner, tool).await {
        Ok(()) => {
            log.info(&format!("{} is already installed.", tool));
            return Ok(Availability::AlreadyInstalled);
        }
        Err(err) => {
            println!("{}", format!("[-] {}. Installing...", err).red());
            log.error(&format!("{}. Attempting to install...", err));
        }
    }

    install_tool(runner, log, tool).await?;

    probe_tool(runner, tool).await.map_err(|err| Error::InstallFailed {
        tool: tool.to_string(),
        reason: format!("still unavailable after install: {}", err),
    })?;

    println!("{}", format!("[+] {} installed successfully!", tool).green());
    log.info(&format!("{} installed successfully.", tool));
    Ok(Availability::Installed)
}

/// Checks every tool in order, stopping at the first one that cannot be installed.
pub async fn ensure_tools(
    runner: &dyn CommandRunner,
    log: &ProgressTracker,
    tools: &[Tool],
) -> Result<()> {
    for &tool in tools {
        ensure_tool(runner, log, tool).await?;
    }
    Ok(())
}

async fn probe_tool(runner: &dyn CommandRunner, tool: Tool) -> Result<()> {
    match runner.run(&tool.probe()).await {
        Ok(output) => output.check(tool.binary()).map(|_| ()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(Error::ToolMissing(tool.to_string()))
        }
        Err(err) => Err(Error::Io(err)),
    }
}

async fn install_tool(runner: &dyn CommandRunner, log: &ProgressTracker, tool: Tool) -> Result<()> {
    log.info(&format!("Installing {}...", tool));

    for step in tool.install_steps() {
        let Some((program, args)) = step.split_first() else {
            continue;
        };
        let invocation = Invocation::new(*program, args.iter().copied());
        log.info(&format!("Running: {}", invocation));

        let output = runner.run(&invocation).await.map_err(|err| Error::InstallFailed {
            tool: tool.to_string(),
            reason: format!("{}: {}", invocation, err),
        })?;

        output.check(program).map_err(|err| Error::InstallFailed {
            tool: tool.to_string(),
            reason: err.to_string(),
        })?;
    }

    Ok(())
}
