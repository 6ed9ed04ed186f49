// enumeration.rs - Subdomain enumeration
// Purpose: run amass and sublist3r against the root domain, each writing its
//          own output file. Failures are logged, never raised.

use colored::*;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::progress::ProgressTracker;
use crate::runner::{CommandRunner, Invocation};
use crate::tools::Tool;

/// Subdomain enumerators, run one after the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumerator {
    Amass,
    Sublist3r,
}

impl Enumerator {
    pub const ALL: [Enumerator; 2] = [Enumerator::Amass, Enumerator::Sublist3r];

    pub fn tool(self) -> Tool {
        match self {
            Enumerator::Amass => Tool::Amass,
            Enumerator::Sublist3r => Tool::Sublist3r,
        }
    }

    pub fn invocation(self, domain: &str, output: &Path) -> Invocation {
        let out = output.display().to_string();
        match self {
            Enumerator::Amass => Invocation::new("amass", ["enum", "-d", domain, "-o", out.as_str()]),
            Enumerator::Sublist3r => Invocation::new("sublist3r", ["-d", domain, "-o", out.as_str()]),
        }
    }
}

/// Runs one enumerator and returns `output` whether or not it succeeded.
///
/// The file may be missing or partial afterwards; the merge stage copes with both.
pub async fn run_enumerator(
    runner: &dyn CommandRunner,
    log: &ProgressTracker,
    enumerator: Enumerator,
    domain: &str,
    output: &Path,
) -> PathBuf {
    let tool = enumerator.tool();
    let stage = format!("{} enumeration", tool);

    println!("{}", format!("[?] Running {} for subdomain enumeration on {}...", tool, domain).blue());
    log.stage_started(&stage);

    let result = runner
        .run(&enumerator.invocation(domain, output))
        .await
        .map_err(Error::from)
        .and_then(|out| out.check(tool.binary()));

    match result {
        Ok(_) => {
            let found = count_lines(output);
            println!("{}", format!("[+] {} subdomain enumeration completed! ({} found)", tool, found).green());
            log.stage_completed(&stage);
            log.data_found(&format!("{} subdomains", tool), found);
        }
        Err(err) => {
            println!("{}", format!("[-] {} failed: {}", tool, err).red());
            log.stage_failed(&stage, &err.to_string());
        }
    }

    output.to_path_buf()
}

fn count_lines(path: &Path) -> usize {
    std::fs::read(path)
        .map(|c| String::from_utf8_lossy(&c).lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}
