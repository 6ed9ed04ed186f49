// probe.rs - HTTP liveness probing
// Purpose: one batch httpx run over the merged list, then read the alive
//          hosts back as bare hostnames

use colored::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::merge::is_valid_hostname;
use crate::progress::ProgressTracker;
use crate::runner::{CommandRunner, Invocation};

const STAGE: &str = "httpx probing";

pub fn probe_invocation(subdomains_file: &Path, alive_file: &Path) -> Invocation {
    Invocation::new(
        "httpx",
        [
            "-silent".to_string(),
            "-l".to_string(),
            subdomains_file.display().to_string(),
            "-o".to_string(),
            alive_file.display().to_string(),
        ],
    )
}

/// Probes every host in `subdomains_file` and returns the path httpx wrote to.
///
/// A failed run leaves whatever httpx managed to write (possibly nothing).
pub async fn probe_subdomains(
    runner: &dyn CommandRunner,
    log: &ProgressTracker,
    subdomains_file: &Path,
    alive_file: &Path,
) -> PathBuf {
    println!("{}", "[?] Probing subdomains for live hosts with httpx...".blue());
    log.stage_started(STAGE);

    let result = runner
        .run(&probe_invocation(subdomains_file, alive_file))
        .await
        .map_err(Error::from)
        .and_then(|out| out.check("httpx"));

    match result {
        Ok(_) => {
            println!("{}", format!("[+] Live subdomains saved to {}", alive_file.display()).green());
            log.stage_completed(STAGE);
        }
        Err(err) => {
            println!("{}", format!("[-] HTTPX probing failed: {}", err).red());
            log.stage_failed(STAGE, &err.to_string());
        }
    }

    alive_file.to_path_buf()
}

/// Reduces one prober output line to its hostname.
///
/// Accepts `host`, `scheme://host`, `scheme://host:port/path`; returns
/// `None` when what is left is not a hostname.
pub fn normalize_live_line(line: &str) -> Option<String> {
    let line = line.trim();
    let without_scheme = line.split_once("://").map(|(_, rest)| rest).unwrap_or(line);
    let authority = without_scheme.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit_once(':').map(|(h, _)| h).unwrap_or(authority);

    is_valid_hostname(host).then(|| host.to_string())
}

/// Normalises prober output into unique hostnames in first-seen order.
///
/// Returns the hosts and the number of non-empty lines that were dropped.
pub fn parse_live_hosts(content: &str) -> (Vec<String>, usize) {
    let mut hosts: Vec<String> = Vec::new();
    let mut rejected = 0usize;
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match normalize_live_line(line) {
            Some(host) if !hosts.contains(&host) => hosts.push(host),
            Some(_) => {}
            None => rejected += 1,
        }
    }
    (hosts, rejected)
}

/// Reads the alive list, deduplicated in first-seen order.
///
/// A missing file means the prober produced nothing; that is logged and
/// treated as an empty live set.
pub fn read_live_hosts(log: &ProgressTracker, alive_file: &Path) -> io::Result<Vec<String>> {
    let content = match fs::read(alive_file) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log.warn(&format!("{} does not exist, no live hosts to scan", alive_file.display()));
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let (hosts, rejected) = parse_live_hosts(&content);
    if rejected > 0 {
        log.warn(&format!("Dropped {} malformed line(s) from {}", rejected, alive_file.display()));
    }
    log.data_found("live subdomains", hosts.len());

    Ok(hosts)
}
