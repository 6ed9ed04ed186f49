// report_generator.rs - Final report
// Purpose: serialise everything a run collected into final_report.txt
//          (and optionally final_report.json). No decisions are made here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::{self, PipelineConfig};
use crate::dns::{self, DnsRecordMap};
use crate::error::Result;
use crate::merge;
use crate::probe;

pub const ALL_SUBDOMAINS_HEADER: &str = "=== All Subdomains ===";
pub const LIVE_SUBDOMAINS_HEADER: &str = "=== Live Subdomains ===";
pub const DNS_HEADER: &str = "=== DNS Records ===";
pub const DIRBUSTING_HEADER: &str = "=== Directory Busting Results ===";
pub const PORTSCAN_HEADER: &str = "=== Port Scan Results ===";

/// Raw tool output captured for one host.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub dirbusting: Vec<String>,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub domain: String,
    pub generated_at: DateTime<Utc>,
    pub subdomains: BTreeSet<String>,
    pub live_subdomains: Vec<String>,
    pub dns_records: BTreeMap<String, DnsRecordMap>,
    pub scan_results: BTreeMap<String, ScanResult>,
}

impl Report {
    pub fn new(
        domain: &str,
        subdomains: BTreeSet<String>,
        live_subdomains: Vec<String>,
        dns_records: BTreeMap<String, DnsRecordMap>,
        scan_results: BTreeMap<String, ScanResult>,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            generated_at: Utc::now(),
            subdomains,
            live_subdomains,
            dns_records,
            scan_results,
        }
    }

    /// Renders the text report. Sections always appear, in a fixed order,
    /// even when they have nothing under them.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Scan Report for Domain: {}\n", self.domain));
        out.push_str(&format!("Scan Date: {}\n", self.generated_at.to_rfc3339()));
        out.push('\n');

        out.push_str(&format!("{}\n", ALL_SUBDOMAINS_HEADER));
        for sub in &self.subdomains {
            out.push_str(&format!("{}\n", sub));
        }

        out.push_str(&format!("\n{}\n", LIVE_SUBDOMAINS_HEADER));
        for sub in &self.live_subdomains {
            out.push_str(&format!("{}\n", sub));
        }

        out.push_str(&format!("\n{}\n", DNS_HEADER));
        for (sub, records) in &self.dns_records {
            out.push_str(&format!("\nSubdomain: {}\n", sub));
            for (record, entries) in records {
                out.push_str(&format!("{}:\n", record));
                for entry in entries {
                    out.push_str(&format!("  {}\n", entry));
                }
            }
        }

        out.push_str(&format!("\n{}\n", DIRBUSTING_HEADER));
        for (sub, result) in &self.scan_results {
            out.push_str(&format!("\nSubdomain: {}\n", sub));
            for line in &result.dirbusting {
                out.push_str(&format!("{}\n", line));
            }
        }

        out.push_str(&format!("\n{}\n", PORTSCAN_HEADER));
        for (sub, result) in &self.scan_results {
            out.push_str(&format!("\nSubdomain: {}\n", sub));
            for line in &result.ports {
                out.push_str(&format!("{}\n", line));
            }
        }

        out
    }

    pub fn write_text(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.render())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Rebuilds a report from the artifacts a finished run left in `dir`.
    pub fn load_from_dir(dir: &Path, domain: &str) -> io::Result<Self> {
        let layout = PipelineConfig {
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };

        let subdomains = merge::collect_subdomains(&[layout.artifact(config::MERGED_FILE)])?.subdomains;
        let (live, _) = probe::parse_live_hosts(&read_or_empty(&layout.artifact(config::ALIVE_FILE))?);

        let mut dns_records = BTreeMap::new();
        for host in &live {
            let dump = read_or_empty(&layout.dns_output(host))?;
            let records = dns::parse_dns_dump(&dump);
            if !records.is_empty() {
                dns_records.insert(host.clone(), records);
            }
        }

        let scan_results = collect_scan_results(&layout, &live)?;

        Ok(Report::new(domain, subdomains, live, dns_records, scan_results))
    }
}

/// Reads every host's dirbusting and port-scan artifacts back as lines.
///
/// A missing artifact (failed task) contributes no lines.
pub fn collect_scan_results(
    config: &PipelineConfig,
    hosts: &[String],
) -> io::Result<BTreeMap<String, ScanResult>> {
    let mut results = BTreeMap::new();
    for host in hosts {
        let result = ScanResult {
            dirbusting: non_empty_lines(&read_or_empty(&config.dirbusting_output(host))?),
            ports: non_empty_lines(&read_or_empty(&config.portscan_output(host))?),
        };
        results.insert(host.clone(), result);
    }
    Ok(results)
}

fn read_or_empty(path: &Path) -> io::Result<String> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err),
    }
}

pub(crate) fn non_empty_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}
