// pipeline.rs - Stage sequencing
// Purpose: tools → enumeration → merge → probe → DNS → fan-out → report.
//          Only tool installation can abort a run; every other stage logs
//          its failure and hands the next stage whatever data exists.

use colored::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{self, PipelineConfig};
use crate::dns;
use crate::enumeration::{Enumerator, run_enumerator};
use crate::error::Result;
use crate::merge::{self, MergedSubdomains};
use crate::metrics::ScanMetrics;
use crate::parallel_executor::{ParallelExecutor, ScanKind, plan_tasks};
use crate::probe;
use crate::progress::ProgressTracker;
use crate::report_generator::Report;
use crate::runner::CommandRunner;
use crate::tools;

#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: Report,
    pub report_path: PathBuf,
    pub metrics: ScanMetrics,
}

pub struct Pipeline {
    config: PipelineConfig,
    runner: Arc<dyn CommandRunner>,
    log: Arc<ProgressTracker>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, runner: Arc<dyn CommandRunner>, log: Arc<ProgressTracker>) -> Self {
        Self { config, runner, log }
    }

    pub async fn run(&self, domain: &str, wordlist: &Path) -> Result<PipelineOutcome> {
        let runner = self.runner.as_ref();
        let log = self.log.as_ref();
        let mut metrics = ScanMetrics::new(log.scan_id().to_string(), domain.to_string());

        log.scan_started();
        println!("{}", format!("[?] Starting scan for domain {}...", domain).blue());

        // ═══════════════════════════════════════════════════════════════════
        // STAGE 1: TOOL CHECK
        // ═══════════════════════════════════════════════════════════════════
        stage_banner("STAGE 1: TOOL CHECK");
        tools::ensure_tools(runner, log, &self.config.required_tools()).await?;

        // ═══════════════════════════════════════════════════════════════════
        // STAGE 2: SUBDOMAIN ENUMERATION
        // ═══════════════════════════════════════════════════════════════════
        stage_banner("STAGE 2: SUBDOMAIN ENUMERATION");
        let mut enumeration_outputs = Vec::with_capacity(Enumerator::ALL.len());
        for enumerator in Enumerator::ALL {
            let output = self.config.enumeration_output(enumerator.tool(), domain);
            enumeration_outputs.push(run_enumerator(runner, log, enumerator, domain, &output).await);
        }

        let merged_file = self.config.artifact(config::MERGED_FILE);
        let merged = self.merge(&enumeration_outputs, &merged_file);
        metrics.total_subdomains = merged.subdomains.len();
        metrics.rejected_lines = merged.rejected;

        // ═══════════════════════════════════════════════════════════════════
        // STAGE 3: LIVENESS PROBING
        // ═══════════════════════════════════════════════════════════════════
        stage_banner("STAGE 3: LIVENESS PROBING");
        let alive_file = self.config.artifact(config::ALIVE_FILE);
        probe::probe_subdomains(runner, log, &merged_file, &alive_file).await;

        let live = probe::read_live_hosts(log, &alive_file).unwrap_or_else(|err| {
            log.error(&format!("Could not read {}: {}", alive_file.display(), err));
            Vec::new()
        });
        metrics.live_subdomains = live.len();
        println!("{}", format!("[+] {} live subdomains", live.len()).green().bold());

        // ═══════════════════════════════════════════════════════════════════
        // STAGE 4: DNS RECORDS
        // ═══════════════════════════════════════════════════════════════════
        stage_banner("STAGE 4: DNS RECORDS");
        log.stage_started("dns records");
        let mut dns_records = BTreeMap::new();
        for host in &live {
            let records = dns::fetch_dns_records(runner, log, host).await;
            if !records.is_empty() {
                metrics.hosts_with_dns_records += 1;
                let dump = self.config.dns_output(host);
                if let Err(err) = std::fs::write(&dump, dns::format_dns_dump(&records)) {
                    log.error(&format!("Could not write {}: {}", dump.display(), err));
                }
                dns_records.insert(host.clone(), records);
            } else {
                let dump = self.config.dns_output(host);
                if dump.exists() && std::fs::remove_file(&dump).is_err() {
                    log.error(&format!("Could not remove stale {}", dump.display()));
                }
            }
        }
        log.stage_completed("dns records");

        // ═══════════════════════════════════════════════════════════════════
        // STAGE 5: DIRECTORY BUSTING + PORT SCANNING
        // ═══════════════════════════════════════════════════════════════════
        stage_banner("STAGE 5: DIRECTORY BUSTING + PORT SCANNING");
        log.stage_started("fan-out");
        let executor = ParallelExecutor::new(
            self.config.workers,
            Arc::clone(&self.runner),
            Arc::clone(&self.log),
        );
        let summary = executor.execute(plan_tasks(&live, wordlist, &self.config)).await;
        metrics.dirbusting_failed = summary.failed_count(ScanKind::DirBusting);
        metrics.portscans_failed = summary.failed_count(ScanKind::PortScan);
        metrics.dirbusting_completed = live.len() - metrics.dirbusting_failed;
        metrics.portscans_completed = live.len() - metrics.portscans_failed;
        log.stage_completed("fan-out");

        // ═══════════════════════════════════════════════════════════════════
        // STAGE 6: REPORT
        // ═══════════════════════════════════════════════════════════════════
        stage_banner("STAGE 6: REPORT");
        let report = Report::new(domain, merged.subdomains, live, dns_records, summary.scan_results);
        let report_path = self.config.artifact(config::REPORT_FILE);
        report.write_text(&report_path)?;
        println!("{}", format!("[?] Final report saved to '{}'", report_path.display()).cyan());
        log.info(&format!("Final report saved to '{}'.", report_path.display()));

        if self.config.json {
            let json_path = self.config.artifact(config::REPORT_JSON_FILE);
            match report.write_json(&json_path) {
                Ok(()) => log.info(&format!("JSON report saved to '{}'.", json_path.display())),
                Err(err) => log.error(&format!("Could not write {}: {}", json_path.display(), err)),
            }
        }

        metrics.finalize();
        if let Err(err) = metrics.save_to_file(&self.config.artifact(config::METRICS_FILE)) {
            log.error(&format!("Could not save metrics: {}", err));
        }
        log.scan_completed();

        Ok(PipelineOutcome { report, report_path, metrics })
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> MergedSubdomains {
        let log = self.log.as_ref();
        log.stage_started("merge");

        match merge::merge_subdomain_files(inputs, output) {
            Ok(merged) => {
                if merged.rejected > 0 {
                    log.warn(&format!("Dropped {} malformed enumeration line(s)", merged.rejected));
                }
                println!(
                    "{}",
                    format!("[+] Merged {} unique subdomains into {}", merged.subdomains.len(), output.display())
                        .green()
                );
                log.data_found("subdomains", merged.subdomains.len());
                log.stage_completed("merge");
                merged
            }
            Err(err) => {
                println!("{}", format!("[-] Merging subdomains failed: {}", err).red());
                log.stage_failed("merge", &err.to_string());
                MergedSubdomains::default()
            }
        }
    }
}

fn stage_banner(title: &str) {
    println!("\n{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
    println!("{}", format!("  {}", title).yellow().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
}
