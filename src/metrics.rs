use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Counters for one pipeline run, saved next to the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub scan_id: String,
    pub target: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: f64,

    pub total_subdomains: usize,
    pub rejected_lines: usize,
    pub live_subdomains: usize,
    pub hosts_with_dns_records: usize,

    pub dirbusting_completed: usize,
    pub dirbusting_failed: usize,
    pub portscans_completed: usize,
    pub portscans_failed: usize,
}

impl ScanMetrics {
    pub fn new(scan_id: String, target: String) -> Self {
        Self {
            scan_id,
            target,
            start_time: Utc::now(),
            end_time: None,
            duration_seconds: 0.0,
            total_subdomains: 0,
            rejected_lines: 0,
            live_subdomains: 0,
            hosts_with_dns_records: 0,
            dirbusting_completed: 0,
            dirbusting_failed: 0,
            portscans_completed: 0,
            portscans_failed: 0,
        }
    }

    /// Stamps the end time and computes the duration.
    pub fn finalize(&mut self) {
        let end = Utc::now();
        self.duration_seconds = (end - self.start_time).num_milliseconds() as f64 / 1000.0;
        self.end_time = Some(end);
    }

    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn print_summary(&self, output_dir: &Path) {
        println!("\n{}", "═══════════════════════════════════════════════════════════════".green().bold());
        println!("{}", format!("  SCAN COMPLETED: {}", self.target).green().bold());
        println!("{}", "═══════════════════════════════════════════════════════════════".green().bold());
        println!("{}", format!("  Subdomains discovered: {}", self.total_subdomains).cyan());
        println!("{}", format!("  Live subdomains: {}", self.live_subdomains).cyan());
        println!("{}", format!("  Hosts with DNS records: {}", self.hosts_with_dns_records).cyan());
        println!(
            "{}",
            format!(
                "  Directory busting: {} ok / {} failed",
                self.dirbusting_completed, self.dirbusting_failed
            )
            .cyan()
        );
        println!(
            "{}",
            format!(
                "  Port scans: {} ok / {} failed",
                self.portscans_completed, self.portscans_failed
            )
            .cyan()
        );
        println!("{}", format!("  Scan duration: {:.2}s", self.duration_seconds).cyan());
        println!("{}", format!("  Results directory: {}/", output_dir.display()).green());
        println!("{}", "═══════════════════════════════════════════════════════════════".green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_sets_end_time() {
        let mut metrics = ScanMetrics::new("id".to_string(), "example.com".to_string());
        assert!(metrics.end_time.is_none());

        metrics.finalize();

        assert!(metrics.end_time.is_some());
        assert!(metrics.duration_seconds >= 0.0);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan_metrics.json");
        let mut metrics = ScanMetrics::new("id".to_string(), "example.com".to_string());
        metrics.live_subdomains = 3;

        metrics.save_to_file(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["live_subdomains"], 3);
        assert_eq!(json["target"], "example.com");
    }
}
