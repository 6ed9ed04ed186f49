// main.rs - busta CLI
// Purpose: parse arguments, set up the scan directory and logger, then hand
//          the run to the pipeline

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use busta::config::{self, Buster, PipelineConfig};
use busta::pipeline::Pipeline;
use busta::progress::ProgressTracker;
use busta::runner::SystemRunner;

/// Busta - subdomain recon pipeline
#[derive(Parser, Debug)]
#[command(
    name = "busta",
    version,
    about = "Enumerate, probe, dirbust and port-scan the subdomains of a domain",
    long_about = r#"
Runs amass and sublist3r against the root domain, merges their results,
probes the merged list with httpx, fetches DNS records for every live host
and runs directory busting (ffuf or gobuster) plus an nmap port scan per
live host on a bounded worker pool. Everything ends up in final_report.txt.

EXAMPLES:

  busta example.com /usr/share/wordlists/dirb/common.txt
  busta example.com words.txt --workers 10 --output-dir scans/example.com
  busta example.com words.txt --buster gobuster --json
"#
)]
struct Args {
    /// Root domain to enumerate (e.g. example.com)
    domain: String,

    /// Wordlist used for directory busting
    wordlist: PathBuf,

    /// Number of concurrent directory-busting / port-scan tasks
    #[arg(short, long, default_value_t = 5)]
    workers: usize,

    /// Directory that receives every artifact of the run
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory brute-forcer to use (ffuf or gobuster)
    #[arg(short, long, default_value_t = Buster::Ffuf)]
    buster: Buster,

    /// Also export the report as final_report.json
    #[arg(long)]
    json: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            output_dir: self.output_dir.clone(),
            buster: self.buster,
            json: self.json,
        }
    }
}

fn print_banner() {
    println!("{}", "═══════════════════════════════════════════════════════════════".cyan().bold());
    println!("{}", "  ██████╗ ██╗   ██╗███████╗████████╗ █████╗ ".cyan().bold());
    println!("{}", "  ██╔══██╗██║   ██║██╔════╝╚══██╔══╝██╔══██╗".cyan().bold());
    println!("{}", "  ██████╔╝██║   ██║███████╗   ██║   ███████║".cyan().bold());
    println!("{}", "  ██╔══██╗██║   ██║╚════██║   ██║   ██╔══██║".cyan().bold());
    println!("{}", "  ██████╔╝╚██████╔╝███████║   ██║   ██║  ██║".cyan().bold());
    println!("{}", "  ╚═════╝  ╚═════╝ ╚══════╝   ╚═╝   ╚═╝  ╚═╝".cyan().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════".cyan().bold());
    println!("{}", format!("  busta v{} - Subdomain Recon Pipeline", env!("CARGO_PKG_VERSION")).white().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════\n".cyan().bold());
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let domain = args.domain.trim().to_string();
    let config = args.pipeline_config();

    print_banner();

    if let Err(err) = config::validate_inputs(&domain, &args.wordlist, &config) {
        eprintln!("{}", format!("[-] {}", err).red().bold());
        std::process::exit(1);
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {}", config.output_dir.display()))?;

    let scan_id = uuid::Uuid::new_v4().to_string();
    let tracker = Arc::new(
        ProgressTracker::new(scan_id, domain.clone(), &config.output_dir)
            .context("Failed to open scan log files")?,
    );
    println!(
        "{}",
        format!("[*] Logging to {}", tracker.log_path().display()).cyan()
    );

    let output_dir = config.output_dir.clone();
    let pipeline = Pipeline::new(config, Arc::new(SystemRunner), Arc::clone(&tracker));
    let result = pipeline.run(&domain, &args.wordlist).await;
    drop(pipeline);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", format!("[-] Scan aborted: {}", err).red().bold());
            tracker.error(&format!("Scan aborted: {}", err));
            tracker.flush().context("Failed to flush scan log")?;
            std::process::exit(1);
        }
    };

    outcome.metrics.print_summary(&output_dir);

    match Arc::try_unwrap(tracker) {
        Ok(tracker) => tracker.finish().context("Failed to close scan log")?,
        Err(tracker) => tracker.flush().context("Failed to flush scan log")?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_positionals_parse() {
        let args = Args::try_parse_from(["busta", "example.com", "words.txt"]).unwrap();
        assert_eq!(args.domain, "example.com");
        assert_eq!(args.wordlist, PathBuf::from("words.txt"));
        assert_eq!(args.workers, 5);
        assert_eq!(args.buster, Buster::Ffuf);
        assert!(!args.json);
    }

    #[test]
    fn test_missing_positional_rejected() {
        assert!(Args::try_parse_from(["busta", "example.com"]).is_err());
    }

    #[test]
    fn test_extra_positional_rejected() {
        assert!(Args::try_parse_from(["busta", "example.com", "words.txt", "extra"]).is_err());
    }

    #[test]
    fn test_unsupported_buster_rejected() {
        let err = Args::try_parse_from(["busta", "example.com", "words.txt", "--buster", "nmap"]).unwrap_err();
        assert!(err.to_string().contains("cannot brute-force directories"));
        assert!(Args::try_parse_from(["busta", "example.com", "words.txt", "--buster", "dirb"]).is_err());
    }

    #[test]
    fn test_options_map_to_config() {
        let args = Args::try_parse_from([
            "busta",
            "example.com",
            "words.txt",
            "--workers",
            "9",
            "--buster",
            "gobuster",
            "--output-dir",
            "out",
            "--json",
        ])
        .unwrap();

        let config = args.pipeline_config();
        assert_eq!(config.workers, 9);
        assert_eq!(config.buster, Buster::Gobuster);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.json);
    }
}
