// Rebuild final_report.txt from the artifacts of a finished scan
use std::path::Path;

use busta::config::{self, PipelineConfig};
use busta::report_generator::Report;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: regen_report <scan_directory> <domain>");
        eprintln!("Example: regen_report scans/example.com example.com");
        std::process::exit(1);
    }

    let scan_dir = Path::new(&args[1]);
    let domain = args[2].trim();

    if !scan_dir.is_dir() {
        eprintln!("Error: Directory not found: {}", scan_dir.display());
        std::process::exit(1);
    }

    println!("Regenerating report for: {}", domain);
    println!("Scan directory: {}", scan_dir.display());

    let report = match Report::load_from_dir(scan_dir, domain) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error reading scan artifacts: {}", e);
            std::process::exit(1);
        }
    };

    let layout = PipelineConfig {
        output_dir: scan_dir.to_path_buf(),
        ..Default::default()
    };
    let path = layout.artifact(config::REPORT_FILE);

    match report.write_text(&path) {
        Ok(()) => {
            println!("Report generated successfully!");
            println!("Output: {}", path.display());
        }
        Err(e) => {
            eprintln!("Error generating report: {}", e);
            std::process::exit(1);
        }
    }
}
