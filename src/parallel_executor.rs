// parallel_executor.rs - Per-host fan-out with a bounded worker pool
// Purpose: one directory-busting task and one port-scan task per live host,
//          all sharing the same semaphore-bounded set of slots

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::{Buster, PipelineConfig};
use crate::progress::ProgressTracker;
use crate::report_generator::{ScanResult, non_empty_lines};
use crate::runner::{CommandRunner, Invocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKind {
    DirBusting,
    PortScan,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::DirBusting => f.write_str("directory busting"),
            ScanKind::PortScan => f.write_str("port scan"),
        }
    }
}

/// A single unit of fan-out work; `output` is unique to (host, kind).
#[derive(Debug, Clone)]
pub struct FanOutTask {
    pub host: String,
    pub kind: ScanKind,
    pub invocation: Invocation,
    pub output: PathBuf,
}

/// What one `execute` call produced. `scan_results` has an entry for every
/// planned host and only holds output captured during this call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOutSummary {
    pub completed: usize,
    pub failed: Vec<(String, ScanKind)>,
    pub scan_results: BTreeMap<String, ScanResult>,
}

impl FanOutSummary {
    pub fn failed_count(&self, kind: ScanKind) -> usize {
        self.failed.iter().filter(|(_, k)| *k == kind).count()
    }
}

pub fn buster_invocation(buster: Buster, host: &str, wordlist: &Path) -> Invocation {
    let wordlist = wordlist.display().to_string();
    match buster {
        Buster::Ffuf => Invocation::new(
            "ffuf",
            [
                "-u".to_string(),
                format!("http://{}/FUZZ", host),
                "-w".to_string(),
                wordlist,
                "-s".to_string(),
            ],
        ),
        Buster::Gobuster => Invocation::new(
            "gobuster",
            [
                "dir".to_string(),
                "-k".to_string(),
                "-q".to_string(),
                "--url".to_string(),
                format!("http://{}", host),
                "-w".to_string(),
                wordlist,
                "--random-agent".to_string(),
            ],
        ),
    }
}

pub fn portscan_invocation(host: &str) -> Invocation {
    Invocation::new("nmap", ["-p", "1-65535", host])
}

/// Builds the dirbusting and port-scan task of every host.
pub fn plan_tasks(hosts: &[String], wordlist: &Path, config: &PipelineConfig) -> Vec<FanOutTask> {
    hosts
        .iter()
        .flat_map(|host| {
            [
                FanOutTask {
                    host: host.clone(),
                    kind: ScanKind::DirBusting,
                    invocation: buster_invocation(config.buster, host, wordlist),
                    output: config.dirbusting_output(host),
                },
                FanOutTask {
                    host: host.clone(),
                    kind: ScanKind::PortScan,
                    invocation: portscan_invocation(host),
                    output: config.portscan_output(host),
                },
            ]
        })
        .collect()
}

/// Outcome of one task: whether it succeeded and the stdout it captured.
struct TaskOutcome {
    ok: bool,
    lines: Vec<String>,
}

pub struct ParallelExecutor {
    workers: usize,
    semaphore: Arc<Semaphore>,
    runner: Arc<dyn CommandRunner>,
    log: Arc<ProgressTracker>,
}

impl ParallelExecutor {
    pub fn new(workers: usize, runner: Arc<dyn CommandRunner>, log: Arc<ProgressTracker>) -> Self {
        let workers = workers.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            workers,
            semaphore: Arc::new(Semaphore::new(workers)),
            runner,
            log,
        }
    }

    /// Runs every task, at most `workers` at a time, and waits for all of them.
    ///
    /// Tasks never cancel each other: a failure is logged and counted, and the
    /// remaining tasks keep their slots.
    pub async fn execute(&self, tasks: Vec<FanOutTask>) -> FanOutSummary {
        let mut summary = FanOutSummary::default();
        if tasks.is_empty() {
            return summary;
        }

        let total = tasks.len();
        println!(
            "{}",
            format!("[*] Scheduling {} tasks on {} workers", total, self.workers).cyan()
        );
        self.log.info(&format!("Scheduling {} fan-out tasks on {} workers", total, self.workers));

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=> "));
        }

        let mut handles = Vec::with_capacity(total);
        for task in tasks {
            let semaphore = Arc::clone(&self.semaphore);
            let runner = Arc::clone(&self.runner);
            let log = Arc::clone(&self.log);
            let pb = pb.clone();
            let id = (task.host.clone(), task.kind);
            summary.scan_results.entry(task.host.clone()).or_default();

            let handle = tokio::spawn(async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => run_task(runner.as_ref(), &log, &pb, &task).await,
                    Err(_) => TaskOutcome { ok: false, lines: Vec::new() },
                };

                pb.inc(1);
                outcome
            });

            handles.push((id, handle));
        }

        for ((host, kind), handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.log.error(&format!("{} task for {} aborted: {}", kind, host, err));
                    TaskOutcome { ok: false, lines: Vec::new() }
                }
            };

            if outcome.ok {
                summary.completed += 1;
            } else {
                summary.failed.push((host.clone(), kind));
            }

            let result = summary.scan_results.entry(host).or_default();
            match kind {
                ScanKind::DirBusting => result.dirbusting = outcome.lines,
                ScanKind::PortScan => result.ports = outcome.lines,
            }
        }

        pb.finish_and_clear();
        println!(
            "{}",
            format!(
                "[+] Fan-out finished: {} completed, {} failed",
                summary.completed,
                summary.failed.len()
            )
            .green()
            .bold()
        );

        summary
    }
}

/// Runs one task and stores whatever it printed, even on a non-zero exit.
///
/// A task that printed nothing leaves no file behind, including one an
/// earlier run wrote under the same name.
async fn run_task(
    runner: &dyn CommandRunner,
    log: &ProgressTracker,
    pb: &ProgressBar,
    task: &FanOutTask,
) -> TaskOutcome {
    log.info(&format!("Running {} on {}: {}", task.kind, task.host, task.invocation));

    let output = match runner.run(&task.invocation).await {
        Ok(output) => output,
        Err(err) => {
            discard_artifact(log, &task.output);
            pb.println(format!("{}", format!("[-] {} failed for {}: {}", task.kind, task.host, err).red()));
            log.error(&format!("{} failed for {}: {}", task.kind, task.host, err));
            return TaskOutcome { ok: false, lines: Vec::new() };
        }
    };

    let lines = non_empty_lines(&output.stdout);
    let stored = if lines.is_empty() {
        discard_artifact(log, &task.output);
        Ok(())
    } else {
        std::fs::write(&task.output, &output.stdout)
    };

    match (output.check(&task.invocation.program), stored) {
        (Ok(_), Ok(())) => {
            pb.println(format!(
                "{}",
                format!("[+] {} completed for {} -> {}", task.kind, task.host, task.output.display()).green()
            ));
            log.info(&format!("{} results for {} saved to {}", task.kind, task.host, task.output.display()));
            TaskOutcome { ok: true, lines }
        }
        (Err(err), _) => {
            pb.println(format!("{}", format!("[-] {} failed for {}: {}", task.kind, task.host, err).red()));
            log.error(&format!("{} failed for {}: {}", task.kind, task.host, err));
            if !lines.is_empty() {
                log.warn(&format!("Kept {} partial line(s) from {} on {}", lines.len(), task.kind, task.host));
            }
            TaskOutcome { ok: false, lines }
        }
        (Ok(_), Err(err)) => {
            pb.println(format!(
                "{}",
                format!("[-] Could not save {} results for {}: {}", task.kind, task.host, err).red()
            ));
            log.error(&format!("Could not write {}: {}", task.output.display(), err));
            TaskOutcome { ok: false, lines }
        }
    }
}

fn discard_artifact(log: &ProgressTracker, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log.warn(&format!("Removed stale {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log.error(&format!("Could not remove {}: {}", path.display(), err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolOutput;
    use crate::runner::testing::{ScriptedRunner, failed, ok};
    use std::time::Duration;

    fn hosts(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("host{}.example.com", i)).collect()
    }

    fn setup(dir: &Path) -> (PipelineConfig, Arc<ProgressTracker>) {
        let config = PipelineConfig {
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let log = Arc::new(
            ProgressTracker::new("t".into(), "example.com".into(), dir).unwrap(),
        );
        (config, log)
    }

    #[test]
    fn test_plan_two_tasks_per_host() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("out"),
            ..Default::default()
        };
        let tasks = plan_tasks(&hosts(3), Path::new("words.txt"), &config);

        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks[0].invocation.to_string(), "ffuf -u http://host1.example.com/FUZZ -w words.txt -s");
        assert_eq!(tasks[1].invocation.to_string(), "nmap -p 1-65535 host1.example.com");
        assert_eq!(tasks[1].output, PathBuf::from("out/nmap_host1_example_com.txt"));
    }

    #[test]
    fn test_gobuster_template() {
        let inv = buster_invocation(Buster::Gobuster, "a.example.com", Path::new("w.txt"));
        assert_eq!(
            inv.to_string(),
            "gobuster dir -k -q --url http://a.example.com -w w.txt --random-agent"
        );
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_workers() {
        let dir = tempfile::tempdir().unwrap();
        let (config, log) = setup(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new(|_| ok("result\n")).with_delay(Duration::from_millis(20)),
        );
        let executor = ParallelExecutor::new(5, runner.clone(), log);

        let tasks = plan_tasks(&hosts(12), Path::new("w.txt"), &config);
        let summary = executor.execute(tasks).await;

        assert_eq!(summary.completed, 24);
        assert_eq!(summary.scan_results.len(), 12);
        assert!(runner.high_water_mark() <= 5, "saw {}", runner.high_water_mark());
        assert!(runner.high_water_mark() > 1);
    }

    #[tokio::test]
    async fn test_failing_host_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let (config, log) = setup(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new(|inv| {
                if inv.args.iter().any(|a| a.contains("host3.example.com")) {
                    failed(1, "connection refused")
                } else {
                    ok("80/tcp open http\n")
                }
            })
            .with_delay(Duration::from_millis(5)),
        );
        let executor = ParallelExecutor::new(5, runner, log);

        let all = hosts(12);
        let summary = executor.execute(plan_tasks(&all, Path::new("w.txt"), &config)).await;

        assert_eq!(summary.completed, 22);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.failed_count(ScanKind::PortScan), 1);
        for host in &all {
            let exists = config.portscan_output(host).exists() && config.dirbusting_output(host).exists();
            assert_eq!(exists, host != "host3.example.com", "{}", host);
        }
        assert_eq!(
            std::fs::read_to_string(config.portscan_output("host7.example.com")).unwrap(),
            "80/tcp open http\n"
        );
        assert_eq!(summary.scan_results["host3.example.com"], ScanResult::default());
        assert_eq!(summary.scan_results["host7.example.com"].ports, vec!["80/tcp open http"]);
    }

    #[tokio::test]
    async fn test_failed_rerun_drops_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (config, log) = setup(dir.path());
        let stale = config.portscan_output("host1.example.com");
        std::fs::write(&stale, "8080/tcp open http-proxy\n").unwrap();
        let runner = Arc::new(ScriptedRunner::new(|inv| match inv.program.as_str() {
            "nmap" => failed(1, "Failed to resolve"),
            _ => ok("admin [Status: 200]\n"),
        }));
        let executor = ParallelExecutor::new(2, runner, log);

        let summary = executor.execute(plan_tasks(&hosts(1), Path::new("w.txt"), &config)).await;

        assert_eq!(summary.failed, vec![("host1.example.com".to_string(), ScanKind::PortScan)]);
        assert!(!stale.exists());
        let result = &summary.scan_results["host1.example.com"];
        assert!(result.ports.is_empty());
        assert_eq!(result.dirbusting, vec!["admin [Status: 200]"]);
    }

    #[tokio::test]
    async fn test_partial_output_kept_on_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (config, log) = setup(dir.path());
        let runner = Arc::new(ScriptedRunner::new(|_| {
            Ok(ToolOutput {
                code: Some(1),
                stdout: "22/tcp open ssh\n".to_string(),
                stderr: "interrupted".to_string(),
            })
        }));
        let executor = ParallelExecutor::new(2, runner, log);

        let summary = executor.execute(plan_tasks(&hosts(1), Path::new("w.txt"), &config)).await;

        assert_eq!(summary.completed, 0);
        assert_eq!(summary.scan_results["host1.example.com"].ports, vec!["22/tcp open ssh"]);
        assert_eq!(
            std::fs::read_to_string(config.portscan_output("host1.example.com")).unwrap(),
            "22/tcp open ssh\n"
        );
    }

    #[test]
    fn test_oversized_worker_count_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let (_config, log) = setup(dir.path());
        let runner = Arc::new(ScriptedRunner::new(|_| ok("")));

        let executor = ParallelExecutor::new(usize::MAX, runner, log);

        assert_eq!(executor.workers, Semaphore::MAX_PERMITS);
    }

    #[tokio::test]
    async fn test_no_hosts_no_work() {
        let dir = tempfile::tempdir().unwrap();
        let (_config, log) = setup(dir.path());
        let runner = Arc::new(ScriptedRunner::new(|_| ok("")));
        let executor = ParallelExecutor::new(5, runner.clone(), log);

        let summary = executor.execute(Vec::new()).await;

        assert_eq!(summary, FanOutSummary::default());
        assert!(runner.calls().is_empty());
    }
}
