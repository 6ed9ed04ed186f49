// runner.rs - Collaborator boundary
// Purpose: every external tool (amass, httpx, ffuf, nmap, dig, ...) is reached
//          through `CommandRunner` so stages never touch processes directly

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::Error;

/// One external program call: binary name plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a non-zero exit into `Error::ToolExecution` so callers can log it uniformly.
    pub fn check(self, tool: &str) -> Result<ToolOutput, Error> {
        if self.success() {
            return Ok(self);
        }

        let status = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());

        Err(Error::ToolExecution {
            tool: tool.to_string(),
            status,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// A missing executable surfaces as `io::ErrorKind::NotFound`.
    async fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Handler = dyn Fn(&Invocation) -> io::Result<ToolOutput> + Send + Sync;

    /// Test double that answers from a closure and records what it saw.
    pub(crate) struct ScriptedRunner {
        handler: Box<Handler>,
        delay: Duration,
        calls: Mutex<Vec<Invocation>>,
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl ScriptedRunner {
        pub(crate) fn new<F>(handler: F) -> Self
        where
            F: Fn(&Invocation) -> io::Result<ToolOutput> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
            }
        }

        /// Every call sleeps this long so overlapping calls can be observed.
        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn high_water_mark(&self) -> usize {
            self.high_water.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
            self.calls.lock().unwrap().push(invocation.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = (self.handler)(invocation);

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    pub(crate) fn ok(stdout: &str) -> io::Result<ToolOutput> {
        Ok(ToolOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub(crate) fn failed(code: i32, stderr: &str) -> io::Result<ToolOutput> {
        Ok(ToolOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    pub(crate) fn not_found() -> io::Result<ToolOutput> {
        Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("dig", ["example.com", "A", "+short"]);
        assert_eq!(inv.to_string(), "dig example.com A +short");
    }

    #[test]
    fn test_check_non_zero_exit() {
        let output = ToolOutput {
            code: Some(2),
            stdout: String::new(),
            stderr: "boom\n".to_string(),
        };
        match output.check("nmap") {
            Err(Error::ToolExecution { tool, status, stderr }) => {
                assert_eq!(tool, "nmap");
                assert_eq!(status, "2");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_system_runner_missing_binary() {
        let inv = Invocation::new("busta-definitely-not-a-real-binary", Vec::<String>::new());
        let err = SystemRunner.run(&inv).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
