// dns.rs - DNS record collection via dig

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::progress::ProgressTracker;
use crate::runner::{CommandRunner, Invocation};

/// Record types queried for every live host, in query order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Soa,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Txt,
        RecordType::Ns,
        RecordType::Soa,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Soa => "SOA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("unknown DNS record type: {}", s)))
    }
}

/// Records found for one host. Types without answers have no key.
pub type DnsRecordMap = BTreeMap<RecordType, Vec<String>>;

pub fn dig_invocation(host: &str, record: RecordType) -> Invocation {
    Invocation::new("dig", [host, record.label(), "+short"])
}

/// Queries each record type once; a failing lookup only drops its own key.
pub async fn fetch_dns_records(
    runner: &dyn CommandRunner,
    log: &ProgressTracker,
    host: &str,
) -> DnsRecordMap {
    println!("{}", format!("[?] Running dig for DNS records on {}...", host).blue());
    log.info(&format!("Running dig for DNS records on {}...", host));

    let mut records = DnsRecordMap::new();

    for record in RecordType::ALL {
        let answer = runner
            .run(&dig_invocation(host, record))
            .await
            .map_err(Error::from)
            .and_then(|out| out.check("dig"));

        match answer {
            Ok(out) => {
                let values: Vec<String> = out
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();

                if values.is_empty() {
                    log.warn(&format!("No {} records found for {}.", record, host));
                } else {
                    println!("{}", format!("[+] {} records for {}: {:?}", record, host, values).green());
                    log.info(&format!("{} records for {}: {}", record, host, values.join(", ")));
                    records.insert(record, values);
                }
            }
            Err(err) => {
                log.warn(&format!("No {} records found for {}: {}", record, host, err));
            }
        }
    }

    records
}

/// Renders a map as `TYPE:` headers followed by two-space indented values.
pub fn format_dns_dump(records: &DnsRecordMap) -> String {
    let mut out = String::new();
    for (record, values) in records {
        out.push_str(&format!("{}:\n", record));
        for value in values {
            out.push_str(&format!("  {}\n", value));
        }
    }
    out
}

/// Inverse of [`format_dns_dump`]; unknown headers and their values are skipped.
pub fn parse_dns_dump(content: &str) -> DnsRecordMap {
    let mut records = DnsRecordMap::new();
    let mut current: Option<RecordType> = None;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("  ") {
            if let Some(record) = current {
                let value = value.trim();
                if !value.is_empty() {
                    records.entry(record).or_default().push(value.to_string());
                }
            }
        } else if let Some(header) = line.trim().strip_suffix(':') {
            current = header.parse().ok();
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{ScriptedRunner, failed, ok};

    fn tracker() -> (tempfile::TempDir, ProgressTracker) {
        let dir = tempfile::tempdir().unwrap();
        let log = ProgressTracker::new("t".into(), "example.com".into(), dir.path()).unwrap();
        (dir, log)
    }

    #[tokio::test]
    async fn test_only_answered_types_are_kept() {
        let (_dir, log) = tracker();
        let runner = ScriptedRunner::new(|inv| match inv.args[1].as_str() {
            "A" => ok("1.2.3.4\n"),
            _ => ok(""),
        });

        let records = fetch_dns_records(&runner, &log, "a.example.com").await;

        let mut expected = DnsRecordMap::new();
        expected.insert(RecordType::A, vec!["1.2.3.4".to_string()]);
        assert_eq!(records, expected);
        assert_eq!(serde_json::to_string(&records).unwrap(), r#"{"A":["1.2.3.4"]}"#);
    }

    #[tokio::test]
    async fn test_queries_all_seven_types_in_order() {
        let (_dir, log) = tracker();
        let runner = ScriptedRunner::new(|_| ok(""));

        fetch_dns_records(&runner, &log, "a.example.com").await;

        let types: Vec<String> = runner.calls().iter().map(|c| c.args[1].clone()).collect();
        assert_eq!(types, vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SOA"]);
        assert_eq!(runner.calls()[0].to_string(), "dig a.example.com A +short");
    }

    #[tokio::test]
    async fn test_one_failing_lookup_does_not_block_others() {
        let (_dir, log) = tracker();
        let runner = ScriptedRunner::new(|inv| match inv.args[1].as_str() {
            "AAAA" => failed(9, "connection timed out; no servers could be reached"),
            "MX" => ok("10 mx1.example.com.\n20 mx2.example.com.\n"),
            "NS" => ok("ns1.example.com.\n"),
            _ => ok("   \n"),
        });

        let records = fetch_dns_records(&runner, &log, "example.com").await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[&RecordType::Mx], vec!["10 mx1.example.com.", "20 mx2.example.com."]);
        assert!(!records.contains_key(&RecordType::Aaaa));
    }

    #[test]
    fn test_dump_can_be_read_back() {
        let mut records = DnsRecordMap::new();
        records.insert(RecordType::Txt, vec!["\"v=spf1 -all\"".to_string()]);
        records.insert(RecordType::A, vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()]);

        let dump = format_dns_dump(&records);

        assert_eq!(dump, "A:\n  1.2.3.4\n  5.6.7.8\nTXT:\n  \"v=spf1 -all\"\n");
        assert_eq!(parse_dns_dump(&dump), records);
    }
}
