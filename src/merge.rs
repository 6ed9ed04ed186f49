// merge.rs - Subdomain merge/dedup
// Purpose: union enumerator outputs into one sorted, duplicate-free list

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

lazy_static! {
    static ref HOSTNAME: Regex = Regex::new(
        r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)*[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$"
    )
    .unwrap();
}

/// Whether `line` has the shape of a DNS hostname (labels of letters, digits, `-`).
pub fn is_valid_hostname(line: &str) -> bool {
    line.len() <= 253 && HOSTNAME.is_match(line)
}

/// Result of reading a set of subdomain files.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergedSubdomains {
    pub subdomains: BTreeSet<String>,
    /// Non-empty lines dropped because they are not hostnames
    pub rejected: usize,
}

/// Reads every existing file in `inputs` and unions their trimmed lines.
///
/// Missing files are skipped and empty lines are ignored. Malformed lines,
/// including ones that are not valid UTF-8, are counted in `rejected`.
pub fn collect_subdomains<P: AsRef<Path>>(inputs: &[P]) -> io::Result<MergedSubdomains> {
    let mut merged = MergedSubdomains::default();

    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            continue;
        }

        let content = fs::read(path)?;
        for raw in content.split(|b| *b == b'\n') {
            match std::str::from_utf8(raw).map(str::trim) {
                Ok("") => {}
                Ok(line) if is_valid_hostname(line) => {
                    merged.subdomains.insert(line.to_string());
                }
                _ => merged.rejected += 1,
            }
        }
    }

    Ok(merged)
}

/// Writes one entry per line, newline-terminated, in set order.
pub fn write_lines<'a, I>(path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut file = io::BufWriter::new(fs::File::create(path)?);
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()
}

/// Merges `inputs` into `output`; running it twice yields identical bytes.
pub fn merge_subdomain_files<P: AsRef<Path>>(inputs: &[P], output: &Path) -> io::Result<MergedSubdomains> {
    let merged = collect_subdomains(inputs)?;
    write_lines(output, &merged.subdomains)?;
    Ok(merged)
}
