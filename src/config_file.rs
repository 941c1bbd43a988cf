//! The configuration-file loader (spec §6): a key=value format where
//! recognized keys match the CLI flag table. Unknown keys are ignored with
//! a warning; values containing shell metacharacters are rejected outright
//! (this file is later interpolated into paths and commands, so it gets the
//! same scrutiny the teacher gives untrusted path input).

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::Path;

/// Every key the config file and CLI recognize (spec §6's flag table,
/// stripped of the `=value` part). Repeatable flags (`path`, `exclude`,
/// `pattern`) may appear more than once; every other key keeps only its
/// last occurrence.
pub const KNOWN_KEYS: &[&str] = &[
    "path",
    "output",
    "exclude",
    "min-size",
    "max-size",
    "pattern",
    "level",
    "follow-symlinks",
    "all",
    "empty",
    "fast",
    "verify",
    "fuzzy",
    "threshold",
    "delete",
    "interactive",
    "dry-run",
    "trash",
    "hardlink",
    "quarantine",
    "keep-newest",
    "keep-oldest",
    "keep-path",
    "smart-delete",
    "threads",
    "cache",
    "sha256",
    "sha512",
    "skip-system",
    "force-system",
    "backup",
    "csv",
    "json",
    "email",
    "log",
    "verbose",
    "quiet",
    "resume",
    "config",
    "exclude-list",
];

const REPEATABLE_KEYS: &[&str] = &["path", "exclude", "pattern"];

/// Characters that make a config-file value refused outright rather than
/// passed through (spec §6: "values containing shell metacharacters are
/// rejected").
const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '$', '`', '<', '>', '\n', '\\'];

/// Parsed config file: each recognized key maps to every value it was given
/// (order preserved, for repeatable keys).
#[derive(Debug, Default, Clone)]
pub struct ConfigFile {
    values: HashMap<String, Vec<String>>,
}

impl ConfigFile {
    pub fn parse_str(contents: &str) -> Result<Self> {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (line_no, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                bail!("config file line {}: missing `=`: `{raw_line}`", line_no + 1);
            };
            let key = key.trim();
            let value = value.trim();

            if let Some(bad) = value.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
                bail!(
                    "config file line {}: value for `{key}` contains a rejected character `{bad}`",
                    line_no + 1
                );
            }

            if !KNOWN_KEYS.contains(&key) {
                log::warn!("config file line {}: ignoring unknown key `{key}`", line_no + 1);
                continue;
            }

            if REPEATABLE_KEYS.contains(&key) {
                values.entry(key.to_string()).or_default().push(value.to_string());
            } else {
                values.insert(key.to_string(), vec![value.to_string()]);
            }
        }
        Ok(ConfigFile { values })
    }

    pub fn parse(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::parse_str(&contents)
    }

    /// All values for a repeatable key, in file order.
    pub fn all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The single value for a non-repeatable key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.last()).map(String::as_str)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Parse a size with an optional `K`/`M`/`G`/`T` suffix and optional
/// trailing `B` (spec §6: "min-size=N, max-size=N | size window, accepting
/// suffixes K,M,G,T with optional B").
pub fn parse_size_with_suffix(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let without_b = trimmed.strip_suffix(['b', 'B']).unwrap_or(trimmed);
    let (digits, multiplier) = match without_b.chars().last() {
        Some(c) if c.is_ascii_digit() => (without_b, 1u64),
        Some('k') | Some('K') => (&without_b[..without_b.len() - 1], 1024u64),
        Some('m') | Some('M') => (&without_b[..without_b.len() - 1], 1024 * 1024),
        Some('g') | Some('G') => (&without_b[..without_b.len() - 1], 1024 * 1024 * 1024),
        Some('t') | Some('T') => (&without_b[..without_b.len() - 1], 1024 * 1024 * 1024 * 1024),
        _ => bail!("empty size value"),
    };
    let value: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid size value `{input}`"))?;
    Ok(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_keys_and_repeatable_values() {
        let cfg = ConfigFile::parse_str("path=/a\npath=/b\nmin-size=10K\n# comment\n").unwrap();
        assert_eq!(cfg.all("path"), &["/a".to_string(), "/b".to_string()]);
        assert_eq!(cfg.get("min-size"), Some("10K"));
    }

    #[test]
    fn unknown_keys_are_ignored_not_rejected() {
        let cfg = ConfigFile::parse_str("bogus-key=value\npath=/a\n").unwrap();
        assert!(cfg.get("bogus-key").is_none());
        assert_eq!(cfg.get("path"), Some("/a"));
    }

    #[test]
    fn shell_metacharacters_are_rejected() {
        assert!(ConfigFile::parse_str("output=/tmp; rm -rf /").is_err());
        assert!(ConfigFile::parse_str("email=a@b.com && echo pwned").is_err());
    }

    #[test]
    fn size_suffixes_parse_to_bytes() {
        assert_eq!(parse_size_with_suffix("10").unwrap(), 10);
        assert_eq!(parse_size_with_suffix("10K").unwrap(), 10 * 1024);
        assert_eq!(parse_size_with_suffix("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size_with_suffix("1GB").unwrap(), 1024 * 1024 * 1024);
    }
}
