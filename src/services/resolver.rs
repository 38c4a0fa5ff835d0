//! Repository root discovery
//!
//! The root directory is looked up through an ordered list of strategies: the
//! command line of a running collector first, then well-known configuration
//! files. The first strategy that finds a root wins.

use crate::error::{AppError, Result};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_COLLECTOR: &str = "rwflowpack";
pub const DEFAULT_ROOT_FLAG: &str = "--root-directory";
pub const DEFAULT_CONFIG_KEY: &str = "ROOT_DIRECTORY";

pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "/etc/sysconfig/rwflowpack.conf",
    "/etc/rwflowpack.conf",
    "/usr/local/etc/rwflowpack.conf",
    "/usr/local/share/silk/etc/rwflowpack.conf",
];

/// Outcome of a single strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    NotFound,
}

pub trait RootStrategy {
    fn name(&self) -> &str;
    fn resolve(&self) -> Result<Resolution>;
}

/// Reads the root directory from the arguments of a running collector.
#[derive(Debug, Clone)]
pub struct ProcessArgs {
    program: String,
    flag: String,
}

impl ProcessArgs {
    pub fn new(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
        }
    }
}

impl Default for ProcessArgs {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTOR, DEFAULT_ROOT_FLAG)
    }
}

impl RootStrategy for ProcessArgs {
    fn name(&self) -> &str {
        "process arguments"
    }

    fn resolve(&self) -> Result<Resolution> {
        let output = Command::new("ps")
            .args(["-eo", "args="])
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    AppError::DependencyMissing("ps not found in PATH".to_string())
                }
                _ => AppError::Io(e),
            })?;

        if !output.status.success() {
            return Err(AppError::Resolution(format!(
                "ps exited with {}",
                output.status
            )));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(match find_root_arg(&listing, &self.program, &self.flag) {
            Some(root) => Resolution::Found(root),
            None => Resolution::NotFound,
        })
    }
}

/// Find `flag=DIR` or `flag DIR` on the command line of `program` in a
/// process listing (one command line per line).
pub fn find_root_arg(listing: &str, program: &str, flag: &str) -> Option<PathBuf> {
    for line in listing.lines() {
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            continue;
        };
        if Path::new(command).file_name() != Some(OsStr::new(program)) {
            continue;
        }

        while let Some(arg) = tokens.next() {
            if arg == flag {
                if let Some(value) = tokens.next() {
                    return Some(PathBuf::from(value));
                }
            } else if let Some(value) = arg.strip_prefix(flag).and_then(|r| r.strip_prefix('=')) {
                if !value.is_empty() {
                    return Some(PathBuf::from(value));
                }
            }
        }
    }
    None
}

/// Reads a shell-style `KEY=value` assignment from configuration files.
#[derive(Debug, Clone)]
pub struct ConfigFiles {
    paths: Vec<PathBuf>,
    key: String,
}

impl ConfigFiles {
    pub fn new(paths: Vec<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            paths,
            key: key.into(),
        }
    }
}

impl Default for ConfigFiles {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).collect(),
            DEFAULT_CONFIG_KEY,
        )
    }
}

impl RootStrategy for ConfigFiles {
    fn name(&self) -> &str {
        "configuration files"
    }

    fn resolve(&self) -> Result<Resolution> {
        for path in &self.paths {
            let contents = match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read configuration file");
                    continue;
                }
            };
            if let Some(root) = find_config_value(&contents, &self.key) {
                debug!(path = %path.display(), "Root directory found in configuration");
                return Ok(Resolution::Found(root));
            }
        }
        Ok(Resolution::NotFound)
    }
}

/// Last non-empty `KEY=value` (optionally `export`ed and quoted) in a shell
/// style configuration file.
pub fn find_config_value(contents: &str, key: &str) -> Option<PathBuf> {
    let mut found = None;
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }
        let value = value.trim();
        let value = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => value[1..].split(quote).next().unwrap_or(""),
            _ => value.split(" #").next().unwrap_or("").trim(),
        };
        if !value.is_empty() {
            found = Some(PathBuf::from(value));
        }
    }
    found
}

/// Ordered chain of strategies.
pub struct RootResolver {
    strategies: Vec<Box<dyn RootStrategy>>,
}

impl RootResolver {
    pub fn new(strategies: Vec<Box<dyn RootStrategy>>) -> Self {
        Self { strategies }
    }

    /// Try each strategy in turn. Strategy errors are logged and skipped; if
    /// nothing is found, a missing dependency is reported ahead of a plain
    /// resolution failure.
    pub fn resolve(&self) -> Result<PathBuf> {
        let mut missing_dependency = None;

        for strategy in &self.strategies {
            match strategy.resolve() {
                Ok(Resolution::Found(root)) => {
                    info!(root = %root.display(), strategy = strategy.name(), "Resolved repository root");
                    return Ok(root);
                }
                Ok(Resolution::NotFound) => {
                    debug!(strategy = strategy.name(), "No repository root found");
                }
                Err(e @ AppError::DependencyMissing(_)) => {
                    warn!(strategy = strategy.name(), error = %e, "Strategy unavailable");
                    missing_dependency.get_or_insert(e);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Strategy failed");
                }
            }
        }

        Err(match missing_dependency {
            Some(AppError::DependencyMissing(msg)) => AppError::DependencyMissing(format!(
                "{}, and no configuration names a repository root; pass --root-dir",
                msg
            )),
            _ => AppError::Resolution(format!(
                "no running {} and no configuration file names a root directory; pass --root-dir",
                DEFAULT_COLLECTOR
            )),
        })
    }
}

impl Default for RootResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ProcessArgs::default()),
            Box::new(ConfigFiles::default()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Fixed {
        outcome: fn() -> Result<Resolution>,
        calls: Rc<Cell<u32>>,
    }

    impl RootStrategy for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn resolve(&self) -> Result<Resolution> {
            self.calls.set(self.calls.get() + 1);
            (self.outcome)()
        }
    }

    fn fixed(outcome: fn() -> Result<Resolution>, calls: &Rc<Cell<u32>>) -> Box<dyn RootStrategy> {
        Box::new(Fixed {
            outcome,
            calls: Rc::clone(calls),
        })
    }

    #[test]
    fn test_first_found_wins() {
        let calls = Rc::new(Cell::new(0));
        let resolver = RootResolver::new(vec![
            fixed(|| Ok(Resolution::NotFound), &calls),
            fixed(|| Ok(Resolution::Found(PathBuf::from("/data/a"))), &calls),
            fixed(|| Ok(Resolution::Found(PathBuf::from("/data/b"))), &calls),
        ]);

        assert_eq!(resolver.resolve().unwrap(), PathBuf::from("/data/a"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failing_strategy_falls_through() {
        let calls = Rc::new(Cell::new(0));
        let resolver = RootResolver::new(vec![
            fixed(|| Err(AppError::DependencyMissing("ps".into())), &calls),
            fixed(|| Ok(Resolution::Found(PathBuf::from("/data"))), &calls),
        ]);
        assert_eq!(resolver.resolve().unwrap(), PathBuf::from("/data"));
    }

    #[test]
    fn test_nothing_found_is_resolution_error() {
        let calls = Rc::new(Cell::new(0));
        let resolver = RootResolver::new(vec![fixed(|| Ok(Resolution::NotFound), &calls)]);
        let err = resolver.resolve().unwrap_err();
        assert!(matches!(err, AppError::Resolution(_)));
        assert!(err.to_string().contains("--root-dir"));
    }

    #[test]
    fn test_missing_dependency_reported_when_nothing_found() {
        let calls = Rc::new(Cell::new(0));
        let resolver = RootResolver::new(vec![
            fixed(|| Err(AppError::DependencyMissing("ps not found".into())), &calls),
            fixed(|| Ok(Resolution::NotFound), &calls),
        ]);
        assert!(matches!(
            resolver.resolve(),
            Err(AppError::DependencyMissing(_))
        ));
    }

    #[test]
    fn test_find_root_arg_forms() {
        let listing = "\
/usr/sbin/sshd -D
/usr/local/sbin/rwflowpack --sensor-configuration=/etc/sensor.conf --root-directory=/data/flow
";
        assert_eq!(
            find_root_arg(listing, "rwflowpack", "--root-directory"),
            Some(PathBuf::from("/data/flow"))
        );

        let spaced = "rwflowpack --log-dest=syslog --root-directory /srv/silk\n";
        assert_eq!(
            find_root_arg(spaced, "rwflowpack", "--root-directory"),
            Some(PathBuf::from("/srv/silk"))
        );

        let other = "grep rwflowpack --root-directory=/nope\n";
        assert_eq!(find_root_arg(other, "rwflowpack", "--root-directory"), None);
    }

    #[test]
    fn test_find_config_value() {
        let contents = r#"
# ROOT_DIRECTORY=/commented
LOG_TYPE=syslog
ROOT_DIRECTORY=
export ROOT_DIRECTORY="/data/silk"  # main archive
"#;
        assert_eq!(
            find_config_value(contents, "ROOT_DIRECTORY"),
            Some(PathBuf::from("/data/silk"))
        );
        assert_eq!(
            find_config_value("ROOT_DIRECTORY=/plain # note", "ROOT_DIRECTORY"),
            Some(PathBuf::from("/plain"))
        );
        assert_eq!(find_config_value("ROOT_DIRECTORY=", "ROOT_DIRECTORY"), None);
    }

    #[test]
    fn test_config_files_skip_missing_files() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("rwflowpack.conf");
        fs::write(&present, "ROOT_DIRECTORY=/data/flow\n").unwrap();

        let strategy = ConfigFiles::new(
            vec![tmp.path().join("absent.conf"), present],
            DEFAULT_CONFIG_KEY,
        );
        assert_eq!(
            strategy.resolve().unwrap(),
            Resolution::Found(PathBuf::from("/data/flow"))
        );

        let empty = ConfigFiles::new(vec![tmp.path().join("absent.conf")], DEFAULT_CONFIG_KEY);
        assert_eq!(empty.resolve().unwrap(), Resolution::NotFound);
    }
}
