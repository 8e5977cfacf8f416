//! The container runtime as seen by the scan and cleanup passes.
//!
//! [`Runtime`] is the whole contract: inventory listings as raw records,
//! free-text prune output, and removal by identifier. [`CliRuntime`] fulfils
//! it by running a Docker-compatible executable and waiting for it.

use crate::error::{Error, Result};
use crate::resource::{Record, ResourceKind};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::ErrorKind;
use std::process::{Command, Output};

const JSON_FORMAT: &str = "{{json .}}";

/// Inventory and mutation calls against a container runtime.
///
/// Every call blocks until the runtime answers.
pub trait Runtime {
    /// Fail fast when the executable or its daemon is unavailable.
    fn check(&self) -> Result<()>;

    /// All containers, including stopped ones, with sizes.
    fn list_containers(&self) -> Result<Vec<Record>>;

    fn list_images(&self) -> Result<Vec<Record>>;

    /// Volumes not referenced by any container.
    fn list_volumes(&self) -> Result<Vec<Record>>;

    /// Networks not used by any container.
    fn list_networks(&self) -> Result<Vec<Record>>;

    /// Disk usage rows, each with a `Reclaimable` size string.
    fn disk_usage(&self) -> Result<Vec<Record>>;

    /// Dry-run build cache prune output, or `None` if the runtime has no dry-run.
    fn preview_cache_prune(&self) -> Result<Option<String>>;

    /// Bulk prune of one kind. `all` only matters for images.
    fn prune(
        &self,
        kind: ResourceKind,
        until: Option<DateTime<Utc>>,
        all: bool,
    ) -> Result<String>;

    /// Remove the given identifiers. Never called for the build cache.
    fn remove(&self, kind: ResourceKind, ids: &[String]) -> Result<String>;
}

/// Runtime backed by a `docker`-compatible command line.
#[derive(Debug, Clone)]
pub struct CliRuntime {
    binary: String,
}

impl CliRuntime {
    pub fn new(binary: impl Into<String>) -> Self {
        CliRuntime {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!("Running {}", self.describe(args));
        Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => Error::RuntimeNotFound(self.binary.clone()),
                _ => Error::Io(err),
            })
    }

    /// Run and return stdout, turning a non-zero exit into `CommandFailed`.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: self.describe(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn list(&self, args: &[&str]) -> Result<Vec<Record>> {
        let stdout = self.run(args)?;
        parse_json_lines(&stdout)
    }
}

impl Runtime for CliRuntime {
    fn check(&self) -> Result<()> {
        let args = ["version", "--format", "{{.Server.Version}}"];
        let output = self.output(&args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::DaemonUnreachable(stderr));
        }
        tracing::debug!(
            "{} server version {}",
            self.binary,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    fn list_containers(&self) -> Result<Vec<Record>> {
        self.list(&["ps", "--all", "--size", "--no-trunc", "--format", JSON_FORMAT])
    }

    fn list_images(&self) -> Result<Vec<Record>> {
        self.list(&["image", "ls", "--no-trunc", "--format", JSON_FORMAT])
    }

    fn list_volumes(&self) -> Result<Vec<Record>> {
        self.list(&[
            "volume",
            "ls",
            "--filter",
            "dangling=true",
            "--format",
            JSON_FORMAT,
        ])
    }

    fn list_networks(&self) -> Result<Vec<Record>> {
        self.list(&[
            "network",
            "ls",
            "--filter",
            "dangling=true",
            "--no-trunc",
            "--format",
            JSON_FORMAT,
        ])
    }

    fn disk_usage(&self) -> Result<Vec<Record>> {
        self.list(&["system", "df", "--format", JSON_FORMAT])
    }

    fn preview_cache_prune(&self) -> Result<Option<String>> {
        let args = ["builder", "prune", "--force", "--dry-run"];
        let output = self.output(&args)?;
        if output.status.success() {
            return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_unsupported_flag(&stderr) {
            tracing::debug!("{} has no build cache dry-run: {}", self.binary, stderr);
            return Ok(None);
        }
        Err(Error::CommandFailed {
            command: self.describe(&args),
            stderr,
        })
    }

    fn prune(
        &self,
        kind: ResourceKind,
        until: Option<DateTime<Utc>>,
        all: bool,
    ) -> Result<String> {
        let mut args: Vec<String> = match kind {
            ResourceKind::Containers => vec!["container".into(), "prune".into()],
            ResourceKind::Images => vec!["image".into(), "prune".into()],
            ResourceKind::Volumes => vec!["volume".into(), "prune".into()],
            ResourceKind::Networks => vec!["network".into(), "prune".into()],
            ResourceKind::Cache => vec!["builder".into(), "prune".into()],
        };
        args.push("--force".into());

        if all && kind == ResourceKind::Images {
            args.push("--all".into());
        }

        if let Some(cutoff) = until {
            if kind == ResourceKind::Volumes {
                // volume prune rejects the until filter
                tracing::debug!("Skipping until filter for volume prune");
            } else {
                args.push("--filter".into());
                args.push(format!(
                    "until={}",
                    cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
                ));
            }
        }

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args)
    }

    fn remove(&self, kind: ResourceKind, ids: &[String]) -> Result<String> {
        let mut args: Vec<&str> = match kind {
            ResourceKind::Containers => vec!["container", "rm"],
            ResourceKind::Images => vec!["image", "rm"],
            ResourceKind::Volumes => vec!["volume", "rm"],
            ResourceKind::Networks => vec!["network", "rm"],
            ResourceKind::Cache => {
                return Err(Error::invalid("build cache has no removable identifiers"))
            }
        };
        args.extend(ids.iter().map(String::as_str));
        self.run(&args)
    }
}

fn is_unsupported_flag(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("unknown flag") || lower.contains("unknown shorthand flag")
}

/// Parse `{{json .}}` output: one JSON object per line, blank lines ignored.
pub fn parse_json_lines(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        records.push(serde_json::from_str::<Record>(line)?);
    }
    Ok(records)
}

/// In-memory runtime for exercising the scan and cleanup passes.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct StubRuntime {
        pub containers: Vec<Record>,
        pub images: Vec<Record>,
        pub volumes: Vec<Record>,
        pub networks: Vec<Record>,
        pub disk_usage: Vec<Record>,
        /// `None` means the dry-run capability is missing
        pub cache_preview: Option<String>,
        pub prune_output: HashMap<ResourceKind, String>,
        pub failing: Vec<ResourceKind>,
        pub calls: RefCell<Vec<String>>,
    }

    impl StubRuntime {
        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub fn mutations(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|call| call.starts_with("prune") || call.starts_with("remove"))
                .collect()
        }

        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        fn fail_if_configured(&self, kind: ResourceKind) -> Result<()> {
            if self.failing.contains(&kind) {
                return Err(Error::CommandFailed {
                    command: format!("{} cleanup", kind),
                    stderr: "permission denied".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Runtime for StubRuntime {
        fn check(&self) -> Result<()> {
            self.record("check".into());
            Ok(())
        }

        fn list_containers(&self) -> Result<Vec<Record>> {
            self.record("list containers".into());
            Ok(self.containers.clone())
        }

        fn list_images(&self) -> Result<Vec<Record>> {
            self.record("list images".into());
            Ok(self.images.clone())
        }

        fn list_volumes(&self) -> Result<Vec<Record>> {
            self.record("list volumes".into());
            Ok(self.volumes.clone())
        }

        fn list_networks(&self) -> Result<Vec<Record>> {
            self.record("list networks".into());
            Ok(self.networks.clone())
        }

        fn disk_usage(&self) -> Result<Vec<Record>> {
            self.record("disk usage".into());
            Ok(self.disk_usage.clone())
        }

        fn preview_cache_prune(&self) -> Result<Option<String>> {
            self.record("preview cache".into());
            Ok(self.cache_preview.clone())
        }

        fn prune(
            &self,
            kind: ResourceKind,
            until: Option<DateTime<Utc>>,
            all: bool,
        ) -> Result<String> {
            self.record(format!(
                "prune {} until={} all={}",
                kind,
                until.is_some(),
                all
            ));
            self.fail_if_configured(kind)?;
            Ok(self.prune_output.get(&kind).cloned().unwrap_or_default())
        }

        fn remove(&self, kind: ResourceKind, ids: &[String]) -> Result<String> {
            self.record(format!("remove {} {}", kind, ids.join(",")));
            self.fail_if_configured(kind)?;
            Ok(ids.join("\n"))
        }
    }
}
