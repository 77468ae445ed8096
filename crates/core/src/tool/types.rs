//! Types for the tool module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Operations the toolkit is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOperation {
    /// Fetch archive files for one observation.
    Download,
    /// Reprocess the raw event list.
    Reprocess,
    /// Build exposure-corrected images, exposure and PSF maps.
    FluxImage,
    /// Wavelet source detection.
    WavDetect,
}

impl ToolOperation {
    /// Name of the toolkit executable for this operation.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Download => "download_chandra_obsid",
            Self::Reprocess => "chandra_repro",
            Self::FluxImage => "fluximage",
            Self::WavDetect => "wavdetect",
        }
    }
}

impl fmt::Display for ToolOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Per-unit tool namespace.
///
/// Concurrent units each get their own scratch directory and their own
/// parameter-file search path, so no two units ever share mutable tool
/// state or temp files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEnvironment {
    /// Scratch directory exported as `ASCDS_WORK_PATH`.
    pub work_path: PathBuf,
    /// Parameter-file search path exported as `PFILES`.
    pub param_path: String,
}

impl ToolEnvironment {
    /// Builds the namespace for a unit whose scratch directory is `scratch`.
    ///
    /// The scratch directory is the writable head of the parameter path; the
    /// toolkit's system parameter directories follow it read-only.
    pub fn for_unit(install_dir: &Path, scratch: PathBuf) -> Self {
        let param_path = format!(
            "{};{}:{}",
            scratch.display(),
            install_dir.join("param").display(),
            install_dir.join("contrib").join("param").display()
        );
        Self {
            work_path: scratch,
            param_path,
        }
    }

    /// Environment variables to set on the child process.
    pub fn vars(&self) -> [(&'static str, String); 2] {
        [
            (
                "ASCDS_WORK_PATH",
                self.work_path.to_string_lossy().to_string(),
            ),
            ("PFILES", self.param_path.clone()),
        ]
    }
}

/// One command-line argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolArg {
    Positional(String),
    Named { name: String, value: String },
}

impl ToolArg {
    /// Renders the argument the way the toolkit's parameter parser expects.
    pub fn render(&self) -> String {
        match self {
            Self::Positional(value) => value.clone(),
            Self::Named { name, value } => format!("{}={}", name, value),
        }
    }
}

/// A single tool invocation for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub unit_id: String,
    pub operation: ToolOperation,
    pub args: Vec<ToolArg>,
    pub env: ToolEnvironment,
}

impl ToolInvocation {
    pub fn new(unit_id: impl Into<String>, operation: ToolOperation, env: ToolEnvironment) -> Self {
        Self {
            unit_id: unit_id.into(),
            operation,
            args: Vec::new(),
            env,
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(ToolArg::Positional(value.into()));
        self
    }

    /// Appends a `name=value` parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(ToolArg::Named {
            name: name.into(),
            value: value.to_string(),
        });
        self
    }

    /// Looks up a named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            ToolArg::Named { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Arguments rendered for the command line.
    pub fn command_args(&self) -> Vec<String> {
        self.args.iter().map(ToolArg::render).collect()
    }
}

/// Output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Captured log text. May be empty.
    pub log: String,
}

impl ToolOutput {
    pub fn new(log: impl Into<String>) -> Self {
        Self { log: log.into() }
    }

    /// The log, or `None` when there is nothing worth writing.
    pub fn log_text(&self) -> Option<&str> {
        let trimmed = self.log.trim_end();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_for_unit() {
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), PathBuf::from("/arc/1843/tmp"));
        assert_eq!(env.work_path, PathBuf::from("/arc/1843/tmp"));
        assert_eq!(
            env.param_path,
            "/arc/1843/tmp;/opt/ciao/param:/opt/ciao/contrib/param"
        );
        let vars = env.vars();
        assert_eq!(vars[0].0, "ASCDS_WORK_PATH");
        assert_eq!(vars[1].0, "PFILES");
    }

    #[test]
    fn test_invocation_builder() {
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), PathBuf::from("/tmp/u"));
        let inv = ToolInvocation::new("1843", ToolOperation::FluxImage, env)
            .param("infile", "evt.fits")
            .param("binsize", 4)
            .param("clobber", "yes");

        assert_eq!(inv.get("binsize"), Some("4"));
        assert_eq!(inv.get("missing"), None);
        assert_eq!(
            inv.command_args(),
            vec!["infile=evt.fits", "binsize=4", "clobber=yes"]
        );
    }

    #[test]
    fn test_positional_args() {
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), PathBuf::from("/tmp/u"));
        let inv = ToolInvocation::new("1843", ToolOperation::Download, env)
            .arg("1843")
            .arg("evt1,asol");
        assert_eq!(inv.command_args(), vec!["1843", "evt1,asol"]);
    }

    #[test]
    fn test_empty_log_is_not_text() {
        assert_eq!(ToolOutput::new("").log_text(), None);
        assert_eq!(ToolOutput::new(" \n\n").log_text(), None);
        assert_eq!(ToolOutput::new("done\n").log_text(), Some("done"));
    }
}
