use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub imaging: ImagingConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// Batch runner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Number of units processed at once.
    ///
    /// This is a budget for simultaneous archive connections, not a
    /// throughput knob.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Root directory holding one subdirectory per unit.
    #[serde(default = "default_archive_root")]
    pub archive_root: PathBuf,
    /// Where the batch report is written, relative to the archive root
    /// unless absolute.
    #[serde(default = "default_report_file")]
    pub report_file: PathBuf,
    /// Optional JSON-lines event journal.
    #[serde(default)]
    pub journal_file: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            archive_root: default_archive_root(),
            report_file: default_report_file(),
            journal_file: None,
        }
    }
}

fn default_concurrency() -> usize {
    9
}

fn default_archive_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_report_file() -> PathBuf {
    PathBuf::from("batch_report.json")
}

/// External toolkit configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolConfig {
    /// Toolkit installation directory (parameter files live below it).
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Directory containing the toolkit executables. Empty means `$PATH`.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,
    /// Timeout for a single tool invocation in seconds.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
    /// Archive file types requested by the acquisition stage.
    #[serde(default = "default_filetypes")]
    pub download_filetypes: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            bin_dir: None,
            timeout_secs: default_tool_timeout(),
            download_filetypes: default_filetypes(),
        }
    }
}

fn default_install_dir() -> PathBuf {
    std::env::var_os("ASCDS_INSTALL")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/opt/ciao"))
}

fn default_tool_timeout() -> u64 {
    86400 // 1 day
}

fn default_filetypes() -> Vec<String> {
    [
        "evt1", "asol", "bpix", "dtf", "msk", "mtl", "stat", "bias", "flt", "fov", "pbk",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Image synthesis parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagingConfig {
    /// Enclosed counts fraction for the PSF map.
    #[serde(default = "default_psfecf")]
    pub psfecf: f64,
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            psfecf: default_psfecf(),
        }
    }
}

fn default_psfecf() -> f64 {
    0.9
}

/// Source detection parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Edition label baked into output file names.
    #[serde(default = "default_edition")]
    pub edition: String,
    /// Skip detection when this edition's source list already exists.
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
    /// Wavelet scales passed to the detector.
    #[serde(default = "default_scales")]
    pub scales: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            edition: default_edition(),
            skip_existing: default_skip_existing(),
            scales: default_scales(),
        }
    }
}

fn default_edition() -> String {
    "baseline".to_string()
}

fn default_skip_existing() -> bool {
    true
}

fn default_scales() -> String {
    "1.4 2 4 8 12 16 32 48".to_string()
}

/// Aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregateConfig {
    /// Directory scanned for per-pair transform records.
    #[serde(default = "default_xmatch_dir")]
    pub input_dir: PathBuf,
    /// Merged table output path.
    #[serde(default = "default_merged_output")]
    pub output: PathBuf,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            input_dir: default_xmatch_dir(),
            output: default_merged_output(),
        }
    }
}

fn default_xmatch_dir() -> PathBuf {
    PathBuf::from("XMatch")
}

fn default_merged_output() -> PathBuf {
    PathBuf::from("merged_xforms.tsv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.runner.concurrency, 9);
        assert_eq!(config.detection.edition, "baseline");
        assert!(config.detection.skip_existing);
        assert_eq!(config.imaging.psfecf, 0.9);
        assert_eq!(config.aggregate.input_dir, PathBuf::from("XMatch"));
    }

    #[test]
    fn test_deserialize_runner_section() {
        let toml = r#"
[runner]
concurrency = 3
archive_root = "/data/archive"
journal_file = "events.jsonl"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.runner.concurrency, 3);
        assert_eq!(config.runner.archive_root, PathBuf::from("/data/archive"));
        assert_eq!(
            config.runner.journal_file,
            Some(PathBuf::from("events.jsonl"))
        );
        assert_eq!(config.runner.report_file, PathBuf::from("batch_report.json"));
    }

    #[test]
    fn test_deserialize_detection_section() {
        let toml = r#"
[detection]
edition = "rerun2"
skip_existing = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.detection.edition, "rerun2");
        assert!(!config.detection.skip_existing);
        assert_eq!(config.detection.scales, "1.4 2 4 8 12 16 32 48");
    }

    #[test]
    fn test_default_filetypes_have_no_duplicates() {
        let types = default_filetypes();
        let mut sorted = types.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), types.len());
        assert!(types.contains(&"evt1".to_string()));
        assert!(types.contains(&"msk".to_string()));
    }

    #[test]
    fn test_tool_section() {
        let toml = r#"
[tool]
install_dir = "/soft/ciao-4.16"
bin_dir = "/soft/ciao-4.16/bin"
timeout_secs = 600
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.tool.install_dir, PathBuf::from("/soft/ciao-4.16"));
        assert_eq!(
            config.tool.bin_dir,
            Some(PathBuf::from("/soft/ciao-4.16/bin"))
        );
        assert_eq!(config.tool.timeout_secs, 600);
    }
}
