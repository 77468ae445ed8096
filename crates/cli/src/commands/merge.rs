//! `wavpipe merge`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use wavpipe_core::aggregate::{merge, DirRecordSource};
use wavpipe_core::Config;

use super::usage;

#[derive(Args)]
pub struct MergeArgs {
    /// Directory of `<left>_<right>.xmatch` records
    pub dir: Option<PathBuf>,

    /// Merged table output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn handle_merge(args: MergeArgs, config: Config) -> Result<()> {
    let dir = args.dir.unwrap_or(config.aggregate.input_dir);
    let output = args.output.unwrap_or(config.aggregate.output);

    if !dir.is_dir() {
        return Err(usage(anyhow::anyhow!(
            "Record directory {:?} does not exist",
            dir
        )));
    }

    let source = DirRecordSource::new(&dir);
    let table = merge(&source).with_context(|| format!("Failed to merge records in {:?}", dir))?;
    table
        .write_tsv(&output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    let missing = table.rows.iter().filter(|r| !r.present).count();
    info!("Merged table written to {:?}", output);
    println!(
        "{} pairs merged ({} without a record) into {}",
        table.len(),
        missing,
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "t1 t2 ra_ref dec_ref roll_ref xpix_ref ypix_ref x_scale y_scale\n";

    #[test]
    fn test_merge_writes_table() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("XMatch");
        std::fs::create_dir(&records).unwrap();
        std::fs::write(
            records.join("A_B.xmatch"),
            format!("{}0.5 -0.25 83.63 22.01 287.5 4096.5 4097.5 1.0 1.0\n", HEADER),
        )
        .unwrap();
        std::fs::write(records.join("C_D.xmatch"), HEADER).unwrap();
        let output = dir.path().join("merged.tsv");

        let args = MergeArgs {
            dir: Some(records),
            output: Some(output.clone()),
        };
        handle_merge(args, Config::default()).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("A\tB\t0.5\t-0.25\t"));
        assert!(lines[2].starts_with("C\tD\t-999.0\t"));
    }

    #[test]
    fn test_missing_dir_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = MergeArgs {
            dir: Some(dir.path().join("nope")),
            output: Some(dir.path().join("merged.tsv")),
        };
        let err = handle_merge(args, Config::default()).unwrap_err();
        assert!(err.downcast_ref::<crate::commands::UsageError>().is_some());
    }
}
