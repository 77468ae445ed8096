//! Tool module for invoking the external analysis toolkit.
//!
//! This module provides the `ToolAdapter` trait and a process-spawning
//! implementation that runs the toolkit's command-line programs.
//!
//! # Features
//!
//! - Archive download, reprocessing, image synthesis and source detection
//! - Per-unit namespace (scratch path, parameter-file path) set on the child
//!   process only, never on the calling process
//! - Captured stdout returned as the invocation log
//! - Per-invocation timeout
//!
//! # Example
//!
//! ```ignore
//! use wavpipe_core::tool::{ProcessToolAdapter, ToolAdapter, ToolInvocation, ToolOperation};
//!
//! let adapter = ProcessToolAdapter::new(config.tool.clone(), config.runner.archive_root.clone());
//! adapter.validate().await?;
//!
//! let env = ToolEnvironment::for_unit(&config.tool.install_dir, scratch_dir);
//! let invocation = ToolInvocation::new("1843", ToolOperation::Reprocess, env)
//!     .arg("1843")
//!     .param("outdir", "")
//!     .param("clobber", "yes");
//!
//! let output = adapter.invoke(invocation).await?;
//! println!("{}", output.log);
//! ```

mod error;
mod process;
mod traits;
mod types;

pub use error::ToolError;
pub use process::ProcessToolAdapter;
pub use traits::ToolAdapter;
pub use types::{ToolArg, ToolEnvironment, ToolInvocation, ToolOperation, ToolOutput};
