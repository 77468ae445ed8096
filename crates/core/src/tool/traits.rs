//! Trait definitions for the tool module.

use async_trait::async_trait;

use super::error::ToolError;
use super::types::{ToolInvocation, ToolOutput};

/// Something that can run toolkit operations.
///
/// Implementations must apply `invocation.env` to the tool run itself and
/// never to shared process state.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Returns the name of this adapter implementation.
    fn name(&self) -> &str;

    /// Runs one operation and returns its log.
    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError>;

    /// Validates that the toolkit is reachable and configured.
    async fn validate(&self) -> Result<(), ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolEnvironment, ToolOperation};
    use std::path::{Path, PathBuf};

    struct EchoAdapter;

    #[async_trait]
    impl ToolAdapter for EchoAdapter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::new(invocation.command_args().join(" ")))
        }

        async fn validate(&self) -> Result<(), ToolError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_adapter_as_trait_object() {
        let adapter: Box<dyn ToolAdapter> = Box::new(EchoAdapter);
        let env = ToolEnvironment::for_unit(Path::new("/opt/ciao"), PathBuf::from("/tmp/u"));
        let inv = ToolInvocation::new("u", ToolOperation::WavDetect, env).param("scales", "1 2");
        let output = adapter.invoke(inv).await.unwrap();
        assert_eq!(output.log, "scales=1 2");
        assert_eq!(adapter.name(), "echo");
    }
}
