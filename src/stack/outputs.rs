//! Stack output extraction.

use tracing::{debug, info};

use crate::error::Result;

use super::provider::StackProvider;
use super::types::StackOutput;

/// Reads the declared outputs of a stack.
#[derive(Debug)]
pub struct OutputExtractor<'a, P: StackProvider + ?Sized> {
    /// Stack provider.
    provider: &'a P,
}

impl<'a, P: StackProvider + ?Sized> OutputExtractor<'a, P> {
    /// Creates a new extractor.
    #[must_use]
    pub const fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Fetches the outputs of a stack. An empty list means the stack declares none.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the describe call fails.
    pub async fn extract(&self, stack_name: &str) -> Result<Vec<StackOutput>> {
        let outputs = self.provider.get_outputs(stack_name).await?;
        if outputs.is_empty() {
            info!("No outputs found for stack {stack_name}");
        } else {
            debug!("Fetched {} outputs for stack {stack_name}", outputs.len());
        }
        Ok(outputs)
    }
}
