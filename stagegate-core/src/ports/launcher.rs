use async_trait::async_trait;

use crate::error::Result;

/// Synchronous invocation of a named remote function.
#[async_trait]
pub trait LaunchInvoker: Send + Sync {
    /// Calls `function_name` with a JSON body and returns the raw response body.
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>>;
}
