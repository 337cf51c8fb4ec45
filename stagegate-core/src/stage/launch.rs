use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use stagegate_model::{LaunchPayload, LaunchResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::lifecycle::Cancellable;
use crate::ports::LaunchInvoker;

#[async_trait]
pub trait ClusterLauncher: Cancellable {
    /// Calls the external launcher once. `None` covers cancellation, transport
    /// failures and unreadable responses alike.
    async fn invoke(&self, payload: &LaunchPayload) -> Option<LaunchResult>;
}

/// Single synchronous call to the external cluster launcher.
///
/// No retries happen here; a caller that wants them wraps this component.
pub struct LaunchInvocation {
    invoker: Arc<dyn LaunchInvoker>,
    function_name: String,
    cancel: CancellationToken,
}

impl fmt::Debug for LaunchInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchInvocation")
            .field("function_name", &self.function_name)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl LaunchInvocation {
    pub fn new(
        invoker: Arc<dyn LaunchInvoker>,
        function_name: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            invoker,
            function_name: function_name.into(),
            cancel,
        }
    }

    async fn call(&self, payload: &LaunchPayload) -> Result<LaunchResult> {
        let body = serde_json::to_vec(payload)?;
        let response = self.invoker.invoke(&self.function_name, body).await?;
        Ok(serde_json::from_slice(&response)?)
    }
}

impl Cancellable for LaunchInvocation {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl ClusterLauncher for LaunchInvocation {
    #[instrument(
        level = "info",
        skip(self, payload),
        fields(
            function = %self.function_name,
            correlation_id = %payload.correlation_id()
        )
    )]
    async fn invoke(&self, payload: &LaunchPayload) -> Option<LaunchResult> {
        if self.cancel.is_cancelled() {
            info!(target: "stage::launch", "cancelled before invoking launcher");
            return None;
        }

        match self.call(payload).await {
            Ok(result) => {
                info!(
                    target: "stage::launch",
                    request_id = %result.request_id(),
                    status = result.http_status_code(),
                    retries = result.retry_attempts(),
                    cluster_id = result.cluster_id.as_deref().unwrap_or_default(),
                    "launcher responded"
                );
                Some(result)
            }
            Err(err) => {
                warn!(
                    target: "stage::launch",
                    error = %err,
                    "launcher invocation failed"
                );
                None
            }
        }
    }
}
