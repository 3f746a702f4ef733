//! Provider configuration and operation context

use std::sync::Arc;

use metakube_client::{HttpClient, MetakubeApi};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::telemetry::{init_telemetry, TelemetryError};
use crate::{Error, Result};

/// A configured provider: one shared API client
#[derive(Clone)]
pub struct Provider {
    client: Arc<dyn MetakubeApi>,
}

impl Provider {
    /// Resolve the configuration, set up logging and build the HTTP client
    pub fn configure(config: &ProviderConfig) -> Result<Self> {
        let settings = config.resolve()?;

        match init_telemetry(&settings.telemetry) {
            Ok(()) => {}
            // Configured twice in one process; the first subscriber stays.
            Err(TelemetryError::SubscriberInit(e)) => debug!(error = %e, "Logging already set up"),
            Err(e) => return Err(Error::config(e.to_string())),
        }

        let client = HttpClient::with_timeout(&settings.host, settings.token, settings.request_timeout)
            .map_err(|e| Error::config(format!("invalid host {}: {}", settings.host, e)))?;

        info!(host = %settings.host, "Configured MetaKube provider");
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Wrap an existing client
    pub fn with_client(client: Arc<dyn MetakubeApi>) -> Self {
        Self { client }
    }

    /// Context for one operation
    pub fn context(&self) -> Context {
        Context::new(self.client.clone())
    }
}

/// Everything a single resource operation needs
#[derive(Clone)]
pub struct Context {
    client: Arc<dyn MetakubeApi>,
    /// Cancelled when the caller gives up; waits stop promptly
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(client: Arc<dyn MetakubeApi>) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Use the caller's cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn api(&self) -> &dyn MetakubeApi {
        self.client.as_ref()
    }
}
