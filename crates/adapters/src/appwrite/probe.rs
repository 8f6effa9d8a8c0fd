//! Raw connectivity probes against the Appwrite endpoint.

use crate::appwrite::client::{AppwriteClient, AppwriteClientConfig};
use dernek_ports::{BoxFuture, ConnectivityProbePort, ProbeResponse, ProbeTarget};
use dernek_shared::{RequestContext, Result};

/// Connectivity probe issuing single unretried requests.
#[derive(Clone)]
pub struct AppwriteConnectivityProbe {
    keyed: AppwriteClient,
    anonymous: AppwriteClient,
}

impl AppwriteConnectivityProbe {
    /// Creates the probe.
    pub fn new(config: &AppwriteClientConfig) -> Result<Self> {
        Ok(Self {
            keyed: AppwriteClient::new(config)?,
            anonymous: AppwriteClient::anonymous(config)?,
        })
    }

    const fn client_for(&self, target: ProbeTarget) -> &AppwriteClient {
        match target {
            ProbeTarget::Account => &self.anonymous,
            ProbeTarget::Endpoint | ProbeTarget::Databases | ProbeTarget::StorageBuckets => {
                &self.keyed
            },
        }
    }
}

impl ConnectivityProbePort for AppwriteConnectivityProbe {
    fn endpoint(&self) -> &str {
        self.keyed.base_url()
    }

    fn probe(
        &self,
        ctx: &RequestContext,
        target: ProbeTarget,
    ) -> BoxFuture<'_, Result<ProbeResponse>> {
        let ctx = ctx.clone();
        let adapter = self.clone();
        Box::pin(async move {
            let client = adapter.client_for(target);
            let request = client.http().get(client.url(target.path()));
            let (status, body) = client
                .send_raw(&ctx, "appwrite.probe", request)
                .await?;
            Ok(ProbeResponse {
                status,
                body: serde_json::from_slice(&body).ok(),
            })
        })
    }
}
