//! HTTP front end for sigbox containers.

pub mod args;
pub mod logging;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use sigbox_core::ContainerService;
use sigbox_trust::{LocalAuthority, SigningGateway, TrustClient};
use tracing::info;

use crate::args::Args;

/// Build the orchestrator and its signing gateway from the command line.
pub fn build_service(args: &Args) -> anyhow::Result<ContainerService> {
    let store = args.store_config();

    if let Some(name) = &args.local_authority {
        let authority = LocalAuthority::generate(name.clone());
        let key = authority.verifying_key();
        info!(authority = %name, "signing with in-process authority");
        let gateway: Arc<dyn SigningGateway> = Arc::new(authority);
        return Ok(ContainerService::new(store, gateway).with_trusted_key(key));
    }

    let trust = args.trust_config();
    let client = TrustClient::new(trust).context("failed to configure trust service client")?;
    info!(
        url = client.base_url(),
        authenticated = client.is_authenticated(),
        "signing through trust service"
    );
    Ok(ContainerService::new(store, Arc::new(client)))
}
