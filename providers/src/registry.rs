//! Build the provider registry from configured credentials.

use std::sync::Arc;
use std::time::Duration;

use idv_verification::{ProviderError, ProviderRegistry};
use tracing::{info, warn};

use crate::persona::PersonaClient;
use crate::plaid::PlaidClient;
use crate::settings::{PersonaSettings, PlaidSettings};

/// Register a client for every provider with complete credentials.
///
/// A provider left out here fails fast with `InvalidProviderConfig` when a
/// user is routed to it.
pub fn build_registry(
    plaid: &PlaidSettings,
    persona: &PersonaSettings,
    timeout: Duration,
) -> Result<ProviderRegistry, ProviderError> {
    let mut registry = ProviderRegistry::new();

    if plaid.is_complete() {
        let client = PlaidClient::new(plaid.clone(), timeout)?;
        info!(environment = %plaid.environment, url = client.base_url(), "plaid client configured");
        registry.register(Arc::new(client));
    } else {
        warn!("plaid credentials missing; users routed to plaid cannot verify");
    }

    if persona.is_complete() {
        let client = PersonaClient::new(persona.clone(), timeout)?;
        info!(url = client.base_url(), "persona client configured");
        registry.register(Arc::new(client));
    } else {
        warn!("persona credentials missing; users routed to persona cannot verify");
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idv_types::VerificationProvider;

    #[test]
    fn only_complete_providers_are_registered() {
        let persona = PersonaSettings {
            api_key: "key".into(),
            template_id: "itmpl_1".into(),
            ..Default::default()
        };
        let registry =
            build_registry(&PlaidSettings::default(), &persona, Duration::from_secs(5)).unwrap();
        assert_eq!(registry.configured(), vec![VerificationProvider::Persona]);
    }
}
