// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Interactive resolution of selectable points.
//!
//! Runs while the user is still filling in the description, so it works on
//! partial input and never fails outward. Internally the outcome keeps
//! "configuration not ready" apart from "server unreachable"; callers that
//! only need a list use [`OptionsOutcome::into_options`].

use connect_core::{AdapterDescription, SelectOption};
use tracing::{debug, warn};

use crate::client::TransportProvider;
use crate::config::{resolve_root, ConnectionTarget};
use crate::connector::SourceConnector;
use crate::error::{ConfigurationError, OpcUaError};

/// Result of one option resolution.
#[derive(Debug)]
pub enum OptionsOutcome {
    /// The description is not complete enough to connect.
    NotReady(ConfigurationError),
    /// Connecting or browsing failed.
    Unreachable(OpcUaError),
    /// One option per discovered point.
    Ready(Vec<SelectOption>),
}

impl OptionsOutcome {
    /// Returns `true` for [`OptionsOutcome::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Collapses the outcome into a list; both failure kinds become empty.
    pub fn into_options(self) -> Vec<SelectOption> {
        match self {
            Self::Ready(options) => options,
            Self::NotReady(_) | Self::Unreachable(_) => Vec::new(),
        }
    }
}

/// Lists the points directly below the configured root.
pub struct OptionResolver<'a> {
    provider: &'a dyn TransportProvider,
}

impl<'a> OptionResolver<'a> {
    /// Creates a resolver opening sessions through `provider`.
    pub fn new(provider: &'a dyn TransportProvider) -> Self {
        Self { provider }
    }

    /// Resolves options against a possibly incomplete description.
    ///
    /// Options are labelled with the derived label and keyed by the native
    /// identifier. Previously selected identifiers stay selected.
    pub async fn resolve(&self, description: &AdapterDescription) -> OptionsOutcome {
        let extractor = description.extractor();
        let (target, root) = match ConnectionTarget::resolve(&extractor)
            .and_then(|target| resolve_root(&extractor).map(|root| (target, root)))
        {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(reason = %e, "Options not resolvable yet");
                return OptionsOutcome::NotReady(e);
            }
        };

        let previously_selected: Vec<String> = extractor
            .selected_options(crate::config::keys::AVAILABLE_NODES)
            .into_iter()
            .map(|o| o.internal_name.clone())
            .collect();

        let mut connector = SourceConnector::new(self.provider.create());
        let browsed = match connector.connect(&target).await {
            Ok(()) => connector.browse(&root, false).await,
            Err(e) => Err(e),
        };
        connector.disconnect().await;

        match browsed {
            Ok(points) => {
                let options = points
                    .into_iter()
                    .map(|p| {
                        let id = p.native_identifier();
                        let option = SelectOption::new(p.label, id.clone());
                        if previously_selected.contains(&id) {
                            option.selected()
                        } else {
                            option
                        }
                    })
                    .collect::<Vec<_>>();
                debug!(root = %root, options = options.len(), "Options resolved");
                OptionsOutcome::Ready(options)
            }
            Err(e) => {
                warn!(
                    endpoint = %target.endpoint_url(),
                    root = %root,
                    error = %e,
                    "Option resolution failed, returning no options"
                );
                OptionsOutcome::Unreachable(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::declare_model;
    use crate::client::{SimulatedProvider, SimulatedServer};
    use crate::config::keys;

    fn partial() -> AdapterDescription {
        let mut desc = declare_model();
        desc.select_alternative(keys::OPC_HOST_OR_URL, keys::OPC_URL);
        desc.set_value(keys::OPC_SERVER_URL, "opc.tcp://sim:4840");
        desc.set_value(keys::NAMESPACE_INDEX, "2");
        desc.set_value(keys::NODE_ID, "Plant.Line1");
        desc
    }

    #[tokio::test]
    async fn test_incomplete_is_not_ready() {
        let provider = SimulatedProvider::new(SimulatedServer::demo());
        let outcome = OptionResolver::new(&provider).resolve(&partial()).await;
        assert!(matches!(outcome, OptionsOutcome::NotReady(ConfigurationError::MissingAlternative { .. })));
        assert!(outcome.into_options().is_empty());
        assert_eq!(provider.server().session_count(), 0);
    }

    #[tokio::test]
    async fn test_ready_lists_direct_children() {
        let provider = SimulatedProvider::new(SimulatedServer::demo());
        let mut desc = partial();
        desc.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);

        let options = OptionResolver::new(&provider).resolve(&desc).await.into_options();
        let pairs: Vec<_> = options
            .iter()
            .map(|o| (o.label.as_str(), o.internal_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Temperature", "Plant.Line1.Temperature"),
                ("Speed", "Plant.Line1.Speed"),
                ("Running", "Plant.Line1.Running"),
                ("Status", "Plant.Line1.Status"),
            ]
        );
        assert_eq!(provider.server().session_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_is_distinguished() {
        let server = SimulatedServer::demo();
        server.set_reachable(false);
        let provider = SimulatedProvider::new(server);
        let mut desc = partial();
        desc.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);

        let outcome = OptionResolver::new(&provider).resolve(&desc).await;
        assert!(matches!(outcome, OptionsOutcome::Unreachable(_)));
        assert!(outcome.into_options().is_empty());
    }

    #[tokio::test]
    async fn test_keeps_previous_selection() {
        let provider = SimulatedProvider::new(SimulatedServer::demo());
        let mut desc = partial();
        desc.select_alternative(keys::ACCESS_MODE, keys::UNAUTHENTICATED);
        desc.set_options(
            keys::AVAILABLE_NODES,
            vec![SelectOption::new("Speed", "Plant.Line1.Speed").selected()],
        );

        let options = OptionResolver::new(&provider).resolve(&desc).await.into_options();
        let selected: Vec<_> = options.iter().filter(|o| o.selected).map(|o| o.label.as_str()).collect();
        assert_eq!(selected, vec!["Speed"]);
    }
}
