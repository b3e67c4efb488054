//! Plugin registry and route table
//!
//! A [`LoadedPlugins`] value is one immutable snapshot of everything the
//! loader produced from a scan: the route table used for dispatch and the
//! registry used for documentation listings. Snapshots are built fresh on
//! every load and swapped in whole; they are never mutated after a load
//! completes.

use crate::plugin::types::{HandlerDescriptor, HttpMethod, PluginExec, PluginMetadata};
use axum::http::Method;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// One routable endpoint: the descriptor plus its exec binding
pub struct RouteEntry {
    pub descriptor: Arc<HandlerDescriptor>,
    pub exec: Arc<dyn PluginExec>,
}

/// Registry entry keyed by a handler's primary endpoint
pub struct RegistryEntry {
    pub descriptor: Arc<HandlerDescriptor>,
    pub metadata: PluginMetadata,
    /// Whether this handler passes the completeness check and appears in
    /// metadata listings
    pub documented: bool,
}

/// Immutable snapshot of routes and registry produced by one load cycle
#[derive(Default)]
pub struct LoadedPlugins {
    routes: HashMap<(HttpMethod, String), Arc<RouteEntry>>,
    registry: BTreeMap<String, RegistryEntry>,
}

impl LoadedPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler: one route per alias, one registry entry under the
    /// primary endpoint.
    ///
    /// Route and registry collisions keep the first registration and drop the
    /// rest with a warning, so any (method, path) pair resolves to at most one
    /// handler.
    pub fn register(&mut self, descriptor: HandlerDescriptor, exec: Arc<dyn PluginExec>) {
        let descriptor = Arc::new(descriptor);
        let entry = Arc::new(RouteEntry {
            descriptor: descriptor.clone(),
            exec,
        });

        for endpoint in descriptor.endpoints() {
            let key = (descriptor.method, endpoint.clone());
            if self.routes.contains_key(&key) {
                warn!(
                    method = %descriptor.method,
                    endpoint = %endpoint,
                    plugin = %descriptor.name,
                    "Route already registered, keeping the first registration"
                );
                continue;
            }
            self.routes.insert(key, entry.clone());
        }

        let Some(primary) = descriptor.primary_endpoint() else {
            return;
        };

        if self.registry.contains_key(&primary) {
            warn!(
                endpoint = %primary,
                plugin = %descriptor.name,
                "Primary endpoint already registered, keeping the first registration"
            );
            return;
        }

        let documented = descriptor.is_documented();
        if let Some(reason) = descriptor.undocumented_reason() {
            warn!(
                endpoint = %primary,
                reason = reason,
                "Plugin will be hidden from docs"
            );
        }

        let metadata = descriptor
            .metadata()
            .expect("primary endpoint exists, metadata must derive");
        self.registry.insert(
            primary,
            RegistryEntry {
                descriptor,
                metadata,
                documented,
            },
        );
    }

    /// Look up the route entry for a request
    pub fn route(&self, method: &Method, endpoint: &str) -> Option<&Arc<RouteEntry>> {
        let method = HttpMethod::from_http(method)?;
        self.routes.get(&(method, endpoint.to_string()))
    }

    /// Ordered metadata of all documented handlers
    pub fn metadata(&self) -> Vec<PluginMetadata> {
        self.registry
            .values()
            .filter(|entry| entry.documented)
            .map(|entry| entry.metadata.clone())
            .collect()
    }

    /// Full registry map, including undocumented handlers
    pub fn registry(&self) -> &BTreeMap<String, RegistryEntry> {
        &self.registry
    }

    /// Number of registered handlers (primary endpoints)
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of routable (method, path) pairs
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
