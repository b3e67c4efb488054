//! Plugin system module
//!
//! This module provides the plugin system implementation including:
//! - Handler descriptor model and exec interface
//! - Registry and route table snapshots
//! - Manifest loader with atomic reload-or-rollback
//! - Hot-reload file watcher
//! - Response envelope helpers
//! - Built-in exec implementations

pub mod builtin;
pub mod loader;
pub mod registry;
pub mod respond;
pub mod types;
pub mod watcher;

pub use loader::PluginLoader;
pub use registry::{LoadedPlugins, RegistryEntry, RouteEntry};
pub use types::{
    ExecTable, FileConstraints, HandlerDescriptor, HttpMethod, ParamType, ParameterSet,
    ParameterSpec, PluginExec, PluginMetadata, PluginRequest, PluginResponse, ResponseSpec,
};
pub use watcher::PluginWatcher;
