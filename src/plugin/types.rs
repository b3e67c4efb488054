//! Plugin type definitions
//!
//! This module defines the handler descriptor model and the execution
//! interface every endpoint implementation must provide. Descriptors are
//! declared in TOML manifest files inside the plugin directory; the `handler`
//! field of a manifest names a statically registered [`PluginExec`]
//! implementation.

use crate::core::error::Result;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// HTTP method a handler is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
}

impl HttpMethod {
    /// Convert to the axum/http method type
    pub fn as_http(&self) -> Method {
        match self {
            HttpMethod::GET => Method::GET,
            HttpMethod::POST => Method::POST,
            HttpMethod::PUT => Method::PUT,
            HttpMethod::DELETE => Method::DELETE,
            HttpMethod::PATCH => Method::PATCH,
        }
    }

    /// Parse from an http method, if it is one of the supported five
    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(HttpMethod::GET),
            Method::POST => Some(HttpMethod::POST),
            Method::PUT => Some(HttpMethod::PUT),
            Method::DELETE => Some(HttpMethod::DELETE),
            Method::PATCH => Some(HttpMethod::PATCH),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::GET => write!(f, "GET"),
            HttpMethod::POST => write!(f, "POST"),
            HttpMethod::PUT => write!(f, "PUT"),
            HttpMethod::DELETE => write!(f, "DELETE"),
            HttpMethod::PATCH => write!(f, "PATCH"),
        }
    }
}

/// Declared type of a request parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
    File,
}

/// Upload constraints for file-typed parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileConstraints {
    /// Maximum size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Accepted MIME types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_types: Option<Vec<String>>,
    /// Accepted file extensions, e.g. [".jpg", ".png"]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_extensions: Option<Vec<String>>,
}

/// Descriptor for a single request parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none", default)]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_constraints: Option<FileConstraints>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub accept_url: Option<bool>,
}

/// Parameters grouped by location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterSet {
    pub query: Vec<ParameterSpec>,
    pub body: Vec<ParameterSpec>,
    pub headers: Vec<ParameterSpec>,
    pub path: Vec<ParameterSpec>,
}

/// Documented response for one HTTP status code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    pub status: u16,
    pub description: String,
    #[serde(default)]
    pub example: Value,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Self-describing declaration of one pluggable endpoint, as read from a
/// manifest file.
///
/// `method` and `handler` are mandatory; a manifest missing either fails to
/// parse and the loader skips the file. An empty `alias` list is caught by the
/// loader for a clearer warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub category: Vec<String>,
    pub method: HttpMethod,
    #[serde(default)]
    pub alias: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: ParameterSet,
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseSpec>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub disabled_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deprecated_reason: Option<String>,
    /// Name of the exec implementation this manifest binds to
    pub handler: String,
}

impl HandlerDescriptor {
    /// Base path derived from the category segments, empty when uncategorized
    pub fn base_path(&self) -> String {
        if self.category.is_empty() {
            String::new()
        } else {
            format!("/{}", self.category.join("/"))
        }
    }

    /// All endpoint paths this handler is routed under, one per alias
    pub fn endpoints(&self) -> Vec<String> {
        let base = self.base_path();
        self.alias
            .iter()
            .map(|alias| format!("{}/{}", base, alias))
            .collect()
    }

    /// The canonical endpoint used for documentation, derived from the first
    /// alias
    pub fn primary_endpoint(&self) -> Option<String> {
        let base = self.base_path();
        self.alias.first().map(|alias| format!("{}/{}", base, alias))
    }

    /// Whether this handler is complete enough to appear in metadata
    /// listings. Incomplete handlers stay routable but are hidden.
    pub fn is_documented(&self) -> bool {
        !self.category.is_empty()
            && !self.name.trim().is_empty()
            && !self.description.trim().is_empty()
    }

    /// Human-readable reason why this handler is hidden from listings
    pub fn undocumented_reason(&self) -> Option<&'static str> {
        if self.category.is_empty() {
            Some("category is missing or empty")
        } else if self.name.trim().is_empty() {
            Some("name is missing or empty")
        } else if self.description.trim().is_empty() {
            Some("description is missing or empty")
        } else {
            None
        }
    }

    /// Browsable metadata derived from this descriptor
    pub fn metadata(&self) -> Option<PluginMetadata> {
        let endpoint = self.primary_endpoint()?;
        Some(PluginMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            category: self.category.clone(),
            method: self.method,
            endpoint,
            aliases: self.alias.clone(),
            tags: self.tags.clone(),
            parameters: self.parameters.clone(),
            responses: self.responses.clone(),
            disabled: self.disabled,
            deprecated: self.deprecated,
            disabled_reason: self.disabled_reason.clone(),
            deprecated_reason: self.deprecated_reason.clone(),
        })
    }
}

/// Browsable metadata for a documented handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
    pub category: Vec<String>,
    pub method: HttpMethod,
    pub endpoint: String,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub parameters: ParameterSet,
    pub responses: BTreeMap<String, ResponseSpec>,
    pub disabled: bool,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_reason: Option<String>,
}

/// Request data handed to an exec implementation
#[derive(Debug, Clone)]
pub struct PluginRequest {
    /// Endpoint path the request was dispatched under (without the /api
    /// prefix)
    pub endpoint: String,
    /// Query string parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HeaderMap,
    /// Parsed JSON body, when one was sent
    pub body: Option<Value>,
}

impl PluginRequest {
    /// Fetch a query parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Response produced by an exec implementation
#[derive(Debug, Clone)]
pub struct PluginResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl PluginResponse {
    /// JSON response with the given status
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Attach a response header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl IntoResponse for PluginResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                axum::http::HeaderName::try_from(name.as_str()),
                axum::http::HeaderValue::try_from(value.as_str()),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

/// Execution interface bound to a manifest via its `handler` field
#[async_trait::async_trait]
pub trait PluginExec: Send + Sync {
    /// Handle one request. Returning `Err` is converted by the dispatcher
    /// into a structured 500 naming the plugin.
    async fn exec(&self, req: PluginRequest) -> Result<PluginResponse>;
}

/// Startup-time table mapping handler names to exec implementations
pub type ExecTable = HashMap<String, Arc<dyn PluginExec>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(manifest: &str) -> std::result::Result<HandlerDescriptor, toml::de::Error> {
        toml::from_str(manifest)
    }

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = parse(
            r#"
name = "TikTok Downloader"
description = "Download videos from TikTok URLs"
method = "GET"
category = ["downloader"]
alias = ["tiktok", "tt"]
handler = "tiktok_downloader"
"#,
        )
        .unwrap();

        assert_eq!(descriptor.version, "1.0.0");
        assert!(descriptor.tags.is_empty());
        assert!(!descriptor.disabled);
        assert!(!descriptor.deprecated);
        assert!(descriptor.parameters.query.is_empty());
    }

    #[test]
    fn test_descriptor_requires_method_and_handler() {
        assert!(parse(r#"name = "x""#).is_err());
        assert!(parse(
            r#"
name = "x"
method = "GET"
"#
        )
        .is_err());
        assert!(parse(
            r#"
name = "x"
handler = "x"
"#
        )
        .is_err());
    }

    #[test]
    fn test_endpoint_derivation() {
        let descriptor = parse(
            r#"
name = "TikTok Downloader"
description = "d"
method = "GET"
category = ["downloader"]
alias = ["tiktok", "tt"]
handler = "tiktok_downloader"
"#,
        )
        .unwrap();

        assert_eq!(descriptor.base_path(), "/downloader");
        assert_eq!(
            descriptor.endpoints(),
            vec!["/downloader/tiktok", "/downloader/tt"]
        );
        assert_eq!(
            descriptor.primary_endpoint().unwrap(),
            "/downloader/tiktok"
        );
    }

    #[test]
    fn test_uncategorized_endpoint() {
        let descriptor = parse(
            r#"
name = "Greet user"
method = "GET"
alias = ["data"]
handler = "greet"
"#,
        )
        .unwrap();

        assert_eq!(descriptor.base_path(), "");
        assert_eq!(descriptor.primary_endpoint().unwrap(), "/data");
    }

    #[test]
    fn test_documented_rules() {
        let mut descriptor = parse(
            r#"
name = "TikTok Downloader"
description = "Download videos"
method = "GET"
category = ["downloader"]
alias = ["tiktok"]
handler = "tiktok_downloader"
"#,
        )
        .unwrap();
        assert!(descriptor.is_documented());

        descriptor.category.clear();
        assert!(!descriptor.is_documented());
        assert_eq!(
            descriptor.undocumented_reason(),
            Some("category is missing or empty")
        );

        descriptor.category = vec!["downloader".into()];
        descriptor.description = "  ".into();
        assert!(!descriptor.is_documented());
    }

    #[test]
    fn test_parameter_spec_parse() {
        let descriptor = parse(
            r#"
name = "TikTok Downloader"
description = "d"
method = "GET"
category = ["downloader"]
alias = ["tiktok"]
handler = "tiktok_downloader"

[[parameters.query]]
name = "url"
type = "string"
required = true
description = "TikTok video URL to download"
pattern = "^https?://"
"#,
        )
        .unwrap();

        let param = &descriptor.parameters.query[0];
        assert_eq!(param.name, "url");
        assert_eq!(param.param_type, ParamType::String);
        assert!(param.required);
        assert_eq!(param.pattern.as_deref(), Some("^https?://"));
    }

    #[test]
    fn test_metadata_round_trip() {
        let descriptor = parse(
            r#"
name = "TikTok Downloader"
description = "Download videos"
method = "GET"
category = ["downloader"]
alias = ["tiktok", "tt"]
tags = ["social-media"]
handler = "tiktok_downloader"
"#,
        )
        .unwrap();

        let metadata = descriptor.metadata().unwrap();
        assert_eq!(metadata.endpoint, "/downloader/tiktok");
        assert_eq!(metadata.aliases, vec!["tiktok", "tt"]);

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["endpoint"], "/downloader/tiktok");
        // Hidden reason fields are omitted when unset
        assert!(json.get("disabledReason").is_none());
    }
}
