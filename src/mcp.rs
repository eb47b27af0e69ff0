//! MCP tool-invocation front end.
//!
//! Exposes the gateway to MCP clients (Cursor, Claude, agent orchestrators)
//! as one read-only tool per registered domain plus one manifest tool.
//! Every tool takes an optional `role` argument and no required ones.
//!
//! Tool calls are translated into a [`DomainRequest`] and answered by the
//! same [`Gateway::read_domain`] the REST server uses. The first text
//! content of a successful call is the JSON item array, identical to the
//! `GET /{domain}` body. Skipped files, if any, follow as a second text
//! content.
//!
//! Every knowledge item is also published as an MCP resource at
//! `knowledge://<domain>/<file>`, and the manifest at `knowledge://manifest`.
//! Listing shows what the default role may read; a read may name another
//! role with a `?role=` suffix. Reads go through the same access guard.
//!
//! Two transports are supported: streamable HTTP, nested into the axum
//! router by [`crate::server`], and stdio via [`run_stdio`].

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use tracing::info;

use knowledge_gateway_core::LoadDiagnostic;

use crate::config::Config;
use crate::gateway::{DomainRequest, Gateway, GatewayError};

/// Result of a tool call before it is wrapped in an MCP `CallToolResult`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReply {
    /// The requested payload, plus any files skipped while loading it.
    Payload {
        body: Value,
        diagnostics: Vec<LoadDiagnostic>,
    },
    /// The gateway refused the read; carries the shared error body.
    Refused(Value),
}

impl From<ToolReply> for CallToolResult {
    fn from(reply: ToolReply) -> Self {
        match reply {
            ToolReply::Payload { body, diagnostics } => {
                let mut content = vec![Content::text(pretty(&body))];
                if !diagnostics.is_empty() {
                    content.push(Content::text(pretty(
                        &json!({ "diagnostics": diagnostics }),
                    )));
                }
                CallToolResult::success(content)
            }
            ToolReply::Refused(body) => CallToolResult::error(vec![Content::text(pretty(&body))]),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Bridges the [`Gateway`] to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone; all clones share one gateway.
#[derive(Clone)]
pub struct McpBridge {
    gateway: Gateway,
    manifest_tool: String,
    server_name: String,
}

impl McpBridge {
    pub fn new(gateway: Gateway, config: &Config) -> Self {
        let server_name = config
            .mcp
            .server_name
            .clone()
            .unwrap_or_else(|| gateway.manifest().name.clone());
        Self {
            manifest_tool: config.mcp.manifest_tool.clone(),
            server_name,
            gateway,
        }
    }

    fn input_schema(&self) -> Arc<JsonObject> {
        let schema = json!({
            "type": "object",
            "properties": {
                "role": {
                    "type": "string",
                    "description": format!(
                        "Caller role checked against the manifest (default: {})",
                        self.gateway.default_role()
                    )
                }
            }
        });
        match schema {
            Value::Object(map) => Arc::new(map),
            _ => Arc::new(JsonObject::new()),
        }
    }

    fn tool(&self, name: &str, description: &str) -> Tool {
        Tool {
            name: Cow::Owned(name.to_string()),
            title: None,
            description: Some(Cow::Owned(description.to_string())),
            input_schema: self.input_schema(),
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    /// All tools in listing order: the manifest tool, then one per domain in
    /// registration order.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools = vec![self.tool(
            &self.manifest_tool,
            "Returns the service manifest: identity, capabilities, and access rules.",
        )];
        for d in self.gateway.registry().domains() {
            tools.push(self.tool(&d.tool, &d.description));
        }
        tools
    }

    /// Answers a tool call.
    ///
    /// Unknown tools are a protocol error (`METHOD_NOT_FOUND`); denied reads
    /// are a successful call carrying an error result.
    pub async fn reply(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<ToolReply, McpError> {
        let role = match arguments.as_ref().and_then(|args| args.get("role")) {
            None | Some(Value::Null) => None,
            Some(Value::String(role)) => Some(role.as_str()),
            Some(other) => {
                return Err(McpError::invalid_params(
                    format!("argument 'role' must be a string, got {}", other),
                    None,
                ))
            }
        };

        if name == self.manifest_tool {
            let body = serde_json::to_value(self.gateway.manifest())
                .map_err(|e| McpError::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None))?;
            return Ok(ToolReply::Payload {
                body,
                diagnostics: Vec::new(),
            });
        }

        let domain = self
            .gateway
            .registry()
            .resolve_tool(name)
            .map_err(|e| McpError::new(ErrorCode::METHOD_NOT_FOUND, e.to_string(), None))?;

        let request: DomainRequest = self.gateway.request(&domain.name, role);
        match self.gateway.read_domain(&request).await {
            Ok(load) => {
                let body = serde_json::to_value(&load.items)
                    .map_err(|e| McpError::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None))?;
                Ok(ToolReply::Payload {
                    body,
                    diagnostics: load.diagnostics,
                })
            }
            Err(e @ GatewayError::Registry(_)) => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                e.to_string(),
                None,
            )),
            Err(e @ GatewayError::Forbidden(_)) => serde_json::to_value(e.body())
                .map(ToolReply::Refused)
                .map_err(|e| McpError::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None)),
        }
    }
}

// ============ Resources ============

/// URI scheme of knowledge resources: `knowledge://<domain>/<file>`.
pub const RESOURCE_SCHEME: &str = "knowledge";

/// URI of the manifest resource.
pub const MANIFEST_RESOURCE_URI: &str = "knowledge://manifest";

/// URI of one knowledge item.
pub fn resource_uri(domain: &str, file: &str) -> String {
    format!("{}://{}/{}", RESOURCE_SCHEME, domain, file)
}

fn mime_type(file: &str) -> &'static str {
    if file.ends_with(".md") || file.ends_with(".markdown") {
        "text/markdown"
    } else {
        "text/plain"
    }
}

/// A parsed resource URI. A `?role=` suffix names the caller role.
#[derive(Debug, PartialEq, Eq)]
struct ResourceRef<'a> {
    domain: &'a str,
    file: Option<&'a str>,
    role: Option<&'a str>,
}

fn parse_resource_uri(uri: &str) -> Option<ResourceRef<'_>> {
    let rest = uri.strip_prefix(RESOURCE_SCHEME)?.strip_prefix("://")?;
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    let role = query.and_then(|q| {
        q.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "role")
            .map(|(_, value)| value)
    });
    let (domain, file) = match path.split_once('/') {
        Some((domain, file)) if !file.is_empty() => (domain, Some(file)),
        Some((domain, _)) => (domain, None),
        None => (path, None),
    };
    if domain.is_empty() {
        return None;
    }
    Some(ResourceRef { domain, file, role })
}

impl McpBridge {
    /// Resources readable by `role`: the manifest, then one resource per item
    /// of every domain the role may read, in registration and file order.
    pub async fn resources(&self, role: Option<&str>) -> Result<Vec<Resource>, McpError> {
        let mut resources = vec![RawResource {
            uri: MANIFEST_RESOURCE_URI.to_string(),
            name: "manifest".to_string(),
            title: Some(self.gateway.manifest().name.clone()),
            description: Some("Service manifest: identity, capabilities, and access rules.".to_string()),
            mime_type: Some("application/json".to_string()),
            size: None,
            icons: None,
            meta: None,
        }
        .no_annotation()];

        for domain in self.gateway.registry().domains() {
            let request = self.gateway.request(&domain.name, role);
            let allowed = self
                .gateway
                .check(&request)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?
                .allowed;
            if !allowed {
                continue;
            }
            let load = self
                .gateway
                .read_domain(&request)
                .await
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            for item in load.items {
                resources.push(
                    RawResource {
                        uri: resource_uri(&domain.name, &item.file),
                        name: format!("{}/{}", domain.name, item.file),
                        title: None,
                        description: Some(domain.description.clone()),
                        mime_type: Some(mime_type(&item.file).to_string()),
                        size: u32::try_from(item.content.len()).ok(),
                        icons: None,
                        meta: None,
                    }
                    .no_annotation(),
                );
            }
        }

        Ok(resources)
    }

    /// Reads one resource through the access guard.
    ///
    /// Unknown domains and files are `RESOURCE_NOT_FOUND`; a denied read is
    /// `INVALID_REQUEST` carrying the shared error body as data.
    pub async fn read_resource_uri(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let target = parse_resource_uri(uri).ok_or_else(|| {
            McpError::invalid_params(format!("not a knowledge resource URI: {}", uri), None)
        })?;

        let Some(file) = target.file else {
            if target.domain == "manifest" {
                let text = serde_json::to_string_pretty(self.gateway.manifest())
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                return Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: uri.to_string(),
                        mime_type: Some("application/json".to_string()),
                        text,
                        meta: None,
                    }],
                });
            }
            return Err(McpError::resource_not_found(
                format!("resource not found: {}", uri),
                None,
            ));
        };

        let request = self.gateway.request(target.domain, target.role);
        let load = match self.gateway.read_domain(&request).await {
            Ok(load) => load,
            Err(e @ GatewayError::Registry(_)) => {
                return Err(McpError::resource_not_found(e.to_string(), None))
            }
            Err(e @ GatewayError::Forbidden(_)) => {
                let data = serde_json::to_value(e.body())
                    .map_err(|err| McpError::internal_error(err.to_string(), None))?;
                return Err(McpError::invalid_request(e.to_string(), Some(data)));
            }
        };

        let item = load
            .items
            .into_iter()
            .find(|item| item.file == file)
            .ok_or_else(|| {
                McpError::resource_not_found(format!("resource not found: {}", uri), None)
            })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: uri.to_string(),
                mime_type: Some(mime_type(&item.file).to_string()),
                text: item.content,
                meta: None,
            }],
        })
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        let manifest = self.gateway.manifest();
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: self.server_name.clone(),
                title: None,
                version: manifest.version.clone(),
                description: if manifest.description.is_empty() {
                    None
                } else {
                    Some(manifest.description.clone())
                },
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Read-only knowledge gateway. Call {} for the manifest; each other tool \
                 returns one knowledge domain as a JSON array of {{file, topic, content}}. \
                 Documents are also resources at knowledge://<domain>/<file>.",
                self.manifest_tool
            )),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.tools())))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools().into_iter().find(|t| t.name == name)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(self.resources(None).await?))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_resource_uri(&request.uri).await
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.reply(&request.name, request.arguments)
            .await
            .map(CallToolResult::from)
    }
}

/// Serves the MCP bridge over stdin/stdout until the client disconnects.
pub async fn run_stdio(gateway: Gateway, config: &Config) -> anyhow::Result<()> {
    let bridge = McpBridge::new(gateway, config);
    info!(server = %bridge.server_name, "MCP server on stdio");
    let service = bridge.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn bridge() -> (TempDir, McpBridge) {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::minimal(tmp.path());
        fs::write(
            &cfg.gateway.manifest,
            r#"{ "name": "logic64-decision-system", "version": "1.0.0",
                 "capabilities": { "decision-model": true, "prohibitions": true },
                 "access": { "decision-model": ["agent"], "prohibitions": ["auditor"] } }"#,
        )
        .unwrap();
        let dir = cfg.gateway.store_root.join("decision-model");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("lifecycle.md"), "# Lifecycle").unwrap();
        let dir = cfg.gateway.store_root.join("prohibitions");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("no-eval.md"), "Never call eval.").unwrap();

        let gw = Gateway::bootstrap(&cfg).unwrap();
        (tmp, McpBridge::new(gw, &cfg))
    }

    fn args(role: &str) -> Option<JsonObject> {
        match json!({ "role": role }) {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_tools_listed_per_domain() {
        let (_tmp, bridge) = bridge();
        let names: Vec<String> = bridge.tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names[0], "get_manifest");
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"get_decision_model".to_string()));
        assert!(names.contains(&"read_coding_standards".to_string()));
        assert!(bridge.get_tool("get_prohibitions").is_some());
        assert!(bridge.get_tool("nope").is_none());
    }

    #[tokio::test]
    async fn test_manifest_tool() {
        let (_tmp, bridge) = bridge();
        match bridge.reply("get_manifest", None).await.unwrap() {
            ToolReply::Payload { body, .. } => {
                assert_eq!(body["name"], "logic64-decision-system");
                assert_eq!(body["access"]["prohibitions"][0], "auditor");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_default_role_reads_domain() {
        let (_tmp, bridge) = bridge();
        match bridge.reply("get_decision_model", None).await.unwrap() {
            ToolReply::Payload { body, diagnostics } => {
                assert_eq!(body[0]["file"], "lifecycle.md");
                assert_eq!(body[0]["topic"], "decision-model");
                assert_eq!(body[0]["content"], "# Lifecycle");
                assert!(diagnostics.is_empty());
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_denied_role_refused() {
        let (_tmp, bridge) = bridge();
        match bridge.reply("get_prohibitions", args("agent")).await.unwrap() {
            ToolReply::Refused(body) => assert_eq!(body["error"]["code"], "forbidden"),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert!(matches!(
            bridge.reply("get_prohibitions", args("auditor")).await.unwrap(),
            ToolReply::Payload { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let (_tmp, bridge) = bridge();
        let err = bridge.reply("read_astrology", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_string_role_rejected() {
        let (_tmp, bridge) = bridge();
        let arguments = match json!({ "role": 5 }) {
            Value::Object(map) => Some(map),
            _ => None,
        };
        let err = bridge
            .reply("get_decision_model", arguments)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_parse_resource_uri() {
        assert_eq!(
            parse_resource_uri("knowledge://rules/01-no-orm.md?role=reviewer"),
            Some(ResourceRef {
                domain: "rules",
                file: Some("01-no-orm.md"),
                role: Some("reviewer"),
            })
        );
        assert_eq!(
            parse_resource_uri("knowledge://manifest"),
            Some(ResourceRef {
                domain: "manifest",
                file: None,
                role: None,
            })
        );
        assert_eq!(parse_resource_uri("file:///etc/passwd"), None);
        assert_eq!(parse_resource_uri("knowledge://"), None);
    }

    #[tokio::test]
    async fn test_resources_follow_access_rules() {
        let (_tmp, bridge) = bridge();

        let uris: Vec<String> = bridge
            .resources(None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.raw.uri.clone())
            .collect();
        assert_eq!(
            uris,
            vec![
                "knowledge://manifest".to_string(),
                "knowledge://decision-model/lifecycle.md".to_string(),
            ]
        );

        let uris: Vec<String> = bridge
            .resources(Some("auditor"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.raw.uri.clone())
            .collect();
        assert_eq!(
            uris,
            vec![
                "knowledge://manifest".to_string(),
                "knowledge://prohibitions/no-eval.md".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_resource_allowed() {
        let (_tmp, bridge) = bridge();
        let result = bridge
            .read_resource_uri("knowledge://decision-model/lifecycle.md")
            .await
            .unwrap();
        assert_eq!(
            result.contents,
            vec![ResourceContents::TextResourceContents {
                uri: "knowledge://decision-model/lifecycle.md".to_string(),
                mime_type: Some("text/markdown".to_string()),
                text: "# Lifecycle".to_string(),
                meta: None,
            }]
        );

        let result = bridge
            .read_resource_uri("knowledge://prohibitions/no-eval.md?role=auditor")
            .await
            .unwrap();
        assert_eq!(result.contents.len(), 1);
    }

    #[tokio::test]
    async fn test_read_resource_denied() {
        let (_tmp, bridge) = bridge();
        let err = bridge
            .read_resource_uri("knowledge://prohibitions/no-eval.md")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        let data = err.data.unwrap();
        assert_eq!(data["error"]["code"], "forbidden");

        let err = bridge
            .read_resource_uri("knowledge://decision-model/lifecycle.md?role=guest")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_read_resource_not_found() {
        let (_tmp, bridge) = bridge();
        for uri in [
            "knowledge://astrology/stars.md",
            "knowledge://decision-model/missing.md",
            "knowledge://decision-model",
        ] {
            let err = bridge.read_resource_uri(uri).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_read_manifest_resource() {
        let (_tmp, bridge) = bridge();
        let result = bridge.read_resource_uri(MANIFEST_RESOURCE_URI).await.unwrap();
        match &result.contents[0] {
            ResourceContents::TextResourceContents { text, .. } => {
                let manifest: Value = serde_json::from_str(text).unwrap();
                assert_eq!(manifest["name"], "logic64-decision-system");
            }
            other => panic!("unexpected contents: {:?}", other),
        }
    }
}
