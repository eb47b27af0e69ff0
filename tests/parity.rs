//! Parity tests for the two protocol front ends.
//!
//! A real REST server is bound to a free port and queried with reqwest; the
//! MCP bridge is driven in-process. For every domain and caller role both
//! must return the same items in the same order, or refuse the same way.

use knowledge_gateway::config::Config;
use knowledge_gateway::mcp::{McpBridge, ToolReply};
use knowledge_gateway::server::{router, PARTIAL_FAILURES_HEADER, PARTIAL_FAILURE_FILES_HEADER};
use knowledge_gateway::Gateway;
use rmcp::model::{ErrorCode, JsonObject};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

const MANIFEST: &str = r#"{
    "name": "logic64-mcp-core",
    "version": "1.0.0",
    "description": "Architecture, rules, and standards",
    "type": "knowledge-server",
    "readOnly": true,
    "capabilities": {
        "architecture": true,
        "rules": true,
        "standards": false,
        "decision-model": true,
        "prohibitions": true
    },
    "access": {
        "architecture": ["agent"],
        "rules": ["agent", "reviewer"],
        "standards": ["agent"],
        "decision-model": ["agent"]
    }
}"#;

const ROLES: &[&str] = &["agent", "reviewer", "guest", ""];

fn setup() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let cfg = Config::minimal(tmp.path());
    fs::write(&cfg.gateway.manifest, MANIFEST).unwrap();

    let store = &cfg.gateway.store_root;
    let arch = store.join("architecture");
    fs::create_dir_all(&arch).unwrap();
    fs::write(arch.join("overview.md"), "# Overview\n\nThree layers.").unwrap();
    fs::write(arch.join("layers.md"), "# Layers\n\nUI, API, data.").unwrap();
    fs::write(arch.join("diagram.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

    let rules = store.join("rules");
    fs::create_dir_all(&rules).unwrap();
    fs::write(rules.join("01-no-orm.md"), "No ORMs.").unwrap();
    fs::write(rules.join("02-broken.md"), [0xff, 0xfe, 0xfd]).unwrap();
    fs::write(rules.join("03-rls.md"), "Row level security everywhere.").unwrap();

    let standards = store.join("coding-standards");
    fs::create_dir_all(&standards).unwrap();
    fs::write(standards.join("style.md"), "Use rustfmt.").unwrap();

    fs::create_dir_all(store.join("decision-model")).unwrap();

    (tmp, cfg)
}

async fn spawn_server(gateway: Gateway, cfg: &Config) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(gateway, cfg);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

fn role_args(role: &str) -> Option<JsonObject> {
    match json!({ "role": role }) {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[tokio::test]
async fn test_rest_and_mcp_agree_for_every_domain_and_role() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let bridge = McpBridge::new(gateway.clone(), &cfg);
    let base = spawn_server(gateway.clone(), &cfg).await;
    let client = reqwest::Client::new();

    for domain in gateway.registry().domains() {
        for role in ROLES {
            let resp = client
                .get(format!("{}/{}", base, domain.name))
                .query(&[("role", role)])
                .send()
                .await
                .unwrap();
            let status = resp.status().as_u16();
            let rest_body: Value = resp.json().await.unwrap();

            let reply = bridge.reply(&domain.tool, role_args(role)).await.unwrap();

            match (status, reply) {
                (200, ToolReply::Payload { body, .. }) => {
                    assert_eq!(rest_body, body, "items differ for {} as '{}'", domain.name, role);
                }
                (403, ToolReply::Refused(body)) => {
                    assert_eq!(rest_body, body, "denials differ for {} as '{}'", domain.name, role);
                    assert_eq!(body["error"]["code"], "forbidden");
                }
                (status, reply) => panic!(
                    "front ends disagree for {} as '{}': REST {} vs MCP {:?}",
                    domain.name, role, status, reply
                ),
            }
        }
    }
}

#[tokio::test]
async fn test_end_to_end_architecture_scenario() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let bridge = McpBridge::new(gateway.clone(), &cfg);
    let base = spawn_server(gateway, &cfg).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/architecture", base))
        .header("x-caller-role", "agent")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let items: Value = resp.json().await.unwrap();
    assert_eq!(
        items,
        json!([
            { "file": "layers.md", "topic": "architecture", "content": "# Layers\n\nUI, API, data." },
            { "file": "overview.md", "topic": "architecture", "content": "# Overview\n\nThree layers." }
        ])
    );

    match bridge.reply("read_architecture", role_args("agent")).await.unwrap() {
        ToolReply::Payload { body, .. } => assert_eq!(body, items),
        other => panic!("expected payload, got {:?}", other),
    }

    let resp = client
        .get(format!("{}/architecture", base))
        .header("x-caller-role", "guest")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(matches!(
        bridge.reply("read_architecture", role_args("guest")).await.unwrap(),
        ToolReply::Refused(_)
    ));
}

#[tokio::test]
async fn test_query_role_overrides_header() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let base = spawn_server(gateway, &cfg).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/architecture?role=guest", base))
        .header("x-caller-role", "agent")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_blank_query_role_falls_back_to_header() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let base = spawn_server(gateway, &cfg).await;
    let client = reqwest::Client::new();

    for url in [
        format!("{}/architecture", base),
        format!("{}/architecture?role=", base),
        format!("{}/architecture?role=%20", base),
    ] {
        let resp = client
            .get(&url)
            .header("x-caller-role", "guest")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403, "{}", url);
    }
}

#[tokio::test]
async fn test_partial_failure_reported_on_both_front_ends() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let bridge = McpBridge::new(gateway.clone(), &cfg);
    let base = spawn_server(gateway, &cfg).await;

    let resp = reqwest::get(format!("{}/rules", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get(PARTIAL_FAILURES_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("1")
    );
    assert_eq!(
        resp.headers()
            .get(PARTIAL_FAILURE_FILES_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("02-broken.md")
    );
    let items: Value = resp.json().await.unwrap();
    let files: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["file"].as_str().unwrap())
        .collect();
    assert_eq!(files, vec!["01-no-orm.md", "03-rls.md"]);

    match bridge.reply("read_governance_rules", None).await.unwrap() {
        ToolReply::Payload { body, diagnostics } => {
            assert_eq!(body, items);
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].file, "02-broken.md");
        }
        other => panic!("expected payload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_and_missing_domains_return_empty_list() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let base = spawn_server(gateway, &cfg).await;

    // decision-model exists but is empty; prohibitions has no directory and
    // no access rule, so it is denied rather than served.
    let resp = reqwest::get(format!("{}/decision-model", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!([]));

    let resp = reqwest::get(format!("{}/prohibitions", base)).await.unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_unknown_domain_is_not_found_on_both_front_ends() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let bridge = McpBridge::new(gateway.clone(), &cfg);
    let base = spawn_server(gateway, &cfg).await;

    let resp = reqwest::get(format!("{}/astrology", base)).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let err = bridge.reply("read_astrology", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_manifest_and_health() {
    let (_tmp, cfg) = setup();
    let gateway = Gateway::bootstrap(&cfg).unwrap();
    let bridge = McpBridge::new(gateway.clone(), &cfg);
    let base = spawn_server(gateway, &cfg).await;

    let health: Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        health,
        json!({
            "status": "running",
            "service": "logic64-mcp-core",
            "version": "1.0.0",
            "type": "knowledge-server"
        })
    );

    let manifest: Value = reqwest::get(format!("{}/manifest", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(manifest["capabilities"]["standards"], false);
    assert_eq!(manifest["access"]["rules"], json!(["agent", "reviewer"]));

    match bridge.reply("get_manifest", None).await.unwrap() {
        ToolReply::Payload { body, .. } => assert_eq!(body, manifest),
        other => panic!("expected payload, got {:?}", other),
    }
}
