//! I/O family: `number`, `text_input`, `http`, `visualization`.

use std::collections::HashMap;

use async_trait::async_trait;
use security::SsrfPolicy;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::model::NodeDefinition;
use crate::registry::Executor;
use crate::template;

/// `data.value`: a literal number passed through unchanged.
pub struct NumberExecutor;

#[async_trait]
impl Executor for NumberExecutor {
    fn node_kind(&self) -> &str {
        "number"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_f64("value").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        Ok(Value::from(node.field_f64("value")?))
    }
}

/// `data.value`: a string, `{name}`-interpolated against variables/context.
pub struct TextInputExecutor;

#[async_trait]
impl Executor for TextInputExecutor {
    fn node_kind(&self) -> &str {
        "text_input"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_str("value").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let template_str = node.field_str("value")?;
        let context = interpolation_context(ctx, &node.id);
        Ok(Value::String(template::interpolate(template_str, &context)))
    }
}

fn interpolation_context(ctx: &dyn ExecutionContext, node_id: &str) -> HashMap<String, Value> {
    let mut context = ctx.state().context_get_all();
    context.insert("input".to_string(), ctx.get_input(node_id));
    context
}

/// `data.url`, `data.method` (default `GET`), `data.body?`, `data.headers?`
/// (object), `data.client?` (UUID string referencing a preconfigured
/// [`http_client::HttpClient`]). Without `client`, an ephemeral client is
/// built from the active [`config::Config`]'s SSRF policy.
pub struct HttpExecutor;

#[async_trait]
impl Executor for HttpExecutor {
    fn node_kind(&self) -> &str {
        "http"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_str("url").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        ctx.increment_http_call()?;

        let url_template = node.field_str("url")?;
        let context = interpolation_context(ctx, &node.id);
        let url = template::interpolate(url_template, &context);
        let method = node.data.get("method").and_then(Value::as_str).unwrap_or("GET").to_string();
        let body = node.data.get("body").map(|v| match v {
            Value::String(s) => s.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        });

        let cfg = ctx.config();
        let transport = http_client::ReqwestTransport::default();

        let response = if let Some(client_id) = node.data.get("client").and_then(Value::as_str) {
            let uid = client_id
                .parse::<uuid::Uuid>()
                .map_err(|_| NodeError::invalid_payload(format!("node '{}' field 'client' is not a UUID", node.id)))?;
            let client = ctx.http_clients().get(&uid)?;
            client
                .request(&transport, &method, &url, body, cfg.max_http_redirects, cfg.max_response_size)
                .await?
        } else {
            let headers = node
                .data
                .get("headers")
                .and_then(Value::as_object)
                .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string())).collect())
                .unwrap_or_default();
            let ephemeral = http_client::HttpClient::new(http_client::HttpClientConfig {
                policy: ephemeral_policy(cfg),
                headers,
                ..Default::default()
            });
            ephemeral
                .request(&transport, &method, &url, body, cfg.max_http_redirects, cfg.max_response_size)
                .await?
        };

        let body_text = String::from_utf8_lossy(&response.body).to_string();
        let parsed_body: Value = serde_json::from_str(&body_text).unwrap_or(Value::String(body_text));

        Ok(json!({
            "status": response.status,
            "headers": response.headers.into_iter().collect::<HashMap<_, _>>(),
            "body": parsed_body,
            "redirects_followed": response.redirects_followed,
        }))
    }
}

fn ephemeral_policy(cfg: &config::Config) -> SsrfPolicy {
    let mut allowed_schemes = vec!["https".to_string()];
    if cfg.allow_http {
        allowed_schemes.push("http".to_string());
    }
    SsrfPolicy {
        block_private_ips: !cfg.allow_private_ips,
        block_localhost: !cfg.allow_localhost,
        block_link_local: !cfg.allow_link_local,
        block_cloud_metadata: !cfg.allow_cloud_metadata,
        allowed_domains: cfg.allowed_domains.clone(),
        blocked_domains: cfg.blocked_domains.clone(),
        allowed_schemes,
    }
}

/// `data.value`: the presentation payload, passed through untouched. The
/// engine reports this node's value as part of `final_output`.
pub struct VisualizationExecutor;

#[async_trait]
impl Executor for VisualizationExecutor {
    fn node_kind(&self) -> &str {
        "visualization"
    }

    fn validate(&self, _node: &NodeDefinition) -> Result<(), NodeError> {
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        if let Some(value) = node.data.get("value") {
            Ok(value.clone())
        } else {
            Ok(ctx.get_input(&node.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn number_passes_through() {
        let node = NodeDefinition::new("n1", "number", json!({ "value": 42.0 }));
        let ctx = TestContext::new();
        let out = NumberExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out, Value::from(42.0));
        assert_eq!(ctx.node_executions(), 1);
    }

    #[tokio::test]
    async fn text_input_interpolates_context() {
        let node = NodeDefinition::new("n1", "text_input", json!({ "value": "hi {name}" }));
        let ctx = TestContext::new();
        ctx.state().set_variable("name", Value::String("ada".into()));
        let out = TextInputExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out, Value::String("hi ada".into()));
    }

    #[test]
    fn http_validate_requires_url() {
        let node = NodeDefinition::new("n1", "http", json!({}));
        assert!(HttpExecutor.validate(&node).is_err());
    }
}
