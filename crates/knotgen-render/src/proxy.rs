//! リバースプロキシ設定（nginx）
//!
//! Tera テンプレートでインスタンスごとに `server` ブロックを1つ出力します。

use crate::error::Result;
use knotgen_core::{ArtifactKind, InstancePlan, PROXY_FILE, RenderedArtifact};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

const TEMPLATE_NAME: &str = "nginx.conf";

const NGINX_TEMPLATE: &str = r#"{{ header }}
{% for upstream in upstreams %}
# instance {{ upstream.id }} ({{ upstream.label }})
server {
    listen 80;
    server_name {{ upstream.server_name }};

    location / {
        proxy_pass http://127.0.0.1:{{ upstream.port }};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }
}
{% endfor %}"#;

#[derive(Debug, Serialize)]
struct Upstream<'a> {
    id: u32,
    label: &'a str,
    server_name: &'a str,
    port: u16,
}

/// `nginx.conf` をレンダリング（インスタンス ID 順）
pub fn render_proxy(plans: &[InstancePlan]) -> Result<RenderedArtifact> {
    let mut upstreams: Vec<Upstream<'_>> = plans
        .iter()
        .map(|plan| Upstream {
            id: plan.id,
            label: plan.label.as_str(),
            server_name: &plan.server_name,
            port: plan.http_port,
        })
        .collect();
    upstreams.sort_by_key(|u| u.id);

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, NGINX_TEMPLATE)?;

    let mut context = Context::new();
    context.insert("header", crate::GENERATED_HEADER);
    context.insert("upstreams", &upstreams);

    let content = tera.render(TEMPLATE_NAME, &context)?;
    debug!(servers = upstreams.len(), "Rendered proxy config");

    Ok(RenderedArtifact::new(
        ArtifactKind::ProxyConfig,
        PROXY_FILE,
        content,
    ))
}
