//! インスタンス別 .env ファイル

use knotgen_core::{
    ArtifactKind, GenerationConfig, InstancePlan, RenderedArtifact, ServiceRole, env_file_path,
};

/// .env に書き出すキーと値（出力順）
pub fn env_entries(plan: &InstancePlan, config: &GenerationConfig) -> Vec<(&'static str, String)> {
    let upstream = &config.upstream;
    let redis_port = config.base_ports.redis_port_base.to_string();
    let login_enabled = if upstream.login_enabled { "True" } else { "False" };

    vec![
        ("AUGUR_DATABASE", upstream.database.clone()),
        ("AUGUR_HOST", upstream.host.clone()),
        ("AUGUR_PASSWORD", config.secrets.upstream_password.clone()),
        ("AUGUR_PORT", plan.upstream_service_port.to_string()),
        ("AUGUR_SCHEMA", upstream.schema.clone()),
        ("AUGUR_USERNAME", upstream.username.clone()),
        ("AUGUR_LOGIN_ENABLED", login_enabled.to_string()),
        ("REDIS_CACHE_HOST", plan.service_name(ServiceRole::RedisCache)),
        ("REDIS_CACHE_PORT", redis_port.clone()),
        ("REDIS_CACHE_PASSWORD", plan.credentials.cache_password.clone()),
        ("REDIS_USERS_HOST", plan.service_name(ServiceRole::RedisUsers)),
        ("REDIS_USERS_PORT", redis_port),
        ("REDIS_USERS_PASSWORD", plan.credentials.users_password.clone()),
        ("POSTGRES_PASSWORD", plan.credentials.db_password.clone()),
        ("DEFAULT_SEARCHBAR_LABEL", plan.label.to_string()),
    ]
}

/// `envs/instance{i}.env` をレンダリング
pub fn render_env_file(plan: &InstancePlan, config: &GenerationConfig) -> RenderedArtifact {
    let mut content = format!(
        "{}\n# Environment for instance {} ({})\n",
        crate::GENERATED_HEADER,
        plan.id,
        plan.label
    );
    for (key, value) in env_entries(plan, config) {
        content.push_str(key);
        content.push('=');
        content.push_str(&quote_env_value(&value));
        content.push('\n');
    }

    RenderedArtifact::new(ArtifactKind::EnvFile, env_file_path(plan.id), content)
}

/// compose の env_file として安全な形にクォート
///
/// 記号を含まない値はそのまま。それ以外はシングルクォートで囲み
/// （展開されない）、値自体に `'` を含む場合のみダブルクォートで
/// `\` `"` をエスケープし `$` を `$$` にする。
fn quote_env_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/' | '@' | ','));
    if plain {
        return value.to_string();
    }

    if !value.contains('\'') {
        return format!("'{}'", value);
    }

    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "$$");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knotgen_core::{Label, LabelSet, Secrets, plan};

    fn sample(id: u32) -> (InstancePlan, GenerationConfig) {
        let config = GenerationConfig {
            instance_count: 3,
            ..Default::default()
        };
        let labels = LabelSet::new(vec![
            Label::new("x").unwrap(),
            Label::new("y").unwrap(),
            Label::new("z").unwrap(),
        ])
        .unwrap();
        (plan(id, &config, &labels), config)
    }

    #[test]
    fn test_fixed_key_set_in_order() {
        let (plan, config) = sample(2);
        let keys: Vec<_> = env_entries(&plan, &config)
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        assert_eq!(
            keys,
            vec![
                "AUGUR_DATABASE",
                "AUGUR_HOST",
                "AUGUR_PASSWORD",
                "AUGUR_PORT",
                "AUGUR_SCHEMA",
                "AUGUR_USERNAME",
                "AUGUR_LOGIN_ENABLED",
                "REDIS_CACHE_HOST",
                "REDIS_CACHE_PORT",
                "REDIS_CACHE_PASSWORD",
                "REDIS_USERS_HOST",
                "REDIS_USERS_PORT",
                "REDIS_USERS_PASSWORD",
                "POSTGRES_PASSWORD",
                "DEFAULT_SEARCHBAR_LABEL",
            ]
        );
    }

    #[test]
    fn test_env_file_content() {
        let (plan, config) = sample(2);
        let artifact = render_env_file(&plan, &config);

        assert_eq!(artifact.kind, ArtifactKind::EnvFile);
        assert_eq!(artifact.path, std::path::PathBuf::from("envs/instance2.env"));
        assert!(artifact.content.starts_with("# Generated by knotgen"));
        assert!(artifact.content.contains("\nAUGUR_PORT=7002\n"));
        assert!(artifact.content.contains("\nAUGUR_LOGIN_ENABLED=False\n"));
        assert!(artifact.content.contains("\nREDIS_CACHE_HOST=redis-cache-2\n"));
        assert!(artifact.content.contains("\nREDIS_USERS_HOST=redis-users-2\n"));
        assert!(artifact.content.contains("\nREDIS_CACHE_PORT=6379\n"));
        assert!(artifact.content.contains("\nREDIS_CACHE_PASSWORD=pass-cache-2\n"));
        assert!(artifact.content.contains("\nPOSTGRES_PASSWORD=pass-db-2\n"));
        assert!(artifact.content.contains("\nDEFAULT_SEARCHBAR_LABEL=y\n"));
        assert!(artifact.content.ends_with('\n'));
    }

    #[test]
    fn test_upstream_password_from_secrets() {
        let (plan, mut config) = sample(1);
        config.secrets = Secrets {
            upstream_password: "p@ss w$rd".to_string(),
            credential_seed: "pass".to_string(),
        };

        let artifact = render_env_file(&plan, &config);
        assert!(artifact.content.contains("\nAUGUR_PASSWORD='p@ss w$rd'\n"));
    }

    #[test]
    fn test_quote_env_value() {
        assert_eq!(quote_env_value("plain-value_1.2"), "plain-value_1.2");
        assert_eq!(quote_env_value("has space"), "'has space'");
        assert_eq!(quote_env_value("$HOME"), "'$HOME'");
        assert_eq!(quote_env_value("it's $x"), "\"it's $$x\"");
        assert_eq!(quote_env_value("a\"b'c"), "\"a\\\"b'c\"");
    }
}
