pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "KNOTGEN_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["knotgen.yaml", ".knotgen.yaml"];

/// knotgen.yaml の内容
///
/// 全てのキーは省略可能。CLI フラグと環境変数が常に優先される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub instances: Option<u32>,
    pub labels: Option<PathBuf>,
    pub build_context: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub secrets: Option<PathBuf>,
    pub domain: Option<String>,
    pub jobs: Option<usize>,
    pub force: Option<bool>,
    pub ports: PortSettings,
    pub label_policy: LabelPolicySettings,
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortSettings {
    pub http_base: Option<u16>,
    pub upstream_base: Option<u16>,
    pub redis: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelPolicySettings {
    pub strict: Option<bool>,
    /// 空文字ならラベルファイル必須
    pub default_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSettings {
    pub host: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub username: Option<String>,
    pub login_enabled: Option<bool>,
}

/// 読み込んだ設定と、その読み込み元
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSettings {
    pub path: Option<PathBuf>,
    pub settings: Settings,
}

/// グローバル設定ファイルのパス (~/.config/knotgen/config.yaml)
pub fn global_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("knotgen").join("config.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 KNOTGEN_CONFIG_PATH (直接パス指定、存在しなければエラー)
/// 2. カレントディレクトリ: knotgen.yaml, .knotgen.yaml
/// 3. ~/.config/knotgen/config.yaml (グローバル設定)
///
/// どこにも無ければ `Ok(None)`。
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(SettingsError::NotFound(path));
    }

    // 2. カレントディレクトリで検索
    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. グローバル設定ファイル
    Ok(global_settings_path().filter(|path| path.exists()))
}

/// 指定パスの設定ファイルを読み込む
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // 空ファイルは全てデフォルト
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// 設定ファイルを探して読み込む（見つからなければデフォルト）
pub fn load_settings() -> Result<LoadedSettings> {
    match find_settings_file()? {
        Some(path) => {
            debug!(path = %path.display(), "Loading settings file");
            let settings = load_settings_from(&path)?;
            Ok(LoadedSettings {
                path: Some(path),
                settings,
            })
        }
        None => {
            debug!("No settings file found, using defaults");
            Ok(LoadedSettings::default())
        }
    }
}
