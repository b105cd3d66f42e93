//! 生成物レンダラー
//!
//! 検証済みの計画と依存グラフから、各生成物のテキストを作る純粋関数群。
//! ファイルシステムには触れません。

pub mod compose;
pub mod env_file;
pub mod error;
pub mod postgres;
pub mod proxy;

pub use compose::{ComposeFile, ComposeFragment, ComposeService, render_fragment, render_manifest};
pub use env_file::{env_entries, render_env_file};
pub use error::*;
pub use postgres::render_postgres_config;
pub use proxy::render_proxy;

/// 生成物の先頭に付けるコメント
pub const GENERATED_HEADER: &str = "# Generated by knotgen. Do not edit by hand.";
