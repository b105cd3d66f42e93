//! モデル定義
//!
//! knotgen で使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod artifact;
mod config;
mod graph;
mod label;
mod plan;
mod resource;

// Re-exports
pub use artifact::*;
pub use config::*;
pub use graph::*;
pub use label::*;
pub use plan::*;
pub use resource::*;
