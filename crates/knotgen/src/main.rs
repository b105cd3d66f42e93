mod commands;
mod options;
mod pipeline;
mod utils;
mod writer;

use clap::{Parser, Subcommand};
use options::{AllocationArgs, GenerateArgs};

#[derive(Parser)]
#[command(name = "knotgen")]
#[command(about = "ラベルごとに独立したスタックを、衝突なく並べる。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// compose / .env / nginx / postgres 設定を生成
    Generate(GenerateArgs),
    /// 割り当て計画と検証結果を表示（何も書き込まない）
    Plan {
        #[command(flatten)]
        allocation: AllocationArgs,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログは stderr へ（デフォルトは warn、RUST_LOG で上書き）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Generate(args) => commands::generate::handle(args).await,
        Commands::Plan { allocation, json } => commands::plan::handle(allocation, json).await,
        Commands::Version => {
            println!("knotgen {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
