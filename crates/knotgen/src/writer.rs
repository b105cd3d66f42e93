//! 生成物の書き込み
//!
//! 出力先と同じディレクトリに一時ファイルを作り、書き終えてから rename で
//! 置き換える。失敗時の一時ファイルは NamedTempFile の drop で消える。

use knotgen_core::{OverwritePolicy, RenderedArtifact};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// 1ファイル分の書き込み結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Replaced,
    /// 既存ファイルを残した（Skip ポリシー）
    Skipped,
}

#[derive(Error, Debug)]
#[error("書き込みに失敗しました: {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// `root` 配下に生成物を書き込む
#[tracing::instrument(skip(artifact, root), fields(path = %artifact.path.display()))]
pub fn write_artifact(
    artifact: &RenderedArtifact,
    root: &Path,
    policy: OverwritePolicy,
) -> Result<WriteOutcome, WriteError> {
    let path = root.join(&artifact.path);
    let existed = path.exists();

    if existed && policy == OverwritePolicy::Skip {
        debug!("Destination exists, skipping");
        return Ok(WriteOutcome::Skipped);
    }

    let fail = |source: std::io::Error| WriteError {
        path: path.clone(),
        source,
    };

    let parent = path.parent().unwrap_or(root);
    std::fs::create_dir_all(parent).map_err(fail)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(fail)?;
    tmp.write_all(artifact.content.as_bytes()).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;

    let outcome = commit(tmp, &path, policy, existed).map_err(fail)?;
    debug!(outcome = ?outcome, "Committed file");
    Ok(outcome)
}

/// 書き終えた一時ファイルを出力先へ rename する
///
/// Skip では既存ファイルを置き換えない。存在確認の後に別プロセスが
/// 作ったファイルも残す。
fn commit(
    tmp: NamedTempFile,
    path: &Path,
    policy: OverwritePolicy,
    existed: bool,
) -> std::io::Result<WriteOutcome> {
    match policy {
        OverwritePolicy::Skip => match tmp.persist_noclobber(path) {
            Ok(_) => Ok(WriteOutcome::Created),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::Skipped),
            Err(e) => Err(e.error),
        },
        OverwritePolicy::Force => {
            tmp.persist(path).map_err(|e| e.error)?;
            Ok(if existed {
                WriteOutcome::Replaced
            } else {
                WriteOutcome::Created
            })
        }
    }
}
