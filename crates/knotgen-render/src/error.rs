use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("テンプレート展開エラー: {0}")]
    Template(String),

    #[error("YAML シリアライズエラー: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error(
        "サービス '{service}' にヘルスチェックが無いため healthy 条件を満たせません（依存元: {dependent}）"
    )]
    MissingHealthcheck { service: String, dependent: String },
}

impl From<tera::Error> for RenderError {
    fn from(err: tera::Error) -> Self {
        // Teraのエラーは原因を連結して詳細を残す
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        RenderError::Template(detail)
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
