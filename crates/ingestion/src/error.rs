//! Ingestion 错误类型

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 数据集索引无法打开或读取
    #[error("failed to read dataset index {path}: {source}")]
    DatasetIo {
        /// 索引文件路径
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 数据集索引中的某行不是有效记录
    #[error("invalid record at {path}:{line}: {message}")]
    InvalidRecord {
        /// 索引文件路径
        path: PathBuf,
        /// 行号（从 1 开始）
        line: usize,
        /// 解析错误消息
        message: String,
    },
}

impl IngestionError {
    pub fn invalid_record(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
