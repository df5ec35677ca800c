//! 错误类型 (Error taxonomy)
//!
//! - `ConfigError`:      运行前配置错误, 立即中止
//! - `DataError`:        单个章节的数据错误, 隔离后跳过该章节
//! - `PersistenceError`: 保存阶段错误, 不影响已计算的结果

use std::path::PathBuf;

use thiserror::Error;

/// 配置错误: 模型/跟踪器配置引用缺失或格式错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("model weights not found: {0}")]
    MissingModel(PathBuf),

    #[error("tracker profile not found: {0}")]
    MissingTrackerProfile(String),

    #[error("tracker profile must be a .yaml/.yml file or a built-in name, got: {0}")]
    MalformedTrackerProfile(String),

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 数据错误: 章节视频无法打开、帧率异常或跟踪器调用失败
#[derive(Error, Debug)]
pub enum DataError {
    #[error("cannot open video {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("video reports an unusable frame rate: {fps}")]
    InvalidFrameRate { fps: f64 },

    #[error("target frame rate must be positive")]
    InvalidTargetFps,

    #[error("tracker failed on {path}: {reason}")]
    Tracker { path: PathBuf, reason: String },
}

/// 保存错误: 输出目录或CSV无法写入
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write detection folder {path}: {reason}")]
    DetectionFolder { path: PathBuf, reason: String },
}

/// 运行级错误
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("cannot list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
