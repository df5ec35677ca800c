// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! BRUVS 鲨鱼追踪流水线
//!
//! 章节选择 → 抽帧步长 → 外部检测/跟踪器 → 轨迹过滤 → CSV + 检测图片
pub mod chapters; // 章节选择 (双目左相机过滤)
pub mod config; // 运行模式与固定超参数
pub mod detection; // 跟踪记录与外部跟踪器接口
pub mod error; // 错误类型
pub mod input; // 视频探测与抽帧
pub mod output; // 结果汇总与保存
pub mod pipeline; // 追踪流水线
pub mod postprocess; // 轨迹过滤
pub mod stride; // 抽帧步长

pub use crate::chapters::{select_chapters, ChapterId};
pub use crate::config::{ConfigFile, Device, Profile, TrackingConfig};
pub use crate::detection::{DetectionRecord, TrackRequest, UltralyticsCli, VideoTracker};
pub use crate::error::{ConfigError, DataError, Error, PersistenceError, Result};
pub use crate::input::{FfmpegProbe, VideoInfo, VideoProbe};
pub use crate::output::{ResultAggregator, SaveSummary, SharkTrackRow};
pub use crate::pipeline::{
    CancelToken, ChapterFailure, ChapterResult, ResultSet, RunOutcome, RunReport,
    TrackingPipeline,
};
pub use crate::postprocess::filter_tracks;
pub use crate::stride::compute_stride;
