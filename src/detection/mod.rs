/// 检测与跟踪 (Detection & Tracking)
///
/// 检测模型与跨帧关联都在外部完成, 这里只定义接口与记录格式
/// - types:       逐帧逐目标的跟踪记录
/// - tracker:     VideoTracker 接口
/// - ultralytics: 基于 `yolo track` 命令行的实现
pub mod tracker;
pub mod types;
pub mod ultralytics;

pub use tracker::{TrackRequest, VideoTracker};
pub use types::{BBox, DetectionRecord, TrackSummary, TrackedRow};
pub use ultralytics::UltralyticsCli;
