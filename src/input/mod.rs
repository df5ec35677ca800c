/// 视频输入系统 (Video Input System)
///
/// - probe:      打开章节视频, 读取原始帧率与分辨率后关闭
/// - frame_grab: 按帧序号截取画面 (检测图片目录使用)
pub mod frame_grab;
pub mod probe;

pub use frame_grab::{grab_frames, FrameGrabFilter};
pub use probe::{FfmpegProbe, VideoInfo, VideoProbe};
