/// 视频容器探测 (帧率 / 分辨率)
/// Video container probing
use std::path::{Path, PathBuf};

use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use log::debug;

use crate::error::DataError;

/// 章节视频的只读属性
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub native_fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// 视频探测接口
///
/// 只负责读出容器信息, 帧率是否可用由调用方判断.
pub trait VideoProbe {
    fn probe(&self, path: &Path) -> Result<VideoInfo, DataError>;
}

/// 基于FFmpeg的探测器: 打开容器, 读取第一个视频流的信息后立即关闭
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegProbe;

impl VideoProbe for FfmpegProbe {
    fn probe(&self, path: &Path) -> Result<VideoInfo, DataError> {
        let unreadable = |reason: String| DataError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let url = path.to_string_lossy().into_owned();
        match find_video_stream_info(url) {
            Ok(Some(StreamInfo::Video {
                fps, width, height, ..
            })) => {
                let info = VideoInfo {
                    path: path.to_path_buf(),
                    native_fps: f64::from(fps),
                    width: u32::try_from(width).unwrap_or_default(),
                    height: u32::try_from(height).unwrap_or_default(),
                };
                debug!(
                    "📹 {}: {:.3}fps {}x{}",
                    path.display(),
                    info.native_fps,
                    info.width,
                    info.height
                );
                Ok(info)
            }
            Ok(_) => Err(unreadable("no video stream".to_string())),
            Err(e) => Err(unreadable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_missing_file_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FfmpegProbe.probe(&dir.path().join("missing.mp4"));
        assert!(matches!(result, Err(DataError::Unreadable { .. })));
    }
}
