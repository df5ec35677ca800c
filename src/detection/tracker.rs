//! 视频跟踪器统一接口
//! Common interface for the external detector/tracker

use std::path::Path;

use super::types::DetectionRecord;
use crate::config::{Device, TrackingConfig};
use crate::error::DataError;

/// 单个章节的跟踪请求
#[derive(Clone, Debug)]
pub struct TrackRequest<'a> {
    pub video: &'a Path,
    pub conf: f32,
    pub iou: f32,
    pub imgsz: u32,
    pub tracker_profile: &'a str,
    /// 抽帧步长, 永远 >= 1
    pub stride: u32,
    pub device: Device,
    pub verbose: bool,
    /// 原始帧尺寸 (宽, 高), 用于还原像素坐标
    pub frame_size: (u32, u32),
}

impl<'a> TrackRequest<'a> {
    pub fn new(
        config: &'a TrackingConfig,
        video: &'a Path,
        stride: u32,
        frame_size: (u32, u32),
    ) -> Self {
        Self {
            video,
            conf: config.confidence_threshold,
            iou: config.iou_threshold,
            imgsz: config.image_size,
            tracker_profile: &config.tracker_profile,
            stride,
            device: config.device,
            verbose: false,
            frame_size,
        }
    }
}

/// 检测 + 跟踪器 Trait
///
/// 实现方负责模型加载与跨帧关联, 调用是同步且耗时的.
/// 同一个实例在所有章节之间复用.
pub trait VideoTracker {
    /// 跟踪一个视频文件, 返回逐帧逐目标的记录
    fn track(&mut self, request: &TrackRequest<'_>) -> Result<Vec<DetectionRecord>, DataError>;
}

impl<T: VideoTracker + ?Sized> VideoTracker for Box<T> {
    fn track(&mut self, request: &TrackRequest<'_>) -> Result<Vec<DetectionRecord>, DataError> {
        (**self).track(request)
    }
}
