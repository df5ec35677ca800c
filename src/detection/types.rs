/// 跟踪结果数据结构定义
/// Data structures for per-frame tracking results
use serde::{Deserialize, Serialize};

// ========== 数据结构 ==========

/// 检测框 (像素坐标, 左上/右下)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    /// 由归一化中心点格式 (cx, cy, w, h) 还原为像素坐标
    pub fn from_normalized_xywh(cx: f32, cy: f32, w: f32, h: f32, width: u32, height: u32) -> Self {
        let (fw, fh) = (width as f32, height as f32);
        Self {
            x1: (cx - w / 2.0) * fw,
            y1: (cy - h / 2.0) * fh,
            x2: (cx + w / 2.0) * fw,
            y2: (cy + h / 2.0) * fh,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// 单帧单目标的跟踪记录 (外部跟踪器输出)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// 跟踪ID, 同一章节内唯一且跨帧稳定
    pub track_id: u64,
    /// 抽帧后的帧序号 (从0开始)
    pub frame_index: u64,
    /// 原始视频中的帧序号
    pub source_frame: u64,
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BBox,
}

/// 单条轨迹的统计 (仅在过滤时临时计算)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSummary {
    pub frame_count: usize,
    pub max_confidence: f32,
}

/// 可被轨迹过滤器处理的行
pub trait TrackedRow {
    fn track_id(&self) -> u64;
    fn confidence(&self) -> f32;
}

impl TrackedRow for DetectionRecord {
    fn track_id(&self) -> u64 {
        self.track_id
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }
}
