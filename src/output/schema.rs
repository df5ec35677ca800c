//! 输出表格式 (SharkTrack schema)
//!
//! 每行一个检测, 轨迹ID在所有章节之间唯一: 每个章节的ID整体偏移到
//! 前一个章节最大ID之后.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::detection::TrackedRow;
use crate::pipeline::ResultSet;

/// CSV 列名 (与 `SharkTrackRow` 字段顺序一致)
pub const COLUMNS: [&str; 14] = [
    "chapter_path",
    "video_name",
    "frame",
    "source_frame",
    "time",
    "xmin",
    "ymin",
    "xmax",
    "ymax",
    "w",
    "h",
    "confidence",
    "class",
    "track_id",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharkTrackRow {
    /// `<video>/<chapter>.mp4`, 相对于输入根目录
    pub chapter_path: String,
    pub video_name: String,
    /// 抽帧后的帧序号
    pub frame: u64,
    /// 原始视频帧序号
    pub source_frame: u64,
    /// HH:MM:SS
    pub time: String,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class: u32,
    pub track_id: u64,
}

impl TrackedRow for SharkTrackRow {
    fn track_id(&self) -> u64 {
        self.track_id
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// 原始跟踪结果 → 输出表
pub trait SchemaConverter {
    fn to_output_schema(&self, results: &ResultSet, target_fps: u32) -> Vec<SharkTrackRow>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SharkTrackConverter;

impl SchemaConverter for SharkTrackConverter {
    fn to_output_schema(&self, results: &ResultSet, target_fps: u32) -> Vec<SharkTrackRow> {
        let mut rows = Vec::with_capacity(results.values().map(|r| r.records.len()).sum());
        let mut offset = 0u64;

        for result in results.values() {
            let chapter_path = result.chapter.to_string();
            let mut max_id = None;

            for record in &result.records {
                let Some(track_id) = offset.checked_add(record.track_id) else {
                    warn!(
                        "⚠️ {}: 轨迹ID {} 超出范围, 丢弃该行",
                        chapter_path, record.track_id
                    );
                    continue;
                };
                max_id = max_id.max(Some(record.track_id));
                rows.push(SharkTrackRow {
                    chapter_path: chapter_path.clone(),
                    video_name: result.chapter.video_name.clone(),
                    frame: record.frame_index,
                    source_frame: record.source_frame,
                    time: format_time(record.frame_index, target_fps),
                    xmin: record.bbox.x1,
                    ymin: record.bbox.y1,
                    xmax: record.bbox.x2,
                    ymax: record.bbox.y2,
                    w: record.bbox.width(),
                    h: record.bbox.height(),
                    confidence: record.confidence,
                    class: record.class_id,
                    track_id,
                });
            }

            if let Some(max_id) = max_id {
                offset = offset
                    .checked_add(max_id)
                    .and_then(|o| o.checked_add(1))
                    .unwrap_or(u64::MAX);
            }
        }
        rows
    }
}

/// 抽帧序号 → 章节内时间 (HH:MM:SS)
pub fn format_time(frame: u64, target_fps: u32) -> String {
    let seconds = frame / u64::from(target_fps.max(1));
    let elapsed = chrono::Duration::seconds(seconds as i64);
    format!(
        "{:02}:{:02}:{:02}",
        elapsed.num_hours(),
        elapsed.num_minutes() % 60,
        elapsed.num_seconds() % 60
    )
}
