//! 轨迹后处理 (Track filtering)
//!
//! 按 track_id 分组, 满足以下任一条件的轨迹保留:
//! 1. 持续帧数 >= D (5fps 时 D=5, 其他 D=2, 约等于1秒)
//! 2. 最大置信度 > 0.8
//!
//! 很短但置信度极高的检测保留; 置信度低但持续出现的轨迹同样保留.

use std::collections::HashMap;

use crate::detection::{TrackSummary, TrackedRow};

/// 置信度豁免阈值 (严格大于)
pub const MAX_CONF_THRESHOLD: f32 = 0.8;

/// 持续时间阈值 (帧数, 大于等于)
pub fn duration_threshold(target_fps: u32) -> usize {
    if target_fps == 5 {
        5
    } else {
        2
    }
}

/// 统计每条轨迹的帧数与最大置信度
pub fn summarize_tracks<R: TrackedRow>(records: &[R]) -> HashMap<u64, TrackSummary> {
    let mut summaries: HashMap<u64, TrackSummary> = HashMap::new();
    for record in records {
        summaries
            .entry(record.track_id())
            .and_modify(|s| {
                s.frame_count += 1;
                s.max_confidence = s.max_confidence.max(record.confidence());
            })
            .or_insert(TrackSummary {
                frame_count: 1,
                max_confidence: record.confidence(),
            });
    }
    summaries
}

/// 轨迹是否保留
pub fn is_valid_track(summary: &TrackSummary, target_fps: u32) -> bool {
    summary.frame_count >= duration_threshold(target_fps)
        || summary.max_confidence > MAX_CONF_THRESHOLD
}

/// 过滤轨迹, 保持原有行顺序且不修改保留的行
pub fn filter_tracks<R: TrackedRow + Clone>(records: &[R], target_fps: u32) -> Vec<R> {
    let summaries = summarize_tracks(records);
    records
        .iter()
        .filter(|r| {
            summaries
                .get(&r.track_id())
                .is_some_and(|s| is_valid_track(s, target_fps))
        })
        .cloned()
        .collect()
}

/// 每条轨迹置信度最高的一行 (相同置信度取最先出现的), 按 track_id 排序
pub fn max_confidence_rows<R: TrackedRow>(records: &[R]) -> Vec<&R> {
    let mut best: HashMap<u64, &R> = HashMap::new();
    for record in records {
        best.entry(record.track_id())
            .and_modify(|current| {
                if record.confidence() > current.confidence() {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    let mut rows: Vec<&R> = best.into_values().collect();
    rows.sort_by_key(|r| r.track_id());
    rows
}
