//! ultralytics 跟踪器适配 (外部进程)
//!
//! 调用 `yolo track ... save_txt=True save_conf=True`, 然后解析
//! `<project>/<name>/labels/<stem>_<frame>.txt`. 每行格式:
//!
//! ```text
//! cls cx cy w h conf [track_id]
//! ```
//!
//! 坐标为归一化的中心点格式. 帧号从1开始, 按抽帧后的序号计数.
//! 没有被跟踪器分配ID的检测没有最后一列, 直接丢弃.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};
use regex::Regex;

use super::tracker::{TrackRequest, VideoTracker};
use super::types::{BBox, DetectionRecord};
use crate::config::TrackingConfig;
use crate::error::DataError;

const RUN_NAME: &str = "track";

/// ultralytics CLI 跟踪器
pub struct UltralyticsCli {
    bin: String,
    model: PathBuf,
}

impl UltralyticsCli {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            bin: config.yolo_bin.clone(),
            model: config.model.clone(),
        }
    }

    fn command(&self, request: &TrackRequest<'_>, project: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("track")
            .arg(format!("model={}", self.model.display()))
            .arg(format!("source={}", request.video.display()))
            .arg(format!("conf={}", request.conf))
            .arg(format!("iou={}", request.iou))
            .arg(format!("imgsz={}", request.imgsz))
            .arg(format!("tracker={}", request.tracker_profile))
            .arg(format!("vid_stride={}", request.stride))
            .arg(format!("device={}", request.device))
            .arg(format!(
                "verbose={}",
                if request.verbose { "True" } else { "False" }
            ))
            .arg("save=False")
            .arg("save_txt=True")
            .arg("save_conf=True")
            .arg(format!("project={}", project.display()))
            .arg(format!("name={}", RUN_NAME))
            .arg("exist_ok=True");
        cmd
    }
}

impl VideoTracker for UltralyticsCli {
    fn track(&mut self, request: &TrackRequest<'_>) -> Result<Vec<DetectionRecord>, DataError> {
        let tracker_error = |reason: String| DataError::Tracker {
            path: request.video.to_path_buf(),
            reason,
        };

        let scratch = tempfile::tempdir().map_err(|e| tracker_error(e.to_string()))?;
        let mut cmd = self.command(request, scratch.path());
        debug!("🚀 {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| tracker_error(format!("failed to spawn {}: {}", self.bin, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(tracker_error(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        let labels = scratch.path().join(RUN_NAME).join("labels");
        let records = parse_label_dir(&labels, request.stride, request.frame_size)
            .map_err(tracker_error)?;
        info!(
            "✅ {} 跟踪完成: {} 条记录",
            request.video.display(),
            records.len()
        );
        Ok(records)
    }
}

/// 抽帧后第 `processed` 帧 (从1开始) 在原视频中的帧序号 (从0开始)
fn source_frame(processed: u64, stride: u32) -> u64 {
    (processed * u64::from(stride)).saturating_sub(1)
}

/// 解析 labels 目录. 目录不存在表示整段视频没有检测结果.
pub fn parse_label_dir(
    dir: &Path,
    stride: u32,
    frame_size: (u32, u32),
) -> Result<Vec<DetectionRecord>, String> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let name_re = Regex::new(r"^.+_(\d+)\.txt$").map_err(|e| e.to_string())?;
    let mut frames: Vec<(u64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| e.to_string())? {
        let path = entry.map_err(|e| e.to_string())?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(frame) = name_re
            .captures(file_name)
            .and_then(|caps| caps[1].parse::<u64>().ok())
        else {
            debug!("跳过无法识别的标签文件: {}", file_name);
            continue;
        };
        frames.push((frame, path));
    }
    frames.sort();

    let mut records = Vec::new();
    for (frame, path) in frames {
        let text = fs::read_to_string(&path).map_err(|e| e.to_string())?;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match parse_label_line(line) {
                Some(label) => {
                    let Some(track_id) = label.track_id else {
                        continue;
                    };
                    records.push(DetectionRecord {
                        track_id,
                        frame_index: frame.saturating_sub(1),
                        source_frame: source_frame(frame, stride),
                        class_id: label.class_id,
                        confidence: label.confidence,
                        bbox: BBox::from_normalized_xywh(
                            label.xywh[0],
                            label.xywh[1],
                            label.xywh[2],
                            label.xywh[3],
                            frame_size.0,
                            frame_size.1,
                        ),
                    });
                }
                None => warn!("⚠️ 无法解析标签行 {}: {:?}", path.display(), line),
            }
        }
    }
    Ok(records)
}

struct LabelLine {
    class_id: u32,
    xywh: [f32; 4],
    confidence: f32,
    track_id: Option<u64>,
}

/// 2^53: 超过这个值的ID在 f64 中已经不精确
const MAX_TRACK_ID: f64 = 9_007_199_254_740_992.0;

fn is_track_id(value: f64) -> bool {
    value >= 0.0 && value.fract() == 0.0 && value < MAX_TRACK_ID
}

// 数值用 "%g" 写出, 大ID可能是科学计数法 (1e+06)
fn parse_label_line(line: &str) -> Option<LabelLine> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let track_id = match values.len() {
        6 => None,
        7 if is_track_id(values[6]) => Some(values[6] as u64),
        _ => return None,
    };
    Some(LabelLine {
        class_id: values[0] as u32,
        xywh: [
            values[1] as f32,
            values[2] as f32,
            values[3] as f32,
            values[4] as f32,
        ],
        confidence: values[5] as f32,
        track_id,
    })
}
