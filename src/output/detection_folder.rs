//! 检测图片目录 (Detection folder)
//!
//! 每条轨迹保存一张图片: 置信度最高的那一帧, 画上检测框.
//! 输出 `output_dir/detections/<track_id>.jpg`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{info, warn};

use super::schema::SharkTrackRow;
use crate::error::PersistenceError;
use crate::input::grab_frames;
use crate::postprocess::max_confidence_rows;

pub const DETECTIONS_DIR: &str = "detections";

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 3;

/// 构建检测图片目录, 返回写出的图片数量
pub trait DetectionFolderBuilder {
    fn build(
        &mut self,
        table: &[SharkTrackRow],
        source_root: &Path,
        output_dir: &Path,
        target_fps: u32,
    ) -> Result<usize, PersistenceError>;
}

/// 按原始帧序号读取画面
pub trait FrameSource {
    fn frames(
        &mut self,
        video: &Path,
        frames: &BTreeSet<u64>,
    ) -> Result<BTreeMap<u64, RgbImage>, String>;
}

/// FFmpeg解码抽帧
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegFrames;

impl FrameSource for FfmpegFrames {
    fn frames(
        &mut self,
        video: &Path,
        frames: &BTreeSet<u64>,
    ) -> Result<BTreeMap<u64, RgbImage>, String> {
        grab_frames(video, frames)
    }
}

/// 每条轨迹的最高置信度检测
#[derive(Debug, Default)]
pub struct MaxConfDetectionFolder<S> {
    source: S,
}

impl<S: FrameSource> MaxConfDetectionFolder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: FrameSource> DetectionFolderBuilder for MaxConfDetectionFolder<S> {
    fn build(
        &mut self,
        table: &[SharkTrackRow],
        source_root: &Path,
        output_dir: &Path,
        target_fps: u32,
    ) -> Result<usize, PersistenceError> {
        let dir = output_dir.join(DETECTIONS_DIR);
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::DetectionFolder {
            path: dir.clone(),
            reason: e.to_string(),
        })?;

        // 同一章节的帧一次解码完成
        let mut by_chapter: BTreeMap<&str, Vec<&SharkTrackRow>> = BTreeMap::new();
        for row in max_confidence_rows(table) {
            by_chapter.entry(row.chapter_path.as_str()).or_default().push(row);
        }

        let mut written = 0;
        for (chapter_path, rows) in by_chapter {
            let video = source_root.join(chapter_path);
            let wanted: BTreeSet<u64> = rows.iter().map(|r| r.source_frame).collect();
            let frames = match self.source.frames(&video, &wanted) {
                Ok(frames) => frames,
                Err(e) => {
                    warn!("⚠️ 无法截取 {} 的画面: {}", video.display(), e);
                    continue;
                }
            };

            for row in rows {
                let Some(frame) = frames.get(&row.source_frame) else {
                    warn!(
                        "⚠️ 轨迹 {} 缺少帧 #{} ({})",
                        row.track_id, row.source_frame, chapter_path
                    );
                    continue;
                };

                let mut image = frame.clone();
                draw_detection(&mut image, row);
                let path = dir.join(format!("{}.jpg", row.track_id));
                image
                    .save(&path)
                    .map_err(|e| PersistenceError::DetectionFolder {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                written += 1;
            }
        }

        info!(
            "🖼️ 检测图片已保存到 {} ({} 张, {}fps)",
            dir.display(),
            written,
            target_fps
        );
        Ok(written)
    }
}

/// 画检测框, 坐标裁剪到图像范围内
fn draw_detection(image: &mut RgbImage, row: &SharkTrackRow) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let max_x = width as f32 - 1.0;
    let max_y = height as f32 - 1.0;
    let x1 = row.xmin.clamp(0.0, max_x) as i32;
    let y1 = row.ymin.clamp(0.0, max_y) as i32;
    let x2 = row.xmax.clamp(0.0, max_x) as i32;
    let y2 = row.ymax.clamp(0.0, max_y) as i32;

    for t in 0..BOX_THICKNESS {
        let w = (x2 - x1 - 2 * t).max(1) as u32;
        let h = (y2 - y1 - 2 * t).max(1) as u32;
        draw_hollow_rect_mut(image, Rect::at(x1 + t, y1 + t).of_size(w, h), BOX_COLOR);
    }
}
