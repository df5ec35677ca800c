//! 端到端: 章节选择 → 跟踪 → 过滤 → CSV
use std::fs;
use std::path::Path;

use sharktrack_rs::detection::BBox;
use sharktrack_rs::output::{DetectionFolderBuilder, SharkTrackConverter};
use sharktrack_rs::{
    ChapterId, DataError, DetectionRecord, PersistenceError, Profile, ResultAggregator,
    SharkTrackRow, TrackRequest, TrackingConfig, TrackingPipeline, VideoInfo, VideoProbe,
    VideoTracker,
};

struct ConstantProbe(f64);

impl VideoProbe for ConstantProbe {
    fn probe(&self, path: &Path) -> Result<VideoInfo, DataError> {
        Ok(VideoInfo {
            path: path.to_path_buf(),
            native_fps: self.0,
            width: 1280,
            height: 720,
        })
    }
}

/// a.mp4: 轨迹1 六帧低置信度, 轨迹2 单帧低置信度
/// b.mp4: 轨迹1 单帧高置信度
struct ScriptedTracker;

fn track(track_id: u64, frames: u64, confidence: f32, stride: u32) -> Vec<DetectionRecord> {
    (0..frames)
        .map(|f| DetectionRecord {
            track_id,
            frame_index: f,
            source_frame: (f + 1) * u64::from(stride) - 1,
            class_id: 0,
            confidence,
            bbox: BBox {
                x1: 100.0,
                y1: 100.0,
                x2: 200.0,
                y2: 150.0,
            },
        })
        .collect()
}

impl VideoTracker for ScriptedTracker {
    fn track(&mut self, request: &TrackRequest<'_>) -> Result<Vec<DetectionRecord>, DataError> {
        let name = request.video.file_name().unwrap().to_string_lossy();
        let mut records = Vec::new();
        match name.as_ref() {
            "a.mp4" => {
                records.extend(track(1, 6, 0.3, request.stride));
                records.extend(track(2, 1, 0.5, request.stride));
            }
            "b.mp4" => records.extend(track(1, 1, 0.9, request.stride)),
            _ => {}
        }
        Ok(records)
    }
}

struct NoFolder;

impl DetectionFolderBuilder for NoFolder {
    fn build(
        &mut self,
        _table: &[SharkTrackRow],
        _source_root: &Path,
        _output_dir: &Path,
        _target_fps: u32,
    ) -> Result<usize, PersistenceError> {
        Ok(0)
    }
}

fn setup(dir: &Path) -> TrackingConfig {
    for chapter in ["v1/a.mp4", "v1/b.mp4", "v1/notes.txt"] {
        let path = dir.join("videos").join(chapter);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
    let model = dir.join("best.pt");
    fs::write(&model, b"weights").unwrap();

    let mut config = TrackingConfig::for_profile(Profile::Analyst);
    config.model = model;
    config.tracker_profile = "botsort.yaml".to_string();
    config
}

#[test]
fn test_two_chapters_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let target_fps = config.target_fps;
    let mut pipeline = TrackingPipeline::new(config, ScriptedTracker, ConstantProbe(25.0));
    let mut aggregator = ResultAggregator::new(SharkTrackConverter, NoFolder, target_fps);

    let output = dir.path().join("output");
    let outcome = pipeline
        .execute(
            &dir.path().join("videos"),
            false,
            Some((&mut aggregator, output.as_path())),
        )
        .unwrap();

    let keys: Vec<&ChapterId> = outcome.report.results.keys().collect();
    assert_eq!(
        keys,
        vec![&ChapterId::new("v1", "a.mp4"), &ChapterId::new("v1", "b.mp4")]
    );
    assert!(outcome.report.results.values().all(|r| r.stride == 5));
    assert_eq!(outcome.report.record_count(), 8);

    let summary = outcome.saved.unwrap().unwrap();
    assert_eq!(summary.rows, 7);
    assert_eq!(summary.tracks, 2);

    let mut reader = csv::Reader::from_path(output.join("output.csv")).unwrap();
    let rows: Vec<SharkTrackRow> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 7);
    assert!(rows[..6].iter().all(|r| r.chapter_path == "v1/a.mp4" && r.track_id == 1));
    assert_eq!(rows[6].chapter_path, "v1/b.mp4");
    assert_eq!(rows[6].track_id, 4);
    assert_eq!(rows[5].source_frame, 29);
    assert_eq!(rows[5].time, "00:00:01");
}

#[test]
fn test_no_save_leaves_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let mut pipeline = TrackingPipeline::new(config, ScriptedTracker, ConstantProbe(30.0));

    let outcome = pipeline
        .execute::<SharkTrackConverter, NoFolder>(&dir.path().join("videos"), false, None)
        .unwrap();
    assert!(outcome.saved.is_none());
    assert_eq!(outcome.report.results.len(), 2);
    assert!(!dir.path().join("output").exists());
}

struct BrokenFolder;

impl DetectionFolderBuilder for BrokenFolder {
    fn build(
        &mut self,
        _table: &[SharkTrackRow],
        _source_root: &Path,
        output_dir: &Path,
        _target_fps: u32,
    ) -> Result<usize, PersistenceError> {
        Err(PersistenceError::DetectionFolder {
            path: output_dir.join("detections"),
            reason: "disk full".to_string(),
        })
    }
}

#[test]
fn test_save_failure_keeps_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let mut pipeline = TrackingPipeline::new(config, ScriptedTracker, ConstantProbe(25.0));
    let mut aggregator = ResultAggregator::new(SharkTrackConverter, BrokenFolder, 5);

    let output = dir.path().join("output");
    let outcome = pipeline
        .execute(
            &dir.path().join("videos"),
            false,
            Some((&mut aggregator, output.as_path())),
        )
        .unwrap();

    assert_eq!(outcome.report.results.len(), 2);
    assert_eq!(outcome.report.record_count(), 8);
    assert!(matches!(
        outcome.saved,
        Some(Err(PersistenceError::DetectionFolder { .. }))
    ));
    // CSV 先于图片目录写出
    assert!(output.join("output.csv").is_file());
}

#[test]
fn test_unwritable_output_dir_keeps_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();

    let mut pipeline = TrackingPipeline::new(config, ScriptedTracker, ConstantProbe(25.0));
    let mut aggregator = ResultAggregator::new(SharkTrackConverter, NoFolder, 5);
    let output = blocker.join("output");
    let outcome = pipeline
        .execute(
            &dir.path().join("videos"),
            false,
            Some((&mut aggregator, output.as_path())),
        )
        .unwrap();

    assert_eq!(outcome.report.results.len(), 2);
    assert!(matches!(
        outcome.saved,
        Some(Err(PersistenceError::CreateDir { .. }))
    ));
}
