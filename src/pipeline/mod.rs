/// 追踪流水线 (Tracking Pipeline)
///
/// 单线程顺序处理: 跟踪器本身会占满计算资源, 并发处理章节没有收益.
/// - 章节选择 → 探测帧率 → 计算步长 → 外部跟踪器
/// - 单个章节失败只记录, 不影响其他章节
/// - 取消令牌只在章节之间检查
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};

use crate::chapters::{expected_layout, select_chapters, ChapterId};
use crate::config::TrackingConfig;
use crate::detection::{DetectionRecord, TrackRequest, VideoTracker};
use crate::error::{DataError, PersistenceError, Result};
use crate::input::{VideoInfo, VideoProbe};
use crate::output::{DetectionFolderBuilder, ResultAggregator, SaveSummary, SchemaConverter};
use crate::stride::compute_stride;

/// 单个章节的原始跟踪结果
#[derive(Clone, Debug)]
pub struct ChapterResult {
    pub chapter: ChapterId,
    pub video: VideoInfo,
    pub stride: u32,
    pub records: Vec<DetectionRecord>,
}

/// 章节 → 结果, 按章节字典序排列
pub type ResultSet = BTreeMap<ChapterId, ChapterResult>;

/// 失败的章节及原因
#[derive(Debug)]
pub struct ChapterFailure {
    pub chapter: ChapterId,
    pub error: DataError,
}

/// 章节之间检查的取消标志
pub type CancelToken = Arc<AtomicBool>;

/// 一次运行的结果
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: ResultSet,
    pub failures: Vec<ChapterFailure>,
    /// 因取消而未处理的章节
    pub skipped: Vec<ChapterId>,
}

impl RunReport {
    /// 没有找到任何章节
    pub fn is_empty_input(&self) -> bool {
        self.results.is_empty() && self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.results.values().map(|r| r.records.len()).sum()
    }

    pub fn log_summary(&self) {
        info!(
            "📊 章节统计: 成功 {} | 失败 {} | 跳过 {}",
            self.results.len(),
            self.failures.len(),
            self.skipped.len()
        );
        for result in self.results.values() {
            info!(
                "  ✅ {}: {} 条记录 (步长 {}, {:.2}fps)",
                result.chapter,
                result.records.len(),
                result.stride,
                result.video.native_fps
            );
        }
        for failure in &self.failures {
            error!("  ❌ {}: {}", failure.chapter, failure.error);
        }
        for chapter in &self.skipped {
            warn!("  ⏭️ {}: 已取消", chapter);
        }
    }
}

/// 运行 + (可选) 保存的结果. 保存失败不会丢弃已计算的结果.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub saved: Option<std::result::Result<SaveSummary, PersistenceError>>,
}

pub struct TrackingPipeline<T, P> {
    config: TrackingConfig,
    tracker: T,
    probe: P,
    cancel: Option<CancelToken>,
}

impl<T: VideoTracker, P: VideoProbe> TrackingPipeline<T, P> {
    pub fn new(config: TrackingConfig, tracker: T, probe: P) -> Self {
        Self {
            config,
            tracker,
            probe,
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.load(Ordering::Relaxed))
    }

    fn process_chapter(
        &mut self,
        root: &Path,
        chapter: &ChapterId,
    ) -> std::result::Result<ChapterResult, DataError> {
        let path: PathBuf = chapter.path_in(root);
        info!("🎬 处理章节: {}", path.display());

        let video = self.probe.probe(&path)?;
        let stride = compute_stride(video.native_fps, self.config.target_fps)?;
        let request = TrackRequest::new(&self.config, &path, stride, video.frame_size());
        let records = self.tracker.track(&request)?;

        Ok(ChapterResult {
            chapter: chapter.clone(),
            video,
            stride,
            records,
        })
    }

    /// 跟踪根目录下所有符合条件的章节
    ///
    /// 配置错误与根目录无法读取会立即返回; 章节级别的错误记录在报告中.
    pub fn run(&mut self, root: &Path, stereo: bool) -> Result<RunReport> {
        self.config.validate()?;
        let chapters = select_chapters(root, stereo)?;

        let mut report = RunReport::default();
        if chapters.is_empty() {
            warn!("⚠️ 未在 {} 中找到任何章节", root.display());
            println!("No chapters found in the given folder");
            println!("Please ensure the folder structure resembles the following:");
            println!("{}", expected_layout());
            return Ok(report);
        }

        info!("🚀 共 {} 个章节待处理", chapters.len());
        let mut remaining = chapters.into_iter();
        while let Some(chapter) = remaining.next() {
            if self.is_cancelled() {
                warn!("🛑 收到取消信号, 停止处理");
                report.skipped.push(chapter);
                report.skipped.extend(remaining.by_ref());
                break;
            }

            match self.process_chapter(root, &chapter) {
                Ok(result) => {
                    report.results.insert(chapter, result);
                }
                Err(e) => {
                    warn!("⚠️ 跳过章节 {}: {}", chapter, e);
                    report.failures.push(ChapterFailure { chapter, error: e });
                }
            }
        }

        Ok(report)
    }

    /// 运行并在需要时保存
    pub fn execute<C: SchemaConverter, B: DetectionFolderBuilder>(
        &mut self,
        root: &Path,
        stereo: bool,
        save_to: Option<(&mut ResultAggregator<C, B>, &Path)>,
    ) -> Result<RunOutcome> {
        let report = self.run(root, stereo)?;
        report.log_summary();

        let saved = save_to.map(|(aggregator, output_dir)| {
            aggregator.save(&report.results, root, output_dir)
        });
        Ok(RunOutcome { report, saved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use crate::detection::BBox;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::fs;

    struct FixedProbe(HashMap<String, f64>);

    impl VideoProbe for FixedProbe {
        fn probe(&self, path: &Path) -> std::result::Result<VideoInfo, DataError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            let fps = self.0.get(&name).copied().ok_or(DataError::Unreadable {
                path: path.to_path_buf(),
                reason: "unknown".to_string(),
            })?;
            Ok(VideoInfo {
                path: path.to_path_buf(),
                native_fps: fps,
                width: 1920,
                height: 1080,
            })
        }
    }

    #[derive(Default)]
    struct RecordingTracker {
        strides: Vec<u32>,
    }

    impl VideoTracker for RecordingTracker {
        fn track(
            &mut self,
            request: &TrackRequest<'_>,
        ) -> std::result::Result<Vec<DetectionRecord>, DataError> {
            self.strides.push(request.stride);
            Ok(vec![DetectionRecord {
                track_id: 1,
                frame_index: 0,
                source_frame: 0,
                class_id: 0,
                confidence: 0.5,
                bbox: BBox::default(),
            }])
        }
    }

    fn setup(chapters: &[&str]) -> (tempfile::TempDir, TrackingConfig) {
        let dir = tempfile::tempdir().unwrap();
        for chapter in chapters {
            let path = dir.path().join("videos").join(chapter);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }
        let model = dir.path().join("best.pt");
        fs::write(&model, b"weights").unwrap();

        let mut config = TrackingConfig::for_profile(Profile::Analyst);
        config.model = model;
        config.tracker_profile = "bytetrack.yaml".to_string();
        (dir, config)
    }

    fn probe(entries: &[(&str, f64)]) -> FixedProbe {
        FixedProbe(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn test_failed_chapter_is_isolated() {
        let (dir, config) = setup(&["v1/a.mp4", "v1/b.mp4", "v2/c.mp4"]);
        let probe = probe(&[("a.mp4", 29.97), ("b.mp4", 0.0), ("c.mp4", 24.0)]);
        let mut pipeline = TrackingPipeline::new(config, RecordingTracker::default(), probe);

        let report = pipeline.run(&dir.path().join("videos"), false).unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].chapter, ChapterId::new("v1", "b.mp4"));
        assert!(matches!(
            report.failures[0].error,
            DataError::InvalidFrameRate { .. }
        ));
        assert_eq!(pipeline.tracker.strides, vec![6, 5]);
    }

    #[test]
    fn test_empty_root_is_not_an_error() {
        let (dir, config) = setup(&[]);
        fs::create_dir_all(dir.path().join("videos")).unwrap();
        let mut pipeline =
            TrackingPipeline::new(config, RecordingTracker::default(), probe(&[]));

        let report = pipeline.run(&dir.path().join("videos"), true).unwrap();
        assert!(report.is_empty_input());
        assert_eq!(report.record_count(), 0);
    }

    #[test]
    fn test_config_error_aborts_before_chapters() {
        let (dir, mut config) = setup(&["v1/a.mp4"]);
        config.model = dir.path().join("missing.pt");
        let mut pipeline = TrackingPipeline::new(
            config,
            RecordingTracker::default(),
            probe(&[("a.mp4", 25.0)]),
        );

        let result = pipeline.run(&dir.path().join("videos"), false);
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(pipeline.tracker.strides.is_empty());
    }

    #[test]
    fn test_cancel_between_chapters() {
        let (dir, config) = setup(&["v1/a.mp4", "v1/b.mp4"]);
        let token: CancelToken = Arc::new(AtomicBool::new(true));
        let mut pipeline = TrackingPipeline::new(
            config,
            RecordingTracker::default(),
            probe(&[("a.mp4", 25.0), ("b.mp4", 25.0)]),
        )
        .with_cancel_token(token);

        let report = pipeline.run(&dir.path().join("videos"), false).unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(!report.is_empty_input());
    }
}
