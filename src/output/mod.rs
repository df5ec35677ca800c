/// 结果汇总与保存 (Result aggregation)
///
/// - schema:           原始跟踪结果 → SharkTrack 输出表
/// - detection_folder: 每条轨迹的最高置信度截图
///
/// CSV (`output_dir/output.csv`) 是一次运行唯一持久的产物, 先于图片目录写出.
pub mod detection_folder;
pub mod schema;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

pub use detection_folder::{
    DetectionFolderBuilder, FfmpegFrames, FrameSource, MaxConfDetectionFolder, DETECTIONS_DIR,
};
pub use schema::{SchemaConverter, SharkTrackConverter, SharkTrackRow, COLUMNS};

use crate::error::PersistenceError;
use crate::pipeline::ResultSet;
use crate::postprocess::filter_tracks;

/// 输出表文件名
pub const OUTPUT_CSV: &str = "output.csv";

/// 保存统计
#[derive(Clone, Debug, PartialEq)]
pub struct SaveSummary {
    pub csv_path: PathBuf,
    pub rows: usize,
    pub tracks: usize,
    pub detection_images: usize,
}

pub struct ResultAggregator<C, B> {
    converter: C,
    folder_builder: B,
    target_fps: u32,
}

impl ResultAggregator<SharkTrackConverter, MaxConfDetectionFolder<FfmpegFrames>> {
    pub fn with_defaults(target_fps: u32) -> Self {
        Self::new(
            SharkTrackConverter,
            MaxConfDetectionFolder::new(FfmpegFrames),
            target_fps,
        )
    }
}

impl<C: SchemaConverter, B: DetectionFolderBuilder> ResultAggregator<C, B> {
    pub fn new(converter: C, folder_builder: B, target_fps: u32) -> Self {
        Self {
            converter,
            folder_builder,
            target_fps,
        }
    }

    /// 转换 + 轨迹过滤后的扁平表
    pub fn flat_table(&self, results: &ResultSet) -> Vec<SharkTrackRow> {
        let rows = self.converter.to_output_schema(results, self.target_fps);
        filter_tracks(&rows, self.target_fps)
    }

    /// 保存结果: 输出目录 → CSV → 检测图片目录
    pub fn save(
        &mut self,
        results: &ResultSet,
        source_root: &Path,
        output_dir: &Path,
    ) -> Result<SaveSummary, PersistenceError> {
        fs::create_dir_all(output_dir).map_err(|source| PersistenceError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        info!("🧹 后处理结果...");
        let table = self.flat_table(results);

        let csv_path = output_dir.join(OUTPUT_CSV);
        info!("💾 保存结果到 {}...", csv_path.display());
        write_csv(&csv_path, &table)?;

        let detection_images =
            self.folder_builder
                .build(&table, source_root, output_dir, self.target_fps)?;

        let tracks = table.iter().map(|r| r.track_id).collect::<HashSet<_>>().len();
        Ok(SaveSummary {
            csv_path,
            rows: table.len(),
            tracks,
            detection_images,
        })
    }
}

/// 写出CSV; 空表只写表头
pub fn write_csv(path: &Path, rows: &[SharkTrackRow]) -> Result<(), PersistenceError> {
    let csv_error = |source: csv::Error| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    if rows.is_empty() {
        writer.write_record(COLUMNS).map_err(csv_error)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer
        .flush()
        .map_err(|e| csv_error(csv::Error::from(e)))?;
    Ok(())
}
