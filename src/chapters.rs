//! 章节选择 (Chapter selection)
//!
//! 目录结构: `root/<video>/<chapter>.mp4`. 双目 BRUVS 只处理左相机 (LGX) 的章节,
//! 避免同一条鲨鱼被计数两次.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};

/// 章节视频扩展名 (区分大小写)
pub const VIDEO_EXTENSION: &str = ".mp4";
/// 左相机文件名标记 (区分大小写)
pub const LEFT_CAMERA_MARKER: &str = "LGX";

/// 章节标识: (视频名, 章节文件名)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChapterId {
    pub video_name: String,
    pub chapter_filename: String,
}

impl ChapterId {
    pub fn new(video_name: impl Into<String>, chapter_filename: impl Into<String>) -> Self {
        Self {
            video_name: video_name.into(),
            chapter_filename: chapter_filename.into(),
        }
    }

    /// 相对于根目录的路径
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.video_name).join(&self.chapter_filename)
    }

    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.video_name, self.chapter_filename)
    }
}

/// 章节是否符合条件 (仅判断文件名)
pub fn is_eligible(chapter_filename: &str, stereo: bool) -> bool {
    chapter_filename.ends_with(VIDEO_EXTENSION)
        && (!stereo || chapter_filename.contains(LEFT_CAMERA_MARKER))
}

/// 遍历两层目录, 返回按字典序排列的章节
///
/// 根目录下的非目录条目直接忽略; 视频目录中只有普通文件会被选中.
/// 没有找到任何章节时返回空列表.
pub fn select_chapters(root: &Path, stereo: bool) -> Result<Vec<ChapterId>> {
    let io_error = |source| Error::Io {
        path: root.to_path_buf(),
        source,
    };

    let mut chapters = Vec::new();
    for entry in skip_unreadable(fs::read_dir(root).map_err(io_error)?, root) {
        let video_path = entry.path();
        if !video_path.is_dir() {
            continue;
        }
        let Some(video_name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!("⚠️ 跳过非UTF-8目录名: {}", video_path.display());
            continue;
        };

        let listing = match fs::read_dir(&video_path) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("⚠️ 无法读取视频目录 {}: {}", video_path.display(), e);
                continue;
            }
        };

        for chapter in skip_unreadable(listing, &video_path) {
            let Some(chapter_filename) = chapter.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !is_eligible(&chapter_filename, stereo) {
                continue;
            }
            if !chapter.path().is_file() {
                debug!("跳过非文件条目: {}", chapter.path().display());
                continue;
            }
            chapters.push(ChapterId::new(video_name.clone(), chapter_filename));
        }
    }

    chapters.sort();
    Ok(chapters)
}

/// 跳过读取失败的目录条目, 记录警告
fn skip_unreadable<'a, T: 'a>(
    entries: impl Iterator<Item = io::Result<T>> + 'a,
    dir: &'a Path,
) -> impl Iterator<Item = T> + 'a {
    entries.filter_map(move |entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("⚠️ 跳过 {} 中无法读取的条目: {}", dir.display(), e);
            None
        }
    })
}

/// 没有找到章节时给用户的目录结构提示
pub fn expected_layout() -> &'static str {
    "videos_folder\n\
     ├── video1\n\
     │   ├── chapter1.mp4\n\
     │   ├── chapter2.mp4\n\
     └── video2\n\
     \x20   ├── chapter1.mp4\n\
     \x20   ├── chapter2.mp4"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn stereo_tree() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("video1/LGX_01.mp4"));
        touch(&root.path().join("video1/RGX_01.mp4"));
        root
    }

    #[test]
    fn test_stereo_selects_left_camera_only() {
        let root = stereo_tree();
        let chapters = select_chapters(root.path(), true).unwrap();
        assert_eq!(chapters, vec![ChapterId::new("video1", "LGX_01.mp4")]);
    }

    #[test]
    fn test_mono_selects_all() {
        let root = stereo_tree();
        let chapters = select_chapters(root.path(), false).unwrap();
        assert_eq!(
            chapters,
            vec![
                ChapterId::new("video1", "LGX_01.mp4"),
                ChapterId::new("video1", "RGX_01.mp4"),
            ]
        );
    }

    #[test]
    fn test_empty_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(select_chapters(root.path(), false).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            select_chapters(&root.path().join("nope"), false),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_skips_files_dirs_and_other_extensions() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("stray.mp4"));
        touch(&root.path().join("video1/notes.txt"));
        touch(&root.path().join("video1/upper.MP4"));
        fs::create_dir_all(root.path().join("video1/folder.mp4")).unwrap();
        touch(&root.path().join("video1/c1.mp4"));

        let chapters = select_chapters(root.path(), false).unwrap();
        assert_eq!(chapters, vec![ChapterId::new("video1", "c1.mp4")]);
    }

    #[test]
    fn test_unreadable_entries_are_skipped() {
        let entries = vec![
            Ok("video1"),
            Err(io::Error::other("stale handle")),
            Ok("video2"),
        ];
        let kept: Vec<&str> =
            skip_unreadable(entries.into_iter(), Path::new("/videos")).collect();
        assert_eq!(kept, vec!["video1", "video2"]);
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(is_eligible("LGX_01.mp4", true));
        assert!(!is_eligible("lgx_01.mp4", true));
        assert!(is_eligible("lgx_01.mp4", false));
    }

    #[test]
    fn test_sorted_across_videos() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("b/2.mp4"));
        touch(&root.path().join("b/1.mp4"));
        touch(&root.path().join("a/9.mp4"));

        let chapters: Vec<String> = select_chapters(root.path(), false)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(chapters, vec!["a/9.mp4", "b/1.mp4", "b/2.mp4"]);
    }
}
