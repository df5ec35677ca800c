//! 追踪配置 - 两种运行模式 + 固定超参数
//!
//! | Profile | 模型    | Fps  | 设备 |
//! |---------|---------|------|------|
//! | mobile  | YOLOv8n | 2fps | CPU  |
//! | analyst | YOLOv8s | 5fps | GPU0 |
//!
//! 模型与跟踪器路径可以通过JSON文件覆盖, 阈值不可调.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use phf::phf_set;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 检测置信度阈值
pub const CONF_THRESHOLD: f32 = 0.2;
/// 跟踪关联 IOU 阈值
pub const IOU_ASSOCIATION_THRESHOLD: f32 = 0.5;
/// 推理输入尺寸
pub const IMAGE_SIZE: u32 = 640;
/// 默认跟踪器可执行文件 (ultralytics CLI)
pub const DEFAULT_YOLO_BIN: &str = "yolo";

/// ultralytics 自带的跟踪器配置, 不需要本地文件
static BUILTIN_TRACKERS: phf::Set<&'static str> = phf_set! {
    "botsort.yaml",
    "bytetrack.yaml",
};

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// 轻量模型, 可在CPU上快速运行
    Mobile,
    /// 精度优先, 需要GPU
    Analyst,
}

/// 推理设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "{}", index),
        }
    }
}

/// 运行模式绑定的默认参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileDefaults {
    pub target_fps: u32,
    pub device: Device,
    pub tracker_profile: &'static str,
    pub model: &'static str,
}

impl Profile {
    pub const fn defaults(self) -> ProfileDefaults {
        match self {
            Profile::Mobile => ProfileDefaults {
                target_fps: 2,
                device: Device::Cpu,
                tracker_profile: "botsort.yaml",
                model: "models/yolov8_n_mvd2_50/best.pt",
            },
            Profile::Analyst => ProfileDefaults {
                target_fps: 5,
                device: Device::Cuda(0),
                tracker_profile: "trackers/tracker_5fps.yaml",
                model: "models/p2v5_new/weights/best.pt",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Mobile => "mobile",
            Profile::Analyst => "analyst",
        }
    }
}

/// 单个运行模式的路径覆盖
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOverrides {
    pub model: Option<PathBuf>,
    pub tracker: Option<String>,
}

/// JSON配置文件
///
/// ```json
/// {
///   "yolo_bin": "/opt/venv/bin/yolo",
///   "analyst": { "model": "/models/p2v5/best.pt", "tracker": "trackers/tracker_5fps.yaml" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub yolo_bin: Option<String>,
    pub mobile: ProfileOverrides,
    pub analyst: ProfileOverrides,
}

impl ConfigFile {
    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    pub fn overrides(&self, profile: Profile) -> &ProfileOverrides {
        match profile {
            Profile::Mobile => &self.mobile,
            Profile::Analyst => &self.analyst,
        }
    }
}

/// 一次运行的不可变配置
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    pub profile: Profile,
    pub model: PathBuf,
    pub tracker_profile: String,
    pub yolo_bin: String,
    pub target_fps: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub image_size: u32,
    pub device: Device,
}

impl TrackingConfig {
    pub fn for_profile(profile: Profile) -> Self {
        Self::with_overrides(profile, &ConfigFile::default())
    }

    pub fn with_overrides(profile: Profile, file: &ConfigFile) -> Self {
        let defaults = profile.defaults();
        let overrides = file.overrides(profile);

        let model = overrides
            .model
            .clone()
            .unwrap_or_else(|| resolve_model(Path::new(defaults.model)));
        let tracker_profile = overrides
            .tracker
            .clone()
            .unwrap_or_else(|| defaults.tracker_profile.to_string());

        Self {
            profile,
            model,
            tracker_profile,
            yolo_bin: file
                .yolo_bin
                .clone()
                .unwrap_or_else(|| DEFAULT_YOLO_BIN.to_string()),
            target_fps: defaults.target_fps,
            confidence_threshold: CONF_THRESHOLD,
            iou_threshold: IOU_ASSOCIATION_THRESHOLD,
            image_size: IMAGE_SIZE,
            device: defaults.device,
        }
    }

    /// 在处理任何章节之前检查模型与跟踪器配置引用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.model.is_file() {
            return Err(ConfigError::MissingModel(self.model.clone()));
        }

        if BUILTIN_TRACKERS.contains(self.tracker_profile.as_str()) {
            return Ok(());
        }

        let tracker = Path::new(&self.tracker_profile);
        let is_yaml = tracker
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !is_yaml {
            return Err(ConfigError::MalformedTrackerProfile(
                self.tracker_profile.clone(),
            ));
        }
        if !tracker.is_file() {
            return Err(ConfigError::MissingTrackerProfile(
                self.tracker_profile.clone(),
            ));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!("🎛️  运行模式: {}", self.profile.name());
        info!("  📦 模型: {}", self.model.display());
        info!("  🎯 跟踪器: {}", self.tracker_profile);
        info!(
            "  ⚙️ {}fps | conf {:.2} | iou {:.2} | imgsz {} | device {}",
            self.target_fps,
            self.confidence_threshold,
            self.iou_threshold,
            self.image_size,
            self.device
        );
    }
}

/// 相对路径找不到时, 退回到用户数据目录 (~/.local/share/sharktrack/...)
fn resolve_model(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    if let Some(data_dir) = dirs::data_dir() {
        let candidate = data_dir.join("sharktrack").join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}
