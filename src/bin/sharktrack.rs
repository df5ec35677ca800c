/// 鲨鱼追踪 (SharkTrack)
///
/// BRUVS 水下视频批处理:
/// 1. 遍历 `root/<video>/<chapter>.mp4`, 双目模式只取左相机 (LGX)
/// 2. 按目标帧率抽帧, 调用外部检测/跟踪器
/// 3. 过滤短时低置信度轨迹, 保存 CSV 与检测图片
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{error, info};

use sharktrack_rs::{
    ConfigFile, FfmpegProbe, Profile, ResultAggregator, TrackingConfig, TrackingPipeline,
    UltralyticsCli,
};

/// SharkTrack 参数
#[derive(Parser, Debug)]
#[command(author, version, about = "SharkTrack - BRUVS 视频鲨鱼追踪", long_about = None)]
struct Args {
    /// 视频根目录
    #[arg(long = "video-path", alias = "video_path", value_name = "DIR")]
    video_path: PathBuf,

    /// 是否为双目 BRUVS (LGX/RGX), 必须显式给出 true/false
    #[arg(
        long,
        required = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        value_name = "BOOL"
    )]
    stereo: bool,

    /// 运行模式: mobile (2fps, CPU) 或 analyst (5fps, GPU)
    #[arg(long, value_enum, default_value_t = Profile::Analyst)]
    profile: Profile,

    /// 输出目录
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// JSON配置文件 (模型与跟踪器路径)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 只计算, 不保存结果
    #[arg(long)]
    no_save: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = TrackingConfig::with_overrides(args.profile, &file);

    info!("🦈 SharkTrack 启动");
    config.log_summary();
    info!(
        "📹 视频目录: {} (stereo: {})",
        args.video_path.display(),
        args.stereo
    );

    let target_fps = config.target_fps;
    let tracker = UltralyticsCli::new(&config);
    let mut pipeline = TrackingPipeline::new(config, tracker, FfmpegProbe);
    let mut aggregator = ResultAggregator::with_defaults(target_fps);

    let save_to = (!args.no_save).then_some((&mut aggregator, args.output.as_path()));
    let outcome = pipeline
        .execute(&args.video_path, args.stereo, save_to)
        .context("tracking run failed")?;

    match outcome.saved {
        Some(Ok(summary)) => info!(
            "✅ 已保存 {} 条检测 / {} 条轨迹 → {} ({} 张检测图片)",
            summary.rows,
            summary.tracks,
            summary.csv_path.display(),
            summary.detection_images
        ),
        Some(Err(e)) => {
            error!(
                "❌ 保存失败: {} ({} 个章节的结果仍在内存中)",
                e,
                outcome.report.results.len()
            );
            return Ok(ExitCode::FAILURE);
        }
        None => info!(
            "⏭️ 未保存: {} 个章节, {} 条原始记录",
            outcome.report.results.len(),
            outcome.report.record_count()
        ),
    }

    Ok(ExitCode::SUCCESS)
}
