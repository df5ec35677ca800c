/// FFmpeg抽帧过滤器: 章节视频 → 指定帧的RGB图像
/// FFmpeg frame grabbing filter
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Frame, Input};
use image::RgbImage;
use log::{debug, warn};

/// 过滤器与调用方共享的截取结果
#[derive(Debug, Default)]
pub struct GrabState {
    pub frames: BTreeMap<u64, RgbImage>,
    /// 已经越过最后一个目标帧, 之后的解码错误是过滤器主动停止
    pub reached_last: bool,
}

type SharedState = Arc<Mutex<GrabState>>;

fn lock_state(state: &Mutex<GrabState>) -> MutexGuard<'_, GrabState> {
    state.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("⚠️ 抽帧状态锁已中毒, 继续使用已截取的帧");
        poisoned.into_inner()
    })
}

/// 单帧的处理方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStep {
    Pass,
    Capture(u64),
    Stop,
}

/// 按解码顺序为帧编号, 判断截取 / 跳过 / 停止
#[derive(Clone, Debug)]
pub struct FrameCursor {
    wanted: BTreeSet<u64>,
    last_wanted: u64,
    next_index: u64,
}

impl FrameCursor {
    pub fn new(wanted: BTreeSet<u64>) -> Self {
        let last_wanted = wanted.last().copied().unwrap_or(0);
        Self {
            wanted,
            last_wanted,
            next_index: 0,
        }
    }

    pub fn advance(&mut self) -> FrameStep {
        let index = self.next_index;
        self.next_index += 1;

        if index > self.last_wanted {
            FrameStep::Stop
        } else if self.wanted.contains(&index) {
            FrameStep::Capture(index)
        } else {
            FrameStep::Pass
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.next_index
    }
}

/// RGB24 单平面, 逐行拷贝去掉行尾填充
pub fn copy_rgb24(plane: &[u8], width: u32, height: u32, linesize: usize) -> Option<RgbImage> {
    let row_bytes = width as usize * 3;
    if width == 0 || height == 0 || linesize < row_bytes {
        return None;
    }
    let needed = linesize * (height as usize - 1) + row_bytes;
    if plane.len() < needed {
        return None;
    }

    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.chunks(linesize).take(height as usize) {
        buffer.extend_from_slice(&row[..row_bytes]);
    }
    RgbImage::from_raw(width, height, buffer)
}

/// 按原始帧序号截取画面. 最后一帧之后返回错误以停止解码.
pub struct FrameGrabFilter {
    cursor: FrameCursor,
    state: SharedState,
}

impl FrameGrabFilter {
    fn new(wanted: BTreeSet<u64>, state: SharedState) -> Self {
        Self {
            cursor: FrameCursor::new(wanted),
            state,
        }
    }
}

impl FrameFilter for FrameGrabFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("🎞️ 抽帧开始: {} 帧", self.cursor.wanted.len());
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        let index = match self.cursor.advance() {
            FrameStep::Pass => return Ok(Some(frame)),
            FrameStep::Stop => {
                lock_state(&self.state).reached_last = true;
                return Err("all frames captured".to_string());
            }
            FrameStep::Capture(index) => index,
        };

        let image = unsafe {
            // 空帧或损坏帧
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                warn!("⚠️ 帧 #{} 损坏, 跳过", index);
                return Ok(Some(frame));
            }

            let w = (*frame.as_ptr()).width;
            let h = (*frame.as_ptr()).height;
            let plane = (*frame.as_ptr()).data[0];
            let linesize = (*frame.as_ptr()).linesize[0];

            if w <= 0 || h <= 0 || linesize <= 0 || plane.is_null() {
                warn!("⚠️ 帧 #{} 尺寸异常 {}x{} stride={}", index, w, h, linesize);
                return Ok(Some(frame));
            }

            let linesize = linesize as usize;
            let len = linesize * (h as usize - 1) + w as usize * 3;
            if linesize < w as usize * 3 {
                warn!("⚠️ 帧 #{} 行宽不足 stride={}", index, linesize);
                return Ok(Some(frame));
            }
            let data = std::slice::from_raw_parts(plane, len);
            copy_rgb24(data, w as u32, h as u32, linesize)
        };

        match image {
            Some(image) => {
                lock_state(&self.state).frames.insert(index, image);
            }
            None => warn!("⚠️ 帧 #{} 无法转换为RGB图像", index),
        }
        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        debug!("🎞️ 抽帧结束, 已读取 {} 帧", self.cursor.frames_seen());
    }
}

/// 解码结束后整理结果
///
/// 过滤器越过最后一个目标帧后的错误是主动停止; 其余错误只有在
/// 一帧都没截到时才算失败, 否则返回已截取的部分.
pub fn finish_grab(
    video: &Path,
    state: GrabState,
    wanted: usize,
    finished: Result<(), String>,
) -> Result<BTreeMap<u64, RgbImage>, String> {
    if let Err(e) = finished {
        if !state.reached_last && state.frames.is_empty() {
            return Err(format!("解码中断: {}", e));
        }
        if !state.reached_last {
            warn!("⚠️ {}: 解码中断: {}", video.display(), e);
        }
    }
    if state.frames.len() < wanted {
        warn!(
            "⚠️ {}: 仅截取到 {}/{} 帧",
            video.display(),
            state.frames.len(),
            wanted
        );
    }
    Ok(state.frames)
}

/// 解码视频并截取指定帧 (原始帧序号, 从0开始)
pub fn grab_frames(video: &Path, frames: &BTreeSet<u64>) -> Result<BTreeMap<u64, RgbImage>, String> {
    if frames.is_empty() {
        return Ok(BTreeMap::new());
    }

    let state: SharedState = Arc::new(Mutex::new(GrabState::default()));
    let filter = FrameGrabFilter::new(frames.clone(), Arc::clone(&state));

    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("grab", Box::new(filter));
    let out = create_null_output().add_frame_pipeline(pipe);

    let input = Input::new(video.to_string_lossy().into_owned());

    let ctx = FfmpegContext::builder()
        .input(input)
        .filter_descs(["format=rgb24"].into())
        .output(out)
        .build()
        .map_err(|e| format!("构建失败: {}", e))?;

    let sch = ctx.start().map_err(|e| format!("启动失败: {}", e))?;
    let finished = sch.wait().map_err(|e| e.to_string());

    let grabbed = std::mem::take(&mut *lock_state(&state));
    finish_grab(video, grabbed, frames.len(), finished)
}
