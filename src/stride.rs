//! 抽帧步长 (Frame stride)
//!
//! 原始视频帧率 → 固定处理帧率. 取整采用"四舍六入五成双"(round half to even),
//! 与 ultralytics 端 Python `round()` 的结果一致.

use log::warn;

use crate::error::DataError;

/// 计算抽帧步长: `round(native_fps / target_fps)`
///
/// - `native_fps` 非正数、NaN 或无穷 → `DataError::InvalidFrameRate`
/// - `target_fps == 0` → `DataError::InvalidTargetFps`
/// - 原始帧率低于目标帧率一半时结果取整为0, 此时退化为逐帧处理 (步长1)
pub fn compute_stride(native_fps: f64, target_fps: u32) -> Result<u32, DataError> {
    if !native_fps.is_finite() || native_fps <= 0.0 {
        return Err(DataError::InvalidFrameRate { fps: native_fps });
    }
    if target_fps == 0 {
        return Err(DataError::InvalidTargetFps);
    }

    let stride = (native_fps / f64::from(target_fps)).round_ties_even();
    if stride < 1.0 {
        warn!(
            "⚠️ 原始帧率 {:.2}fps 低于目标 {}fps, 逐帧处理",
            native_fps, target_fps
        );
        return Ok(1);
    }
    Ok(stride as u32)
}
