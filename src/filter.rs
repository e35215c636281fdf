//! 平滑滤波模块 - 温度读数的指数移动平均

/// 指数移动平均滤波器
///
/// 首次观测直接作为种子值（避免用 0 作初值导致前若干输出偏低），
/// 之后按 `smoothed = alpha * smoothed_prev + (1 - alpha) * sample` 更新。
/// alpha 越大越平稳，越小越灵敏。
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    /// 衰减系数，(0, 1) 区间
    alpha: f64,
    /// 当前平滑值，首次观测前为 None
    smoothed: Option<f64>,
}

impl SmoothingFilter {
    /// 默认衰减系数
    pub const DEFAULT_ALPHA: f64 = 0.9;

    /// 创建滤波器，alpha 必须在 (0, 1) 区间
    pub fn new(alpha: f64) -> Self {
        debug_assert!(alpha > 0.0 && alpha < 1.0, "alpha must be in (0, 1)");
        Self {
            alpha,
            smoothed: None,
        }
    }

    /// 观测一个样本，返回更新后的平滑值
    pub fn observe(&mut self, sample: f64) -> f64 {
        let next = match self.smoothed {
            // 首次观测：种子
            None => sample,
            Some(prev) => self.alpha * prev + (1.0 - self.alpha) * sample,
        };
        self.smoothed = Some(next);
        next
    }

    /// 当前平滑值（尚未观测过样本时为 None）
    pub fn value(&self) -> Option<f64> {
        self.smoothed
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA)
    }
}
