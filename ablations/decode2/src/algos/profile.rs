//! 解码器运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 支持多次 "开始 -> 结束" 区间的累加.
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时.
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时间 (微秒).
    #[inline]
    fn total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// 单个解码器在整个归档上的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 成功解码的条目数.
    entries: u64,

    /// 读取失败或形状不符而跳过的条目数.
    skipped: u64,

    /// 解码 + 角度计算花费的总时间.
    decode_time: AccTimer,

    /// 整个任务花费的总时间 (包括读取归档与写报告).
    real_time: AccTimer,

    /// 最耗时的一次解码.
    most: Option<Duration>,

    /// 非有限关键点总数.
    non_finite: u64,

    /// Cobb 角 (有限值) 之和, 个数, 最大值.
    cobb_sum: f64,
    cobb_n: u64,
    cobb_max: Option<f64>,

    /// 与串行 soft-argmax 结果的平均关键点距离 (有限值) 之和与个数 (模型空间像素).
    drift_sum: f64,
    drift_n: u64,
}

impl Profile {
    /// 初始化. 同时开始总计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: 0,
            skipped: 0,
            decode_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
            non_finite: 0,
            cobb_sum: 0.0,
            cobb_n: 0,
            cobb_max: None,
            drift_sum: 0.0,
            drift_n: 0,
        }
    }

    /// 记录一个被跳过的条目.
    #[inline]
    pub fn count_skipped(&mut self) {
        self.skipped += 1;
    }

    /// 开始一次解码计时.
    #[inline]
    pub fn decode_start(&mut self) {
        self.decode_time.start();
    }

    /// 结束一次解码计时.
    #[inline]
    pub fn decode_elapsed(&mut self) {
        let d = self.decode_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一个成功解码的条目.
    pub fn count_entry(&mut self, cobb: f64, non_finite: usize, drift: f64) {
        self.entries += 1;
        self.non_finite += non_finite as u64;
        if cobb.is_finite() {
            self.cobb_sum += cobb;
            self.cobb_n += 1;
            self.cobb_max = Some(self.cobb_max.map_or(cobb, |m| m.max(cobb)));
        }
        if drift.is_finite() {
            self.drift_sum += drift;
            self.drift_n += 1;
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 成功解码的条目数.
    #[inline]
    pub fn get_entries(&self) -> u64 {
        self.entries
    }

    /// 跳过的条目数.
    #[inline]
    pub fn get_skipped(&self) -> u64 {
        self.skipped
    }

    /// 非有限关键点总数.
    #[inline]
    pub fn get_non_finite(&self) -> u64 {
        self.non_finite
    }

    /// 解码总时间 (微秒).
    #[inline]
    pub fn get_decode_time_us(&self) -> u64 {
        self.decode_time.total_us()
    }

    /// 任务总时间 (微秒).
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.total_us()
    }

    /// 平均解码时间 (微秒).
    #[inline]
    pub fn get_avg_decode_time_us(&self) -> Option<f64> {
        match self.entries {
            0 => None,
            n => Some(self.get_decode_time_us() as f64 / n as f64),
        }
    }

    /// 最耗时的一次解码.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }

    /// 平均 Cobb 角.
    #[inline]
    pub fn get_avg_cobb(&self) -> Option<f64> {
        match self.cobb_n {
            0 => None,
            n => Some(self.cobb_sum / n as f64),
        }
    }

    /// 最大 Cobb 角.
    #[inline]
    pub fn get_max_cobb(&self) -> Option<f64> {
        self.cobb_max
    }

    /// 与串行 soft-argmax 的平均关键点距离.
    #[inline]
    pub fn get_avg_drift(&self) -> Option<f64> {
        match self.drift_n {
            0 => None,
            n => Some(self.drift_sum / n as f64),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_stats() {
        let mut p = Profile::new();
        assert_eq!(p.get_avg_cobb(), None);
        assert_eq!(p.get_avg_decode_time_us(), None);

        p.decode_start();
        p.decode_elapsed();
        p.count_entry(10.0, 0, 0.5);
        p.count_entry(f64::NAN, 6, 1.5);
        p.count_entry(30.0, 0, f64::NAN);
        p.count_skipped();
        let p = p.finish();

        assert_eq!(p.get_entries(), 3);
        assert_eq!(p.get_skipped(), 1);
        assert_eq!(p.get_non_finite(), 6);
        assert_eq!(p.get_avg_cobb(), Some(20.0));
        assert_eq!(p.get_max_cobb(), Some(30.0));
        // 非有限的距离不计入平均值.
        assert_eq!(p.get_avg_drift(), Some(1.0));
        assert!(p.get_most_time_consuming().is_some());
    }
}
