//! 硬 argmax, 仅作为诊断与消融对照使用.

use ndarray::ArrayView2;
use ordered_float::NotNan;

/// 返回行优先顺序下第一个最大值所在的 `(x, y)` (即 `(w, h)`).
///
/// NaN 被忽略; 整个通道都是 NaN 时返回 `(NaN, NaN)`.
pub(crate) fn hard_argmax<T: Copy + Into<f64>>(surface: ArrayView2<T>) -> (f64, f64) {
    surface
        .indexed_iter()
        .filter_map(|((h, w), &v)| NotNan::new(v.into()).ok().map(|s| (s, h, w)))
        .reduce(|best, cur| if cur.0 > best.0 { cur } else { best })
        .map_or((f64::NAN, f64::NAN), |(_, h, w)| (w as f64, h as f64))
}
