//! soft-argmax 的单通道实现.
//!
//! 步骤: 减去通道最大值 -> 指数 -> 归一化为概率分布 -> 对行/列边缘分布求期望.
//! 无论输入精度如何, 累加一律在 `f64` 上进行.

use ndarray::{ArrayView2, Axis};

pub(crate) struct SoftArgmaxImp<'a, T: num::Float> {
    surface: ArrayView2<'a, T>,
}

macro_rules! impl_soft_argmax {
    ($fp: ty) => {
        impl<'a> SoftArgmaxImp<'a, $fp> {
            /// `surface` 的形状为 `(H, W)`, 且不能为空.
            pub fn new(surface: ArrayView2<'a, $fp>) -> Self {
                debug_assert!(!surface.is_empty(), "热图不能为空");
                Self { surface }
            }

            /// 通道最大值. 忽略 NaN; 全为 NaN 时为 `-inf`.
            fn max_score(&self) -> f64 {
                self.surface
                    .iter()
                    .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v as f64))
            }

            /// 返回热图网格上的期望坐标 `(x, y)`, 取值 `[0, W - 1] × [0, H - 1]`.
            ///
            /// 若通道中存在 NaN 或 `+inf`, 结果为 `(NaN, NaN)`.
            pub fn expectation(&self) -> (f64, f64) {
                let max = self.max_score();

                // 稳定化: exp(v - max) <= 1, 不会上溢.
                let weights = self.surface.mapv(|v| (v as f64 - max).exp());
                let total: f64 = weights.sum();

                // 列边缘分布 (对行求和) 与行边缘分布 (对列求和).
                let col_marginal = weights.sum_axis(Axis(0));
                let row_marginal = weights.sum_axis(Axis(1));

                let x = expect_index(col_marginal.iter().copied()) / total;
                let y = expect_index(row_marginal.iter().copied()) / total;
                (x, y)
            }
        }
    };
}

impl_soft_argmax!(f32);
impl_soft_argmax!(f64);

/// `Σ i · w_i`.
#[inline]
fn expect_index<I: Iterator<Item = f64>>(weights: I) -> f64 {
    weights.enumerate().map(|(i, w)| i as f64 * w).sum()
}
