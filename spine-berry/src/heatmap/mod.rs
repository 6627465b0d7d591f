//! 热图解码: 将模型输出的 `(102, H, W)` 得分图堆栈解码为模型空间下的关键点坐标.
//!
//! 默认使用 soft-argmax: 把每个通道视为未归一化的对数概率, 取其期望位置,
//! 而不是取最大值位置. 对多峰或有噪声的热图更稳健, 代价是热图不够尖锐时会偏向质心.
//!
//! 热图分辨率通常低于模型输入分辨率 (例如 128 对 512). 解码时 x 乘以 `input_w / W`,
//! y 乘以 `input_h / H`, 从而还原到模型输入的坐标单位.

mod hard_argmax;
mod soft_argmax;

use crate::anatomy::LandmarkId;
use crate::consts::N_LANDMARKS;
use crate::error::ShapeError;
use crate::landmarks::ModelLandmarks;
use crate::{Idx2d, Point2d};
use hard_argmax::hard_argmax;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use soft_argmax::SoftArgmaxImp;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 模型输出的得分图堆栈, 形状为 `(102, H, W)`, 元素为任意实数 (可能含 NaN).
///
/// 该结构是只读的.
#[derive(Clone, Debug)]
pub struct ScoreMaps<T> {
    data: Array3<T>,
}

/// 把热图网格坐标缩放到模型输入坐标, 组装为关键点数组.
fn assemble(grid: &[Point2d], (h, w): Idx2d, (in_h, in_w): Idx2d) -> ModelLandmarks {
    debug_assert_eq!(grid.len(), N_LANDMARKS);
    let sx = in_w as f64 / w as f64;
    let sy = in_h as f64 / h as f64;
    let data = Array2::from_shape_fn((N_LANDMARKS, 2), |(i, c)| match c {
        0 => grid[i].0 * sx,
        _ => grid[i].1 * sy,
    });
    ModelLandmarks::new_unchecked(data)
}

macro_rules! impl_score_maps {
    ($fp: ty) => {
        impl ScoreMaps<$fp> {
            /// 构建得分图堆栈.
            ///
            /// 通道数不等于 102 时返回 `Err(ShapeError::ChannelCount)`;
            /// 空间尺寸为 0 时返回 `Err(ShapeError::EmptySurface)`.
            pub fn new(data: Array3<$fp>) -> Result<Self, ShapeError> {
                let (n, h, w) = data.dim();
                if n != N_LANDMARKS {
                    return Err(ShapeError::ChannelCount {
                        expected: N_LANDMARKS,
                        found: n,
                    });
                }
                if h == 0 || w == 0 {
                    return Err(ShapeError::EmptySurface);
                }
                Ok(Self { data })
            }

            /// 单个热图的形状 `(H, W)`.
            #[inline]
            pub fn surface_shape(&self) -> Idx2d {
                let (_, h, w) = self.data.dim();
                (h, w)
            }

            /// 获取某个关键点对应的通道.
            #[inline]
            pub fn channel(&self, id: LandmarkId) -> ArrayView2<'_, $fp> {
                self.data.index_axis(Axis(0), id.index())
            }

            /// 获得数据的一份不可变 shallow copy.
            #[inline]
            pub fn data(&self) -> ArrayView3<'_, $fp> {
                self.data.view()
            }

            /// 直接获得底层数据.
            #[inline]
            pub fn into_raw(self) -> Array3<$fp> {
                self.data
            }

            /// 在热图网格上做 soft-argmax, 不做缩放.
            ///
            /// 每个坐标都落在 `[0, W - 1] × [0, H - 1]` 内; 含 NaN / `+inf` 的通道得到 `(NaN, NaN)`.
            pub fn soft_argmax_grid(&self) -> Vec<Point2d> {
                self.data
                    .axis_iter(Axis(0))
                    .map(|c| SoftArgmaxImp::<$fp>::new(c).expectation())
                    .collect()
            }

            /// soft-argmax 解码, 并缩放到形状为 `input_shape = (高, 宽)` 的模型输入坐标.
            pub fn decode(&self, input_shape: Idx2d) -> ModelLandmarks {
                assemble(&self.soft_argmax_grid(), self.surface_shape(), input_shape)
            }

            /// 同 [`Self::decode`], 模型输入为 `resolution × resolution` 的正方形.
            #[inline]
            pub fn decode_square(&self, resolution: usize) -> ModelLandmarks {
                self.decode((resolution, resolution))
            }

            /// 硬 argmax 解码: 取每个通道第一个最大值的位置 (行优先), 缩放方式同 [`Self::decode`].
            ///
            /// 仅用于诊断和对照; NaN 被忽略, 全 NaN 通道得到 `(NaN, NaN)`.
            pub fn decode_hard(&self, input_shape: Idx2d) -> ModelLandmarks {
                let grid: Vec<Point2d> = self.data.axis_iter(Axis(0)).map(hard_argmax).collect();
                assemble(&grid, self.surface_shape(), input_shape)
            }
        }

        /// 并发操作部分
        #[cfg(feature = "rayon")]
        impl ScoreMaps<$fp> {
            /// 借助 `rayon`, 并行地对每个通道做 soft-argmax. 结果与 [`Self::decode`] 完全相同.
            pub fn par_decode(&self, input_shape: Idx2d) -> ModelLandmarks {
                let grid: Vec<Point2d> = self
                    .data
                    .axis_iter(Axis(0))
                    .into_par_iter()
                    .map(|c| SoftArgmaxImp::<$fp>::new(c).expectation())
                    .collect();
                assemble(&grid, self.surface_shape(), input_shape)
            }
        }
    };
}

impl_score_maps!(f32);
impl_score_maps!(f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anatomy::{LandmarkRole, Vertebra};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 确定性的伪随机数, 取值 `[-1, 1)`.
    fn lcg(seed: &mut u64) -> f64 {
        *seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((*seed >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }

    #[test]
    fn test_shape_rejected() {
        let e = ScoreMaps::<f32>::new(Array3::zeros((101, 8, 8))).unwrap_err();
        assert_eq!(
            e,
            ShapeError::ChannelCount {
                expected: 102,
                found: 101
            }
        );
        let e = ScoreMaps::<f64>::new(Array3::zeros((102, 0, 8))).unwrap_err();
        assert_eq!(e, ShapeError::EmptySurface);
    }

    /// 全等热图解码为几何中心.
    #[test]
    fn test_uniform_surface_center() {
        let (h, w) = (9, 16);
        let maps = ScoreMaps::<f64>::new(Array3::from_elem((102, h, w), 3.25)).unwrap();
        let lm = maps.decode((h, w));
        for (_, (x, y)) in lm.iter() {
            assert!(f64_eq(x, (w as f64 - 1.0) / 2.0));
            assert!(f64_eq(y, (h as f64 - 1.0) / 2.0));
        }
    }

    #[test]
    fn test_sharp_peak() {
        let mut data = Array3::<f32>::zeros((102, 32, 32));
        let id = LandmarkId::new(Vertebra::T7, LandmarkRole::InferiorPosterior);
        data[(id.index(), 3, 5)] = 1000.0;
        let maps = ScoreMaps::<f32>::new(data).unwrap();
        let (x, y) = maps.decode((32, 32)).get(id);
        assert!(f64_eq(x, 5.0));
        assert!(f64_eq(y, 3.0));
    }

    /// 热图分辨率 128, 模型输入 512: 坐标放大 4 倍.
    #[test]
    fn test_decode_scaling() {
        let mut data = Array3::<f32>::zeros((102, 128, 64));
        data[(0, 10, 20)] = 500.0;
        let maps = ScoreMaps::<f32>::new(data).unwrap();
        let (x, y) = maps.decode_square(512).point(0).unwrap();
        assert!(f64_eq(x, 20.0 * 8.0));
        assert!(f64_eq(y, 10.0 * 4.0));
    }

    /// 巨大的得分不会导致上溢, 且期望值始终落在网格范围内.
    #[test]
    fn test_bounds_with_extreme_scores() {
        let (h, w) = (24, 40);
        let mut seed = 7;
        let data = Array3::from_shape_fn((102, h, w), |(c, _, _)| {
            lcg(&mut seed) * 10f64.powi((c % 8) as i32 * 40)
        });
        let maps = ScoreMaps::<f64>::new(data).unwrap();
        for (x, y) in maps.soft_argmax_grid() {
            assert!(x.is_finite() && y.is_finite());
            assert!((0.0..=(w - 1) as f64).contains(&x), "{x}");
            assert!((0.0..=(h - 1) as f64).contains(&y), "{y}");
        }
    }

    #[test]
    fn test_huge_offset_peak() {
        let mut data = Array3::<f64>::from_elem((102, 16, 16), 1e300);
        data[(4, 12, 2)] = 1e300 + 1e290;
        let (x, y) = ScoreMaps::<f64>::new(data).unwrap().decode((16, 16)).point(4).unwrap();
        assert!(f64_eq(x, 2.0));
        assert!(f64_eq(y, 12.0));
    }

    /// NaN 通道被如实暴露, 其它通道不受影响.
    #[test]
    fn test_nan_channel_surfaced() {
        let mut data = Array3::<f32>::zeros((102, 8, 8));
        data.index_axis_mut(Axis(0), 10).fill(f32::NAN);
        data[(11, 0, 0)] = f32::NAN;
        data[(12, 1, 1)] = f32::INFINITY;
        let lm = ScoreMaps::<f32>::new(data).unwrap().decode((8, 8));
        let bad: Vec<_> = lm.non_finite().iter().map(|id| id.index()).collect();
        assert_eq!(bad, vec![10, 11, 12]);
        let (x, y) = lm.point(13).unwrap();
        assert!(f64_eq(x, 3.5) && f64_eq(y, 3.5));
    }

    #[test]
    fn test_f32_f64_agree() {
        let mut seed = 42;
        let d64 = Array3::from_shape_fn((102, 12, 20), |_| lcg(&mut seed) * 6.0);
        let d32 = d64.mapv(|v| v as f32);
        let a = ScoreMaps::<f64>::new(d64).unwrap().decode_square(512);
        let b = ScoreMaps::<f32>::new(d32).unwrap().decode_square(512);
        for ((_, (ax, ay)), (_, (bx, by))) in a.iter().zip(b.iter()) {
            assert!((ax - bx).abs() < 1e-2 && (ay - by).abs() < 1e-2);
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_decode_matches_serial() {
        let mut seed = 3;
        let data = Array3::from_shape_fn((102, 32, 32), |_| lcg(&mut seed) as f32 * 10.0);
        let maps = ScoreMaps::<f32>::new(data).unwrap();
        assert_eq!(maps.decode_square(512), maps.par_decode((512, 512)));
    }

    #[test]
    fn test_hard_argmax_first_max() {
        let mut data = Array3::<f32>::zeros((102, 6, 6));
        data[(0, 2, 4)] = 5.0;
        data[(0, 4, 1)] = 5.0;
        data[(1, 0, 0)] = f32::NAN;
        data[(1, 5, 5)] = 1.0;
        data.index_axis_mut(Axis(0), 2).fill(f32::NAN);
        let lm = ScoreMaps::<f32>::new(data).unwrap().decode_hard((12, 12));
        assert_eq!(lm.point(0), Some((8.0, 4.0)));
        assert_eq!(lm.point(1), Some((10.0, 10.0)));
        let (x, y) = lm.point(2).unwrap();
        assert!(x.is_nan() && y.is_nan());
        // 全零通道: 第一个像素.
        assert_eq!(lm.point(3), Some((0.0, 0.0)));
    }
}
