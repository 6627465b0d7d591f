//! 关键点坐标数组.
//!
//! 坐标有两种空间: 模型空间 ([`ModelLandmarks`], 固定的正方形分辨率) 和原图空间
//! ([`SourceLandmarks`], 原始图像分辨率). 两者之间只差按轴的线性缩放.
//! 两种类型的底层数据都是形状恰为 `(102, 2)` 的 `Array2<f64>`, 第 0 列为 x, 第 1 列为 y.

use crate::anatomy::{LandmarkId, LandmarkRole, Vertebra};
use crate::angle::{Endplate, EndplateKind};
use crate::consts::{N_LANDMARKS, N_ROLES};
use crate::error::{ScaleError, ShapeError};
use crate::Point2d;
use ndarray::{Array2, ArrayView2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 原图尺寸 (宽, 高), 两者均为正.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageSize {
    width: u32,
    height: u32,
}

impl ImageSize {
    /// 构建原图尺寸. 宽或高为 0 时返回 `Err(ScaleError::NonPositiveDimension)`.
    pub fn new(width: u32, height: u32) -> Result<Self, ScaleError> {
        if width == 0 || height == 0 {
            return Err(ScaleError::NonPositiveDimension);
        }
        Ok(Self { width, height })
    }

    /// 正方形尺寸.
    #[inline]
    pub fn square(side: u32) -> Result<Self, ScaleError> {
        Self::new(side, side)
    }

    /// 宽.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 高.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// 检查数组是否为 `(102, 2)`.
fn check_shape(data: &Array2<f64>) -> Result<(), ShapeError> {
    let (rows, cols) = data.dim();
    if cols != 2 {
        return Err(ShapeError::NotPairs(cols));
    }
    if rows != N_LANDMARKS {
        return Err(ShapeError::LandmarkCount {
            expected: N_LANDMARKS,
            found: rows,
        });
    }
    Ok(())
}

/// 模型空间下的关键点坐标.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelLandmarks {
    data: Array2<f64>,
}

/// 原图空间下的关键点坐标.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceLandmarks {
    data: Array2<f64>,
}

/// 两种坐标空间共用的只读方法集合.
macro_rules! impl_landmarks {
    ($($ty: ty),+) => {
        $(
            impl $ty {
                /// 从 `(102, 2)` 数组构建. 形状不符时返回 `Err`, 不做截断或填充.
                pub fn from_array(data: Array2<f64>) -> Result<Self, ShapeError> {
                    check_shape(&data)?;
                    Ok(Self { data })
                }

                /// 直接初始化. 调用方保证形状为 `(102, 2)`.
                #[inline]
                pub(crate) fn new_unchecked(data: Array2<f64>) -> Self {
                    debug_assert!(check_shape(&data).is_ok());
                    Self { data }
                }

                /// 从按稠密索引排列的点序列构建.
                pub fn from_points(points: &[Point2d]) -> Result<Self, ShapeError> {
                    if points.len() != N_LANDMARKS {
                        return Err(ShapeError::LandmarkCount {
                            expected: N_LANDMARKS,
                            found: points.len(),
                        });
                    }
                    let data = Array2::from_shape_fn((N_LANDMARKS, 2), |(i, c)| match c {
                        0 => points[i].0,
                        _ => points[i].1,
                    });
                    Ok(Self { data })
                }

                /// 获取关键点坐标 `(x, y)`.
                #[inline]
                pub fn get(&self, id: impl Into<LandmarkId>) -> Point2d {
                    let i = id.into().index();
                    (self.data[(i, 0)], self.data[(i, 1)])
                }

                /// 按稠密索引获取坐标. 越界时返回 `None`.
                #[inline]
                pub fn point(&self, index: usize) -> Option<Point2d> {
                    (index < N_LANDMARKS).then(|| (self.data[(index, 0)], self.data[(index, 1)]))
                }

                /// 获取某椎骨的全部 6 个点, 顺序同 [`LandmarkRole::ALL`].
                pub fn vertebra_points(&self, vertebra: Vertebra) -> [Point2d; N_ROLES] {
                    LandmarkRole::ALL.map(|r| self.get((vertebra, r)))
                }

                /// 获取某椎骨的上终板或下终板.
                #[inline]
                pub fn endplate(&self, vertebra: Vertebra, kind: EndplateKind) -> Endplate {
                    let (ant, post) = kind.roles();
                    Endplate::new(self.get((vertebra, ant)), self.get((vertebra, post)))
                }

                /// 以稠密索引顺序迭代 `(标识, 坐标)`.
                pub fn iter(&self) -> impl Iterator<Item = (LandmarkId, Point2d)> + '_ {
                    LandmarkId::iter().map(move |id| (id, self.get(id)))
                }

                /// 所有坐标分量含有 NaN / inf 的关键点.
                pub fn non_finite(&self) -> Vec<LandmarkId> {
                    self.iter()
                        .filter(|(_, (x, y))| !x.is_finite() || !y.is_finite())
                        .map(|(id, _)| id)
                        .collect()
                }

                /// 是否全部坐标都是有限值?
                #[inline]
                pub fn is_finite(&self) -> bool {
                    self.data.iter().all(|v| v.is_finite())
                }

                /// 获得数据的一份不可变 shallow copy.
                #[inline]
                pub fn data(&self) -> ArrayView2<'_, f64> {
                    self.data.view()
                }

                /// 直接获得底层数据.
                #[inline]
                pub fn into_raw(self) -> Array2<f64> {
                    self.data
                }
            }
        )+
    };
}

impl_landmarks!(ModelLandmarks, SourceLandmarks);

/// 对坐标的两列分别乘以 `sx` 和 `sy`.
fn scaled(data: &Array2<f64>, sx: f64, sy: f64) -> Array2<f64> {
    let mut out = data.clone();
    out.column_mut(0).mapv_inplace(|x| x * sx);
    out.column_mut(1).mapv_inplace(|y| y * sy);
    out
}

impl ModelLandmarks {
    /// 将 `resolution × resolution` 模型空间的坐标缩放至尺寸为 `size` 的原图空间.
    ///
    /// x 乘以 `width / resolution`, y 乘以 `height / resolution`.
    /// 这里假设模型输入由非等比缩放得到, 不做长宽比校正.
    pub fn rescale(&self, size: ImageSize, resolution: usize) -> Result<SourceLandmarks, ScaleError> {
        if resolution == 0 {
            return Err(ScaleError::NonPositiveResolution);
        }
        let r = resolution as f64;
        let data = scaled(
            &self.data,
            size.width() as f64 / r,
            size.height() as f64 / r,
        );
        Ok(SourceLandmarks::new_unchecked(data))
    }
}

impl SourceLandmarks {
    /// [`ModelLandmarks::rescale`] 的逆操作.
    pub fn to_model(&self, size: ImageSize, resolution: usize) -> Result<ModelLandmarks, ScaleError> {
        if resolution == 0 {
            return Err(ScaleError::NonPositiveResolution);
        }
        let r = resolution as f64;
        let data = scaled(
            &self.data,
            r / size.width() as f64,
            r / size.height() as f64,
        );
        Ok(ModelLandmarks::new_unchecked(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample_points() -> Vec<Point2d> {
        (0..N_LANDMARKS)
            .map(|i| (i as f64 * 3.7 + 0.25, 511.0 - i as f64 * 2.1))
            .collect()
    }

    #[test]
    fn test_image_size_invalid() {
        assert_eq!(
            ImageSize::new(0, 10).unwrap_err(),
            ScaleError::NonPositiveDimension
        );
        assert_eq!(
            ImageSize::new(10, 0).unwrap_err(),
            ScaleError::NonPositiveDimension
        );
        assert!(ImageSize::new(1, 1).is_ok());
    }

    #[test]
    fn test_shape_rejected() {
        let e = ModelLandmarks::from_array(Array2::zeros((101, 2))).unwrap_err();
        assert_eq!(
            e,
            ShapeError::LandmarkCount {
                expected: 102,
                found: 101
            }
        );
        let e = ModelLandmarks::from_array(Array2::zeros((102, 3))).unwrap_err();
        assert_eq!(e, ShapeError::NotPairs(3));
        let e = SourceLandmarks::from_points(&[(0.0, 0.0); 103]).unwrap_err();
        assert_eq!(
            e,
            ShapeError::LandmarkCount {
                expected: 102,
                found: 103
            }
        );
    }

    #[test]
    fn test_index_layout() {
        let pts = sample_points();
        let lm = ModelLandmarks::from_points(&pts).unwrap();
        for (i, p) in pts.iter().enumerate() {
            assert_eq!(lm.point(i), Some(*p));
            assert_eq!(lm.get(LandmarkId::from_index(i).unwrap()), *p);
        }
        assert_eq!(lm.point(N_LANDMARKS), None);

        let l1 = lm.vertebra_points(Vertebra::L1);
        assert_eq!(l1[0], pts[72]);
        assert_eq!(l1[5], pts[77]);

        let sup = lm.endplate(Vertebra::T2, EndplateKind::Superior);
        assert_eq!((sup.anterior, sup.posterior), (pts[6], pts[7]));
        let inf = lm.endplate(Vertebra::T2, EndplateKind::Inferior);
        assert_eq!((inf.anterior, inf.posterior), (pts[8], pts[9]));
    }

    #[test]
    fn test_rescale() {
        let lm = ModelLandmarks::from_points(&sample_points()).unwrap();
        let size = ImageSize::new(1024, 256).unwrap();
        let src = lm.rescale(size, 512).unwrap();
        for ((_, (mx, my)), (_, (sx, sy))) in lm.iter().zip(src.iter()) {
            assert!(f64_eq(sx, mx * 2.0));
            assert!(f64_eq(sy, my * 0.5));
        }
        assert_eq!(
            lm.rescale(size, 0).unwrap_err(),
            ScaleError::NonPositiveResolution
        );
    }

    /// 缩放到原图再缩放回来, 坐标应当不变.
    #[test]
    fn test_rescale_round_trip() {
        let lm = ModelLandmarks::from_points(&sample_points()).unwrap();
        for (w, h) in [(1, 1), (333, 777), (2048, 1536), (512, 512)] {
            let size = ImageSize::new(w, h).unwrap();
            let back = lm.rescale(size, 512).unwrap().to_model(size, 512).unwrap();
            for ((_, (ax, ay)), (_, (bx, by))) in lm.iter().zip(back.iter()) {
                assert!((ax - bx).abs() < 1e-9 * ax.abs().max(1.0));
                assert!((ay - by).abs() < 1e-9 * ay.abs().max(1.0));
            }
        }
    }

    #[test]
    fn test_non_finite() {
        let mut pts = sample_points();
        pts[7].0 = f64::NAN;
        pts[80].1 = f64::INFINITY;
        let lm = ModelLandmarks::from_points(&pts).unwrap();
        assert!(!lm.is_finite());
        let bad: Vec<_> = lm.non_finite().iter().map(|id| id.index()).collect();
        assert_eq!(bad, vec![7, 80]);
    }
}
