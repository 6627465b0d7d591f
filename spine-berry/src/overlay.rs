//! 结果叠加图与得分图的可视化.
//!
//! 叠加图: 胸椎关键点为蓝色, 腰椎关键点为橙色, 终板连线为黄色,
//! Cobb 角上端椎的上终板与下端椎的下终板为红色. 不绘制文字.

use crate::anatomy::{Region, Vertebra};
use crate::angle::{AngleReport, EndplateKind};
use crate::consts::rgb;
use crate::heatmap::ScoreMaps;
use crate::landmarks::SourceLandmarks;
use crate::Point2d;
use image::{DynamicImage, GrayImage, ImageResult, Luma, Rgb, RgbImage};
use ndarray::Axis;
use std::path::Path;

/// 关键点圆点半径 (像素).
const POINT_RADIUS: i64 = 3;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的对象.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 在原图 (的 RGB 副本) 上绘制关键点与终板.
///
/// `landmarks` 必须是原图空间坐标. 非有限坐标与超出画布的部分会被跳过.
pub fn draw_landmarks(image: &DynamicImage, landmarks: &SourceLandmarks, report: &AngleReport) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for v in Vertebra::ALL {
        let color = match v.region() {
            Region::Thoracic => Rgb(rgb::THORACIC),
            Region::Lumbar => Rgb(rgb::LUMBAR),
        };
        for p in landmarks.vertebra_points(v) {
            fill_circle(&mut canvas, p, POINT_RADIUS, color);
        }
        for kind in [EndplateKind::Superior, EndplateKind::Inferior] {
            let e = landmarks.endplate(v, kind);
            draw_line(&mut canvas, e.anterior, e.posterior, Rgb(rgb::ENDPLATE));
        }
    }

    if let Some((upper, lower)) = report.cobb().pair() {
        let sup = landmarks.endplate(upper, EndplateKind::Superior);
        let inf = landmarks.endplate(lower, EndplateKind::Inferior);
        draw_line(&mut canvas, sup.anterior, sup.posterior, Rgb(rgb::COBB));
        draw_line(&mut canvas, inf.anterior, inf.posterior, Rgb(rgb::COBB));
    }
    canvas
}

/// 四舍五入到像素. 非有限值或绝对值过大时返回 `None`.
#[inline]
fn to_pixel((x, y): Point2d) -> Option<(i64, i64)> {
    let limit = i32::MAX as f64;
    if x.is_finite() && y.is_finite() && x.abs() < limit && y.abs() < limit {
        Some((x.round() as i64, y.round() as i64))
    } else {
        None
    }
}

#[inline]
fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_circle(canvas: &mut RgbImage, center: Point2d, r: i64, color: Rgb<u8>) {
    let Some((cx, cy)) = to_pixel(center) else {
        return;
    };
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                put(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham 直线.
fn draw_line(canvas: &mut RgbImage, from: Point2d, to: Point2d, color: Rgb<u8>) {
    let (Some((mut x0, mut y0)), Some((x1, y1))) = (to_pixel(from), to_pixel(to)) else {
        return;
    };
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(canvas, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

macro_rules! impl_score_maps_vis {
    ($($fp: ty),+) => {
        $(
            /// 逐像素取全部通道的最大得分, 再线性拉伸到 `0 ~ 255`. NaN 记为 0.
            impl ImgWriteVis for ScoreMaps<$fp> {
                fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let proj = self
                        .data()
                        .fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v as f64));
                    let (lo, hi) = proj
                        .iter()
                        .filter(|v| v.is_finite())
                        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
                    let span = if hi > lo { hi - lo } else { 1.0 };
                    let (height, width) = proj.dim();
                    let mut buf = GrayImage::new(width as u32, height as u32);
                    for ((h, w), &v) in proj.indexed_iter() {
                        let gray = if v.is_finite() { ((v - lo) / span * 255.0).round() as u8 } else { 0 };
                        buf.put_pixel(w as u32, h as u32, Luma([gray]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

impl_score_maps_vis!(f32, f64);
