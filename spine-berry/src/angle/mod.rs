//! 脊柱畸形角度计算: Cobb 角, 胸椎后凸角, 腰椎前凸角, 以及相邻节段角.

mod endplate;
mod engine;
mod report;

pub use endplate::{angle_between, endplate_angle, Endplate, EndplateKind};

pub use engine::{
    cobb_search, compute_all_angles, compute_cobb_angle, compute_kyphosis, compute_lordosis,
    compute_segment_angles,
};

pub use report::{AngleReport, CobbAngle, KyphosisAngle, LordosisAngle, SegmentAngle};

pub(crate) use report::round1;
