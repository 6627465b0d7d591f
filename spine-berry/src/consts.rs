//! 通用常量.

/// 三通道颜色, 供结果叠加图使用.
pub mod rgb {
    /// 胸椎关键点颜色 (蓝).
    pub const THORACIC: [u8; 3] = [0, 180, 255];

    /// 腰椎关键点颜色 (橙).
    pub const LUMBAR: [u8; 3] = [255, 140, 0];

    /// 终板连线颜色 (黄).
    pub const ENDPLATE: [u8; 3] = [255, 255, 0];

    /// Cobb 角端椎终板颜色 (红).
    pub const COBB: [u8; 3] = [255, 50, 50];
}

/// 椎骨个数 (T1 ~ L5).
pub const N_VERTEBRAE: usize = 17;

/// 胸椎个数 (T1 ~ T12).
pub const N_THORACIC: usize = 12;

/// 每个椎骨上的关键点个数.
pub const N_ROLES: usize = 6;

/// 关键点总数. 模型输出的热图通道数也必须与之相同.
pub const N_LANDMARKS: usize = N_VERTEBRAE * N_ROLES;

/// 相邻椎骨对的个数, 即节段角个数.
pub const N_SEGMENTS: usize = N_VERTEBRAE - 1;

/// 模型默认输入分辨率 (正方形边长).
pub const MODEL_RESOLUTION: usize = 512;

/// 模型默认的热图下采样倍率. 512 输入对应 128 热图.
pub const HEATMAP_STRIDE: usize = 4;

/// 椎骨内各角色的偏移量. 与 [`crate::anatomy::LandmarkRole`] 的顺序一致.
pub mod offset {
    /// 上终板前缘.
    pub const SUP_ANT: usize = 0;

    /// 上终板后缘.
    pub const SUP_POST: usize = 1;

    /// 下终板前缘.
    pub const INF_ANT: usize = 2;

    /// 下终板后缘.
    pub const INF_POST: usize = 3;

    /// 左椎弓根.
    pub const PEDICLE_LEFT: usize = 4;

    /// 右椎弓根.
    pub const PEDICLE_RIGHT: usize = 5;
}
