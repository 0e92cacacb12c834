//! nifti 仿射矩阵提取与比较.
//!
//! nifti-1 header 不直接存储 4x4 仿射矩阵, 需要按优先级从
//! sform (`srow_*`), qform (四元数) 或 `pixdim` 三者之一恢复.
//! 该优先级与主流加载器 (nibabel 等) 的行为保持一致.

use nifti::NiftiHeader;

/// 体素索引到物理空间坐标的 4x4 仿射矩阵, 行优先.
pub type Affine4 = [[f64; 4]; 4];

/// 从 nifti header 恢复仿射矩阵.
///
/// 1. 若 `sform_code > 0`, 前三行直接取 `srow_x/srow_y/srow_z`;
/// 2. 否则, 若 `qform_code > 0`, 由四元数和 `pixdim` 重建;
/// 3. 否则, 退化为 `diag(pixdim[1..4], 1)`, 平移为 0.
pub fn from_header(h: &NiftiHeader) -> Affine4 {
    if h.sform_code > 0 {
        return from_srows(h);
    }
    if h.qform_code > 0 {
        return from_quaternion(h);
    }

    let mut ans = [[0.0; 4]; 4];
    for (i, row) in ans.iter_mut().enumerate().take(3) {
        row[i] = h.pixdim[i + 1] as f64;
    }
    ans[3][3] = 1.0;
    ans
}

/// 判断两个仿射矩阵是否在逐元素绝对容差 `atol` 内一致.
pub fn allclose(a: &Affine4, b: &Affine4, atol: f64) -> bool {
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| (x - y).abs() <= atol)
}

fn from_srows(h: &NiftiHeader) -> Affine4 {
    let mut ans = [[0.0; 4]; 4];
    for (row, srow) in ans.iter_mut().zip([&h.srow_x, &h.srow_y, &h.srow_z]) {
        for (dst, src) in row.iter_mut().zip(srow.iter()) {
            *dst = *src as f64;
        }
    }
    ans[3][3] = 1.0;
    ans
}

fn from_quaternion(h: &NiftiHeader) -> Affine4 {
    let (b, c, d) = (
        h.quatern_b as f64,
        h.quatern_c as f64,
        h.quatern_d as f64,
    );
    // 浮点误差可能让 1 - (b^2+c^2+d^2) 轻微为负.
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    let rot = [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - b * b - c * c,
        ],
    ];

    // qfac 约定存储在 pixdim[0], 仅取其符号.
    let qfac = if (h.pixdim[0] as f64) < 0.0 { -1.0 } else { 1.0 };
    let scale = [h.pixdim[1] as f64, h.pixdim[2] as f64, qfac * h.pixdim[3] as f64];
    // 磁盘格式的 qoffset_* 字段在 nifti crate 的 header 中命名为 quatern_{x,y,z}.
    let offset = [h.quatern_x as f64, h.quatern_y as f64, h.quatern_z as f64];

    let mut ans = [[0.0; 4]; 4];
    for i in 0..3 {
        for j in 0..3 {
            ans[i][j] = rot[i][j] * scale[j];
        }
        ans[i][3] = offset[i];
    }
    ans[3][3] = 1.0;
    ans
}
