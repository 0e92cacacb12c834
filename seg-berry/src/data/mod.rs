use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayViewMut, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::Idx3d;

pub mod affine;

pub use affine::Affine4;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 3D 标签 nifti 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取体素索引到物理空间坐标的 4x4 仿射矩阵.
    #[inline]
    fn affine(&self) -> Affine4 {
        affine::from_header(self.header())
    }
}

/// nii 格式 3D 分割标签, 包括 header 和多类标签体积. 标签值以 `i16` 保存.
///
/// 与模型预测输出保持同一整数宽度, 因此既可建模多类主预测,
/// 也可建模二值辅助预测.
#[derive(Debug, Clone)]
pub struct SegLabel {
    header: BoxedHeader,
    data: Array3<i16>,
}

impl NiftiHeaderAttr for SegLabel {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for SegLabel {
    type Output = i16;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for SegLabel {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl SegLabel {
    /// 打开 nii 文件格式的 3D 分割标签. `path` 为 nii (或 nii.gz) 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<i16>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<i16>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 从已有 header 和裸标签数据直接组装 `SegLabel` 实体.
    /// 典型用途是在后处理中沿用主预测的空间元信息构建输出体积.
    ///
    /// # 注意
    ///
    /// 1. `data` 按照本 crate 惯用的 \[z, H, W\] 格式组织.
    /// 2. `data` 的形状必须与 `header.dim` 描述一致, 否则程序 panic.
    pub fn from_parts(header: &NiftiHeader, data: Array3<i16>) -> Self {
        let header = Box::new(header.clone());
        assert_eq!(
            data.dim(),
            get_shape_from_header(&header),
            "标签数据与 header 形状不一致"
        );
        Self { header, data }
    }

    /// 将标签体积写入 `path`. 输出沿用 `self` 的 header 元信息,
    /// 数据以 `Int16` 写出; 路径以 `.nii.gz` 结尾时自动压缩.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), nifti::NiftiError> {
        // [z, H, W] -> [W, H, z]. 与读取时的轴重排互逆.
        let data = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&data)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, i16, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, i16, Ix3> {
        self.data.view_mut()
    }

    /// 消耗自身, 返回 header 和标签数据.
    #[inline]
    pub fn into_parts(self) -> (BoxedHeader, Array3<i16>) {
        (self.header, self.data)
    }

    /// 获取标签体积中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: i16) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取标签体积中值大于 0 的体素个数 (即前景体素数).
    #[inline]
    pub fn count_positive(&self) -> usize {
        self.data.iter().filter(|p| **p > 0).count()
    }
}
