//! 训练数据暂存: 将原始 case 目录物化为 nnU-Net raw task 布局.
//!
//! 两种来源:
//!
//! 1. curated 批次目录 ([`curated`]): 子目录名以 `-L`/`-M`/`-R`
//!   组合后缀标记可用侧, 每个在场标志展开为一个 case.
//! 2. 单鼠 triplet 目录 ([`singles`]): 每个子目录内含
//!   `_0000` (CT), `_0001` (PET) 和分割文件各一, 顺序编号为 `caseN`.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod curated;
pub mod singles;

/// 文件物化模式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// 符号链接 (默认).
    #[default]
    Symlink,

    /// 硬链接.
    Hardlink,

    /// 物理拷贝.
    Copy,
}

impl CopyMode {
    /// 从命令行文本解析物化模式. 供 `clap` 的 `value_parser` 使用.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "symlink" => Ok(Self::Symlink),
            "hardlink" => Ok(Self::Hardlink),
            "copy" => Ok(Self::Copy),
            other => Err(format!("未知的物化模式: {other} (可选 symlink/hardlink/copy)")),
        }
    }
}

impl FromStr for CopyMode {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Symlink => "symlink",
            Self::Hardlink => "hardlink",
            Self::Copy => "copy",
        })
    }
}

/// 将 `src` 按 `mode` 物化到 `dst`.
///
/// 父目录按需创建; 已存在的目标文件 (含悬空符号链接) 先被删除.
pub fn materialize(src: &Path, dst: &Path, mode: CopyMode) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst)?;
    }
    match mode {
        CopyMode::Symlink => symlink(src, dst),
        CopyMode::Hardlink => fs::hard_link(src, dst),
        CopyMode::Copy => fs::copy(src, dst).map(|_| ()),
    }
}

/// 暂存运行时错误.
#[derive(Debug)]
pub enum StageError {
    /// 底层 I/O 错误.
    Io(io::Error),

    /// 源目录中没有任何可暂存的 case.
    NoCases,
}

impl From<io::Error> for StageError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NoCases => f.write_str("no stageable cases found in source directory"),
        }
    }
}

impl Error for StageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::NoCases => None,
        }
    }
}

/// 获取 `{用户主目录}/NanoMask` 目录下给定继续项组成的全路径.
pub fn home_nanomask_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("NanoMask");
    ans.extend(it);
    Some(ans)
}

/// 极简 glob 匹配. 仅支持 `*` 通配符, 足以覆盖
/// `{tag}_*_0000.nii.gz` / `*_label.nii.gz` 这类文件名模式.
pub(crate) fn glob_match(pattern: &str, name: &str) -> bool {
    fn go(p: &[u8], n: &[u8]) -> bool {
        match p.split_first() {
            None => n.is_empty(),
            Some((&b'*', rest)) => (0..=n.len()).any(|i| go(rest, &n[i..])),
            Some((c, rest)) => n.split_first().is_some_and(|(d, nr)| c == d && go(rest, nr)),
        }
    }
    go(pattern.as_bytes(), name.as_bytes())
}

/// 按名称升序列出 `dir` 下的直接子目录.
pub(crate) fn sorted_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut ans: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    ans.sort();
    Ok(ans)
}

/// 目录项的 UTF-8 文件名. 非 UTF-8 名称返回 `None` (随后被调用方跳过).
pub(crate) fn file_name_str(p: &Path) -> Option<&str> {
    p.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("s01_*_0000.nii.gz", "s01_ct_0000.nii.gz"));
        assert!(glob_match("*_label.nii.gz", "mouse_label.nii.gz"));
        assert!(glob_match("label.nii.gz", "label.nii.gz"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("*_label.nii.gz", "mouse_mask.nii.gz"));
        assert!(!glob_match("s01_*_0000.nii.gz", "s02_ct_0000.nii.gz"));
        assert!(!glob_match("label.nii", "label.nii.gz"));
    }

    #[test]
    fn test_copy_mode_parse() {
        assert_eq!(CopyMode::parse("symlink"), Ok(CopyMode::Symlink));
        assert_eq!(CopyMode::parse("hardlink"), Ok(CopyMode::Hardlink));
        assert_eq!(CopyMode::parse("copy"), Ok(CopyMode::Copy));
        assert!(CopyMode::parse("move").is_err());
        assert_eq!("symlink".parse::<CopyMode>(), Ok(CopyMode::Symlink));
    }

    #[test]
    fn test_materialize_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.nii.gz");
        std::fs::write(&src, b"one").unwrap();
        let dst = tmp.path().join("tree/imagesTr/case1_0000.nii.gz");

        materialize(&src, &dst, CopyMode::Copy).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"one");

        std::fs::write(&src, b"two").unwrap();
        materialize(&src, &dst, CopyMode::Symlink).unwrap();
        assert!(dst.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&dst).unwrap(), b"two");
    }
}
