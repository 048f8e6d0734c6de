//! MetaImage (`.mhd` / `.mha`) 格式读取.
//!
//! 文件头由若干 `Key = Value` 行组成, 并以 `ElementDataFile` 行结束.
//! 数据按 x 最快、z 最慢的顺序存放, 正好对应 `(z, y, x)` 的行优先布局.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use ndarray::Array3;
use thiserror::Error;

use crate::data::IDENTITY_DIRECTION;
use crate::{CtVolume, Direction, Spacing};

/// 解析 MetaImage 文件头或数据时的错误.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaImageError {
    /// 缺少必需字段.
    #[error("missing header field `{0}`")]
    MissingField(&'static str),

    /// 字段值无法解析.
    #[error("malformed header field `{key}`: `{value}`")]
    Malformed {
        /// 字段名.
        key: String,
        /// 原始值.
        value: String,
    },

    /// 不是三维数据. 参数为实际维数.
    #[error("expected 3 dimensions, found {0}")]
    Dimensions(usize),

    /// 不支持的体素类型.
    #[error("unsupported element type `{0}`")]
    ElementType(String),

    /// 不支持的数据文件描述, 如 `LIST`.
    #[error("unsupported element data file `{0}`")]
    DataFile(String),

    /// 数据长度不足.
    #[error("data size mismatch: expected {expected} bytes, found {found}")]
    DataSize {
        /// 期望字节数.
        expected: usize,
        /// 实际字节数.
        found: usize,
    },
}

/// 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElementType {
    /// `MET_CHAR`.
    Char,
    /// `MET_UCHAR`.
    UChar,
    /// `MET_SHORT`.
    Short,
    /// `MET_USHORT`.
    UShort,
    /// `MET_INT`.
    Int,
    /// `MET_UINT`.
    UInt,
    /// `MET_FLOAT`.
    Float,
    /// `MET_DOUBLE`.
    Double,
}

/// 按字节序把 `raw` 解码成一列 `$t`, 再转为 `f32`.
macro_rules! decode_as {
    ($raw: expr, $msb: expr, $t: ty) => {{
        const N: usize = std::mem::size_of::<$t>();
        $raw.chunks_exact(N)
            .map(|c| {
                let mut b = [0u8; N];
                b.copy_from_slice(c);
                let v = if $msb {
                    <$t>::from_be_bytes(b)
                } else {
                    <$t>::from_le_bytes(b)
                };
                v as f32
            })
            .collect::<Vec<f32>>()
    }};
}

impl ElementType {
    fn parse(s: &str) -> Result<Self, MetaImageError> {
        let t = match s {
            "MET_CHAR" => Self::Char,
            "MET_UCHAR" => Self::UChar,
            "MET_SHORT" => Self::Short,
            "MET_USHORT" => Self::UShort,
            "MET_INT" => Self::Int,
            "MET_UINT" => Self::UInt,
            "MET_FLOAT" => Self::Float,
            "MET_DOUBLE" => Self::Double,
            other => return Err(MetaImageError::ElementType(other.to_owned())),
        };
        Ok(t)
    }

    /// 单个体素的字节数.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// 把原始字节解码为 `f32`. `msb` 为真时按大端序解码.
    pub fn decode(&self, raw: &[u8], msb: bool) -> Vec<f32> {
        match self {
            Self::Char => decode_as!(raw, msb, i8),
            Self::UChar => decode_as!(raw, msb, u8),
            Self::Short => decode_as!(raw, msb, i16),
            Self::UShort => decode_as!(raw, msb, u16),
            Self::Int => decode_as!(raw, msb, i32),
            Self::UInt => decode_as!(raw, msb, u32),
            Self::Float => decode_as!(raw, msb, f32),
            Self::Double => decode_as!(raw, msb, f64),
        }
    }
}

/// MetaImage 文件头中与读取相关的字段.
#[derive(Clone, Debug, PartialEq)]
pub struct MetaHeader {
    /// 体素个数, 按 `[x, y, z]` 组织 (文件中的原始顺序).
    pub dim_size: [usize; 3],

    /// 体素分辨率, 按 `[x, y, z]` 组织.
    pub element_spacing: [f64; 3],

    /// 方向矩阵, 行优先.
    pub direction: Direction,

    /// 体素类型.
    pub element_type: ElementType,

    /// 是否为大端序.
    pub msb: bool,

    /// 数据是否经 zlib 压缩.
    pub compressed: bool,

    /// 外部数据文件开头需要跳过的字节数. `-1` 表示数据位于文件末尾.
    pub header_size: i64,

    /// `None` 代表 `LOCAL`, 即数据紧跟在文件头之后.
    pub data_file: Option<String>,
}

fn malformed(key: &str, value: &str) -> MetaImageError {
    MetaImageError::Malformed {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>, MetaImageError> {
    value
        .split_whitespace()
        .map(|s| s.parse::<T>().map_err(|_| malformed(key, value)))
        .collect()
}

fn parse_triple<T: std::str::FromStr + Copy>(
    key: &str,
    value: &str,
) -> Result<[T; 3], MetaImageError> {
    match parse_list::<T>(key, value)?.as_slice() {
        &[a, b, c] => Ok([a, b, c]),
        _ => Err(malformed(key, value)),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, MetaImageError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(malformed(key, value)),
    }
}

impl MetaHeader {
    /// 解析文件头. 返回文件头和其后第一个字节的偏移量
    /// (对 `.mha` 而言即数据起始位置).
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), MetaImageError> {
        let mut ndims = None;
        let mut dim_size = None;
        let mut element_spacing = None;
        let mut direction = None;
        let mut element_type = None;
        let mut msb = false;
        let mut compressed = false;
        let mut header_size = 0i64;
        let mut data_file = None;

        let mut pos = 0;
        while pos < bytes.len() {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |i| pos + i);
            let line = String::from_utf8_lossy(&bytes[pos..end]);
            pos = (end + 1).min(bytes.len());

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "NDims" => ndims = Some(value.parse::<usize>().map_err(|_| malformed(key, value))?),
                "DimSize" => dim_size = Some(parse_triple::<usize>(key, value)?),
                "ElementSpacing" => element_spacing = Some(parse_triple::<f64>(key, value)?),
                "ElementSize" if element_spacing.is_none() => {
                    element_spacing = Some(parse_triple::<f64>(key, value)?)
                }
                "TransformMatrix" | "Orientation" | "Rotation" => {
                    let v = parse_list::<f64>(key, value)?;
                    if v.len() != 9 {
                        return Err(malformed(key, value));
                    }
                    let mut d = [[0.0; 3]; 3];
                    for (i, x) in v.into_iter().enumerate() {
                        d[i / 3][i % 3] = x;
                    }
                    direction = Some(d);
                }
                "ElementType" => element_type = Some(ElementType::parse(value)?),
                "ElementByteOrderMSB" | "BinaryDataByteOrderMSB" => msb = parse_bool(key, value)?,
                "CompressedData" => compressed = parse_bool(key, value)?,
                "HeaderSize" => {
                    header_size = value.parse::<i64>().map_err(|_| malformed(key, value))?
                }
                "ElementDataFile" => {
                    data_file = Some(value.to_owned());
                    break;
                }
                _ => {}
            }
        }

        let data_file = data_file.ok_or(MetaImageError::MissingField("ElementDataFile"))?;
        let data_file = match data_file {
            f if f == "LOCAL" => None,
            f if f == "LIST" || f.contains('%') => return Err(MetaImageError::DataFile(f)),
            f => Some(f),
        };
        match ndims {
            Some(3) => {}
            Some(n) => return Err(MetaImageError::Dimensions(n)),
            None => return Err(MetaImageError::MissingField("NDims")),
        }

        let header = Self {
            dim_size: dim_size.ok_or(MetaImageError::MissingField("DimSize"))?,
            element_spacing: element_spacing.unwrap_or([1.0; 3]),
            direction: direction.unwrap_or(IDENTITY_DIRECTION),
            element_type: element_type.ok_or(MetaImageError::MissingField("ElementType"))?,
            msb,
            compressed,
            header_size,
            data_file,
        };
        Ok((header, pos))
    }

    /// 数据形状, 按 `(z, y, x)` 组织.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        let [x, y, z] = self.dim_size;
        (z, y, x)
    }

    /// 体素分辨率, 按 `[z, y, x]` 组织.
    #[inline]
    pub fn spacing(&self) -> Spacing {
        let [x, y, z] = self.element_spacing;
        [z, y, x]
    }

    /// 未压缩数据的字节数.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.dim_size.iter().product::<usize>() * self.element_type.size()
    }

    /// 从 `raw` 中取出实际数据字节: 按需解压, 并处理 `HeaderSize`.
    fn payload(&self, raw: &[u8], skip_header: bool) -> crate::Result<Vec<u8>> {
        let expected = self.data_len();
        let raw = if self.compressed {
            let mut out = Vec::with_capacity(expected);
            ZlibDecoder::new(raw).read_to_end(&mut out)?;
            out
        } else if skip_header && self.header_size < 0 {
            raw[raw.len().saturating_sub(expected)..].to_vec()
        } else if skip_header {
            raw.get(self.header_size as usize..).unwrap_or_default().to_vec()
        } else {
            raw.to_vec()
        };

        if raw.len() < expected {
            return Err(MetaImageError::DataSize {
                expected,
                found: raw.len(),
            }
            .into());
        }
        let mut raw = raw;
        raw.truncate(expected);
        Ok(raw)
    }
}

/// 打开 MetaImage 文件格式的 3D CT 扫描.
///
/// 外部数据文件路径相对于文件头所在目录.
pub(crate) fn read(path: &Path) -> crate::Result<CtVolume> {
    let bytes = fs::read(path)?;
    let (header, offset) = MetaHeader::parse(&bytes)?;

    let payload = match &header.data_file {
        None => header.payload(&bytes[offset..], false)?,
        Some(name) => {
            let data_path = path.parent().unwrap_or(Path::new("")).join(name);
            header.payload(&fs::read(data_path)?, true)?
        }
    };

    let voxels = header.element_type.decode(&payload, header.msb);
    let data = Array3::from_shape_vec(header.shape(), voxels)?;
    Ok(CtVolume::from_parts(data, header.spacing(), header.direction))
}
