//! 🫁欢迎光临🧊
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Direction, Idx3d, NormCenter, Spacing};

pub use crate::data::{normalize, normalize_volume, CtVolume, CtWindow, IDENTITY_DIRECTION};

pub use crate::consts::{CUBE_EDGE, MALIGNANCY_BUCKETS, MAX_RESIZE_CHANNELS, TARGET_VOXEL_MM};

pub use crate::cube::{extract_cube, extract_cube_with_edge, CubeWindow};
pub use crate::dataset::{patient_loader, Annotation, AnnotationTable, PatientAnnotations};
pub use crate::pipeline::{CubeExtractor, PatientSummary, RunSummary};
pub use crate::record::{BucketWriters, Labels, Record, RecordReader, RecordWriter};
pub use crate::resample::{LinearResize, PlaneStackResize, Resampler};

pub use crate::{Error, ExtractConfig, Result};
