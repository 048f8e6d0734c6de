//! 程序运行函数.

use nodule_cube::pipeline::{CubeExtractor, RunSummary};

use crate::env;

/// 实际运行.
pub fn run() -> nodule_cube::Result<RunSummary> {
    let config = env::config_from_env_or_home();
    log::info!(
        "table: {}, output: {}, voxel: {} mm",
        config.table_path.display(),
        config.output_dir.display(),
        config.target_voxel_mm
    );

    CubeExtractor::new(config).run()
}
