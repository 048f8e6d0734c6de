//! 将肺部 CT 扫描按结节标注切分为固定大小的训练样本, 并按恶性程度评分分桶写出.
//!
//! 无命令行参数. 路径和分辨率从环境变量读取, 见 [`env`].

mod env;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .expect("Logger init error");

    match runner::run() {
        Ok(summary) => log::info!(
            "done: {} patients, {} records",
            summary.patients.len(),
            summary.total_written()
        ),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
