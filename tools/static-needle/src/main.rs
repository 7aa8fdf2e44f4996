//! 静态穿刺针分割命令行程序.
//!
//! 外部程序、工作目录和误差表文件分别可由 `$NEEDLE_SOLVER`, `$NEEDLE_WORK_DIR`
//! 和 `$NEEDLE_METRICS_FILE` 指定.

mod cli;
mod result;
mod runner;

use clap::Parser;
use log::LevelFilter;
use needle_seg::NeedleError;
use simple_logger::SimpleLogger;
use std::error::Error;

fn main() {
    if let Err(err) = try_main() {
        match err.downcast_ref::<NeedleError>() {
            Some(e) => eprintln!("error: {:?}: {e}", e.kind()),
            None => eprintln!("error: {err}"),
        }
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let cli = cli::Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    SimpleLogger::new().with_level(level).init()?;

    let out = runner::run(&cli)?;
    println!("{out}");
    Ok(())
}
