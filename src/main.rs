use std::env;
use std::io::Write;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{error, info};

use rnaseq_map::cli::parse;
use rnaseq_map::config::defs::{log_level, RunConfig};
use rnaseq_map::pipelines::rnaseq_map as mapping;


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    Builder::new()
        .filter_level(log_level(args.verbose))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let dir = env::current_dir()?;
    let run_config = match RunConfig::from_args(args, dir) {
        Ok(config) => config,
        Err(e) => {
            error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
            std::process::exit(1);
        }
    };

    info!("The current directory is {:?}", run_config.cwd);

    match mapping::run(&run_config).await {
        Ok(summary) => {
            info!(
                "{} mapping tasks in {}",
                summary.task_count,
                summary.script_path.display()
            );
        }
        Err(e) => {
            error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
            std::process::exit(1);
        }
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}
