use anyhow::{Context, Result};
use clap::Parser;
use merge_logs::output_dir_util::{prepare_output, DEFAULT_OUTPUT_DIR};
use merge_logs::stream_merge_util::StreamMerger;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};

/// Tool to merge logs
#[derive(Parser, Debug)]
#[command(name = "merge_logs", version, about)]
struct Args {
    /// path to the first log file
    file_a: PathBuf,

    /// path to the second log file
    file_b: PathBuf,

    /// output directory, the merged log is written to merged_log.jsonl inside it
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// overwrite the output directory if it exists
    #[arg(short = 'w', long)]
    overwrite: bool,

    /// print debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let output_path = prepare_output(&args.output, args.overwrite)
        .with_context(|| format!("cannot prepare output directory {:?}", args.output))?;

    println!("Merging is started...");
    let start_time = Instant::now();
    let stats = match StreamMerger::new().merge_files(&args.file_a, &args.file_b, &output_path) {
        Ok(stats) => stats,
        Err(e) => {
            warn!(output = %output_path.display(), "merge failed, partial output is invalid");
            return Err(e).with_context(|| {
                format!("failed to merge {:?} and {:?}", args.file_a, args.file_b)
            });
        }
    };
    let elapsed = start_time.elapsed();

    info!(
        from_a = stats.from_a,
        from_b = stats.from_b,
        written = stats.written,
        output = %output_path.display(),
        "merged"
    );
    if stats.out_of_order_a + stats.out_of_order_b > 0 {
        warn!(
            out_of_order_a = stats.out_of_order_a,
            out_of_order_b = stats.out_of_order_b,
            "inputs were not sorted, output order is not guaranteed"
        );
    }
    println!("Merging files took {:.6} sec.", elapsed.as_secs_f64());
    Ok(())
}
