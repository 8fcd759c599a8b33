use anyhow::{Context, Result};
use getopts::Options;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use tracing::info;

const LOG_LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];
const BASE_TIMESTAMP: u64 = 1_600_000_000_000;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("a", "output1", "set first output file name", "NAME");
    opts.optopt("b", "output2", "set second output file name", "NAME");
    opts.optopt("n", "records", "records per file. default value is 1000.", "COUNT");
    opts.optopt("s", "seed", "random seed. default value is 0.", "SEED");
    opts.optflag("h", "help", "print this help menu");

    let matches = opts.parse(&args[1..]).context("cannot parse arguments")?;
    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return Ok(());
    }

    let output_file_a = matches.opt_str("a").unwrap_or("log_a.jsonl".to_string());
    let output_file_b = matches.opt_str("b").unwrap_or("log_b.jsonl".to_string());
    let records: usize = match matches.opt_str("n") {
        Some(n) => n.parse().with_context(|| format!("invalid record count {:?}", n))?,
        None => 1000,
    };
    let seed: u64 = match matches.opt_str("s") {
        Some(s) => s.parse().with_context(|| format!("invalid seed {:?}", s))?,
        None => 0,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut rng = StdRng::seed_from_u64(seed);
    write_log(&output_file_a, records, "a", &mut rng)?;
    write_log(&output_file_b, records, "b", &mut rng)?;
    info!(
        records,
        output_a = %output_file_a,
        output_b = %output_file_b,
        "logs written"
    );
    Ok(())
}

fn write_log(path: &str, records: usize, tag: &str, rng: &mut StdRng) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
    let mut writer = BufWriter::new(file);
    let mut timestamp = BASE_TIMESTAMP;
    for i in 0..records {
        timestamp += rng.gen_range(1..1000);
        let record = json!({
            "timestamp": timestamp,
            "log_level": LOG_LEVELS[rng.gen_range(0..LOG_LEVELS.len())],
            "message": format!("{} record {}", tag, i),
        });
        writeln!(writer, "{}", record).with_context(|| format!("cannot write {}", path))?;
    }
    writer.flush().with_context(|| format!("cannot flush {}", path))?;
    Ok(())
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}
