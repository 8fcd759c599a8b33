use anyhow::{anyhow, Context, Result};
use getopts::{Matches, Options};
use merge_logs::log_line_util::LogLine;
use std::cmp::Ordering;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process;
use tracing::{error, info};

/// First place where a log stops being sorted.
#[derive(Debug, PartialEq)]
struct Disorder {
    line_number: usize,
    timestamp: String,
    previous: String,
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} FILE [options]", program);
    print!("{}", opts.usage(&brief));
}

fn input_file(matches: &Matches) -> Result<String> {
    matches
        .free
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("missing input FILE"))
}

/// Line count of a sorted log, or the first out-of-order line.
fn check_log(input_file: &str) -> Result<std::result::Result<usize, Disorder>> {
    let file = File::open(input_file).with_context(|| format!("cannot open {}", input_file))?;
    let reader = BufReader::new(file);
    let mut previous: Option<LogLine> = None;
    let mut count: usize = 0;
    for (i, line) in reader.lines().enumerate() {
        let raw = line.with_context(|| format!("cannot read {}", input_file))?;
        let current = LogLine::parse(raw, input_file, i + 1)?;
        if let Some(prev) = &previous {
            // incomparable kinds count as unsorted
            if matches!(current.timestamp().compare(prev.timestamp()), Some(Ordering::Less) | None) {
                return Ok(Err(Disorder {
                    line_number: current.line_number(),
                    timestamp: current.timestamp().to_string(),
                    previous: prev.timestamp().to_string(),
                }));
            }
        }
        count += 1;
        previous = Some(current);
    }
    Ok(Ok(count))
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    let matches = opts.parse(&args[1..]).context("cannot parse arguments")?;
    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return Ok(());
    }
    let input_file = match input_file(&matches) {
        Ok(f) => f,
        Err(e) => {
            print_usage(&program, &opts);
            return Err(e);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match check_log(&input_file)? {
        Ok(lines) => {
            info!(file = %input_file, lines, "sorted");
            Ok(())
        }
        Err(disorder) => {
            error!(
                file = %input_file,
                line = disorder.line_number,
                timestamp = %disorder.timestamp,
                previous = %disorder.previous,
                "not sorted"
            );
            process::exit(1);
        }
    }
}
