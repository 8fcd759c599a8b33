use crate::error::{MergeError, MergeResult};
use crate::log_line_util::{LogLine, Timestamp};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters reported by a finished merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub from_a: usize,
    pub from_b: usize,
    pub written: usize,
    pub out_of_order_a: usize,
    pub out_of_order_b: usize,
}

/// Reads one input line by line and turns every line into a `LogLine`.
struct LineSource<R> {
    reader: R,
    name: String,
    line_number: usize,
    exhausted: bool,
    last_timestamp: Option<Timestamp>,
    out_of_order: usize,
}

impl<R: BufRead> LineSource<R> {
    fn new(reader: R, name: &str) -> Self {
        LineSource {
            reader,
            name: name.to_string(),
            line_number: 0,
            exhausted: false,
            last_timestamp: None,
            out_of_order: 0,
        }
    }

    fn next_line(&mut self) -> MergeResult<Option<LogLine>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut raw = String::new();
        let read = match self.reader.read_line(&mut raw) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(MergeError::parse(
                    &self.name,
                    self.line_number + 1,
                    "record is not valid UTF-8",
                ));
            }
            Err(e) => return Err(MergeError::io(&self.name, "read", e)),
        };
        if read == 0 {
            self.exhausted = true;
            debug!(source = %self.name, lines = self.line_number, "input exhausted");
            return Ok(None);
        }
        self.line_number += 1;
        // unterminated last line must not fuse with the next record on output
        if !raw.ends_with('\n') {
            raw.push('\n');
        }
        let line = LogLine::parse(raw, &self.name, self.line_number)?;
        self.check_order(&line);
        Ok(Some(line))
    }

    fn check_order(&mut self, line: &LogLine) {
        if let Some(previous) = &self.last_timestamp {
            if line.timestamp().compare(previous) == Some(Ordering::Less) {
                if self.out_of_order == 0 {
                    warn!(
                        source = %self.name,
                        line = line.line_number(),
                        timestamp = %line.timestamp(),
                        previous = %previous,
                        "input is not sorted by timestamp, merged output will not be sorted either"
                    );
                }
                self.out_of_order += 1;
            }
        }
        self.last_timestamp = Some(line.timestamp().clone());
    }
}

/// Two-way streaming merge of timestamp-sorted JSON Lines inputs.
///
/// Each input has a lookahead slot holding at most one parsed record. When both
/// slots are filled the record with the smaller timestamp is written, the first
/// input winning ties. Once one input runs dry the other is drained without
/// comparisons. Memory use does not depend on the input sizes.
#[derive(Debug, Clone, Default)]
pub struct StreamMerger {
    cancel: Option<Arc<AtomicBool>>,
}

impl StreamMerger {
    pub fn new() -> Self {
        StreamMerger { cancel: None }
    }

    /// Checked once per loop iteration; a set flag aborts with `MergeError::Cancelled`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(AtomicOrdering::Relaxed))
    }

    pub fn merge<RA, RB, W>(
        &self,
        input_a: RA,
        name_a: &str,
        input_b: RB,
        name_b: &str,
        output: &mut W,
        output_name: &str,
    ) -> MergeResult<MergeStats>
    where
        RA: BufRead,
        RB: BufRead,
        W: Write,
    {
        let mut source_a = LineSource::new(input_a, name_a);
        let mut source_b = LineSource::new(input_b, name_b);
        let mut slot_a: Option<LogLine> = None;
        let mut slot_b: Option<LogLine> = None;
        let mut stats = MergeStats::default();

        loop {
            if self.is_cancelled() {
                return Err(MergeError::Cancelled);
            }
            if slot_a.is_none() {
                slot_a = source_a.next_line()?;
            }
            if slot_b.is_none() {
                slot_b = source_b.next_line()?;
            }

            match (slot_a.take(), slot_b.take()) {
                (Some(line_a), Some(line_b)) => {
                    let ordering = line_a
                        .timestamp()
                        .compare(line_b.timestamp())
                        .ok_or_else(|| {
                            MergeError::parse(
                                name_b,
                                line_b.line_number(),
                                format!(
                                    "timestamp {} cannot be compared with timestamp {} at {}:{}",
                                    line_b.timestamp(),
                                    line_a.timestamp(),
                                    name_a,
                                    line_a.line_number()
                                ),
                            )
                        })?;
                    if ordering != Ordering::Greater {
                        emit(output, output_name, &line_a)?;
                        stats.from_a += 1;
                        slot_b = Some(line_b);
                    } else {
                        emit(output, output_name, &line_b)?;
                        stats.from_b += 1;
                        slot_a = Some(line_a);
                    }
                }
                (Some(line_a), None) => {
                    emit(output, output_name, &line_a)?;
                    stats.from_a += 1;
                    slot_a = source_a.next_line()?;
                }
                (None, Some(line_b)) => {
                    emit(output, output_name, &line_b)?;
                    stats.from_b += 1;
                    slot_b = source_b.next_line()?;
                }
                (None, None) => break,
            }
        }

        output
            .flush()
            .map_err(|e| MergeError::io(output_name, "flush", e))?;
        stats.written = stats.from_a + stats.from_b;
        stats.out_of_order_a = source_a.out_of_order;
        stats.out_of_order_b = source_b.out_of_order;
        Ok(stats)
    }

    /// Merges two files into `output_path`, creating or truncating it.
    /// Paths ending in `.gz` are read and written gzip-compressed. The
    /// `merge_logs` binary always writes a plain `merged_log.jsonl`, so gzip
    /// output is only available through this call.
    pub fn merge_files(
        &self,
        path_a: &Path,
        path_b: &Path,
        output_path: &Path,
    ) -> MergeResult<MergeStats> {
        info!(
            input_a = %path_a.display(),
            input_b = %path_b.display(),
            output = %output_path.display(),
            "merging logs"
        );
        let input_a = open_input(path_a)?;
        let input_b = open_input(path_b)?;
        let name_a = path_a.display().to_string();
        let name_b = path_b.display().to_string();
        let output_name = output_path.display().to_string();

        let file = File::create(output_path).map_err(|e| MergeError::io(output_path, "create", e))?;
        let writer = BufWriter::new(file);

        let stats = if is_gzip(output_path) {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            let stats = self.merge(input_a, &name_a, input_b, &name_b, &mut encoder, &output_name)?;
            let mut writer = encoder
                .finish()
                .map_err(|e| MergeError::io(output_path, "finish", e))?;
            writer
                .flush()
                .map_err(|e| MergeError::io(output_path, "flush", e))?;
            stats
        } else {
            let mut writer = writer;
            self.merge(input_a, &name_a, input_b, &name_b, &mut writer, &output_name)?
        };

        debug!(
            from_a = stats.from_a,
            from_b = stats.from_b,
            written = stats.written,
            "merge finished"
        );
        Ok(stats)
    }
}

fn emit<W: Write>(output: &mut W, output_name: &str, line: &LogLine) -> MergeResult<()> {
    output
        .write_all(line.as_bytes())
        .map_err(|e| MergeError::io(output_name, "write", e))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

fn open_input(path: &Path) -> MergeResult<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| MergeError::io(path, "open", e))?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Shorthand for `StreamMerger::new().merge_files(..)`.
pub fn merge_logs(path_a: &Path, path_b: &Path, output_path: &Path) -> MergeResult<MergeStats> {
    StreamMerger::new().merge_files(path_a, path_b, output_path)
}
