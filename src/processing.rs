use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::{umi_output_path, FastqRecord, FastqSink, RecordStream};
use crate::matcher::{ids_match, rewrite};
use crate::DEFAULT_SEPARATOR;

/// How often (in positions) the progress callback fires.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Inputs of one run: the UMI file, the ordered target files and the separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub umi_source: PathBuf,
    pub target_sources: Vec<PathBuf>,
    pub separator: String,
}

impl MergeConfig {
    pub fn new(umi_source: impl Into<PathBuf>, target_sources: Vec<PathBuf>) -> Self {
        Self {
            umi_source: umi_source.into(),
            target_sources,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Per-target counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetStats {
    pub output: PathBuf,
    /// Annotated records written
    pub written: u64,
    /// Positions where the read name differed from the UMI read name
    pub mismatched: u64,
    /// Positions where this target had a record but the UMI stream had ended
    pub missing_umi: u64,
    /// Positions processed after this target had ended
    pub exhausted: u64,
}

impl TargetStats {
    fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            ..Default::default()
        }
    }

    /// Positions that could not be paired because one side had ended.
    pub fn unpaired(&self) -> u64 {
        self.missing_umi + self.exhausted
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Positions at which at least one stream still had a record
    pub positions: u64,
    /// One entry per target, in target order
    pub targets: Vec<TargetStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Running,
    Done,
}

struct Target {
    stream: RecordStream,
    sink: FastqSink,
    stats: TargetStats,
    ended: bool,
}

/// One UMI stream paired with N target streams and their output sinks.
///
/// Streams and sinks are owned by the session, so every file opened is closed
/// when the session is dropped, whether the run finished or failed.
pub struct MergeSession {
    umi: RecordStream,
    targets: Vec<Target>,
    separator: Vec<u8>,
    position: u64,
    umi_ended: bool,
}

impl MergeSession {
    /// Open every input, then create every output.
    pub fn open(config: &MergeConfig) -> Result<Self> {
        let umi = RecordStream::open(&config.umi_source)?;
        let streams = config
            .target_sources
            .iter()
            .map(|p| RecordStream::open(p))
            .collect::<Result<Vec<_>>>()?;
        let mut targets = Vec::with_capacity(streams.len());
        for (stream, source) in streams.into_iter().zip(&config.target_sources) {
            let sink = FastqSink::create(&umi_output_path(source))?;
            targets.push((stream, sink));
        }
        Ok(Self::from_parts(umi, targets, config.separator.as_bytes()))
    }

    /// Assemble a session from already-opened streams and sinks.
    pub fn from_parts(
        umi: RecordStream,
        targets: Vec<(RecordStream, FastqSink)>,
        separator: &[u8],
    ) -> Self {
        let targets = targets
            .into_iter()
            .map(|(stream, sink)| Target {
                stats: TargetStats::new(sink.path()),
                stream,
                sink,
                ended: false,
            })
            .collect();
        Self {
            umi,
            targets,
            separator: separator.to_vec(),
            position: 0,
            umi_ended: false,
        }
    }

    /// Advance every stream by one record and emit annotated records.
    ///
    /// All records of the position are decoded before anything is written,
    /// so a malformed record never leaves a half-emitted position behind.
    fn step(&mut self) -> Result<SyncState> {
        let umi = self.umi.next_record()?;
        let records = self
            .targets
            .iter_mut()
            .map(|t| t.stream.next_record())
            .collect::<Result<Vec<Option<FastqRecord>>>>()?;

        if umi.is_none() && records.iter().all(Option::is_none) {
            return Ok(SyncState::Done);
        }
        self.position += 1;

        if umi.is_none() && !self.umi_ended {
            self.umi_ended = true;
            warn!(
                "UMI file {} ended after {} records; remaining target records will not be annotated",
                self.umi.label(),
                self.position - 1
            );
        }

        for (target, record) in self.targets.iter_mut().zip(records) {
            let Some(record) = record else {
                if !target.ended {
                    target.ended = true;
                    warn!(
                        "{} ended after {} records, before the other inputs",
                        target.stream.label(),
                        self.position - 1
                    );
                }
                target.stats.exhausted += 1;
                continue;
            };
            let Some(umi) = umi.as_ref() else {
                target.stats.missing_umi += 1;
                continue;
            };
            if !ids_match(umi, &record) {
                debug!(
                    "record {} of {}: read '{}' does not match UMI read '{}'",
                    self.position,
                    target.stream.label(),
                    String::from_utf8_lossy(&record.id),
                    String::from_utf8_lossy(&umi.id)
                );
                target.stats.mismatched += 1;
                continue;
            }
            target.sink.write_record(&rewrite(umi, record, &self.separator))?;
            target.stats.written += 1;
        }
        Ok(SyncState::Running)
    }

    /// Run until every stream is exhausted, then flush and close the sinks.
    ///
    /// `on_progress` receives the number of positions processed every
    /// `PROGRESS_INTERVAL` positions and once more at the end.
    pub fn run<F: FnMut(u64)>(mut self, mut on_progress: F) -> Result<MergeSummary> {
        while self.step()? == SyncState::Running {
            if self.position % PROGRESS_INTERVAL == 0 {
                on_progress(self.position);
            }
        }
        on_progress(self.position);

        let mut summary = MergeSummary {
            positions: self.position,
            targets: Vec::with_capacity(self.targets.len()),
        };
        for target in self.targets {
            target.sink.finish()?;
            summary.targets.push(target.stats);
        }
        Ok(summary)
    }
}

/// Annotate every target file of `config` with UMIs, writing `<target>.umi`.
pub fn transfer_umis<F: FnMut(u64)>(config: &MergeConfig, on_progress: F) -> Result<MergeSummary> {
    info!(
        "transferring UMIs from {} to {} file(s)",
        config.umi_source.display(),
        config.target_sources.len()
    );
    let session = MergeSession::open(config)?;
    let summary = session.run(on_progress)?;

    info!("processed {} records", summary.positions);
    for t in &summary.targets {
        info!(
            "{}: {} written, {} mismatched, {} unpaired",
            t.output.display(),
            t.written,
            t.mismatched,
            t.unpaired()
        );
    }
    Ok(summary)
}
