use needletail::errors::{ParseError, ParseErrorKind};
use needletail::{parse_fastx_reader, FastxReader};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, UmiTransError};
use crate::{split_header, OUTPUT_SUFFIX};

/// A FASTQ record owned for the duration of one synchronizer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRecord {
    /// Read name, without the leading `@`
    pub id: Vec<u8>,
    /// Free text following the read name on the header line
    pub comment: Option<Vec<u8>>,
    /// Sequence bytes
    pub seq: Vec<u8>,
    /// Quality string as bytes
    pub qual: Vec<u8>,
}

impl FastqRecord {
    /// Build a record from a raw header (no `@`), sequence and quality.
    pub fn from_parts(header: &[u8], seq: &[u8], qual: &[u8]) -> Self {
        let (id, comment) = split_header(header);
        Self {
            id: id.to_vec(),
            comment: comment.map(|c| c.to_vec()),
            seq: seq.to_vec(),
            qual: qual.to_vec(),
        }
    }
}

/// Result of one decode attempt on a stream.
#[derive(Debug)]
pub enum Decoded {
    Valid(FastqRecord),
    Exhausted,
    /// Content was present but did not form a FASTQ record.
    Malformed(String),
    /// The underlying reader failed.
    Unreadable(String),
}

/// A single-pass FASTQ input, read one record at a time.
///
/// Compressed inputs are detected and decompressed by needletail. A zero-byte
/// input is an empty stream rather than an error.
pub struct RecordStream {
    label: String,
    reader: Option<Box<dyn FastxReader>>,
    position: u64,
}

impl RecordStream {
    /// Open `path` as a record stream labelled with its display name.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| UmiTransError::StreamOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(path.display().to_string(), file)
    }

    /// Wrap any reader as a record stream.
    pub fn from_reader<R: Read + Send + 'static>(label: impl Into<String>, reader: R) -> Result<Self> {
        let label = label.into();
        let reader = match parse_fastx_reader(reader) {
            Ok(r) => Some(r),
            Err(e) if e.kind == ParseErrorKind::EmptyFile => None,
            Err(e) if e.kind == ParseErrorKind::Io => {
                return Err(UmiTransError::Read {
                    stream: label,
                    position: 1,
                    source: io::Error::other(e.to_string()),
                })
            }
            Err(e) => {
                return Err(UmiTransError::MalformedRecord {
                    stream: label,
                    position: 1,
                    content: e.to_string(),
                })
            }
        };
        Ok(Self {
            label,
            reader,
            position: 0,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of records decoded so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Decode the next record without judging it.
    pub fn decode_next(&mut self) -> Decoded {
        let Some(reader) = self.reader.as_mut() else {
            return Decoded::Exhausted;
        };
        let decoded = match reader.next() {
            None => Decoded::Exhausted,
            Some(Err(e)) => decode_failure(&e),
            Some(Ok(rec)) => match rec.qual() {
                Some(qual) => Decoded::Valid(FastqRecord::from_parts(rec.id(), &rec.seq(), qual)),
                None => Decoded::Malformed(format!(
                    "record '{}' has no quality line",
                    String::from_utf8_lossy(rec.id())
                )),
            },
        };
        match decoded {
            Decoded::Valid(_) => self.position += 1,
            // needletail gives no guarantee once it has reported the end
            Decoded::Exhausted => self.reader = None,
            _ => {}
        }
        decoded
    }

    /// Decode and validate the next record.
    ///
    /// Returns `Ok(None)` once the stream is exhausted; malformed or
    /// unreadable content is a fatal error naming this stream.
    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        let attempted = self.position + 1;
        match self.decode_next() {
            Decoded::Valid(rec) => Ok(Some(rec)),
            Decoded::Exhausted => Ok(None),
            Decoded::Malformed(content) => Err(UmiTransError::MalformedRecord {
                stream: self.label.clone(),
                position: attempted,
                content,
            }),
            Decoded::Unreadable(msg) => Err(UmiTransError::Read {
                stream: self.label.clone(),
                position: attempted,
                source: io::Error::other(msg),
            }),
        }
    }
}

fn decode_failure(e: &ParseError) -> Decoded {
    if e.kind == ParseErrorKind::Io {
        Decoded::Unreadable(e.to_string())
    } else {
        Decoded::Malformed(e.to_string())
    }
}

/// Output destination for annotated records of one target.
pub struct FastqSink {
    path: PathBuf,
    writer: Box<dyn Write>,
}

impl FastqSink {
    /// Create (truncating) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let writer = create_fastq_writer(path)?;
        Ok(Self::new(path, writer))
    }

    pub fn new(path: &Path, writer: Box<dyn Write>) -> Self {
        Self {
            path: path.to_path_buf(),
            writer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `@<id> <comment>\n<seq>\n+\n<qual>\n`.
    ///
    /// The space after the identifier is written even when the comment is
    /// absent.
    pub fn write_record(&mut self, rec: &FastqRecord) -> Result<()> {
        self.write_fastq(rec).map_err(|source| UmiTransError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn write_fastq(&mut self, rec: &FastqRecord) -> io::Result<()> {
        let w = &mut self.writer;
        w.write_all(b"@")?;
        w.write_all(&rec.id)?;
        w.write_all(b" ")?;
        if let Some(c) = &rec.comment {
            w.write_all(c)?;
        }
        w.write_all(b"\n")?;
        w.write_all(&rec.seq)?;
        w.write_all(b"\n+\n")?;
        w.write_all(&rec.qual)?;
        w.write_all(b"\n")
    }

    /// Flush buffered output and close the sink.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().map_err(|source| UmiTransError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Create a buffered writer for FASTQ output at `path`.
pub fn create_fastq_writer(path: &Path) -> Result<Box<dyn Write>> {
    let file = File::create(path).map_err(|source| UmiTransError::StreamOpen {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Output path for a target: the target path with `.umi` appended.
pub fn umi_output_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}
