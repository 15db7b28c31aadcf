pub mod error;
pub mod io;
pub mod matcher;
pub mod processing;

pub use error::{Result, UmiTransError};
pub use processing::{transfer_umis, MergeConfig, MergeSummary, TargetStats};

/// Separator placed between the read identifier and the UMI sequence.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Suffix appended to each target path to name its annotated output.
pub const OUTPUT_SUFFIX: &str = ".umi";

/// Split a FASTQ header (without the leading `@`) into identifier and comment.
///
/// The identifier runs up to the first space or tab; the comment is whatever
/// follows that single delimiter. An empty remainder yields `None`.
pub fn split_header(header: &[u8]) -> (&[u8], Option<&[u8]>) {
    match header.iter().position(|&b| b == b' ' || b == b'\t') {
        Some(i) => {
            let comment = &header[i + 1..];
            (&header[..i], (!comment.is_empty()).then_some(comment))
        }
        None => (header, None),
    }
}
