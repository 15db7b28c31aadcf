use crate::io::FastqRecord;

/// Whether two records carry the same read name.
///
/// Only the identifier is compared; comments such as `1:N:0` versus `2:N:0`
/// on mate files are ignored.
#[inline]
pub fn ids_match(umi: &FastqRecord, target: &FastqRecord) -> bool {
    umi.id == target.id
}

/// Build the annotated identifier `<id><separator><umi>`.
pub fn annotated_id(id: &[u8], separator: &[u8], umi_seq: &[u8]) -> Vec<u8> {
    let mut new_id = Vec::with_capacity(id.len() + separator.len() + umi_seq.len());
    new_id.extend_from_slice(id);
    new_id.extend_from_slice(separator);
    new_id.extend_from_slice(umi_seq);
    new_id
}

/// Rewrite `target` with the UMI sequence of `umi` appended to its name.
///
/// Returns `None` when the read names differ; the caller emits nothing for
/// that target at this position. Comment, sequence and quality are carried
/// over untouched.
pub fn match_and_rewrite(
    umi: &FastqRecord,
    target: FastqRecord,
    separator: &[u8],
) -> Option<FastqRecord> {
    ids_match(umi, &target).then(|| rewrite(umi, target, separator))
}

/// Append the UMI sequence of `umi` to the name of `target`, unconditionally.
pub fn rewrite(umi: &FastqRecord, target: FastqRecord, separator: &[u8]) -> FastqRecord {
    FastqRecord {
        id: annotated_id(&target.id, separator, &umi.seq),
        ..target
    }
}
