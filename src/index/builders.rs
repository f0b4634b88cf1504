//! Built-in indexing strategies
//!
//! Each builder scans its source exactly once and produces an immutable
//! resolver. Source problems (missing files, truncated frames, checksum
//! mismatches, unsorted or duplicate keys) are reported as
//! `CORPUS_INDEX_MALFORMED_MANIFEST` for the manifest being built.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::{IndexError, IndexResult};
use super::manifest::{resolve_path, strategy, IndexManifest};
use super::path::{
    ChunkPath, FixedSizeResolver, KeyTableResolver, KeyedChunk, OffsetTableResolver, PathResolver,
};

/// Frame header of a `sequential-offset` record: payload length + crc32
pub const FRAME_HEADER_LEN: u64 = 8;

/// Inputs shared by every build in a batch
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub base_dir: Option<PathBuf>,
    pub default_chunk_size: u64,
}

impl BuildContext {
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }
}

/// Builds the resolver for one strategy identifier.
pub trait IndexBuilder: Send + Sync {
    fn strategy(&self) -> &str;

    fn build(
        &self,
        manifest: &IndexManifest,
        ctx: &BuildContext,
    ) -> IndexResult<Arc<dyn PathResolver>>;
}

fn open_source(manifest: &IndexManifest, path: &Path) -> IndexResult<File> {
    File::open(path).map_err(|e| {
        IndexError::unreachable_source(
            manifest.id(),
            format!("cannot open source {}", path.display()),
            e,
        )
    })
}

fn source_len(manifest: &IndexManifest, path: &Path) -> IndexResult<u64> {
    fs::metadata(path).map(|m| m.len()).map_err(|e| {
        IndexError::unreachable_source(
            manifest.id(),
            format!("cannot stat source {}", path.display()),
            e,
        )
    })
}

fn read_failed(manifest: &IndexManifest, path: &Path, e: io::Error) -> IndexError {
    IndexError::unreachable_source(
        manifest.id(),
        format!("read of {} failed", path.display()),
        e,
    )
}

// ============================================================================
// fixed-size
// ============================================================================

/// Equal byte ranges over one file
#[derive(Debug, Default)]
pub struct FixedSizeBuilder;

impl IndexBuilder for FixedSizeBuilder {
    fn strategy(&self) -> &str {
        strategy::FIXED_SIZE
    }

    fn build(
        &self,
        manifest: &IndexManifest,
        ctx: &BuildContext,
    ) -> IndexResult<Arc<dyn PathResolver>> {
        let file = manifest.single_file(ctx.base_dir())?;
        let chunk_size = manifest
            .positive_option("chunk_size")?
            .unwrap_or(ctx.default_chunk_size);
        let len = source_len(manifest, &file)?;
        Ok(Arc::new(FixedSizeResolver::new(file, len, chunk_size)))
    }
}

// ============================================================================
// sequential-offset
// ============================================================================

/// Framed records: `u32 LE length`, `u32 LE crc32`, payload
#[derive(Debug, Default)]
pub struct SequentialOffsetBuilder;

impl SequentialOffsetBuilder {
    /// Fill `header`, or report a clean end of file before its first byte.
    fn read_header(reader: &mut impl Read, header: &mut [u8; 8]) -> io::Result<Option<usize>> {
        let mut filled = 0;
        while filled < header.len() {
            match reader.read(&mut header[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(if filled == 0 { None } else { Some(filled) })
    }
}

impl IndexBuilder for SequentialOffsetBuilder {
    fn strategy(&self) -> &str {
        strategy::SEQUENTIAL_OFFSET
    }

    fn build(
        &self,
        manifest: &IndexManifest,
        ctx: &BuildContext,
    ) -> IndexResult<Arc<dyn PathResolver>> {
        let path = manifest.single_file(ctx.base_dir())?;
        let file_len = source_len(manifest, &path)?;
        let mut reader = BufReader::new(open_source(manifest, &path)?);

        let mut entries = Vec::new();
        let mut offset = 0u64;
        let mut header = [0u8; 8];
        let mut payload = Vec::new();

        loop {
            let filled = match Self::read_header(&mut reader, &mut header)
                .map_err(|e| read_failed(manifest, &path, e))?
            {
                None => break,
                Some(n) => n,
            };
            if filled < header.len() {
                return Err(IndexError::malformed_manifest(
                    manifest.id(),
                    format!("truncated frame header at offset {}", offset),
                ));
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            // The payload must fit in what is left of the file before anything is allocated.
            let remaining = file_len.saturating_sub(offset + FRAME_HEADER_LEN);
            if u64::from(length) > remaining {
                return Err(IndexError::malformed_manifest(
                    manifest.id(),
                    format!(
                        "truncated record {} at offset {}: frame declares {} bytes, {} remain",
                        entries.len(),
                        offset,
                        length,
                        remaining
                    ),
                ));
            }

            payload.resize(length as usize, 0);
            reader.read_exact(&mut payload).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    IndexError::malformed_manifest(
                        manifest.id(),
                        format!("truncated record {} at offset {}", entries.len(), offset),
                    )
                } else {
                    read_failed(manifest, &path, e)
                }
            })?;

            if crc32fast::hash(&payload) != expected_crc {
                return Err(IndexError::malformed_manifest(
                    manifest.id(),
                    format!("checksum mismatch in record {} at offset {}", entries.len(), offset),
                ));
            }

            entries.push((offset + FRAME_HEADER_LEN, u64::from(length)));
            offset += FRAME_HEADER_LEN + u64::from(length);
        }

        Ok(Arc::new(OffsetTableResolver::new(path, entries)))
    }
}

/// Encode one `sequential-offset` frame.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + FRAME_HEADER_LEN as usize);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

// ============================================================================
// line
// ============================================================================

/// One chunk per newline-terminated line, terminator excluded
#[derive(Debug, Default)]
pub struct LineBuilder;

impl IndexBuilder for LineBuilder {
    fn strategy(&self) -> &str {
        strategy::LINE
    }

    fn build(
        &self,
        manifest: &IndexManifest,
        ctx: &BuildContext,
    ) -> IndexResult<Arc<dyn PathResolver>> {
        let path = manifest.single_file(ctx.base_dir())?;
        let mut reader = BufReader::new(open_source(manifest, &path)?);

        let mut entries = Vec::new();
        let mut offset = 0u64;
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| read_failed(manifest, &path, e))?;
            if read == 0 {
                break;
            }
            let content = if line.last() == Some(&b'\n') { read - 1 } else { read };
            entries.push((offset, content as u64));
            offset += read as u64;
        }

        Ok(Arc::new(OffsetTableResolver::new(path, entries)))
    }
}

// ============================================================================
// sorted-key / sort-merge
// ============================================================================

/// Parse a key table: `key<TAB>file<TAB>offset<TAB>length` per row.
fn parse_key_table(
    manifest: &IndexManifest,
    table: &Path,
    base_dir: Option<&Path>,
) -> IndexResult<Vec<KeyedChunk>> {
    let reader = BufReader::new(open_source(manifest, table)?);
    let mut rows = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| read_failed(manifest, table, e))?;
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let malformed = |reason: &str| {
            IndexError::malformed_manifest(
                manifest.id(),
                format!("{}:{}: {}", table.display(), n + 1, reason),
            )
        };

        let fields: Vec<&str> = trimmed.split('\t').collect();
        let [key, file, offset, length] = fields.as_slice() else {
            return Err(malformed("expected 4 tab-separated fields"));
        };
        let offset: u64 = offset.parse().map_err(|_| malformed("offset is not an integer"))?;
        let length: u64 = length.parse().map_err(|_| malformed("length is not an integer"))?;

        rows.push(KeyedChunk {
            key: key.to_string(),
            path: ChunkPath::new(resolve_path(base_dir, Path::new(file)), offset, length),
        });
    }

    Ok(rows)
}

fn duplicate_key(manifest: &IndexManifest, key: &str) -> IndexError {
    IndexError::malformed_manifest(manifest.id(), format!("duplicate key '{}'", key))
}

/// One key table, sorted once at build time
#[derive(Debug, Default)]
pub struct SortedKeyBuilder;

impl IndexBuilder for SortedKeyBuilder {
    fn strategy(&self) -> &str {
        strategy::SORTED_KEY
    }

    fn build(
        &self,
        manifest: &IndexManifest,
        ctx: &BuildContext,
    ) -> IndexResult<Arc<dyn PathResolver>> {
        let table = manifest.single_file(ctx.base_dir())?;
        let mut rows = parse_key_table(manifest, &table, ctx.base_dir())?;
        rows.sort_by(|a, b| a.key.cmp(&b.key));

        if let Some(pair) = rows.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(duplicate_key(manifest, &pair[0].key));
        }

        Ok(Arc::new(KeyTableResolver::from_sorted(rows)))
    }
}

/// Several pre-sorted key tables merged into one
#[derive(Debug, Default)]
pub struct SortMergeBuilder;

impl IndexBuilder for SortMergeBuilder {
    fn strategy(&self) -> &str {
        strategy::SORT_MERGE
    }

    fn build(
        &self,
        manifest: &IndexManifest,
        ctx: &BuildContext,
    ) -> IndexResult<Arc<dyn PathResolver>> {
        let tables = manifest.all_files(ctx.base_dir())?;

        let mut parts = Vec::with_capacity(tables.len());
        for table in &tables {
            let rows = parse_key_table(manifest, table, ctx.base_dir())?;
            if let Some(pair) = rows.windows(2).find(|w| w[0].key >= w[1].key) {
                return Err(IndexError::malformed_manifest(
                    manifest.id(),
                    format!(
                        "part {} is not strictly sorted at key '{}'",
                        table.display(),
                        pair[1].key
                    ),
                ));
            }
            parts.push(rows.into_iter());
        }

        // Heap entries: (key, part); the row itself stays parked in `heads`.
        let mut heads: Vec<Option<KeyedChunk>> = parts.iter_mut().map(|p| p.next()).collect();
        let mut heap: BinaryHeap<Reverse<(String, usize)>> = heads
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.as_ref().map(|row| Reverse((row.key.clone(), i))))
            .collect();

        let mut merged: Vec<KeyedChunk> = Vec::new();
        while let Some(Reverse((_, part))) = heap.pop() {
            let Some(row) = heads[part].take() else {
                continue;
            };
            if merged.last().is_some_and(|last| last.key == row.key) {
                return Err(duplicate_key(manifest, &row.key));
            }
            merged.push(row);

            heads[part] = parts[part].next();
            if let Some(next) = &heads[part] {
                heap.push(Reverse((next.key.clone(), part)));
            }
        }

        Ok(Arc::new(KeyTableResolver::from_sorted(merged)))
    }
}

/// Every built-in builder
pub fn builtin_builders() -> Vec<Box<dyn IndexBuilder>> {
    vec![
        Box::new(FixedSizeBuilder),
        Box::new(SequentialOffsetBuilder),
        Box::new(LineBuilder),
        Box::new(SortedKeyBuilder),
        Box::new(SortMergeBuilder),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::errors::IndexErrorCode;
    use crate::index::manifest::SourceDescriptor;
    use std::io::Write;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> BuildContext {
        BuildContext {
            base_dir: Some(dir.path().to_path_buf()),
            default_chunk_size: 4,
        }
    }

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) {
        let mut f = File::create(dir.path().join(name)).unwrap();
        f.write_all(bytes).unwrap();
    }

    fn manifest(strategy: &str, files: &[&str]) -> IndexManifest {
        IndexManifest::new("m", strategy, SourceDescriptor::files(files.iter().copied()))
    }

    #[test]
    fn test_fixed_size_uses_default_chunk_size() {
        let dir = TempDir::new().unwrap();
        write(&dir, "data.bin", b"0123456789");

        let resolver = FixedSizeBuilder
            .build(&manifest(strategy::FIXED_SIZE, &["data.bin"]), &ctx(&dir))
            .unwrap();
        assert_eq!(resolver.chunk_count(), 3);
        assert_eq!(resolver.path(2).unwrap().length, 2);
    }

    #[test]
    fn test_missing_source_is_malformed() {
        let dir = TempDir::new().unwrap();
        let err = FixedSizeBuilder
            .build(&manifest(strategy::FIXED_SIZE, &["absent.bin"]), &ctx(&dir))
            .unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::MalformedManifest);
        assert_eq!(err.manifest_id(), Some("m"));
    }

    #[test]
    fn test_sequential_offset_frames() {
        let dir = TempDir::new().unwrap();
        let mut bytes = encode_frame(b"alpha");
        bytes.extend(encode_frame(b""));
        bytes.extend(encode_frame(b"gamma!"));
        write(&dir, "records.bin", &bytes);

        let resolver = SequentialOffsetBuilder
            .build(&manifest(strategy::SEQUENTIAL_OFFSET, &["records.bin"]), &ctx(&dir))
            .unwrap();
        assert_eq!(resolver.chunk_count(), 3);
        assert_eq!(resolver.path(0).unwrap().offset, 8);
        assert_eq!(resolver.path(0).unwrap().length, 5);
        assert_eq!(resolver.path(1).unwrap().length, 0);
        assert_eq!(resolver.path(2).unwrap().offset, 8 + 5 + 8 + 8);
    }

    #[test]
    fn test_sequential_offset_rejects_corruption() {
        let dir = TempDir::new().unwrap();
        let mut bytes = encode_frame(b"alpha");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        write(&dir, "bad.bin", &bytes);
        let err = SequentialOffsetBuilder
            .build(&manifest(strategy::SEQUENTIAL_OFFSET, &["bad.bin"]), &ctx(&dir))
            .unwrap_err();
        assert!(err.message().contains("checksum"));

        let mut truncated = encode_frame(b"alpha");
        truncated.truncate(10);
        write(&dir, "short.bin", &truncated);
        let err = SequentialOffsetBuilder
            .build(&manifest(strategy::SEQUENTIAL_OFFSET, &["short.bin"]), &ctx(&dir))
            .unwrap_err();
        assert!(err.message().contains("truncated"));
    }

    #[test]
    fn test_sequential_offset_rejects_oversized_length() {
        let dir = TempDir::new().unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(u32::MAX - 1).to_le_bytes());
        bytes.extend_from_slice(&crc32fast::hash(b"abc").to_le_bytes());
        bytes.extend_from_slice(b"abc");
        write(&dir, "huge.bin", &bytes);

        let err = SequentialOffsetBuilder
            .build(&manifest(strategy::SEQUENTIAL_OFFSET, &["huge.bin"]), &ctx(&dir))
            .unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::MalformedManifest);
        assert!(err.message().contains("4294967294 bytes, 3 remain"));

        // A valid frame followed by an oversized one fails on the second record.
        let mut bytes = encode_frame(b"alpha");
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);
        write(&dir, "tail.bin", &bytes);
        let err = SequentialOffsetBuilder
            .build(&manifest(strategy::SEQUENTIAL_OFFSET, &["tail.bin"]), &ctx(&dir))
            .unwrap_err();
        assert!(err.message().contains("record 1 at offset 13"));
    }

    #[test]
    fn test_line_chunks() {
        let dir = TempDir::new().unwrap();
        write(&dir, "text.txt", b"one\n\nthree");

        let resolver = LineBuilder
            .build(&manifest(strategy::LINE, &["text.txt"]), &ctx(&dir))
            .unwrap();
        assert_eq!(resolver.chunk_count(), 3);
        assert_eq!(resolver.path(0).unwrap(), ChunkPath::new(dir.path().join("text.txt"), 0, 3));
        assert_eq!(resolver.path(1).unwrap().length, 0);
        assert_eq!(resolver.path(2).unwrap().offset, 5);
        assert_eq!(resolver.path(2).unwrap().length, 5);
    }

    #[test]
    fn test_sorted_key_orders_and_finds() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "keys.tsv",
            b"# key table\nzeta\tz.bin\t0\t4\nalpha\ta.bin\t8\t2\n\nmid\tm.bin\t1\t1\n",
        );

        let resolver = SortedKeyBuilder
            .build(&manifest(strategy::SORTED_KEY, &["keys.tsv"]), &ctx(&dir))
            .unwrap();
        assert_eq!(resolver.chunk_count(), 3);
        assert_eq!(resolver.find_key("alpha"), Some(0));
        assert_eq!(resolver.find_key("zeta"), Some(2));
        assert_eq!(resolver.path(0).unwrap().file, dir.path().join("a.bin"));
    }

    #[test]
    fn test_sorted_key_rejects_duplicates_and_bad_rows() {
        let dir = TempDir::new().unwrap();
        write(&dir, "dup.tsv", b"a\tf\t0\t1\na\tf\t1\t1\n");
        assert!(SortedKeyBuilder
            .build(&manifest(strategy::SORTED_KEY, &["dup.tsv"]), &ctx(&dir))
            .is_err());

        write(&dir, "bad.tsv", b"a\tf\tzero\t1\n");
        let err = SortedKeyBuilder
            .build(&manifest(strategy::SORTED_KEY, &["bad.tsv"]), &ctx(&dir))
            .unwrap_err();
        assert!(err.message().contains("offset"));
    }

    #[test]
    fn test_sort_merge_interleaves_parts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "p1.tsv", b"a\tf\t0\t1\nd\tf\t3\t1\n");
        write(&dir, "p2.tsv", b"b\tf\t1\t1\nc\tf\t2\t1\ne\tf\t4\t1\n");

        let resolver = SortMergeBuilder
            .build(&manifest(strategy::SORT_MERGE, &["p1.tsv", "p2.tsv"]), &ctx(&dir))
            .unwrap();
        assert_eq!(resolver.chunk_count(), 5);
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            assert_eq!(resolver.find_key(key), Some(i as u64));
            assert_eq!(resolver.path(i as i64).unwrap().offset, i as u64);
        }
    }

    #[test]
    fn test_sort_merge_rejects_unsorted_and_overlap() {
        let dir = TempDir::new().unwrap();
        write(&dir, "unsorted.tsv", b"b\tf\t0\t1\na\tf\t1\t1\n");
        write(&dir, "p1.tsv", b"a\tf\t0\t1\n");
        write(&dir, "p2.tsv", b"a\tg\t0\t1\n");

        assert!(SortMergeBuilder
            .build(&manifest(strategy::SORT_MERGE, &["unsorted.tsv"]), &ctx(&dir))
            .is_err());
        let err = SortMergeBuilder
            .build(&manifest(strategy::SORT_MERGE, &["p1.tsv", "p2.tsv"]), &ctx(&dir))
            .unwrap_err();
        assert!(err.message().contains("duplicate"));
    }
}
