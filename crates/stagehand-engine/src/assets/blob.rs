//! Blob archives: many named assets in one file, indexed by a header table.
//!
//! Layout (little-endian):
//!
//! ```text
//! i32   record count
//! i64   header byte length (from the end of this field to the first payload byte)
//! per record:
//!   string  name        (unsigned LEB128 length + UTF-8 bytes)
//!   i32     kind
//!   i64     payload offset, relative to the end of the header
//!   i64     payload length
//! payload bytes
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::bytes::{put_string, ByteReader, Short};
use super::error::BlobError;
use super::kind::AssetKind;

// Fixed prefix: record count + header length.
const PREFIX_LEN: u64 = 4 + 8;

// Refuse absurd header sizes before allocating for them.
const MAX_HEADER_LEN: u64 = 64 * 1024 * 1024;

impl From<Short> for BlobError {
    fn from(s: Short) -> Self {
        BlobError::Truncated { at: s.at, need: s.need }
    }
}

/// One entry of a blob header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    pub name: String,
    pub kind: AssetKind,
    /// Offset from the end of the header.
    pub offset: u64,
    pub length: u64,
}

/// Parsed blob header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHeader {
    pub records: Vec<BlobRecord>,
    /// Absolute file offset of the first payload byte.
    pub data_start: u64,
}

impl BlobHeader {
    /// Reads and validates a header. `file_len` bounds every record's byte range.
    pub fn read<R: Read>(mut r: R, file_len: u64) -> Result<Self, BlobError> {
        let mut prefix = [0u8; PREFIX_LEN as usize];
        r.read_exact(&mut prefix).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => BlobError::Truncated { at: 0, need: PREFIX_LEN as usize },
            _ => BlobError::Io(e),
        })?;
        let mut pr = ByteReader::new(&prefix);
        let count = pr.i32()?;
        let header_len = pr.i64()?;

        if count < 0 {
            return Err(BlobError::Malformed(format!("negative record count {count}")));
        }
        if header_len < 0 || header_len as u64 > MAX_HEADER_LEN {
            return Err(BlobError::Malformed(format!("bad header length {header_len}")));
        }
        let header_len = header_len as u64;
        let data_start = PREFIX_LEN + header_len;
        if data_start > file_len {
            return Err(BlobError::Malformed(format!(
                "header claims {header_len} bytes but the file has {file_len}"
            )));
        }

        let mut table = vec![0u8; header_len as usize];
        r.read_exact(&mut table)?;
        let mut tr = ByteReader::new(&table);

        let available = file_len - data_start;
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            let name = tr
                .string()
                .map_err(|s| BlobError::Truncated { at: PREFIX_LEN as usize + s.at, need: s.need })?
                .ok_or_else(|| BlobError::Malformed(format!("bad record name at byte {}", tr.position())))?;
            let kind_raw = tr.i32()?;
            let offset = tr.i64()?;
            let length = tr.i64()?;

            let kind = AssetKind::from_i32(kind_raw).ok_or_else(|| BlobError::UnknownKind {
                name: name.clone(),
                kind: kind_raw,
            })?;
            if offset < 0 || length < 0 {
                return Err(BlobError::Malformed(format!("record `{name}` has a negative range")));
            }
            let (offset, length) = (offset as u64, length as u64);
            if offset.checked_add(length).is_none_or(|end| end > available) {
                return Err(BlobError::OutOfRange { name, offset, length, available });
            }
            if !seen.insert(name.clone()) {
                return Err(BlobError::DuplicateName(name));
            }
            records.push(BlobRecord { name, kind, offset, length });
        }

        if tr.remaining() != 0 {
            return Err(BlobError::Malformed(format!(
                "{} unused bytes after the last record",
                tr.remaining()
            )));
        }

        Ok(Self { records, data_start })
    }
}

// ── Writer ────────────────────────────────────────────────────────────────

/// Builds a blob archive in memory and writes it out.
#[derive(Debug, Default)]
pub struct BlobWriter {
    entries: Vec<(String, AssetKind, Vec<u8>)>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an asset. Names must be unique within one blob.
    pub fn add(&mut self, name: impl Into<String>, kind: AssetKind, bytes: Vec<u8>) -> Result<(), BlobError> {
        let name = name.into();
        if self.entries.iter().any(|(n, _, _)| *n == name) {
            return Err(BlobError::DuplicateName(name));
        }
        self.entries.push((name, kind, bytes));
        Ok(())
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), BlobError> {
        let mut table = Vec::new();
        let mut offset = 0u64;
        for (name, kind, bytes) in &self.entries {
            put_string(&mut table, name);
            table.extend_from_slice(&kind.to_i32().to_le_bytes());
            table.extend_from_slice(&(offset as i64).to_le_bytes());
            table.extend_from_slice(&(bytes.len() as i64).to_le_bytes());
            offset += bytes.len() as u64;
        }

        let count = i32::try_from(self.entries.len())
            .map_err(|_| BlobError::Malformed("too many records".into()))?;
        w.write_all(&count.to_le_bytes())?;
        w.write_all(&(table.len() as i64).to_le_bytes())?;
        w.write_all(&table)?;
        for (_, _, bytes) in &self.entries {
            w.write_all(bytes)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), BlobError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

// ── Mounted blob ──────────────────────────────────────────────────────────

/// A blob registered with the asset manager.
///
/// The read stream is only open between `open_stream` and `close_stream`; reads outside
/// that window open a short-lived handle of their own.
#[derive(Debug)]
pub(crate) struct MountedBlob {
    pub path: PathBuf,
    pub header: BlobHeader,
    pub id_base: u32,
    stream: Option<BufReader<File>>,
}

impl MountedBlob {
    pub fn open(path: &Path, id_base: u32) -> Result<Self, BlobError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let header = BlobHeader::read(BufReader::new(file), file_len)?;
        Ok(Self {
            path: path.to_path_buf(),
            header,
            id_base,
            stream: None,
        })
    }

    /// Id one past the last record of this blob.
    pub fn id_end(&self) -> u32 {
        self.id_base + self.header.records.len() as u32
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn open_stream(&mut self) -> Result<(), BlobError> {
        if self.stream.is_none() {
            self.stream = Some(BufReader::new(File::open(&self.path)?));
        }
        Ok(())
    }

    pub fn close_stream(&mut self) {
        self.stream = None;
    }

    /// Reads the payload of record `index`.
    pub fn read(&mut self, index: usize) -> Result<Vec<u8>, BlobError> {
        let record = self
            .header
            .records
            .get(index)
            .ok_or_else(|| BlobError::Malformed(format!("no record #{index}")))?;
        let start = self.header.data_start + record.offset;
        let mut buf = vec![0u8; record.length as usize];

        match self.stream.as_mut() {
            Some(stream) => {
                stream.seek(SeekFrom::Start(start))?;
                stream.read_exact(&mut buf)?;
            }
            None => {
                let mut file = File::open(&self.path)?;
                file.seek(SeekFrom::Start(start))?;
                file.read_exact(&mut buf)?;
            }
        }
        Ok(buf)
    }
}
