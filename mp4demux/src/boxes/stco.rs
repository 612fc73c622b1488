use std::io;

use crate::boxes::prelude::*;

/// 8.7.5 Chunk Offset Box (ISO/IEC 14496-12:2015(E))
///
/// Implements both "stco" and "co64"; 32-bit offsets are widened
/// to 64 bits at parse time.
#[derive(Clone)]
pub struct ChunkOffsetBox {
    pub fourcc:  FourCC,
    pub entries: Vec<u64>,
}
pub type ChunkLargeOffsetBox = ChunkOffsetBox;

impl FromBytes for ChunkOffsetBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<ChunkOffsetBox> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let stream = &mut reader;

        let count = u32::from_bytes(stream)? as usize;
        let mut entries = Vec::with_capacity(std::cmp::min(count, 65536));
        if fourcc == b"stco" {
            for _ in 0..count {
                entries.push(u32::from_bytes(stream)? as u64);
            }
        } else {
            for _ in 0..count {
                entries.push(u64::from_bytes(stream)?);
            }
        }

        Ok(ChunkOffsetBox { fourcc, entries })
    }

    fn min_size() -> usize {
        8 + 8
    }
}

impl BoxInfo for ChunkOffsetBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl std::fmt::Debug for ChunkOffsetBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("ChunkOffsetBox");
        dbg.field("fourcc", &self.fourcc);
        dbg.field("entries", &format_args!("[u64; {}]", self.entries.len()));
        dbg.finish()
    }
}
