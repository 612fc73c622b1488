use std::io;

use crate::boxes::prelude::*;

/// 8.7.3.2 Sample Size Box (ISO/IEC 14496-12:2015(E))
///
/// If `size` is non-zero all samples share that constant size and
/// `entries` is empty; otherwise `entries` holds one size per sample.
#[derive(Clone, Default)]
pub struct SampleSizeBox {
    pub size:    u32,
    pub count:   u32,
    pub entries: Vec<u32>,
}

impl SampleSizeBox {
    /// Return an iterator that yields the size of every sample.
    pub fn iter(&self) -> SampleSizeIterator<'_> {
        SampleSizeIterator {
            size:    self.size,
            count:   self.count,
            entries: &self.entries[..],
            index:   0,
        }
    }
}

impl FromBytes for SampleSizeBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<SampleSizeBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let size = u32::from_bytes(stream)?;
        let count = u32::from_bytes(stream)?;
        log::trace!("SampleSizeBox: size {} count {}", size, count);

        let mut entries = Vec::new();
        if size == 0 {
            entries.reserve(std::cmp::min(count as usize, 65536));
            for _ in 0..count {
                entries.push(u32::from_bytes(stream)?);
            }
        }

        Ok(SampleSizeBox {
            size,
            count,
            entries,
        })
    }

    fn min_size() -> usize {
        8 + 12
    }
}

impl BoxInfo for SampleSizeBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC(u32::from_be_bytes(*b"stsz"))
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

impl std::fmt::Debug for SampleSizeBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("SampleSizeBox");
        dbg.field("size", &self.size);
        dbg.field("count", &self.count);
        dbg.field("entries", &format_args!("[u32; {}]", self.entries.len()));
        dbg.finish()
    }
}

pub struct SampleSizeIterator<'a> {
    size:    u32,
    count:   u32,
    entries: &'a [u32],
    index:   usize,
}

impl<'a> Iterator for SampleSizeIterator<'a> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index == self.count as usize {
            return None;
        }
        let index = self.index;
        self.index += 1;
        if self.entries.is_empty() {
            Some(self.size)
        } else {
            Some(self.entries[index])
        }
    }
}
