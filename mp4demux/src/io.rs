//! File reading.
//!
use std::convert::TryInto;
use std::fs;
use std::io::{self, ErrorKind};
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use memmap::{Mmap, MmapOptions};

use crate::serialize::{BoxBytes, ReadBytes};

struct FileSegment {
    start: u64,
    len:   u64,
    map:   Mmap,
}

/// Reads an MP4 file.
///
/// Implements `ReadBytes`, so it can be passed to `read_boxes`.
///
/// We use `mmap` to read the contents of the file, except for the
/// payload of `mdat` boxes. Sample data is read through the shared
/// file handle with `read_exact_at` instead.
pub struct Mp4File {
    file:     Arc<fs::File>,
    pos:      u64,
    size:     u64,
    segments: Vec<FileSegment>,
}

impl Mp4File {
    /// Open an mp4 file.
    pub fn open(path: impl AsRef<str>) -> io::Result<Mp4File> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let size = file.metadata()?.len();

        // Create a list of segments where we leave out the
        // payload part of MDAT boxes.
        let mut segs = Vec::<(u64, u64)>::new();
        segs.push((0, 0));
        let mut pos = 0;
        while let Some((boxtype, boxpos, boxsize, hdrsize)) = next_box(&file, &mut pos, size)? {
            if &boxtype == b"mdat" {
                segs.last_mut().unwrap().1 += hdrsize;
                segs.push((boxpos + boxsize, 0));
            } else {
                segs.last_mut().unwrap().1 += boxsize;
            }
        }

        // Now mmap those segments.
        let mut segments = Vec::new();
        for seg in &segs {
            let len = std::cmp::min(seg.1, size.saturating_sub(seg.0));
            if len == 0 {
                continue;
            }
            let map = unsafe { MmapOptions::new().offset(seg.0).len(len as usize).map(&file)? };
            segments.push(FileSegment {
                start: seg.0,
                len,
                map,
            });
        }

        Ok(Mp4File {
            segments,
            file: Arc::new(file),
            pos: 0,
            size,
        })
    }

    /// Get a reference to the file handle.
    pub fn file(&self) -> Arc<fs::File> {
        self.file.clone()
    }

    #[inline]
    fn map(&self, amount: u64) -> io::Result<(usize, usize)> {
        for idx in 0..self.segments.len() {
            let seg = &self.segments[idx];
            if self.pos >= seg.start && self.pos < seg.start + seg.len {
                if self.pos + amount > seg.start + seg.len {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "tried to read over mapped segment boundary",
                    ));
                }
                let npos = (self.pos - seg.start) as usize;
                return Ok((idx, npos));
            }
        }
        Err(io::Error::new(
            ErrorKind::UnexpectedEof,
            "read request outside of any mapped segment",
        ))
    }
}

// Walk over the top-level boxes of the file.
fn next_box(file: &fs::File, pos: &mut u64, filesize: u64) -> io::Result<Option<([u8; 4], u64, u64, u64)>> {
    if *pos + 8 > filesize {
        return Ok(None);
    }
    let mut buf = [0u8; 8];
    file.read_exact_at(&mut buf[..], *pos)?;
    let mut boxsize = u32::from_be_bytes(buf[0..4].try_into().unwrap()) as u64;
    let boxtype = &buf[4..8];
    let mut hdrsize = 8;
    if boxsize == 0 {
        boxsize = filesize - *pos;
    } else if boxsize == 1 {
        if *pos + 16 > filesize {
            return Err(ioerr!(UnexpectedEof, "truncated box header at offset {}", *pos));
        }
        let mut large = [0u8; 8];
        file.read_exact_at(&mut large[..], *pos + 8)?;
        boxsize = u64::from_be_bytes(large);
        hdrsize = 16;
    }
    if boxsize < hdrsize {
        return Err(ioerr!(InvalidData, "invalid box size {} at offset {}", boxsize, *pos));
    }
    if boxsize > filesize - *pos {
        // Truncated final box; the box parser will report it.
        boxsize = filesize - *pos;
    }
    let xpos = *pos;
    *pos += boxsize;
    Ok(Some((boxtype.try_into().unwrap(), xpos, boxsize, hdrsize)))
}

impl ReadBytes for Mp4File {
    #[inline]
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let (seg, offset) = self.map(amount)?;
        self.pos += amount;
        Ok(&self.segments[seg].map[offset..offset + amount as usize])
    }

    #[inline]
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let (seg, offset) = self.map(amount)?;
        Ok(&self.segments[seg].map[offset..offset + amount as usize])
    }

    #[inline]
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.pos + amount > self.size {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "tried to seek past eof"));
        }
        self.pos += amount;
        Ok(())
    }

    #[inline]
    fn left(&mut self) -> u64 {
        if self.pos > self.size {
            0
        } else {
            self.size - self.pos
        }
    }
}

impl BoxBytes for Mp4File {
    #[inline]
    fn pos(&mut self) -> u64 {
        self.pos
    }

    #[inline]
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.size {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "tried to seek past eof"));
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    fn size(&self) -> u64 {
        self.size
    }
}

/// In-memory reader over a byte buffer.
///
/// Unlike the plain `&[u8]` implementation this one tracks an absolute
/// position, so it can be used to parse boxes.
pub struct MemReader {
    data: Vec<u8>,
    pos:  usize,
}

impl MemReader {
    pub fn new(data: Vec<u8>) -> MemReader {
        MemReader { data, pos: 0 }
    }
}

impl ReadBytes for MemReader {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = amount as usize;
        if self.pos + amount > self.data.len() {
            return Err(ioerr!(UnexpectedEof));
        }
        let pos = self.pos;
        self.pos += amount;
        Ok(&self.data[pos..pos + amount])
    }

    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = std::cmp::min(amount as usize, self.data.len() - self.pos);
        Ok(&self.data[self.pos..self.pos + amount])
    }

    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.pos as u64 + amount > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof));
        }
        self.pos += amount as usize;
        Ok(())
    }

    fn left(&mut self) -> u64 {
        (self.data.len() - self.pos) as u64
    }
}

impl BoxBytes for MemReader {
    fn pos(&mut self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.data.len() as u64 {
            return Err(ioerr!(UnexpectedEof));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl<'a, B: ?Sized + ReadBytes + 'a> ReadBytes for Box<B> {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        B::read(&mut *self, amount)
    }
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        B::peek(&mut *self, amount)
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        B::skip(&mut *self, amount)
    }
    fn left(&mut self) -> u64 {
        B::left(&mut *self)
    }
}

impl<'a, B: ?Sized + BoxBytes + 'a> BoxBytes for Box<B> {
    fn pos(&mut self) -> u64 {
        B::pos(&mut *self)
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        B::seek(&mut *self, pos)
    }
    fn size(&self) -> u64 {
        B::size(&*self)
    }
    fn version(&self) -> u8 {
        B::version(&*self)
    }
    fn flags(&self) -> u32 {
        B::flags(&*self)
    }
}
