//! Box framing: headers, size-limited readers, unknown boxes.
//!
use std::convert::TryInto;
use std::fmt::Debug;
use std::io;

use crate::serialize::{BoxBytes, FromBytes, ReadBytes};
use crate::types::{FourCC, Uuid};

/// Gets implemented for every box.
pub trait BoxInfo {
    /// The "fourcc" name of this box.
    fn fourcc(&self) -> FourCC;
    /// Maximum supported version, if this is a full box.
    fn max_version() -> Option<u8>
    where
        Self: Sized,
    {
        None
    }
}

/// Parsed box header.
///
/// `size` is the number of payload bytes that follow the header. The
/// largesize (if `size1 == 1`), the extended `uuid` type, and the
/// version/flags of known full boxes have already been consumed and
/// accounted for.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size:    u64,
    pub fourcc:  FourCC,
    pub uuid:    Option<Uuid>,
    pub version: Option<u8>,
    pub flags:   u32,
    /// The box ran to the end of the stream (`size == 0` on disk).
    pub to_eof:  bool,
}

impl BoxHeader {
    /// Peek at the fourcc of the next box without advancing the stream.
    pub fn peek_fourcc<R: ReadBytes>(stream: &mut R) -> io::Result<FourCC> {
        let data = stream.peek(8)?;
        if data.len() < 8 {
            return Err(ioerr!(UnexpectedEof));
        }
        Ok(FourCC(u32::from_be_bytes(data[4..8].try_into().unwrap())))
    }

    /// Read a box header.
    pub fn read<R: ReadBytes>(stream: &mut R) -> io::Result<BoxHeader> {
        let size1 = u32::from_bytes(stream)?;
        let fourcc = FourCC::from_bytes(stream)?;
        let mut to_eof = false;
        let mut size = match size1 {
            0 => {
                to_eof = true;
                stream.left()
            },
            1 => {
                let largesize = u64::from_bytes(stream)?;
                if largesize < 16 {
                    return Err(ioerr!(InvalidData, "{}: invalid largesize {}", fourcc, largesize));
                }
                largesize - 16
            },
            sz if sz < 8 => {
                return Err(ioerr!(InvalidData, "{}: invalid box size {}", fourcc, sz));
            },
            sz => (sz - 8) as u64,
        };

        let mut uuid = None;
        if fourcc == b"uuid" {
            if size < 16 {
                return Err(ioerr!(InvalidData, "uuid box too small ({})", size));
            }
            uuid = Some(Uuid::from_bytes(stream)?);
            size -= 16;
        }

        let mut version = None;
        let mut flags = 0;
        if let Some(max_version) = crate::boxes::max_version_for(fourcc) {
            if size < 4 {
                return Err(ioerr!(InvalidData, "{}: too small for a full box ({})", fourcc, size));
            }
            let vf = u32::from_bytes(stream)?;
            let v = (vf >> 24) as u8;
            if v > max_version {
                return Err(ioerr!(InvalidData, "{}: no support for version {}", fourcc, v));
            }
            version = Some(v);
            flags = vf & 0x00ff_ffff;
            size -= 4;
        }

        Ok(BoxHeader {
            size,
            fourcc,
            uuid,
            version,
            flags,
            to_eof,
        })
    }
}

/// Size-limited reader over one box.
///
/// Reads the box header on creation. Reads past the end of the box
/// fail; any bytes the parser leaves unconsumed are skipped when the
/// reader is dropped.
pub struct BoxReader<'a> {
    pub header: BoxHeader,
    maxsize:    u64,
    // We box it, since a BoxReader might contain a BoxReader.
    inner:      Box<dyn ReadBytes + 'a>,
}

impl<'a> BoxReader<'a> {
    /// Read the box header, then return a size-limited reader.
    pub fn new(stream: &'a mut impl ReadBytes) -> io::Result<BoxReader<'a>> {
        let header = BoxHeader::read(stream)?;
        let left = stream.left();
        if header.size > left {
            return Err(ioerr!(
                InvalidData,
                "{}: size {} exceeds {} bytes left in parent",
                header.fourcc,
                header.size,
                left
            ));
        }
        let maxsize = stream.pos() + header.size;
        log::trace!(
            "BoxReader::new: {} payload {} maxsize {}",
            header.fourcc,
            header.size,
            maxsize
        );
        Ok(BoxReader {
            header,
            maxsize,
            inner: Box::new(stream),
        })
    }
}

impl<'a> Drop for BoxReader<'a> {
    fn drop(&mut self) {
        let pos = self.inner.pos();
        if pos < self.maxsize {
            log::trace!(
                "BoxReader {} drop: skipping {}",
                self.header.fourcc,
                self.maxsize - pos
            );
            let _ = self.inner.seek(self.maxsize);
        }
    }
}

// Delegate ReadBytes to the inner reader, bounded by the box size.
impl<'a> ReadBytes for BoxReader<'a> {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        if amount == 0 {
            return Ok(b"");
        }
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(
                InvalidData,
                "{}: read of {} bytes runs past the end of the box",
                self.header.fourcc,
                amount
            ));
        }
        self.inner.read(amount)
    }
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = std::cmp::min(amount, self.left());
        self.inner.peek(amount)
    }
    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if self.inner.pos() + amount > self.maxsize {
            return Err(ioerr!(
                InvalidData,
                "{}: skip of {} bytes runs past the end of the box",
                self.header.fourcc,
                amount
            ));
        }
        self.inner.skip(amount)
    }
    fn left(&mut self) -> u64 {
        let pos = self.inner.pos();
        if pos > self.maxsize {
            0
        } else {
            self.maxsize - pos
        }
    }
}

// Delegate BoxBytes to the inner reader.
impl<'a> BoxBytes for BoxReader<'a> {
    fn pos(&mut self) -> u64 {
        self.inner.pos()
    }
    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.maxsize {
            return Err(ioerr!(UnexpectedEof));
        }
        self.inner.seek(pos)
    }
    fn size(&self) -> u64 {
        self.maxsize
    }
    fn version(&self) -> u8 {
        self.header.version.unwrap_or(0)
    }
    fn flags(&self) -> u32 {
        self.header.flags
    }
}

/// Any unknown box we encounter is recorded as a GenericBox.
///
/// The payload is skipped, only the fourcc and payload size are kept.
#[derive(Clone)]
pub struct GenericBox {
    pub fourcc: FourCC,
    pub size:   u64,
}

impl FromBytes for GenericBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<GenericBox> {
        let mut reader = BoxReader::new(stream)?;
        let fourcc = reader.header.fourcc;
        let size = reader.left();
        reader.skip(size)?;
        Ok(GenericBox { fourcc, size })
    }
    fn min_size() -> usize {
        8
    }
}

impl BoxInfo for GenericBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.fourcc
    }
}

impl Debug for GenericBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("GenericBox");
        dbg.field("fourcc", &self.fourcc);
        dbg.field("size", &self.size);
        dbg.finish()
    }
}

/// Read a collection of boxes from a stream.
pub fn read_boxes<R: ReadBytes>(mut file: R) -> io::Result<Vec<crate::boxes::MP4Box>> {
    let mut boxes = Vec::new();
    while file.left() >= 8 {
        let b = crate::boxes::MP4Box::from_bytes(&mut file)?;
        boxes.push(b);
    }
    Ok(boxes)
}
