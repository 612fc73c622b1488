//! Metadata boxes: `meta`, `keys`, `ilst` and the QuickTime
//! location atom.
//!
//! Two namespaces exist side by side. The QuickTime form tags `ilst`
//! children with 4-byte atoms (`©nam`, `©ART`, ...); the keyed form
//! stores UTF-8 key names in a `keys` table and tags `ilst` children
//! with the 1-based index of their key.
//!
use std::fmt::Debug;
use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.11.1 The Meta box (ISO/IEC 14496-12:2015(E))
    MetaBox {
        boxes:  Vec<MP4Box>,
    },
    fourcc => b"meta",
    version => [],
    impls => [ boxinfo, debug ],
}

impl FromBytes for MetaBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MetaBox> {
        let mut reader = BoxReader::new(stream)?;

        // The ISO form is a full box; the QuickTime form has no
        // version/flags and starts directly with the first child.
        // Sniff the bytes where the child fourcc would be.
        if reader.left() >= 8 {
            let mut hdr = [0u8; 8];
            hdr.copy_from_slice(reader.peek(8)?);
            match &hdr[4..8] {
                b"hdlr" | b"keys" | b"ilst" | b"free" => {},
                _ => reader.skip(4)?,
            }
        }

        let boxes = Vec::<MP4Box>::from_bytes(&mut reader)?;
        Ok(MetaBox { boxes })
    }

    fn min_size() -> usize {
        8
    }
}

impl MetaBox {
    declare_box_methods!(MetadataKeysBox, keys);
    declare_box_methods!(AppleItemListBox, item_list);
}

/// Metadata Item Keys Box (QuickTime).
///
/// UTF-8 key names, referenced from `ilst` by 1-based index.
#[derive(Clone, Debug)]
pub struct MetadataKeysBox {
    pub entries: Vec<MetadataKey>,
}

/// One key: a namespace (usually "mdta") and a name.
#[derive(Clone)]
pub struct MetadataKey {
    pub namespace: FourCC,
    pub name:      String,
}

impl Debug for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\"{}:{}\"", self.namespace, self.name)
    }
}

impl FromBytes for MetadataKeysBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<MetadataKeysBox> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let count = u32::from_bytes(stream)? as usize;
        let mut entries = Vec::with_capacity(std::cmp::min(count, 65536));
        for _ in 0..count {
            let key_size = u32::from_bytes(stream)? as u64;
            if key_size < 8 {
                return Err(ioerr!(InvalidData, "keys: entry size {} too small", key_size));
            }
            let namespace = FourCC::from_bytes(stream)?;
            let name = String::from_utf8_lossy(stream.read(key_size - 8)?).into_owned();
            entries.push(MetadataKey { namespace, name });
        }

        Ok(MetadataKeysBox { entries })
    }

    fn min_size() -> usize {
        8 + 4
    }
}

impl BoxInfo for MetadataKeysBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC(u32::from_be_bytes(*b"keys"))
    }
    #[inline]
    fn max_version() -> Option<u8> {
        Some(0)
    }
}

def_box! {
    /// Metadata Item List Box.
    AppleItemListBox {
        items:  Vec<AppleItem>,
    },
    fourcc => b"ilst",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

/// One `ilst` item.
///
/// The tag is either a QuickTime atom like `©nam` or the 1-based
/// index of a key in the `keys` table. The single child we care
/// about is the `data` box.
#[derive(Clone, Debug)]
pub struct AppleItem {
    pub tag:  FourCC,
    pub data: Option<IDataBox>,
}

impl FromBytes for AppleItem {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut reader = BoxReader::new(stream)?;
        let tag = reader.header.fourcc;
        let stream = &mut reader;

        let mut data: Option<IDataBox> = None;
        while stream.left() >= 8 {
            let mut hdr = [0u8; 8];
            hdr.copy_from_slice(stream.peek(8)?);
            if u32::from_be_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]) == 0 {
                return Err(ioerr!(Unsupported, "{}: box with size 0 inside ilst", tag));
            }
            match &hdr[4..8] {
                b"data" if data.is_none() => data = Some(IDataBox::from_bytes(stream)?),
                _ => {
                    let _ = GenericBox::from_bytes(stream)?;
                },
            }
        }

        Ok(AppleItem { tag, data })
    }

    fn min_size() -> usize {
        8
    }
}

impl BoxInfo for AppleItem {
    #[inline]
    fn fourcc(&self) -> FourCC {
        self.tag
    }
}

/// Item data.
#[derive(Clone, Debug)]
pub struct IDataBox {
    pub class: u8,
    pub data:  AppleData,
}

/// Payload of an item data box.
#[derive(Clone)]
pub enum AppleData {
    /// Class 1: UTF-8 text.
    Text(String),
    /// Classes 13 (JPEG), 14 (PNG), 27 (BMP): the payload is not
    /// read, only its location is recorded.
    Blob { pos: u64, size: u64 },
    /// Anything else is skipped.
    Other,
}

impl Debug for AppleData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AppleData::Text(s) => write!(f, "{:?}", s),
            AppleData::Blob { pos, size } => write!(f, "Blob{{ pos: {}, size: {} }}", pos, size),
            AppleData::Other => write!(f, "Other"),
        }
    }
}

impl FromBytes for IDataBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        // One byte version, three bytes class; only the low byte
        // of the class is used. Then 4 reserved bytes.
        let vc = u32::from_bytes(stream)?;
        let class = (vc & 0xff) as u8;
        stream.skip(4)?;

        let size = stream.left();
        let data = match class {
            1 => {
                let text = String::from_utf8_lossy(stream.read(size)?).into_owned();
                AppleData::Text(text)
            },
            13 | 14 | 27 => {
                let pos = stream.pos();
                stream.skip(size)?;
                AppleData::Blob { pos, size }
            },
            _ => {
                stream.skip(size)?;
                AppleData::Other
            },
        };

        Ok(IDataBox { class, data })
    }

    fn min_size() -> usize {
        8 + 8
    }
}

impl BoxInfo for IDataBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC(u32::from_be_bytes(*b"data"))
    }
}

/// QuickTime location atom (`©xyz`): an ISO 6709 string like
/// "+48.8584+002.2945/".
#[derive(Clone)]
pub struct LocationBox {
    pub location: String,
}

impl FromBytes for LocationBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let len = u16::from_bytes(stream)? as u64;
        let _language = u16::from_bytes(stream)?;
        let location = String::from_utf8_lossy(stream.read(len)?).into_owned();

        Ok(LocationBox { location })
    }

    fn min_size() -> usize {
        8 + 4
    }
}

impl BoxInfo for LocationBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC(u32::from_be_bytes(*b"\xa9xyz"))
    }
}

impl Debug for LocationBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("LocationBox");
        dbg.field("location", &self.location);
        dbg.finish()
    }
}
