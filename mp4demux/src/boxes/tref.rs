use std::io;

use crate::boxes::prelude::*;

/// 8.3.3 Track Reference Box (ISO/IEC 14496-12:2015(E))
///
/// A container of typed reference entries, each of which holds a
/// list of track ids.
#[derive(Clone, Debug)]
pub struct TrackReferenceBox {
    pub references: Vec<TrackReference>,
}

/// One typed reference entry ("cdsc", "chap", "hint", ...).
#[derive(Clone, Debug)]
pub struct TrackReference {
    pub kind:      FourCC,
    pub track_ids: Vec<u32>,
}

impl TrackReferenceBox {
    /// The first referenced track: (reference kind, track id).
    pub fn first(&self) -> Option<(FourCC, u32)> {
        let entry = self.references.first()?;
        let id = entry.track_ids.first()?;
        Some((entry.kind, *id))
    }
}

impl FromBytes for TrackReferenceBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;
        let mut references = Vec::new();
        while stream.left() >= 8 {
            let mut entry = BoxReader::new(stream)?;
            let kind = entry.header.fourcc;
            let mut track_ids = Vec::new();
            while entry.left() >= 4 {
                track_ids.push(u32::from_bytes(&mut entry)?);
            }
            references.push(TrackReference { kind, track_ids });
        }
        Ok(TrackReferenceBox { references })
    }

    fn min_size() -> usize {
        8
    }
}

impl BoxInfo for TrackReferenceBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC(u32::from_be_bytes(*b"tref"))
    }
}
