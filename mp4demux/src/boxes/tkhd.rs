use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.3.2 Track Header Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Only the track id is consumed by the rest of the library;
    /// layer/volume/matrix/width/height are skipped.
    TrackHeaderBox {
        flags:      TrackFlags,
        cr_time:    Time,
        mod_time:   Time,
        track_id:   u32,
        skip:       4,
        duration:   Duration_,
        // reserved, layer, alternate_group, volume, reserved,
        // matrix, width, height.
        skip:       60,
    },
    fourcc => b"tkhd",
    version => [1],
    impls => [ boxinfo, debug, frombytes ],
}

/// Track flags: enabled / in_movie / in_preview.
#[derive(Clone, Copy, Default)]
pub struct TrackFlags(pub u32);

impl FromBytes for TrackFlags {
    fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
        Ok(TrackFlags(bytes.flags()))
    }
    fn min_size() -> usize {
        0
    }
}

impl TrackFlags {
    pub fn enabled(&self) -> bool {
        self.0 & 0x01 > 0
    }
    pub fn in_movie(&self) -> bool {
        self.0 & 0x02 > 0
    }
    pub fn in_preview(&self) -> bool {
        self.0 & 0x04 > 0
    }
}

impl std::fmt::Debug for TrackFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut v = Vec::new();
        if self.enabled() {
            v.push("enabled");
        }
        if self.in_movie() {
            v.push("in_movie");
        }
        if self.in_preview() {
            v.push("in_preview");
        }
        write!(f, "TrackFlags([{}])", v.join(" "))
    }
}
