//
// ISO/IEC 14496-12:2015(E)
// 8.5.2 Sample Description Box
//
use std::io;

use crate::boxes::avcc::AvcConfigurationBox;
use crate::boxes::prelude::*;

def_box! {
    /// 8.5.2 Sample Description Box (ISO/IEC 14496-12:2015(E))
    SampleDescriptionBox {
        entries:    ArraySized32<MP4Box>,
    },
    fourcc => b"stsd",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}

impl SampleDescriptionBox {
    /// Fourcc of the first sample entry ("avc1", "mp4a", "text", ...).
    pub fn entry_fourcc(&self) -> Option<FourCC> {
        self.entries.iter().next().map(|e| e.fourcc())
    }
}

def_box! {
    /// AVC sample entry (VideoSampleEntry).
    AvcSampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        skip:                   16,
        width:                  u16,
        height:                 u16,
        // dpi, reserved, frame count, compressor name, depth, pre_defined.
        skip:                   50,
        // avcC and other boxes (pasp, btrt, ...).
        boxes:                  Vec<MP4Box>,
    },
    fourcc => b"avc1",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

impl AvcSampleEntry {
    /// Get a reference to the decoder configuration record.
    pub fn configuration(&self) -> Option<&AvcConfigurationBox> {
        first_box!(&self.boxes, AvcConfigurationBox)
    }
}

def_box! {
    /// Audio sample entry (mp4a and friends).
    AudioSampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        skip:                   8,
        channel_count:          u16,
        sample_size:            u16,
        skip:                   4,
        sample_rate:            FixedFloat16_16,
        // sub boxes, probably only esds.
        boxes:                  Vec<MP4Box>,
    },
    fourcc => b"mp4a",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 12.3.3 Text metadata sample entry (ISO/IEC 14496-12:2015(E))
    MetadataSampleEntry {
        skip:                   6,
        data_reference_index:   u16,
        content_encoding:       ZString,
        mime_format:            ZString,
    },
    fourcc => b"mett",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}
