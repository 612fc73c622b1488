use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 4.3 File Type Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Recorded for diagnostics only.
    FileTypeBox {
        major_brand:        FourCC,
        minor_version:      u32,
        compatible_brands:  Vec<FourCC>,
    },
    fourcc => b"ftyp",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 8.2.2 Movie Header Box (ISO/IEC 14496-12:2015(E))
    MovieHeaderBox {
        cr_time:    Time,
        mod_time:   Time,
        timescale:  u32,
        duration:   Duration_,
        // rate, volume, reserved, matrix, pre_defined.
        skip:       76,
        next_track_id: u32,
    },
    fourcc => b"mvhd",
    version => [1],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 8.4.2 Media Header Box (ISO/IEC 14496-12:2015(E))
    MediaHeaderBox {
        cr_time:    Time,
        mod_time:   Time,
        timescale:  u32,
        duration:   Duration_,
        language:   IsoLanguageCode,
        quality:    u16,
    },
    fourcc => b"mdhd",
    version => [1],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 12.1.2 Video Media Header Box (ISO/IEC 14496-12:2015(E))
    VideoMediaHeaderBox {
        graphics_mode:  u16,
        skip:           6,
    },
    fourcc => b"vmhd",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 12.2.2 Sound Media Header Box (ISO/IEC 14496-12:2015(E))
    SoundMediaHeaderBox {
        balance:        u16,
        skip:           2,
    },
    fourcc => b"smhd",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 12.4.2 Hint Media Header Box (ISO/IEC 14496-12:2015(E))
    HintMediaHeaderBox {
        max_pdu_size:   u16,
        avg_pdu_size:   u16,
        max_bitrate:    u32,
        avg_bitrate:    u32,
        skip:           4,
    },
    fourcc => b"hmhd",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 8.4.5.2 Null Media Header Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    NullMediaHeaderBox {
    },
    fourcc => b"nmhd",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 8.10.1 User Data Box (ISO/IEC 14496-12:2015(E))
    UserDataBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"udta",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

def_box! {
    /// 8.7.1 Data Information Box (ISO/IEC 14496-12:2015(E))
    DataInformationBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"dinf",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}
