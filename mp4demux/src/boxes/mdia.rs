use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{HandlerBox, MediaHeaderBox, SampleTableBox};

def_box! {
    /// 8.4.1 Media Box (ISO/IEC 14496-12:2015(E))
    MediaBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"mdia",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

impl MediaBox {
    declare_box_methods!(MediaHeaderBox, media_header);
    declare_box_methods!(HandlerBox, handler);
    declare_box_methods!(MediaInformationBox, media_info);
}

def_box! {
    /// 8.4.4 Media Information Box (ISO/IEC 14496-12:2015(E))
    MediaInformationBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"minf",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

impl MediaInformationBox {
    declare_box_methods!(SampleTableBox, sample_table);
}
