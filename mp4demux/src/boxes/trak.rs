use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{MediaBox, TrackHeaderBox, TrackReferenceBox};

def_box! {
    /// 8.3.1 Track Box (ISO/IEC 14496-12:2015(E))
    TrackBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"trak",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

impl TrackBox {
    declare_box_methods!(TrackHeaderBox, track_header);
    declare_box_methods!(MediaBox, media);
    declare_box_methods!(TrackReferenceBox, track_reference);
}
