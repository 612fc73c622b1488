use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{MovieHeaderBox, TrackBox, UserDataBox};

def_box! {
    /// 8.2.1 Movie Box (ISO/IEC 14496-12:2015(E))
    MovieBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"moov",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

impl MovieBox {
    /// Get a reference to the list of tracks.
    pub fn tracks(&self) -> Vec<&TrackBox> {
        iter_box!(&self.boxes, TrackBox).collect::<Vec<_>>()
    }

    declare_box_methods!(MovieHeaderBox, movie_header);
    declare_box_methods!(UserDataBox, user_data);
}
