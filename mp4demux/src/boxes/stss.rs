use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.6.2 Sync Sample Box (ISO/IEC 14496-12:2015(E))
    ///
    /// Sample numbers are 1-based. If the box is absent, every
    /// sample is a sync sample.
    #[derive(Default)]
    SyncSampleBox {
        entries:        ArraySized32<u32>,
    },
    fourcc => b"stss",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}
