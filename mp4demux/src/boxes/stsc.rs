use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.7.4 Sample To Chunk Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    SampleToChunkBox {
        entries:        ArraySized32<SampleToChunkEntry>,
    },
    fourcc => b"stsc",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}

def_struct! {
    /// Entry in SampleToChunkBox.
    ///
    /// `first_chunk` and `sample_description_index` are 1-based,
    /// as per the ISO/IEC 14496-12 spec.
    #[derive(Default)]
    SampleToChunkEntry,
        first_chunk:                u32,
        samples_per_chunk:          u32,
        sample_description_index:   u32,
}
