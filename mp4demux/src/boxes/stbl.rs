use std::io;

use crate::boxes::prelude::*;
use crate::boxes::{ChunkOffsetBox, SampleDescriptionBox, SampleSizeBox};
use crate::boxes::{SampleToChunkBox, SyncSampleBox, TimeToSampleBox};

def_box! {
    /// 8.1.1 Sample Table Box (ISO/IEC 14496-12:2015(E))
    ///
    /// It usually contains:
    ///
    /// - SampleDescriptionBox, stsd
    /// - TimeToSampleBox, stts
    /// - SampleSizeBox, stsz
    /// - SampleToChunkBox, stsc
    /// - ChunkOffsetBox, stco, or ChunkLargeOffsetBox, co64
    ///
    /// Optionally:
    ///
    /// - SyncSampleBox, stss
    SampleTableBox {
        boxes:      Vec<MP4Box>,
    },
    fourcc => b"stbl",
    version => [],
    impls => [ boxinfo, debug, frombytes ],
}

impl SampleTableBox {
    declare_box_methods!(SampleDescriptionBox, sample_description);
    declare_box_methods!(TimeToSampleBox, time_to_sample);
    declare_box_methods!(SampleSizeBox, sample_size);
    declare_box_methods!(SampleToChunkBox, sample_to_chunk);
    declare_box_methods!(SyncSampleBox, sync_samples);

    /// Get a reference to the ChunkOffsetBox or ChunkLargeOffsetBox.
    pub fn chunk_offset_table(&self) -> Option<&ChunkOffsetBox> {
        for box_ in &self.boxes {
            match box_ {
                &MP4Box::ChunkOffsetBox(ref stco) => return Some(stco),
                &MP4Box::ChunkLargeOffsetBox(ref co64) => return Some(co64),
                _ => {},
            }
        }
        None
    }

    /// Find a sample table that occurs more than once.
    ///
    /// Each of stts/stss/stsz/stsc and the chunk offset table must
    /// appear at most once per track.
    pub fn duplicate_table(&self) -> Option<FourCC> {
        let mut stts = 0;
        let mut stss = 0;
        let mut stsz = 0;
        let mut stsc = 0;
        let mut stco = 0;
        for box_ in &self.boxes {
            let count = match box_ {
                &MP4Box::TimeToSampleBox(_) => {
                    stts += 1;
                    stts
                },
                &MP4Box::SyncSampleBox(_) => {
                    stss += 1;
                    stss
                },
                &MP4Box::SampleSizeBox(_) => {
                    stsz += 1;
                    stsz
                },
                &MP4Box::SampleToChunkBox(_) => {
                    stsc += 1;
                    stsc
                },
                &MP4Box::ChunkOffsetBox(_) | &MP4Box::ChunkLargeOffsetBox(_) => {
                    stco += 1;
                    stco
                },
                _ => 0,
            };
            if count > 1 {
                return Some(box_.fourcc());
            }
        }
        None
    }
}
