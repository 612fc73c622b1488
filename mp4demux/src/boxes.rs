//! All the boxes we know.
//!
//! Box types that only need a simple field list live in `misc.rs`;
//! everything with custom parsing or accessors has its own module.
//!
use std::fmt::Debug;
use std::io;

pub(crate) mod misc;
pub(crate) mod prelude;

pub use self::misc::*;
use self::prelude::*;

use crate::mp4box::GenericBox;

def_boxes! {
    FileTypeBox, b"ftyp";
    MovieHeaderBox, b"mvhd";
    MediaHeaderBox, b"mdhd";
    VideoMediaHeaderBox, b"vmhd";
    SoundMediaHeaderBox, b"smhd";
    HintMediaHeaderBox, b"hmhd";
    NullMediaHeaderBox, b"nmhd";
    UserDataBox, b"udta";
    DataInformationBox, b"dinf";

    MovieBox, b"moov" => moov;
    TrackBox, b"trak" => trak;
    TrackHeaderBox, b"tkhd" => tkhd;
    TrackReferenceBox, b"tref" => tref;
    MediaBox, b"mdia" => mdia;
    MediaInformationBox, b"minf";
    HandlerBox, b"hdlr" => hdlr;

    SampleTableBox, b"stbl" => stbl;
    SampleDescriptionBox, b"stsd" => stsd;
    AvcSampleEntry, b"avc1";
    AvcConfigurationBox, b"avcC" => avcc;
    AudioSampleEntry, b"mp4a";
    MetadataSampleEntry, b"mett";
    TimeToSampleBox, b"stts" => stts;
    SyncSampleBox, b"stss" => stss;
    SampleSizeBox, b"stsz" => stsz;
    SampleToChunkBox, b"stsc" => stsc;
    ChunkOffsetBox, b"stco" => stco;
    ChunkLargeOffsetBox, b"co64";

    MetaBox, b"meta" => meta;
    MetadataKeysBox, b"keys";
    AppleItemListBox, b"ilst";
    LocationBox, b"\xa9xyz";
}
