//! The semantic movie/track model.
//!
//! Built once from the parsed box tree: per-track identity, the
//! materialized per-sample index (file offset, size, decode time),
//! inter-track links, and the navigation primitives that operate
//! on the index.
//!
use std::fmt::{self, Display};

use crate::boxes::*;
use crate::error::{Error, Result};
use crate::types::{FixedFloat16_16, FourCC, IsoLanguageCode};

/// What kind of elementary stream a track carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Hint,
    Metadata,
    Text,
    Chapters,
    Unknown,
}

impl Default for TrackKind {
    fn default() -> TrackKind {
        TrackKind::Unknown
    }
}

impl TrackKind {
    /// Map an `hdlr` handler type to a track kind.
    pub fn from_handler(handler_type: FourCC) -> TrackKind {
        match &handler_type.to_be_bytes() {
            b"vide" => TrackKind::Video,
            b"soun" => TrackKind::Audio,
            b"hint" => TrackKind::Hint,
            b"meta" => TrackKind::Metadata,
            b"text" => TrackKind::Text,
            _ => TrackKind::Unknown,
        }
    }
}

impl Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
            TrackKind::Hint => "hint",
            TrackKind::Metadata => "metadata",
            TrackKind::Text => "text",
            TrackKind::Chapters => "chapters",
            TrackKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Video codec of a video track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    Avc,
    Unknown,
}

impl Default for VideoCodec {
    fn default() -> VideoCodec {
        VideoCodec::Unknown
    }
}

/// Codec parameters from the sample description.
#[derive(Clone, Debug)]
pub enum CodecParams {
    Video(VideoParams),
    Audio(AudioParams),
    Metadata(MetadataParams),
    Unknown,
}

impl Default for CodecParams {
    fn default() -> CodecParams {
        CodecParams::Unknown
    }
}

/// Video track details.
#[derive(Clone, Debug, Default)]
pub struct VideoParams {
    pub codec:      VideoCodec,
    pub codec_id:   String,
    pub codec_name: Option<String>,
    pub width:      u16,
    pub height:     u16,
    /// First SPS NAL unit, verbatim.
    pub sps:        Vec<u8>,
    /// First PPS NAL unit, verbatim.
    pub pps:        Vec<u8>,
}

/// Audio track details.
#[derive(Clone, Debug, Default)]
pub struct AudioParams {
    pub codec:         String,
    pub channel_count: u16,
    pub sample_size:   u16,
    pub sample_rate:   FixedFloat16_16,
}

/// Timed-metadata track details.
#[derive(Clone, Debug, Default)]
pub struct MetadataParams {
    pub content_encoding: String,
    pub mime_format:      String,
}

/// One track of the movie.
///
/// Links to other tracks are indices into `Movie::tracks`; ownership
/// stays with the movie.
#[derive(Clone, Debug, Default)]
pub struct Track {
    pub id:                u32,
    pub kind:              TrackKind,
    pub timescale:         u32,
    /// In the track's own timescale.
    pub duration:          u64,
    /// Unix seconds.
    pub creation_time:     i64,
    pub modification_time: i64,
    pub language:          IsoLanguageCode,

    /// First `tref` reference: (kind, referenced track id).
    pub reference:         Option<(FourCC, u32)>,
    pub ref_track:         Option<usize>,
    pub metadata_track:    Option<usize>,
    pub chapters_track:    Option<usize>,

    pub codec:             CodecParams,

    /// 1-based sample numbers; `None` means every sample is sync.
    pub sync_samples:      Option<Vec<u32>>,

    pub sample_count:      u32,
    pub sample_offset:     Vec<u64>,
    pub sample_size:       Vec<u32>,
    /// Decode timestamps, in the track's timescale.
    pub sample_dts:        Vec<u64>,

    /// Navigation cursor, 0-based.
    pub(crate) current_sample: usize,
}

impl Track {
    fn from_trak(trak: &TrackBox) -> Result<Track> {
        let tkhd = trak
            .track_header()
            .ok_or_else(|| Error::Protocol("trak: no tkhd".to_string()))?;
        let track_id = tkhd.track_id;

        let mdia = trak
            .media()
            .ok_or_else(|| Error::Protocol(format!("track {}: no mdia", track_id)))?;
        let mdhd = mdia
            .media_header()
            .ok_or_else(|| Error::Protocol(format!("track {}: no mdhd", track_id)))?;
        let hdlr = mdia
            .handler()
            .ok_or_else(|| Error::Protocol(format!("track {}: no hdlr", track_id)))?;
        let stbl = mdia
            .media_info()
            .and_then(|minf| minf.sample_table())
            .ok_or_else(|| Error::Protocol(format!("track {}: no stbl", track_id)))?;

        if let Some(fourcc) = stbl.duplicate_table() {
            return Err(Error::DuplicateTable(fourcc));
        }

        let kind = TrackKind::from_handler(hdlr.handler_type);
        let index = build_sample_index(track_id, stbl)?;
        let sync_samples = sync_sample_table(track_id, stbl, index.count)?;

        Ok(Track {
            id: track_id,
            kind,
            timescale: mdhd.timescale,
            duration: mdhd.duration.0,
            creation_time: mdhd.cr_time.to_unixtime(),
            modification_time: mdhd.mod_time.to_unixtime(),
            language: mdhd.language,
            reference: trak.track_reference().and_then(|tref| tref.first()),
            ref_track: None,
            metadata_track: None,
            chapters_track: None,
            codec: codec_params(kind, stbl),
            sync_samples,
            sample_count: index.count as u32,
            sample_offset: index.offsets,
            sample_size: index.sizes,
            sample_dts: index.dts,
            current_sample: 0,
        })
    }

    /// Duration in microseconds.
    pub fn duration_us(&self) -> u64 {
        ticks_to_micros(self.duration, self.timescale)
    }

    /// Decode time of a sample, in microseconds.
    pub fn sample_dts_us(&self, sample: usize) -> u64 {
        ticks_to_micros(self.sample_dts[sample], self.timescale)
    }

    /// Current position of the navigation cursor (0-based).
    pub fn current_sample(&self) -> usize {
        self.current_sample
    }

    /// Is sample `sample` (0-based) a sync sample, and which earlier
    /// sample is the nearest preceding sync sample?
    pub fn is_sync_sample(&self, sample: usize) -> (bool, Option<usize>) {
        let table = match self.sync_samples.as_ref() {
            None => return (true, if sample > 0 { Some(sample - 1) } else { None }),
            Some(table) => table,
        };
        let target = sample as u32 + 1;
        let mut prev = None;
        for &s in table {
            if s == target {
                return (true, prev);
            }
            if s > target {
                return (false, prev);
            }
            prev = Some((s - 1) as usize);
        }
        (false, prev)
    }

    /// Find the sample to show for decode time `ts` (in the track's
    /// timescale): the last sample with a dts at or before `ts`, or,
    /// with `require_sync`, the nearest preceding sync sample.
    pub fn locate_sample(&self, ts: u64, require_sync: bool) -> Result<usize> {
        let count = self.sample_count as usize;
        if count == 0 {
            return Err(Error::NotFound(format!("track {}: no samples", self.id)));
        }

        // Proportional estimate, then a forward scan, then settle
        // backwards on the last dts <= ts.
        let mut start = if self.duration > 0 {
            let est = (count as u128 * ts as u128 + self.duration as u128 - 1) / self.duration as u128;
            std::cmp::min(count - 1, est as usize)
        } else {
            0
        };
        while start < count - 1 && self.sample_dts[start] < ts {
            start += 1;
        }
        let mut sample = start;
        while self.sample_dts[sample] > ts {
            if sample == 0 {
                return Err(Error::NotFound(format!(
                    "track {}: no sample at or before time {}",
                    self.id, ts
                )));
            }
            sample -= 1;
        }

        if require_sync {
            let (is_sync, prev) = self.is_sync_sample(sample);
            if !is_sync {
                sample = prev.ok_or_else(|| {
                    Error::NotFound(format!("track {}: no sync sample before time {}", self.id, ts))
                })?;
            }
        }

        Ok(sample)
    }
}

/// The movie: header fields plus the track arena.
#[derive(Clone, Debug, Default)]
pub struct Movie {
    pub timescale:         u32,
    /// In the movie timescale.
    pub duration:          u64,
    /// Unix seconds.
    pub creation_time:     i64,
    pub modification_time: i64,
    pub tracks:            Vec<Track>,
}

impl Movie {
    /// Build the semantic model from a parsed MovieBox.
    pub fn from_moov(moov: &MovieBox) -> Result<Movie> {
        let mvhd = moov
            .movie_header()
            .ok_or_else(|| Error::Protocol("moov: no mvhd".to_string()))?;

        let mut tracks = Vec::new();
        for trak in moov.tracks() {
            tracks.push(Track::from_trak(trak)?);
        }
        link_tracks(&mut tracks);

        Ok(Movie {
            timescale: mvhd.timescale,
            duration: mvhd.duration.0,
            creation_time: mvhd.cr_time.to_unixtime(),
            modification_time: mvhd.mod_time.to_unixtime(),
            tracks,
        })
    }

    /// Duration in microseconds.
    pub fn duration_us(&self) -> u64 {
        ticks_to_micros(self.duration, self.timescale)
    }

    /// Index of the track with this id.
    pub fn track_idx_by_id(&self, track_id: u32) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }
}

#[derive(Debug)]
struct SampleIndex {
    count:   usize,
    offsets: Vec<u64>,
    sizes:   Vec<u32>,
    dts:     Vec<u64>,
}

// Cross-join stsc/stco/stsz/stts into flat per-sample vectors.
fn build_sample_index(track_id: u32, stbl: &SampleTableBox) -> Result<SampleIndex> {
    let stts = stbl
        .time_to_sample()
        .ok_or_else(|| Error::Protocol(format!("track {}: no stts", track_id)))?;
    let stsc = stbl
        .sample_to_chunk()
        .ok_or_else(|| Error::Protocol(format!("track {}: no stsc", track_id)))?;
    let stsz = stbl
        .sample_size()
        .ok_or_else(|| Error::Protocol(format!("track {}: no stsz", track_id)))?;
    let stco = stbl
        .chunk_offset_table()
        .ok_or_else(|| Error::Protocol(format!("track {}: no stco/co64", track_id)))?;

    let count = stsz.count as usize;

    let mut sizes = Vec::new();
    sizes.try_reserve_exact(count).map_err(|_| Error::OutOfMemory)?;
    sizes.extend(stsz.iter());

    // Walk the chunk runs, laying out one offset per sample. The
    // offset within a chunk advances by each laid-out sample's size.
    let chunk_count = stco.entries.len();
    let mut offsets = Vec::new();
    offsets.try_reserve_exact(count).map_err(|_| Error::OutOfMemory)?;
    let entries = &stsc.entries;
    let mut sample = 0usize;
    for (i, entry) in entries.iter().enumerate() {
        let first = entry.first_chunk as usize;
        let end = if i + 1 < entries.len() {
            (entries[i + 1].first_chunk as usize).saturating_sub(1)
        } else {
            chunk_count
        };
        if first == 0 || first > end || end > chunk_count {
            return Err(Error::Protocol(format!(
                "track {}: stsc entry {} has chunk run {}..{} outside 1..{}",
                track_id,
                i + 1,
                first,
                end,
                chunk_count
            )));
        }
        for chunk in first..=end {
            let mut offset = stco.entries[chunk - 1];
            for _ in 0..entry.samples_per_chunk {
                if sample >= count {
                    return Err(Error::Protocol(format!(
                        "track {}: stsc lays out more samples than the stsz count {}",
                        track_id, count
                    )));
                }
                offsets.push(offset);
                offset += sizes[sample] as u64;
                sample += 1;
            }
        }
    }
    if sample != count {
        return Err(Error::Protocol(format!(
            "track {}: stsc/stco lay out {} samples, stsz has {}",
            track_id, sample, count
        )));
    }

    // Decode timestamps: start at 0, advance by each entry's delta.
    let mut dts = Vec::new();
    dts.try_reserve_exact(count).map_err(|_| Error::OutOfMemory)?;
    let mut t = 0u64;
    for entry in stts.entries.iter() {
        for _ in 0..entry.count {
            if dts.len() >= count {
                return Err(Error::Protocol(format!(
                    "track {}: stts implies more samples than the stsz count {}",
                    track_id, count
                )));
            }
            dts.push(t);
            t += entry.delta as u64;
        }
    }
    if dts.len() != count {
        return Err(Error::Protocol(format!(
            "track {}: stts covers {} samples, stsz has {}",
            track_id,
            dts.len(),
            count
        )));
    }

    Ok(SampleIndex {
        count,
        offsets,
        sizes,
        dts,
    })
}

// Validate and extract the sync sample table.
fn sync_sample_table(track_id: u32, stbl: &SampleTableBox, count: usize) -> Result<Option<Vec<u32>>> {
    let stss = match stbl.sync_samples() {
        None => return Ok(None),
        Some(stss) => stss,
    };
    let mut prev = 0u32;
    for &s in stss.entries.iter() {
        if s <= prev || s as usize > count {
            return Err(Error::Protocol(format!(
                "track {}: stss entry {} out of order or outside 1..{}",
                track_id, s, count
            )));
        }
        prev = s;
    }
    Ok(Some(stss.entries.to_vec()))
}

// Pull the codec parameters out of the sample description.
fn codec_params(kind: TrackKind, stbl: &SampleTableBox) -> CodecParams {
    let stsd = match stbl.sample_description() {
        Some(stsd) => stsd,
        None => return CodecParams::Unknown,
    };
    let entry_fourcc = stsd.entry_fourcc();
    match kind {
        TrackKind::Video => {
            let mut params = VideoParams {
                codec_id: entry_fourcc.map(|f| f.to_string()).unwrap_or_default(),
                ..VideoParams::default()
            };
            if let Some(avc1) = first_box!(&stsd.entries, AvcSampleEntry) {
                params.width = avc1.width;
                params.height = avc1.height;
                if let Some(config) = avc1.configuration() {
                    params.codec = VideoCodec::Avc;
                    params.codec_id = config.codec_id();
                    params.codec_name = Some(config.codec_name().to_string());
                    params.sps = config.sps.clone();
                    params.pps = config.pps.clone();
                }
            }
            CodecParams::Video(params)
        },
        TrackKind::Audio => {
            let mut params = AudioParams {
                codec: entry_fourcc.map(|f| f.to_string()).unwrap_or_default(),
                ..AudioParams::default()
            };
            if let Some(entry) = first_box!(&stsd.entries, AudioSampleEntry) {
                params.channel_count = entry.channel_count;
                params.sample_size = entry.sample_size;
                params.sample_rate = entry.sample_rate;
            }
            CodecParams::Audio(params)
        },
        TrackKind::Metadata => {
            if let Some(entry) = first_box!(&stsd.entries, MetadataSampleEntry) {
                CodecParams::Metadata(MetadataParams {
                    content_encoding: entry.content_encoding.as_str().to_string(),
                    mime_format: entry.mime_format.as_str().to_string(),
                })
            } else {
                CodecParams::Unknown
            }
        },
        _ => CodecParams::Unknown,
    }
}

// Resolve tref links, then apply the lone-video + lone-metadata fallback.
fn link_tracks(tracks: &mut Vec<Track>) {
    for i in 0..tracks.len() {
        let (kind, reference) = (tracks[i].kind, tracks[i].reference);
        let (ref_kind, ref_id) = match reference {
            Some(r) => r,
            None => continue,
        };
        if ref_kind.0 == 0 || ref_id == 0 {
            continue;
        }
        let r = match tracks.iter().position(|t| t.id == ref_id) {
            Some(r) => r,
            None => continue,
        };
        if r == i {
            continue;
        }
        if ref_kind == b"cdsc" && kind == TrackKind::Metadata {
            tracks[r].metadata_track = Some(i);
            tracks[i].ref_track = Some(r);
        } else if ref_kind == b"chap" && tracks[r].kind == TrackKind::Text {
            tracks[i].chapters_track = Some(r);
            tracks[r].ref_track = Some(i);
            tracks[r].kind = TrackKind::Chapters;
        }
    }

    let count_of = |tracks: &[Track], kind| tracks.iter().filter(|t| t.kind == kind).count();
    if count_of(tracks, TrackKind::Video) == 1
        && count_of(tracks, TrackKind::Metadata) == 1
        && count_of(tracks, TrackKind::Audio) == 0
        && count_of(tracks, TrackKind::Hint) == 0
    {
        let v = tracks.iter().position(|t| t.kind == TrackKind::Video).unwrap();
        let m = tracks.iter().position(|t| t.kind == TrackKind::Metadata).unwrap();
        if tracks[v].metadata_track.is_none() {
            log::debug!(
                "link_tracks: linking lone metadata track {} to video track {}",
                tracks[m].id,
                tracks[v].id
            );
            tracks[v].metadata_track = Some(m);
            tracks[m].ref_track = Some(v);
        }
    }
}

/// Ticks at `timescale` ticks/second to microseconds, rounding half up.
pub fn ticks_to_micros(t: u64, timescale: u32) -> u64 {
    if timescale == 0 {
        return 0;
    }
    ((t as u128 * 1_000_000 + timescale as u128 / 2) / timescale as u128) as u64
}

/// Microseconds to ticks at `timescale` ticks/second, rounding half up.
pub fn micros_to_ticks(us: u64, timescale: u32) -> u64 {
    ((us as u128 * timescale as u128 + 500_000) / 1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArraySized32;

    fn stbl(
        stts: Vec<TimeToSampleEntry>,
        stsc: Vec<SampleToChunkEntry>,
        stsz: SampleSizeBox,
        chunk_offsets: Vec<u64>,
    ) -> SampleTableBox {
        SampleTableBox {
            boxes: vec![
                MP4Box::TimeToSampleBox(TimeToSampleBox {
                    entries: ArraySized32(stts),
                }),
                MP4Box::SampleToChunkBox(SampleToChunkBox {
                    entries: ArraySized32(stsc),
                }),
                MP4Box::SampleSizeBox(stsz),
                MP4Box::ChunkOffsetBox(ChunkOffsetBox {
                    fourcc: FourCC::new("stco"),
                    entries: chunk_offsets,
                }),
            ],
        }
    }

    fn entry(first_chunk: u32, samples_per_chunk: u32) -> SampleToChunkEntry {
        SampleToChunkEntry {
            first_chunk,
            samples_per_chunk,
            sample_description_index: 1,
        }
    }

    #[test]
    fn constant_sample_size() {
        let stbl = stbl(
            vec![TimeToSampleEntry { count: 3, delta: 100 }],
            vec![entry(1, 3)],
            SampleSizeBox {
                size: 4096,
                count: 3,
                entries: vec![],
            },
            vec![0x2000],
        );
        let index = build_sample_index(1, &stbl).unwrap();
        assert_eq!(index.offsets, vec![0x2000, 0x3000, 0x4000]);
        assert_eq!(index.sizes, vec![4096, 4096, 4096]);
        assert_eq!(index.dts, vec![0, 100, 200]);
    }

    #[test]
    fn variable_sizes_across_chunks() {
        let stbl = stbl(
            vec![TimeToSampleEntry { count: 7, delta: 10 }],
            vec![entry(1, 2), entry(3, 3)],
            SampleSizeBox {
                size: 0,
                count: 7,
                entries: vec![10, 20, 30, 40, 50, 60, 70],
            },
            vec![100, 200, 300],
        );
        let index = build_sample_index(1, &stbl).unwrap();
        assert_eq!(index.offsets, vec![100, 110, 200, 230, 300, 350, 410]);
    }

    #[test]
    fn sample_count_mismatch() {
        // stts covers 4 samples, stsz has 3.
        let stbl = stbl(
            vec![TimeToSampleEntry { count: 4, delta: 10 }],
            vec![entry(1, 3)],
            SampleSizeBox {
                size: 100,
                count: 3,
                entries: vec![],
            },
            vec![0],
        );
        let err = build_sample_index(1, &stbl).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn stsc_overruns_stsz() {
        let stbl = stbl(
            vec![TimeToSampleEntry { count: 3, delta: 10 }],
            vec![entry(1, 5)],
            SampleSizeBox {
                size: 100,
                count: 3,
                entries: vec![],
            },
            vec![0],
        );
        let err = build_sample_index(1, &stbl).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    fn seek_track() -> Track {
        Track {
            id: 1,
            kind: TrackKind::Video,
            timescale: 1,
            duration: 9,
            sync_samples: Some(vec![1, 4, 7]),
            sample_count: 9,
            sample_offset: vec![0; 9],
            sample_size: vec![1; 9],
            sample_dts: (0..9).collect(),
            ..Track::default()
        }
    }

    #[test]
    fn seek_to_sync_sample() {
        let track = seek_track();
        // 3.5s at timescale 1 rounds up to tick 4; sample #5 (0-based 4)
        // is not sync, the nearest earlier sync sample is #4 (0-based 3).
        let ts = micros_to_ticks(3_500_000, track.timescale);
        assert_eq!(ts, 4);
        assert_eq!(track.locate_sample(ts, true).unwrap(), 3);
        assert_eq!(track.locate_sample(ts, false).unwrap(), 4);
    }

    #[test]
    fn sync_sample_lookup() {
        let track = seek_track();
        assert_eq!(track.is_sync_sample(0), (true, None));
        assert_eq!(track.is_sync_sample(1), (false, Some(0)));
        assert_eq!(track.is_sync_sample(3), (true, Some(0)));
        assert_eq!(track.is_sync_sample(8), (false, Some(6)));

        let mut track = track;
        track.sync_samples = None;
        assert_eq!(track.is_sync_sample(0), (true, None));
        assert_eq!(track.is_sync_sample(5), (true, Some(4)));
    }

    #[test]
    fn time_conversion_rounds_half_up() {
        assert_eq!(ticks_to_micros(1000, 100), 10_000_000);
        assert_eq!(ticks_to_micros(1, 3), 333_333);
        assert_eq!(ticks_to_micros(2, 3), 666_667);
        assert_eq!(micros_to_ticks(3_500_000, 1), 4);
        assert_eq!(micros_to_ticks(3_499_999, 1), 3);
        // Values above 2^32 survive the conversion.
        let big = (1u64 << 33) + 500;
        assert_eq!(ticks_to_micros(big, 1000), big * 1000);
    }
}
