//! The demuxer itself: open a file, inspect it, seek, read samples.
//!
use std::fs;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::boxes::{FileTypeBox, MovieBox, MP4Box};
use crate::chapters::{self, Chapter};
use crate::error::{Error, Result};
use crate::io::Mp4File;
use crate::metadata::{self, CoverKind, Metadata};
use crate::mp4box::read_boxes;
use crate::track::{micros_to_ticks, CodecParams, Movie, TrackKind};
use crate::types::IsoLanguageCode;

/// An open MP4 file with its parsed model.
///
/// All state is built by [`Demuxer::open`]; afterwards only the
/// per-track sample cursors change. Dropping the demuxer releases
/// the file and all memory.
pub struct Demuxer {
    file:     Arc<fs::File>,
    path:     String,
    boxes:    Vec<MP4Box>,
    movie:    Movie,
    metadata: Metadata,
    chapters: Vec<Chapter>,
}

/// Movie-level information.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct MediaInfo {
    pub duration_us:       u64,
    /// Unix seconds.
    pub creation_time:     i64,
    pub modification_time: i64,
    pub track_count:       u32,
}

/// General track information.
#[derive(Debug, Default, Serialize)]
pub struct TrackInfo {
    pub id:                u32,
    pub track_type:        String,
    pub duration_us:       u64,
    pub creation_time:     i64,
    pub modification_time: i64,
    pub timescale:         u32,
    pub sample_count:      u32,
    #[serde(serialize_with = "display")]
    pub language:          IsoLanguageCode,
    pub specific_info:     SpecificTrackInfo,
}

/// Track-type specific info.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SpecificTrackInfo {
    Video(VideoTrackInfo),
    Audio(AudioTrackInfo),
    Metadata(MetadataTrackInfo),
    Unknown(UnknownTrackInfo),
}

impl Default for SpecificTrackInfo {
    fn default() -> SpecificTrackInfo {
        SpecificTrackInfo::Unknown(UnknownTrackInfo {
            codec_id: "und".to_string(),
        })
    }
}

/// Video track details.
#[derive(Debug, Default, Serialize)]
pub struct VideoTrackInfo {
    pub codec_id:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_name: Option<String>,
    pub width:      u16,
    pub height:     u16,
}

/// Audio track details.
#[derive(Debug, Default, Serialize)]
pub struct AudioTrackInfo {
    pub codec_id:      String,
    pub channel_count: u16,
    pub bit_depth:     u16,
    pub sample_rate:   f64,
}

/// Timed-metadata track details.
#[derive(Debug, Default, Serialize)]
pub struct MetadataTrackInfo {
    pub content_encoding: String,
    pub mime_format:      String,
}

/// Unknown track type.
#[derive(Debug, Default, Serialize)]
pub struct UnknownTrackInfo {
    pub codec_id: String,
}

/// Information about one sample, as returned by [`Demuxer::next_sample`].
///
/// All-zero when the cursor is past the end of the track.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleInfo {
    pub sample_size:   u32,
    /// Size of the linked metadata track's sample, 0 if none.
    pub metadata_size: u32,
    /// Decode time in microseconds.
    pub dts_us:        u64,
    /// Decode time of the next sample in microseconds; 0 at the end.
    pub next_dts_us:   u64,
}

impl Demuxer {
    /// Open an MP4 file and build the full in-memory model.
    pub fn open(path: impl AsRef<str>) -> Result<Demuxer> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(Error::InvalidArgument("empty path".to_string()));
        }

        let mut reader = Mp4File::open(path)?;
        let boxes = read_boxes(&mut reader)?;
        let file = reader.file();

        let moov = first_box!(&boxes, MovieBox)
            .ok_or_else(|| Error::MalformedSize("no moov box in file".to_string()))?;
        let movie = Movie::from_moov(moov)?;
        let metadata = metadata::build(moov);
        let chapters = chapters::extract(&file, &movie)?;

        Ok(Demuxer {
            file,
            path: path.to_string(),
            boxes,
            movie,
            metadata,
            chapters,
        })
    }

    /// Path this demuxer was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The parsed box tree, for inspection.
    pub fn boxes(&self) -> &[MP4Box] {
        &self.boxes[..]
    }

    /// The file type box, if the file had one.
    pub fn file_type(&self) -> Option<&FileTypeBox> {
        first_box!(&self.boxes, FileTypeBox)
    }

    /// The semantic movie model.
    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    /// Movie-level info.
    pub fn media_info(&self) -> MediaInfo {
        MediaInfo {
            duration_us:       self.movie.duration_us(),
            creation_time:     self.movie.creation_time,
            modification_time: self.movie.modification_time,
            track_count:       self.movie.tracks.len() as u32,
        }
    }

    /// Number of tracks.
    pub fn track_count(&self) -> usize {
        self.movie.tracks.len()
    }

    /// Per-track descriptor.
    pub fn track_info(&self, idx: usize) -> Result<TrackInfo> {
        let track = self
            .movie
            .tracks
            .get(idx)
            .ok_or_else(|| Error::InvalidArgument(format!("track index {} out of range", idx)))?;

        let specific_info = match &track.codec {
            CodecParams::Video(v) => SpecificTrackInfo::Video(VideoTrackInfo {
                codec_id:   v.codec_id.clone(),
                codec_name: v.codec_name.clone(),
                width:      v.width,
                height:     v.height,
            }),
            CodecParams::Audio(a) => SpecificTrackInfo::Audio(AudioTrackInfo {
                codec_id:      a.codec.clone(),
                channel_count: a.channel_count,
                bit_depth:     a.sample_size,
                sample_rate:   a.sample_rate.get(),
            }),
            CodecParams::Metadata(m) => SpecificTrackInfo::Metadata(MetadataTrackInfo {
                content_encoding: m.content_encoding.clone(),
                mime_format:      m.mime_format.clone(),
            }),
            CodecParams::Unknown => SpecificTrackInfo::default(),
        };

        Ok(TrackInfo {
            id: track.id,
            track_type: track.kind.to_string(),
            duration_us: track.duration_us(),
            creation_time: track.creation_time,
            modification_time: track.modification_time,
            timescale: track.timescale,
            sample_count: track.sample_count,
            language: track.language,
            specific_info,
        })
    }

    /// Borrowed SPS and PPS parameter sets of an AVC video track.
    ///
    /// Both may be empty if the track has no decoder configuration.
    pub fn avc_decoder_config(&self, track_id: u32) -> Result<(&[u8], &[u8])> {
        let idx = self
            .movie
            .track_idx_by_id(track_id)
            .ok_or_else(|| Error::NotFound(format!("track {}", track_id)))?;
        match &self.movie.tracks[idx].codec {
            CodecParams::Video(v) => Ok((&v.sps[..], &v.pps[..])),
            _ => Ok((&[][..], &[][..])),
        }
    }

    /// Position every track's cursor at `time_us`.
    ///
    /// Chapter tracks are left alone; metadata tracks with a
    /// reference follow their referenced track.
    pub fn seek(&mut self, time_us: u64, require_sync: bool) -> Result<()> {
        for idx in 0..self.movie.tracks.len() {
            let (kind, has_ref, count, track_id) = {
                let t = &self.movie.tracks[idx];
                (t.kind, t.ref_track.is_some(), t.sample_count, t.id)
            };
            if count == 0 || kind == TrackKind::Chapters {
                continue;
            }
            if kind == TrackKind::Metadata && has_ref {
                continue;
            }

            let (sample, ts_found, meta_idx) = {
                let t = &self.movie.tracks[idx];
                let ts = micros_to_ticks(time_us, t.timescale);
                let sample = t.locate_sample(ts, require_sync)?;
                (sample, t.sample_dts[sample], t.metadata_track)
            };
            self.movie.tracks[idx].current_sample = sample;

            if let Some(mi) = meta_idx {
                let m = &mut self.movie.tracks[mi];
                if m.sample_dts.get(sample) == Some(&ts_found) {
                    m.current_sample = sample;
                } else {
                    log::warn!(
                        "seek: metadata track {} does not line up with track {} at sample {}",
                        m.id,
                        track_id,
                        sample
                    );
                }
            }
        }
        Ok(())
    }

    /// Return the current sample of a track and advance the cursor.
    ///
    /// If `sample_buf` is given and large enough the sample payload
    /// is copied into it; same for `meta_buf` and the linked metadata
    /// track's sample. Past the end an all-zero [`SampleInfo`] is
    /// returned and nothing is read.
    pub fn next_sample(
        &mut self,
        track_id: u32,
        mut sample_buf: Option<&mut [u8]>,
        mut meta_buf: Option<&mut [u8]>,
    ) -> Result<SampleInfo> {
        let idx = self
            .movie
            .track_idx_by_id(track_id)
            .ok_or_else(|| Error::NotFound(format!("track {}", track_id)))?;

        let (cur, count, meta_idx) = {
            let t = &self.movie.tracks[idx];
            (t.current_sample, t.sample_count as usize, t.metadata_track)
        };
        if cur >= count {
            return Ok(SampleInfo::default());
        }

        let mut info = SampleInfo::default();
        {
            let t = &self.movie.tracks[idx];
            info.sample_size = t.sample_size[cur];
            info.dts_us = t.sample_dts_us(cur);
            info.next_dts_us = if cur + 1 < count { t.sample_dts_us(cur + 1) } else { 0 };
            if let Some(buf) = sample_buf.as_deref_mut() {
                let size = info.sample_size as usize;
                if buf.len() < size {
                    return Err(Error::BufferTooSmall {
                        needed: info.sample_size as u64,
                    });
                }
                self.file
                    .read_exact_at(&mut buf[..size], t.sample_offset[cur])
                    .map_err(Error::Io)?;
            }
        }

        if let Some(mi) = meta_idx {
            let m = &self.movie.tracks[mi];
            let mcur = m.current_sample;
            if mcur < m.sample_count as usize {
                info.metadata_size = m.sample_size[mcur];
                if let Some(buf) = meta_buf.as_deref_mut() {
                    let size = info.metadata_size as usize;
                    if buf.len() < size {
                        return Err(Error::BufferTooSmall {
                            needed: info.metadata_size as u64,
                        });
                    }
                    self.file
                        .read_exact_at(&mut buf[..size], m.sample_offset[mcur])
                        .map_err(Error::Io)?;
                }
            }
        }

        self.movie.tracks[idx].current_sample += 1;
        if let Some(mi) = meta_idx {
            let m = &mut self.movie.tracks[mi];
            if m.current_sample < m.sample_count as usize {
                m.current_sample += 1;
            }
        }

        Ok(info)
    }

    /// The chapter list, possibly empty.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters[..]
    }

    /// The merged metadata as parallel key/value arrays.
    pub fn metadata_strings(&self) -> (&[String], &[String]) {
        (&self.metadata.keys[..], &self.metadata.values[..])
    }

    /// Size and type of the cover art, if any.
    ///
    /// If `buf` is given and large enough, the cover bytes are
    /// copied into it.
    pub fn metadata_cover(&self, buf: Option<&mut [u8]>) -> Result<Option<(u64, CoverKind)>> {
        let cover = match self.metadata.cover {
            Some(cover) => cover,
            None => return Ok(None),
        };
        if let Some(buf) = buf {
            if (buf.len() as u64) < cover.size {
                return Err(Error::BufferTooSmall { needed: cover.size });
            }
            self.file
                .read_exact_at(&mut buf[..cover.size as usize], cover.pos)
                .map_err(Error::Io)?;
        }
        Ok(Some((cover.size, cover.kind)))
    }
}

impl std::fmt::Debug for Demuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("Demuxer");
        dbg.field("path", &self.path);
        dbg.field("movie", &self.movie);
        dbg.finish()
    }
}

// Serialize helper.
fn display<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
