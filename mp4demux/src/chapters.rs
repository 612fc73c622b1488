//! Chapter list extraction.
//!
//! Chapters are stored as a text track referenced through a "chap"
//! track reference. Each sample is a 16-bit length-prefixed UTF-8
//! string; the sample's decode time is the chapter start.
//!
use std::convert::TryInto;
use std::fs;
use std::os::unix::fs::FileExt;

use crate::error::Result;
use crate::track::{ticks_to_micros, Movie};

/// We stop collecting after this many chapters.
pub const MAX_CHAPTERS: usize = 100;

/// One chapter: start time and title.
#[derive(Clone, Debug)]
pub struct Chapter {
    pub time_us: u64,
    pub name:    String,
}

/// Read the chapter list from the linked chapter track, if any.
pub(crate) fn extract(file: &fs::File, movie: &Movie) -> Result<Vec<Chapter>> {
    let chapter_track = movie.tracks.iter().find_map(|t| t.chapters_track);
    let track = match chapter_track {
        Some(idx) => &movie.tracks[idx],
        None => return Ok(Vec::new()),
    };

    let mut chapters = Vec::new();
    for sample in 0..track.sample_count as usize {
        if chapters.len() >= MAX_CHAPTERS {
            log::debug!("chapters: track {}: more than {} chapters, truncating", track.id, MAX_CHAPTERS);
            break;
        }
        let size = track.sample_size[sample] as usize;
        let mut buf = vec![0u8; size];
        file.read_exact_at(&mut buf, track.sample_offset[sample])
            .map_err(crate::error::Error::Io)?;

        let mut name = String::new();
        if size >= 2 {
            let len = u16::from_be_bytes(buf[0..2].try_into().unwrap()) as usize;
            if len <= size - 2 {
                name = String::from_utf8_lossy(&buf[2..2 + len]).into_owned();
            }
        }

        chapters.push(Chapter {
            time_us: ticks_to_micros(track.sample_dts[sample], track.timescale),
            name,
        });
    }

    Ok(chapters)
}
