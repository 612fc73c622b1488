//! Read ISO Base Media (MP4 / MOV) containers and demultiplex them.
//!
//! Opening a file parses the box hierarchy, reconstructs a flat
//! per-sample index for every track (file offset, size, decode time),
//! links tracks to each other (timed metadata, chapters), and merges
//! the container-level metadata. Afterwards samples can be read
//! sequentially per track, and all tracks can be repositioned with a
//! microsecond-precision seek.
//!
//! ```no_run
//! fn main() -> mp4demux::Result<()> {
//!     let mut dmx = mp4demux::Demuxer::open("movie.mp4")?;
//!
//!     let info = dmx.media_info();
//!     println!("{} tracks, {} us", info.track_count, info.duration_us);
//!
//!     // Read the first video sample.
//!     let track = dmx.track_info(0)?;
//!     let mut buf = vec![0u8; 1024 * 1024];
//!     let sample = dmx.next_sample(track.id, Some(&mut buf[..]), None)?;
//!     println!("sample of {} bytes at {} us", sample.sample_size, sample.dts_us);
//!
//!     Ok(())
//! }
//! ```
//!
//! Fragmented files (`moof`), edit lists and writing are out of scope.
//!
#[macro_use]
mod ioerr;
#[macro_use]
#[doc(hidden)]
pub mod macros;
#[macro_use]
pub mod serialize;
pub mod types;

pub mod boxes;
pub mod chapters;
pub mod demux;
pub mod error;
pub mod io;
pub mod metadata;
pub mod mp4box;
pub mod track;

pub use crate::demux::{Demuxer, MediaInfo, SampleInfo, TrackInfo};
pub use crate::error::{Error, Result};
pub use crate::io::Mp4File;
