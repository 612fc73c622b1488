//! End-to-end tests over synthesized MP4 files.
//!
//! Each test writes a minimal but complete file to a temp path,
//! opens it with the demuxer, and drives the whole open, inspect,
//! seek and read path.
use mp4demux::metadata::CoverKind;
use mp4demux::{Demuxer, Error};

// ---- byte builders ----------------------------------------------------

fn atom(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
    v.extend_from_slice(fourcc);
    v.extend_from_slice(payload);
    v
}

// A full box: version + 24-bit flags in front of the payload.
fn full(fourcc: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.push(version);
    v.extend_from_slice(&flags.to_be_bytes()[1..4]);
    v.extend_from_slice(payload);
    atom(fourcc, &v)
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut v = Vec::new();
    for p in parts {
        v.extend_from_slice(p);
    }
    v
}

fn be32(v: u32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

fn be16(v: u16) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

fn ftyp() -> Vec<u8> {
    atom(
        b"ftyp",
        &concat(&[b"isom".to_vec(), be32(0x200), b"isom".to_vec(), b"avc1".to_vec()]),
    )
}

// Mac-epoch timestamp for a unix time.
fn mac_time(unix: u32) -> Vec<u8> {
    be32(unix.wrapping_add(0x7C25B080))
}

fn mvhd(timescale: u32, duration: u32, creation_unix: u32, modification_unix: u32) -> Vec<u8> {
    full(
        b"mvhd",
        0,
        0,
        &concat(&[
            mac_time(creation_unix),
            mac_time(modification_unix),
            be32(timescale),
            be32(duration),
            vec![0u8; 76],
            be32(100), // next_track_id
        ]),
    )
}

fn tkhd(track_id: u32, duration: u32) -> Vec<u8> {
    full(
        b"tkhd",
        0,
        7,
        &concat(&[
            mac_time(0),
            mac_time(0),
            be32(track_id),
            be32(0),
            be32(duration),
            vec![0u8; 60],
        ]),
    )
}

fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    full(
        b"mdhd",
        0,
        0,
        &concat(&[
            mac_time(0),
            mac_time(0),
            be32(timescale),
            be32(duration),
            be16(0x55c4), // "und"
            be16(0),
        ]),
    )
}

fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    full(
        b"hdlr",
        0,
        0,
        &concat(&[
            be32(0),
            handler.to_vec(),
            vec![0u8; 12],
            name.as_bytes().to_vec(),
            vec![0u8],
        ]),
    )
}

fn stts(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = be32(entries.len() as u32);
    for &(count, delta) in entries {
        payload.extend(be32(count));
        payload.extend(be32(delta));
    }
    full(b"stts", 0, 0, &payload)
}

fn stsc(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = be32(entries.len() as u32);
    for &(first_chunk, samples_per_chunk) in entries {
        payload.extend(be32(first_chunk));
        payload.extend(be32(samples_per_chunk));
        payload.extend(be32(1));
    }
    full(b"stsc", 0, 0, &payload)
}

fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut payload = be32(0);
    payload.extend(be32(sizes.len() as u32));
    for &s in sizes {
        payload.extend(be32(s));
    }
    full(b"stsz", 0, 0, &payload)
}

fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut payload = be32(offsets.len() as u32);
    for &o in offsets {
        payload.extend(be32(o));
    }
    full(b"stco", 0, 0, &payload)
}

fn stss(samples: &[u32]) -> Vec<u8> {
    let mut payload = be32(samples.len() as u32);
    for &s in samples {
        payload.extend(be32(s));
    }
    full(b"stss", 0, 0, &payload)
}

const SPS: &[u8] = &[0x67, 0x64, 0x00, 0x1f, 0xac, 0xd9, 0x40];
const PPS: &[u8] = &[0x68, 0xee, 0x3c, 0x80];

fn avcc() -> Vec<u8> {
    let mut payload = vec![1u8, 0x64, 0x00, 0x1f, 0xff, 0xe1];
    payload.extend(be16(SPS.len() as u16));
    payload.extend_from_slice(SPS);
    payload.push(1);
    payload.extend(be16(PPS.len() as u16));
    payload.extend_from_slice(PPS);
    atom(b"avcC", &payload)
}

fn avc1(width: u16, height: u16) -> Vec<u8> {
    let mut payload = vec![0u8; 6];
    payload.extend(be16(1)); // data_reference_index
    payload.extend(vec![0u8; 16]);
    payload.extend(be16(width));
    payload.extend(be16(height));
    payload.extend(vec![0u8; 50]);
    payload.extend(avcc());
    atom(b"avc1", &payload)
}

fn stsd(entry: Vec<u8>) -> Vec<u8> {
    full(b"stsd", 0, 0, &concat(&[be32(1), entry]))
}

fn mett(mime_format: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 6];
    payload.extend(be16(1));
    payload.push(0); // empty content_encoding
    payload.extend(mime_format.as_bytes());
    payload.push(0);
    atom(b"mett", &payload)
}

fn trak(parts: &[Vec<u8>]) -> Vec<u8> {
    atom(b"trak", &concat(parts))
}

fn mdia(parts: &[Vec<u8>]) -> Vec<u8> {
    atom(b"mdia", &concat(parts))
}

fn minf(parts: &[Vec<u8>]) -> Vec<u8> {
    atom(b"minf", &concat(parts))
}

fn stbl(parts: &[Vec<u8>]) -> Vec<u8> {
    atom(b"stbl", &concat(parts))
}

fn vmhd() -> Vec<u8> {
    full(b"vmhd", 0, 1, &[0u8; 8])
}

fn nmhd() -> Vec<u8> {
    full(b"nmhd", 0, 0, &[])
}

fn write_temp(name: &str, data: &[u8]) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("mp4demux-test-{}-{}.mp4", std::process::id(), name));
    std::fs::write(&path, data).unwrap();
    path.to_str().unwrap().to_string()
}

// ---- tests ------------------------------------------------------------

#[test]
fn open_inspect_and_read_video() {
    // Three video samples of 4, 5, 6 bytes in one chunk.
    let samples: &[&[u8]] = &[b"AAAA", b"BBBBB", b"CCCCCC"];
    let mdat_payload = concat(&samples.iter().map(|s| s.to_vec()).collect::<Vec<_>>());

    let ftyp = ftyp();
    let chunk_pos = (ftyp.len() + 8) as u32;
    let mdat = atom(b"mdat", &mdat_payload);

    let moov = atom(
        b"moov",
        &concat(&[
            mvhd(1000, 2000, 1_000_000_000, 1_000_000_001),
            trak(&[
                tkhd(1, 2000),
                mdia(&[
                    mdhd(30, 60),
                    hdlr(b"vide", "VideoHandler"),
                    minf(&[
                        vmhd(),
                        stbl(&[
                            stsd(avc1(640, 360)),
                            stts(&[(3, 10)]),
                            stsc(&[(1, 3)]),
                            stsz(&[4, 5, 6]),
                            stco(&[chunk_pos]),
                        ]),
                    ]),
                ]),
            ]),
        ]),
    );

    let path = write_temp("video", &concat(&[ftyp, mdat, moov]));
    let mut dmx = Demuxer::open(&path).unwrap();

    let info = dmx.media_info();
    assert_eq!(info.track_count, 1);
    assert_eq!(info.duration_us, 2_000_000);
    assert_eq!(info.creation_time, 1_000_000_000);
    // The modification time is the real one, not a copy of creation.
    assert_eq!(info.modification_time, 1_000_000_001);

    let track = dmx.track_info(0).unwrap();
    assert_eq!(track.id, 1);
    assert_eq!(track.track_type, "video");
    assert_eq!(track.sample_count, 3);
    assert_eq!(track.duration_us, 2_000_000);
    match &track.specific_info {
        mp4demux::demux::SpecificTrackInfo::Video(v) => {
            assert_eq!(v.codec_id, "avc1.64001f");
            assert_eq!(v.codec_name.as_deref(), Some("AVC High"));
            assert_eq!(v.width, 640);
            assert_eq!(v.height, 360);
        },
        other => panic!("expected video info, got {:?}", other),
    }

    let (sps, pps) = dmx.avc_decoder_config(1).unwrap();
    assert_eq!(sps, SPS);
    assert_eq!(pps, PPS);

    // Sequential reads.
    let mut buf = [0u8; 16];
    let expected_dts = [0u64, 333_333, 666_667];
    let expected_next = [333_333u64, 666_667, 0];
    for i in 0..3 {
        let s = dmx.next_sample(1, Some(&mut buf[..]), None).unwrap();
        assert_eq!(s.sample_size as usize, samples[i].len());
        assert_eq!(&buf[..s.sample_size as usize], samples[i]);
        assert_eq!(s.dts_us, expected_dts[i]);
        assert_eq!(s.next_dts_us, expected_next[i]);
        assert_eq!(s.metadata_size, 0);
    }

    // Past the end: all-zero info, no error.
    let s = dmx.next_sample(1, Some(&mut buf[..]), None).unwrap();
    assert_eq!(s.sample_size, 0);
    assert_eq!(s.dts_us, 0);

    // Too-small caller buffer.
    dmx.seek(0, false).unwrap();
    let mut tiny = [0u8; 2];
    let err = dmx.next_sample(1, Some(&mut tiny[..]), None).unwrap_err();
    assert!(matches!(err, Error::BufferTooSmall { needed: 4 }));

    // Bad arguments.
    assert!(matches!(dmx.track_info(5), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        dmx.next_sample(99, None, None),
        Err(Error::NotFound(_))
    ));

    // Opening the same file twice yields the same index.
    let dmx2 = Demuxer::open(&path).unwrap();
    assert_eq!(
        dmx.movie().tracks[0].sample_offset,
        dmx2.movie().tracks[0].sample_offset
    );
    assert_eq!(
        dmx.movie().tracks[0].sample_dts,
        dmx2.movie().tracks[0].sample_dts
    );

    drop(dmx);
    drop(dmx2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn seek_lands_on_sync_samples() {
    // Nine one-byte samples, dts 0..=8 at timescale 1.
    let mdat_payload = b"ABCDEFGHI".to_vec();
    let ftyp = ftyp();
    let chunk_pos = (ftyp.len() + 8) as u32;
    let mdat = atom(b"mdat", &mdat_payload);

    let moov = atom(
        b"moov",
        &concat(&[
            mvhd(1, 9, 0, 0),
            trak(&[
                tkhd(1, 9),
                mdia(&[
                    mdhd(1, 9),
                    hdlr(b"vide", "VideoHandler"),
                    minf(&[
                        vmhd(),
                        stbl(&[
                            stsd(avc1(64, 64)),
                            stts(&[(9, 1)]),
                            stsc(&[(1, 9)]),
                            stsz(&[1; 9]),
                            stco(&[chunk_pos]),
                            stss(&[1, 4, 7]),
                        ]),
                    ]),
                ]),
            ]),
        ]),
    );

    let path = write_temp("seek", &concat(&[ftyp, mdat, moov]));
    let mut dmx = Demuxer::open(&path).unwrap();

    // 3.5s rounds to tick 4; sample #5 is not sync, fall back to #4.
    dmx.seek(3_500_000, true).unwrap();
    assert_eq!(dmx.movie().tracks[0].current_sample(), 3);
    let mut buf = [0u8; 1];
    let s = dmx.next_sample(1, Some(&mut buf[..]), None).unwrap();
    assert_eq!(s.dts_us, 3_000_000);
    assert_eq!(&buf, b"D");

    // Without the sync requirement we land on the exact sample.
    dmx.seek(3_500_000, false).unwrap();
    assert_eq!(dmx.movie().tracks[0].current_sample(), 4);
    let s = dmx.next_sample(1, Some(&mut buf[..]), None).unwrap();
    assert_eq!(s.dts_us, 4_000_000);
    assert_eq!(&buf, b"E");

    drop(dmx);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn chapter_track_is_linked_and_extracted() {
    let video_sample = b"VVVV";
    let chapter_samples: &[&[u8]] = &[b"\x00\x05Intro", b"\x00\x05Outro"];

    let ftyp = ftyp();
    let video_pos = (ftyp.len() + 8) as u32;
    let chap1_pos = video_pos + video_sample.len() as u32;
    let chap2_pos = chap1_pos + chapter_samples[0].len() as u32;
    let mdat_payload = concat(&[
        video_sample.to_vec(),
        chapter_samples[0].to_vec(),
        chapter_samples[1].to_vec(),
    ]);
    let mdat = atom(b"mdat", &mdat_payload);

    let moov = atom(
        b"moov",
        &concat(&[
            mvhd(1000, 20_000, 0, 0),
            // Video track referencing the chapter text track.
            trak(&[
                tkhd(1, 20_000),
                atom(b"tref", &atom(b"chap", &be32(2))),
                mdia(&[
                    mdhd(1000, 20_000),
                    hdlr(b"vide", "VideoHandler"),
                    minf(&[
                        vmhd(),
                        stbl(&[
                            stsd(avc1(64, 64)),
                            stts(&[(1, 20_000)]),
                            stsc(&[(1, 1)]),
                            stsz(&[video_sample.len() as u32]),
                            stco(&[video_pos]),
                        ]),
                    ]),
                ]),
            ]),
            // Text track with two chapter samples at 0s and 10s.
            trak(&[
                tkhd(2, 20_000),
                mdia(&[
                    mdhd(1000, 20_000),
                    hdlr(b"text", "ChapterHandler"),
                    minf(&[
                        nmhd(),
                        stbl(&[
                            stsd(atom(b"text", &[0u8; 8])),
                            stts(&[(2, 10_000)]),
                            stsc(&[(1, 1)]),
                            stsz(&[
                                chapter_samples[0].len() as u32,
                                chapter_samples[1].len() as u32,
                            ]),
                            stco(&[chap1_pos, chap2_pos]),
                        ]),
                    ]),
                ]),
            ]),
        ]),
    );

    let path = write_temp("chapters", &concat(&[ftyp, mdat, moov]));
    let dmx = Demuxer::open(&path).unwrap();

    let chapters = dmx.chapters();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].time_us, 0);
    assert_eq!(chapters[0].name, "Intro");
    assert_eq!(chapters[1].time_us, 10_000_000);
    assert_eq!(chapters[1].name, "Outro");

    // The text track was reclassified.
    assert_eq!(dmx.track_info(1).unwrap().track_type, "chapters");
    // And linked from the video track.
    assert_eq!(dmx.movie().tracks[0].chapters_track, Some(1));

    drop(dmx);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn metadata_merge_and_cover() {
    let cover_bytes = b"JPEGDATA";

    // moov/meta: keyed form.
    let keys = {
        let key = b"com.apple.quicktime.make";
        let mut payload = be32(1);
        payload.extend(be32(8 + key.len() as u32));
        payload.extend_from_slice(b"mdta");
        payload.extend_from_slice(key);
        full(b"keys", 0, 0, &payload)
    };
    let keyed_ilst = atom(
        b"ilst",
        &atom(
            &1u32.to_be_bytes(),
            &atom(
                b"data",
                &concat(&[vec![0, 0, 0, 1], be32(0), b"Widget Corp".to_vec()]),
            ),
        ),
    );
    let iso_meta = atom(b"meta", &concat(&[be32(0), keys, keyed_ilst]));

    // moov/udta/meta: fourcc-tagged form plus a cover.
    let tagged_ilst = atom(
        b"ilst",
        &concat(&[
            atom(
                b"\xa9mak",
                &atom(
                    b"data",
                    &concat(&[vec![0, 0, 0, 1], be32(0), b"Widget Corp (udta)".to_vec()]),
                ),
            ),
            atom(
                b"covr",
                &atom(
                    b"data",
                    &concat(&[vec![0, 0, 0, 13], be32(0), cover_bytes.to_vec()]),
                ),
            ),
        ]),
    );
    let qt_meta = atom(b"meta", &tagged_ilst);
    let xyz = atom(
        b"\xa9xyz",
        &concat(&[
            be16(18),
            be16(0x15c7),
            b"+48.8584+002.2945/".to_vec(),
        ]),
    );
    let udta = atom(b"udta", &concat(&[qt_meta, xyz]));

    let moov = atom(b"moov", &concat(&[mvhd(1000, 0, 0, 0), iso_meta, udta]));
    let path = write_temp("metadata", &concat(&[ftyp(), moov]));
    let dmx = Demuxer::open(&path).unwrap();

    let (keys, values) = dmx.metadata_strings();
    assert_eq!(keys.len(), 3);
    assert_eq!(values.len(), 3);
    assert_eq!(keys[0], "com.apple.quicktime.make");
    assert_eq!(values[0], "Widget Corp");
    assert_eq!(keys[1], "\u{a9}mak");
    assert_eq!(values[1], "Widget Corp (udta)");
    assert_eq!(keys[2], "\u{a9}xyz");
    assert_eq!(values[2], "+48.8584+002.2945/");

    let (size, kind) = dmx.metadata_cover(None).unwrap().unwrap();
    assert_eq!(size, cover_bytes.len() as u64);
    assert_eq!(kind, CoverKind::Jpeg);

    let mut buf = vec![0u8; size as usize];
    dmx.metadata_cover(Some(&mut buf[..])).unwrap();
    assert_eq!(&buf[..], cover_bytes);

    let mut tiny = [0u8; 2];
    let err = dmx.metadata_cover(Some(&mut tiny[..])).unwrap_err();
    assert!(matches!(err, Error::BufferTooSmall { .. }));

    drop(dmx);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn duplicate_sample_table_is_rejected() {
    let ftyp = ftyp();
    let moov = atom(
        b"moov",
        &concat(&[
            mvhd(1000, 1000, 0, 0),
            trak(&[
                tkhd(1, 1000),
                mdia(&[
                    mdhd(1000, 1000),
                    hdlr(b"vide", "VideoHandler"),
                    minf(&[
                        vmhd(),
                        stbl(&[
                            stsd(avc1(64, 64)),
                            stts(&[(1, 1000)]),
                            stts(&[(1, 1000)]),
                            stsc(&[(1, 1)]),
                            stsz(&[1]),
                            stco(&[0]),
                        ]),
                    ]),
                ]),
            ]),
        ]),
    );
    let path = write_temp("duptable", &concat(&[ftyp, moov]));
    let err = Demuxer::open(&path).unwrap_err();
    assert!(matches!(err, Error::DuplicateTable(_)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn lone_metadata_track_follows_video() {
    let video_sample = b"VID1";
    let meta_sample = b"META";

    let ftyp = ftyp();
    let video_pos = (ftyp.len() + 8) as u32;
    let meta_pos = video_pos + video_sample.len() as u32;
    let mdat = atom(b"mdat", &concat(&[video_sample.to_vec(), meta_sample.to_vec()]));

    let moov = atom(
        b"moov",
        &concat(&[
            mvhd(1000, 1000, 0, 0),
            trak(&[
                tkhd(1, 1000),
                mdia(&[
                    mdhd(1000, 1000),
                    hdlr(b"vide", "VideoHandler"),
                    minf(&[
                        vmhd(),
                        stbl(&[
                            stsd(avc1(64, 64)),
                            stts(&[(1, 1000)]),
                            stsc(&[(1, 1)]),
                            stsz(&[video_sample.len() as u32]),
                            stco(&[video_pos]),
                        ]),
                    ]),
                ]),
            ]),
            // Timed metadata track, no tref: the fallback links it.
            trak(&[
                tkhd(2, 1000),
                mdia(&[
                    mdhd(1000, 1000),
                    hdlr(b"meta", "MetadataHandler"),
                    minf(&[
                        nmhd(),
                        stbl(&[
                            stsd(mett("application/json")),
                            stts(&[(1, 1000)]),
                            stsc(&[(1, 1)]),
                            stsz(&[meta_sample.len() as u32]),
                            stco(&[meta_pos]),
                        ]),
                    ]),
                ]),
            ]),
        ]),
    );

    let path = write_temp("metatrack", &concat(&[ftyp, mdat, moov]));
    let mut dmx = Demuxer::open(&path).unwrap();

    assert_eq!(dmx.movie().tracks[0].metadata_track, Some(1));
    assert_eq!(dmx.movie().tracks[1].ref_track, Some(0));

    let info = dmx.track_info(1).unwrap();
    assert_eq!(info.track_type, "metadata");
    match &info.specific_info {
        mp4demux::demux::SpecificTrackInfo::Metadata(m) => {
            assert_eq!(m.mime_format, "application/json");
            assert_eq!(m.content_encoding, "");
        },
        other => panic!("expected metadata info, got {:?}", other),
    }

    let mut buf = [0u8; 8];
    let mut mbuf = [0u8; 8];
    let s = dmx
        .next_sample(1, Some(&mut buf[..]), Some(&mut mbuf[..]))
        .unwrap();
    assert_eq!(s.sample_size, 4);
    assert_eq!(s.metadata_size, 4);
    assert_eq!(&buf[..4], video_sample);
    assert_eq!(&mbuf[..4], meta_sample);

    drop(dmx);
    let _ = std::fs::remove_file(&path);
}
