//! AVC decoder configuration.
//!
use std::io;

use crate::boxes::prelude::*;

/// AvcConfigurationBox (ISO/IEC 14496-15).
///
/// The parameter set NAL units are kept verbatim; only the first SPS
/// and the first PPS are retained, the rest is skipped.
//
// aligned(8) class AVCDecoderConfigurationRecord {
//     unsigned int(8) configurationVersion = 1;
//     unsigned int(8) AVCProfileIndication;
//     unsigned int(8) profile_compatibility;
//     unsigned int(8) AVCLevelIndication;
//     bit(6) reserved = '111111'b;
//     unsigned int(2) lengthSizeMinusOne;
//     bit(3) reserved = '111'b;
//     unsigned int(5) numOfSequenceParameterSets;
//     for (i=0; i< numOfSequenceParameterSets; i++) {
//       unsigned int(16) sequenceParameterSetLength;
//       bit(8*sequenceParameterSetLength) sequenceParameterSetNALUnit;
//     }
//     unsigned int(8) numOfPictureParameterSets;
//     for (i=0; i< numOfPictureParameterSets; i++) {
//       unsigned int(16) pictureParameterSetLength;
//       bit(8*pictureParameterSetLength) pictureParameterSetNALUnit;
//     }
// }
#[derive(Clone)]
pub struct AvcConfigurationBox {
    pub configuration_version: u8,
    pub profile_indication:    u8,
    pub profile_compatibility: u8,
    pub level_indication:      u8,
    pub length_size_minus_one: u8,
    pub sps:                   Vec<u8>,
    pub pps:                   Vec<u8>,
}

impl FromBytes for AvcConfigurationBox {
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut reader = BoxReader::new(stream)?;
        let stream = &mut reader;

        let configuration_version = u8::from_bytes(stream)?;
        let profile_indication = u8::from_bytes(stream)?;
        let profile_compatibility = u8::from_bytes(stream)?;
        let level_indication = u8::from_bytes(stream)?;
        let length_size_minus_one = u8::from_bytes(stream)? & 0b0000_0011;

        let sps_count = u8::from_bytes(stream)? & 0b0001_1111;
        let mut sps = Vec::new();
        for i in 0..sps_count {
            let len = u16::from_bytes(stream)? as u64;
            if i == 0 {
                sps = stream.read(len)?.to_vec();
            } else {
                stream.skip(len)?;
            }
        }

        let pps_count = u8::from_bytes(stream)?;
        let mut pps = Vec::new();
        for i in 0..pps_count {
            let len = u16::from_bytes(stream)? as u64;
            if i == 0 {
                pps = stream.read(len)?.to_vec();
            } else {
                stream.skip(len)?;
            }
        }

        Ok(AvcConfigurationBox {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    fn min_size() -> usize {
        8 + 7
    }
}

impl AvcConfigurationBox {
    /// Return codec id as avc1.4d401f
    pub fn codec_id(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_indication, self.profile_compatibility, self.level_indication
        )
    }

    /// Return human name of codec, like "Baseline" or "High".
    pub fn codec_name(&self) -> &'static str {
        match self.profile_indication {
            0x2c => "AVC CAVLC 4:4:4",
            0x42 => "AVC Baseline",
            0x4d => "AVC Main",
            0x58 => "AVC Extended",
            0x64 => "AVC High",
            0x6e => "AVC High 10",
            0x7a => "AVC High 4:2:2",
            0xf4 => "AVC High 4:4:4",
            _ => "AVC",
        }
    }
}

impl BoxInfo for AvcConfigurationBox {
    #[inline]
    fn fourcc(&self) -> FourCC {
        FourCC(u32::from_be_bytes(*b"avcC"))
    }
}

impl std::fmt::Debug for AvcConfigurationBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut dbg = f.debug_struct("AvcConfigurationBox");
        dbg.field("codec_id", &self.codec_id());
        dbg.field("length_size_minus_one", &self.length_size_minus_one);
        dbg.field("sps", &format_args!("[u8; {}]", self.sps.len()));
        dbg.field("pps", &format_args!("[u8; {}]", self.pps.len()));
        dbg.finish()
    }
}
