//! Definitions of types used in mp4 boxes.
//!
//! This module contains fundamental types used in boxes (such as Time,
//! FourCC, ZString, etc).
//!
use std::convert::TryInto;
use std::fmt::{Debug, Display};
use std::io;

use chrono::{
    self,
    offset::{Local, TimeZone},
};
use serde::Serialize;

use crate::serialize::{FromBytes, ReadBytes};

// Convenience macro to implement FromBytes for newtypes.
macro_rules! def_from_bytes_newtype {
    ($newtype:ident, $type:ty) => {
        impl FromBytes for $newtype {
            fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
                let res = <$type>::from_bytes(bytes)?;
                Ok($newtype(res))
            }
            fn min_size() -> usize {
                <$type>::min_size()
            }
        }
    };
}

// 32 bits in boxes with version 0, and 64 bits in boxes with version >= 1.
macro_rules! def_from_bytes_versioned {
    ($newtype:ident) => {
        impl FromBytes for $newtype {
            fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
                Ok(match bytes.version() {
                    1 => $newtype(u64::from_bytes(bytes)?),
                    _ => $newtype(u32::from_bytes(bytes)? as u64),
                })
            }
            fn min_size() -> usize {
                u32::min_size()
            }
        }
        impl From<$newtype> for u64 {
            fn from(t: $newtype) -> u64 {
                t.0
            }
        }
        impl From<u64> for $newtype {
            fn from(t: u64) -> $newtype {
                $newtype(t)
            }
        }
    };
}

/// The optional "usertype" of a box is a uuid.
#[derive(Clone, Copy, Default)]
pub struct Uuid(pub [u8; 16]);

impl FromBytes for Uuid {
    fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
        let data = bytes.read(16)?;
        let mut u = [0u8; 16];
        u.copy_from_slice(data);
        Ok(Uuid(u))
    }

    fn min_size() -> usize {
        16
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // 8-4-4-4-12
        let p1 = u32::from_be_bytes((self.0)[0..4].try_into().unwrap());
        let p2 = u16::from_be_bytes((self.0)[4..6].try_into().unwrap());
        let p3 = u16::from_be_bytes((self.0)[6..8].try_into().unwrap());
        let p4 = u16::from_be_bytes((self.0)[8..10].try_into().unwrap());
        let p5 = u16::from_be_bytes((self.0)[10..12].try_into().unwrap());
        let p6 = u32::from_be_bytes((self.0)[12..16].try_into().unwrap());
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:04x}{:08x}",
            p1, p2, p3, p4, p5, p6
        )
    }
}

impl Debug for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

/// Duration_ is a 32/64 bit value where "all ones" means "unknown".
#[derive(Clone, Copy, Default)]
pub struct Duration_(pub u64);
def_from_bytes_versioned!(Duration_);

impl Debug for Duration_ {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Time is a 32/64 bit value, measured in seconds since 01-01-1904 00:00:00.
#[derive(Clone, Copy, Default)]
pub struct Time(pub u64);
def_from_bytes_versioned!(Time);

// TZ=UTC date +%s -d "1904-01-01 00:00:00"
const OFFSET_TO_UNIX: u64 = 2082844800;

impl Time {
    /// Unix timestamp (seconds since 01-01-1970).
    pub fn to_unixtime(&self) -> i64 {
        (self.0 as i64) - (OFFSET_TO_UNIX as i64)
    }

    /// Build a Time from a unix timestamp.
    pub fn from_unixtime(t: i64) -> Time {
        Time((t + OFFSET_TO_UNIX as i64) as u64)
    }

    fn to_rfc3339(&self) -> String {
        Local.timestamp(self.to_unixtime(), 0).to_rfc3339()
    }
}

impl Debug for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self.to_rfc3339())
    }
}

/// FourCC is the 4-byte name of any box.
///
/// Usually this is four bytes of ASCII characters, but it could be anything.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FourCC(pub u32);
def_from_bytes_newtype!(FourCC, u32);

impl FourCC {
    pub fn new(s: &str) -> FourCC {
        s.as_bytes().into()
    }

    fn fmt_fourcc(&self, dbg: bool) -> String {
        let c = self.to_be_bytes();
        for i in 0..4 {
            if (c[i] < 32 || c[i] > 126) && !(i == 0 && c[i] == 0xa9) {
                return format!("0x{:x}", self.0);
            }
        }
        let mut s = String::new();
        if dbg {
            s.push('"');
        }
        for i in 0..4 {
            s.push(c[i] as char);
        }
        if dbg {
            s.push('"');
        }
        s
    }

    #[inline]
    pub fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

// Let if (fourcc == b"moov") .. work
impl std::cmp::PartialEq<&[u8; 4]> for FourCC {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        &self.to_be_bytes() == *other
    }
}

impl Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.fmt_fourcc(true))
    }
}

impl Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.fmt_fourcc(false))
    }
}

impl From<&[u8]> for FourCC {
    fn from(b: &[u8]) -> FourCC {
        FourCC(u32::from_be_bytes(b.try_into().unwrap()))
    }
}

/// Language code ('eng', 'dut', 'fra', etc).
///
/// A 16-bit value containing 3 5-bit values that are interpreted as letters,
/// so that we get a 3-character country code. Such as "eng", "ger", "dut" etc.
#[derive(Clone, Copy, Serialize)]
pub struct IsoLanguageCode(pub u16);
def_from_bytes_newtype!(IsoLanguageCode, u16);

impl Display for IsoLanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut s = String::new();
        s.push((((self.0 >> 10) & 0x1f) + 0x60) as u8 as char);
        s.push((((self.0 >> 5) & 0x1f) + 0x60) as u8 as char);
        s.push((((self.0 >> 0) & 0x1f) + 0x60) as u8 as char);
        write!(f, "{}", s)
    }
}

impl Debug for IsoLanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Default for IsoLanguageCode {
    fn default() -> IsoLanguageCode {
        // "und"
        IsoLanguageCode(0x55c4)
    }
}

/// Zero terminated string.
///
/// Reads up to and including the NUL terminator, or to the end of
/// the enclosing box, whichever comes first.
#[derive(Clone, Default)]
pub struct ZString(pub String);

impl ZString {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::ops::Deref for ZString {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl FromBytes for ZString {
    fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
        let left = bytes.left();
        let data = bytes.peek(left)?;
        let len = data.iter().position(|&b| b == 0);
        let data = match len {
            Some(len) => &bytes.read(len as u64 + 1)?[..len],
            None => bytes.read(left)?,
        };
        let mut s = String::new();
        for &b in data {
            s.push(b as char);
        }
        Ok(ZString(s))
    }
    fn min_size() -> usize {
        0
    }
}

impl Display for ZString {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Debug for ZString {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\"{}\"", self.as_str())
    }
}

macro_rules! fixed_float {
    ($(#[$outer:meta])* $name:ident, $type:tt, $frac_bits:expr) => {
        #[derive(Clone, Copy, Default)]
        $(#[$outer])*
        pub struct $name(pub $type);
        def_from_bytes_newtype!($name, $type);

        impl $name {
            pub fn get(&self) -> f64 {
                (self.0 as f64) / ((1 << $frac_bits) as f64)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.get())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.get())
            }
        }

        impl From<$name> for f64 {
            fn from(t: $name) -> f64 {
                t.get()
            }
        }
    };
}

fixed_float!(
    /// 32 bits 16.16 fixed float.
    FixedFloat16_16,
    u32,
    16
);

/// An array with a 32 bits count in front of it.
///
/// The count is read first, then exactly that many entries; a stream
/// that runs out before the count is satisfied is an error.
#[derive(Clone, Default)]
pub struct ArraySized32<T>(pub Vec<T>);

impl<T> ArraySized32<T> {
    /// Returns the number of elements in the array.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T> FromBytes for ArraySized32<T>
where
    T: FromBytes,
{
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let count = u32::from_bytes(stream)? as usize;
        let mut v = Vec::with_capacity(std::cmp::min(count, 65536));
        for _ in 0..count {
            v.push(T::from_bytes(stream)?);
        }
        Ok(ArraySized32(v))
    }

    fn min_size() -> usize {
        4
    }
}

impl<T> From<Vec<T>> for ArraySized32<T> {
    fn from(v: Vec<T>) -> Self {
        ArraySized32(v)
    }
}

impl<T> std::ops::Deref for ArraySized32<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0[..]
    }
}

// Debug implementation that truncates long arrays.
impl<T> Debug for ArraySized32<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if f.alternate() && self.0.len() > 20 {
            writeln!(f, "\n// Array length: {} (showing first and last entry)", self.0.len())?;
            let v = vec![&self.0[0], &self.0[self.0.len() - 1]];
            return f.debug_list().entries(v.into_iter()).finish();
        }
        Debug::fmt(&self.0, f)
    }
}

impl<'a, T> IntoIterator for &'a ArraySized32<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_formatting() {
        assert_eq!(FourCC::new("moov").to_string(), "moov");
        assert_eq!(format!("{:?}", FourCC::new("trak")), "\"trak\"");
        // Leading 0xa9 (copyright sign) is a valid tag prefix.
        assert_eq!(FourCC(u32::from_be_bytes(*b"\xa9nam")).to_string(), "\u{a9}nam");
        // Anything else non-printable formats as hex.
        assert_eq!(FourCC(1).to_string(), "0x1");
    }

    #[test]
    fn mac_epoch_round_trip() {
        for &t in &[0u64, 2082844800, 3503872496, u32::MAX as u64] {
            let time = Time(t);
            assert_eq!(Time::from_unixtime(time.to_unixtime()).0, t);
        }
        // 0x7C25B080 seconds between the epochs.
        assert_eq!(Time(0x7C25B080).to_unixtime(), 0);
    }

    #[test]
    fn zstring_stops_at_nul() {
        let mut data = &b"VideoHandler\0junk"[..];
        let s = ZString::from_bytes(&mut data).unwrap();
        assert_eq!(s.as_str(), "VideoHandler");
        assert_eq!(data, &b"junk"[..]);

        let mut data = &b"no terminator"[..];
        let s = ZString::from_bytes(&mut data).unwrap();
        assert_eq!(s.as_str(), "no terminator");
    }

    #[test]
    fn language_code() {
        // "und" is packed as 0x55c4.
        assert_eq!(IsoLanguageCode(0x55c4).to_string(), "und");
    }
}
