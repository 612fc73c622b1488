//! Basic deserializer.
//!
//! The ReadBytes/BoxBytes traits and the def_struct! macro are defined here.
//!
//! It also contains the FromBytes implementations for the primitive
//! integer types.
//!
use std::convert::TryInto;
use std::io::{self, ErrorKind::UnexpectedEof};

use auto_impl::auto_impl;

/// Byte reader in a stream.
#[auto_impl(&mut)]
pub trait ReadBytes: BoxBytes {
    /// Read an exact number of bytes, return a reference to the buffer.
    fn read(&mut self, amount: u64) -> io::Result<&[u8]>;

    /// Read an exact number of bytes, but don't advance position.
    fn peek(&mut self, amount: u64) -> io::Result<&[u8]>;

    /// Skip some bytes in the input.
    fn skip(&mut self, amount: u64) -> io::Result<()>;

    /// How much data is left?
    fn left(&mut self) -> u64;
}

/// A bunch of optional methods for reading boxes rather than
/// simple structs. All the methods have defaults.
#[auto_impl(&mut)]
pub trait BoxBytes {
    /// Get current position in the stream.
    fn pos(&mut self) -> u64 {
        unimplemented!()
    }
    /// Seek to a position in the stream.
    fn seek(&mut self, _pos: u64) -> io::Result<()> {
        unimplemented!()
    }
    /// Size of the stream.
    fn size(&self) -> u64 {
        unimplemented!()
    }
    /// Version of the enclosing full box.
    fn version(&self) -> u8 {
        0
    }
    /// Flags of the enclosing full box.
    fn flags(&self) -> u32 {
        0
    }
}

/// Implementation of ReadBytes on a byte slice.
impl ReadBytes for &[u8] {
    fn read(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = amount as usize;
        if amount > (*self).len() {
            return Err(ioerr!(UnexpectedEof));
        }
        let res = &self[0..amount];
        (*self) = &self[amount..];
        Ok(res)
    }

    fn peek(&mut self, amount: u64) -> io::Result<&[u8]> {
        let amount = std::cmp::min(amount as usize, self.len());
        Ok(&self[0..amount])
    }

    fn skip(&mut self, amount: u64) -> io::Result<()> {
        if amount > (*self).len() as u64 {
            return Err(ioerr!(UnexpectedEof));
        }
        (*self) = &self[amount as usize..];
        Ok(())
    }

    #[inline]
    fn left(&mut self) -> u64 {
        (*self).len() as u64
    }
}

impl BoxBytes for &[u8] {
    fn pos(&mut self) -> u64 {
        0
    }
    fn size(&self) -> u64 {
        self.len() as u64
    }
}

/// Trait to deserialize a type.
pub trait FromBytes {
    fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self>
    where
        Self: Sized;
    fn min_size() -> usize;
}

// Convenience macro to implement FromBytes for integer types.
macro_rules! def_from_bytes {
    ($type:ident) => {
        impl FromBytes for $type {
            #[inline]
            fn from_bytes<R: ReadBytes>(bytes: &mut R) -> io::Result<Self> {
                let sz = std::mem::size_of::<$type>();
                let data = bytes.read(sz as u64)?;
                let data = data.try_into().map_err(|_| UnexpectedEof)?;
                Ok($type::from_be_bytes(data))
            }
            #[inline]
            fn min_size() -> usize {
                std::mem::size_of::<$type>()
            }
        }
    };
}

def_from_bytes!(u8);
def_from_bytes!(i16);
def_from_bytes!(u16);
def_from_bytes!(i32);
def_from_bytes!(u32);
def_from_bytes!(i64);
def_from_bytes!(u64);

/// Generic implementation for Vec<T>: read items until the stream runs out.
impl<T> FromBytes for Vec<T>
where
    T: FromBytes,
{
    fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
        let mut v = Vec::new();
        let min_size = T::min_size() as u64;
        while stream.left() >= min_size && stream.left() > 0 {
            v.push(T::from_bytes(stream)?);
        }
        Ok(v)
    }
    fn min_size() -> usize {
        0
    }
}

/// A macro to define a struct and implement the FromBytes trait for it.
///
/// Usage:
///
/// ```text
/// def_struct! { Name,
///     field1:     u32,        // primitive type
///     field2:     Time,       // struct that also implements FromBytes
///     skip:       8,          // skip 8 bytes here while deserializing.
///     ....
/// }
/// ```
macro_rules! def_struct {
    // minimum size for a certain type. we hard-code u* here.
    (@min_size u8) => { 1 };
    (@min_size i16) => { 2 };
    (@min_size u16) => { 2 };
    (@min_size i32) => { 4 };
    (@min_size u32) => { 4 };
    (@min_size u64) => { 8 };
    (@min_size Vec<$tt:tt>) => { 0 };
    (@min_size ArraySized32<$gen:tt>) => { 4 };
    (@min_size $type:ty) => {
        <$type>::min_size()
    };
    (@min_size $amount:expr) => { $amount };
    (@min_size $($tt:tt)*) => { compile_error!(stringify!($($tt)*)); };

    // @def_struct: Define a struct line by line using accumulation and recursion.
    (@def_struct $(#[$outer:meta])* $name:ident, $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)?) => {
        def_struct!(@def_struct_ [$(#[$outer])* $name], [ $( $field: $type $(<$gen>)?, )* ] -> []);
    };
    // During definition of the struct, we skip all the "skip" entries.
    (@def_struct_ $info:tt, [ skip: $amount:tt, $($tt:tt)*] -> [ $($res:tt)* ]) => {
        def_struct!(@def_struct_ $info, [$($tt)*] -> [ $($res)* ]);
    };
    // Add normal field.
    (@def_struct_ $info:tt, [ $field:ident: $type:ty, $($tt:tt)*] -> [ $($res:tt)* ]) => {
        def_struct!(@def_struct_ $info, [$($tt)*] -> [ $($res)* pub $field: $type, ]);
    };
    // Final.
    (@def_struct_ [$(#[$outer:meta])* $name:ident], [] -> [ $($res:tt)* ]) => {
        $(#[$outer])*
        pub struct $name { $(
            $res
        )* }
    };

    // @from_bytes: Generate the from_bytes details for a struct.
    (@from_bytes $name:ident, $stream:tt, $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)?) => {
        def_struct!(@from_bytes_ $name, $stream, [ $( $field: $type $(<$gen>)?, )* ] -> [] [])
    };
    // Insert a skip instruction.
    (@from_bytes_ $name:ident, $stream:ident, [ skip: $amount:tt, $($tt:tt)*]
        -> [ $($set:tt)* ] [ $($fields:tt)* ] ) => {
        def_struct!(@from_bytes_ $name, $stream, [ $($tt)* ] ->
            [ $($set)* [ $stream.skip($amount)?; ] ] [$($fields)*])
    };
    // Set a field.
    (@from_bytes_ $name:ident, $stream:ident, [ $field:tt: $type:tt $(<$gen:tt>)?, $($tt:tt)*]
        -> [ $($set:tt)* ] [ $($fields:tt)* ]) => {
        def_struct!(@from_bytes_ $name, $stream, [ $($tt)* ] ->
            [ $($set)* [ let $field = <$type $(<$gen>)?>::from_bytes($stream)?; ] ] [ $($fields)* $field ])
    };
    // Final.
    (@from_bytes_ $name:ident, $_stream:tt, [] -> [ $([$($set:tt)*])* ] [ $($field:tt)* ]) => {
        {
            $(
                $($set)*
            )*
            Ok($name {
                $(
                    $field,
                )*
            })
        }
    };

    // Helpers for skip
    (@filter_skip skip, $($tt:tt)*) => {};
    (@filter_skip $field:ident, $($tt:tt)*) => { $($tt)* };

    // Main entry point to define just one struct.
    ($(#[$outer:meta])* $name:ident, $($field:tt: $type:tt $(<$gen:tt>)?),* $(,)?) => {
        def_struct!(@def_struct $(#[$outer])* #[derive(Clone)] $name,
            $(
                $field: $type $(<$gen>)?,
            )*
        );

        // Debug implementation that skips "skip"
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut dbg = f.debug_struct(stringify!($name));
                $(
                    def_struct!(@filter_skip $field, dbg.field(stringify!($field), &self.$field););
                )*
                dbg.finish()
            }
        }

        impl FromBytes for $name {
            fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<Self> {
                def_struct!(@from_bytes $name, stream, $(
                    $field: $type $(<$gen>)?,
                )*)
            }

            fn min_size() -> usize {
                $( def_struct!(@min_size $type $(<$gen>)?) + )* 0
            }
        }
    };

    // Alternative entry point.
    ($(#[$outer:meta])* $name:ident { $($tt:tt)* }) => {
        def_struct!($(#[$outer])* $name, $($tt)*);
    }
}
