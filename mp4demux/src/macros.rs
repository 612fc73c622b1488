//
// Several helper macros.
//

// List of all boxes, used in boxes.rs.
//
// For each box, include its module. Then build an enum with
// a variant for each box.
macro_rules! def_boxes {

    // main entry point.
    ($($name:ident, $fourcc:tt $(=> $mod:tt)? ; )+) => {

        // include modules.
        $(
            $(
                pub(crate) mod $mod;
                pub use self::$mod::*;
            )?
        )+

        // build enum.
        impl_enum!(MP4Box, $($name, $fourcc),*);
    };
}

// Define one box.
//
// def_box! {
//     TypeName {
//         member: type,
//         member: type,
//     },
//     fourcc => b"fourcc",
//     version => [ max_version ],
//     impls => [ boxinfo, debug, frombytes ],
//  }
macro_rules! def_box {

    // expand block and call def_struct!
    (@IMPL def_struct $(#[$outer:meta])* $name:ident, { $($block:tt)* }) => {
        def_struct!(@def_struct $(#[$outer])* $name, $($block)*);
    };

    // impls => [ boxinfo ]
    (@IMPL boxinfo $name:ident, $fourcc:expr, [$($maxver:tt)?], $_block:tt) => {
        impl BoxInfo for $name {
            #[inline]
            fn fourcc(&self) -> FourCC {
                FourCC(u32::from_be_bytes(*$fourcc))
            }
            $(
                #[inline]
                fn max_version() -> Option<u8> {
                    Some($maxver)
                }
            )?
        }
    };

    // impls => [ debug ]
    (@IMPL debug $name:ident, $_fourcc:expr, $_version:tt, { $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)? }) => {
        // Debug implementation that adds a fourcc field.
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut dbg = f.debug_struct(stringify!($name));
                dbg.field("fourcc", &self.fourcc());
                $(
                    def_struct!(@filter_skip $field, dbg.field(stringify!($field), &self.$field););
                )*
                dbg.finish()
            }
        }
    };

    // impls => [ frombytes ]
    (@IMPL frombytes $name:ident, $_fourcc:expr, $_version:tt, { $( $field:tt: $type:tt $(<$gen:tt>)? ),* $(,)? }) => {
        impl FromBytes for $name {
            #[allow(unused_variables)]
            fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<$name> {
                let mut reader = $crate::mp4box::BoxReader::new(stream)?;
                let reader = &mut reader;
                def_struct!(@from_bytes $name, reader, $(
                    $field: $type $(<$gen>)?,
                )*)
            }

            fn min_size() -> usize {
                $(
                    def_struct!(@min_size $type $(<$gen>)?) +
                )* 8
            }
        }
    };

    // Main entry point.
    ($(#[$outer:meta])* $name:ident $block:tt, fourcc => $fourcc:expr,
     version => $version:tt, impls => [ $($impl:ident),* ] $(,)?)  => {

        // Define the struct itself.
        def_box!(@IMPL def_struct $(#[$outer])* #[derive(Clone)] $name, $block);

        // And the impl's we want for it.
        $(
            def_box!(@IMPL $impl $name, $fourcc, $version, $block);
        )*
    };
}

// Define the MP4Box enum.
macro_rules! impl_enum {
    ($enum:ident, $($name:ident, $fourcc:tt),*) => {

        /// All the boxes we know.
        #[derive(Clone)]
        pub enum $enum {
            $(
                $name($name),
            )*
            GenericBox(GenericBox),
        }

        /// Maximum supported version for a fourcc, if it names a known full box.
        pub(crate) fn max_version_for(fourcc: FourCC) -> Option<u8> {
            match &fourcc.to_be_bytes() {
                $(
                    $fourcc => <$name as BoxInfo>::max_version(),
                )*
                _ => None,
            }
        }

        // Define FromBytes trait for the enum.
        impl FromBytes for $enum {
            fn from_bytes<R: ReadBytes>(stream: &mut R) -> io::Result<$enum> {

                // Peek at the fourcc, then dispatch.
                let fourcc = $crate::mp4box::BoxHeader::peek_fourcc(stream)?;
                log::trace!("MP4Box::from_bytes: {}", fourcc);

                let b = fourcc.to_be_bytes();
                let e = match &b {
                    $(
                        $fourcc => $enum::$name($name::from_bytes(stream)?),
                    )*
                    _ => $enum::GenericBox(GenericBox::from_bytes(stream)?),
                };
                Ok(e)
            }

            fn min_size() -> usize {
                8
            }
        }

        // Define BoxInfo trait for the enum.
        impl BoxInfo for $enum {
            #[inline]
            fn fourcc(&self) -> FourCC {
                match self {
                    $(
                        &$enum::$name(ref b) => b.fourcc(),
                    )*
                    &$enum::GenericBox(ref b) => b.fourcc(),
                }
            }
        }

        // Debug implementation that delegates to the variant.
        impl Debug for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $(
                        &$enum::$name(ref b) => Debug::fmt(b, f),
                    )*
                    &$enum::GenericBox(ref b) => Debug::fmt(b, f),
                }
            }
        }
    };
}

/// Find the first box of type $type in $vec.
#[macro_export]
macro_rules! first_box {
    ($vec:expr, $type:ident) => {
        $crate::iter_box!($vec, $type).next()
    };
}

/// Iterate over all boxes of type $type in $vec.
#[macro_export]
macro_rules! iter_box {
    ($vec:expr, $type:ident) => {
        $vec.iter().filter_map(|x| match x {
            &$crate::boxes::MP4Box::$type(ref b) => Some(b),
            _ => None,
        })
    };
}

/// Helper.
macro_rules! declare_box_methods {
    ($type:ident, $method:ident) => {
        /// Get a reference to the $type, if present.
        pub fn $method(&self) -> Option<&$type> {
            first_box!(&self.boxes, $type)
        }
    };
}
