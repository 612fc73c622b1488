use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.4.3 Handler Reference Box (ISO/IEC 14496-12:2015(E))
    HandlerBox {
        skip:       4,
        handler_type:   FourCC,
        skip:       12,
        name:       ZString,
    },
    fourcc => b"hdlr",
    version => [0],
    impls => [ boxinfo, debug, frombytes ],
}
