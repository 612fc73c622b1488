//! Merge the two metadata namespaces into one string-keyed view,
//! and pick a single cover-art blob.
//!
use crate::boxes::*;
use crate::mp4box::BoxInfo;
use crate::types::FourCC;

// QuickTime tags we map into the merged view.
const APPLE_TAGS: [&[u8; 4]; 9] = [
    b"\xa9ART", b"\xa9nam", b"\xa9day", b"\xa9cmt", b"\xa9cpy",
    b"\xa9mak", b"\xa9mod", b"\xa9swr", b"\xa9too",
];

const ARTWORK_KEY: &str = "com.apple.quicktime.artwork";

/// Cover art image type, from the `data` box class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverKind {
    Jpeg,
    Png,
    Bmp,
}

impl CoverKind {
    fn from_class(class: u8) -> Option<CoverKind> {
        match class {
            13 => Some(CoverKind::Jpeg),
            14 => Some(CoverKind::Png),
            27 => Some(CoverKind::Bmp),
            _ => None,
        }
    }

    /// Usual file extension for this image type.
    pub fn extension(&self) -> &'static str {
        match self {
            CoverKind::Jpeg => "jpg",
            CoverKind::Png => "png",
            CoverKind::Bmp => "bmp",
        }
    }
}

/// Location and type of a cover-art blob. The bytes themselves are
/// only read when the consumer asks for them.
#[derive(Clone, Copy, Debug)]
pub struct Cover {
    pub pos:  u64,
    pub size: u64,
    pub kind: CoverKind,
}

/// The merged metadata: parallel key/value arrays plus one cover.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub keys:   Vec<String>,
    pub values: Vec<String>,
    pub cover:  Option<Cover>,
}

/// Merge all metadata found under `moov`.
///
/// Keyed (`keys` + indexed `ilst`) entries come first, then the
/// fourcc-tagged entries, then the location; only pairs with a
/// non-empty key and value are kept. The keyed cover wins over the
/// tagged one.
pub(crate) fn build(moov: &MovieBox) -> Metadata {
    let mut keyed_pairs = Vec::new();
    let mut tagged_pairs = Vec::new();
    let mut keyed_cover = None;
    let mut tagged_cover = None;

    for meta in meta_boxes(moov) {
        let ilst = match meta.item_list() {
            Some(ilst) => ilst,
            None => continue,
        };
        match meta.keys() {
            Some(keys) => collect_keyed(keys, ilst, &mut keyed_pairs, &mut keyed_cover),
            None => collect_tagged(ilst, &mut tagged_pairs, &mut tagged_cover),
        }
    }

    let mut metadata = Metadata::default();
    let pairs = keyed_pairs.into_iter().chain(tagged_pairs.into_iter());
    for (key, value) in pairs {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        metadata.keys.push(key);
        metadata.values.push(value);
    }

    if let Some(udta) = moov.user_data() {
        if let Some(location) = first_box!(&udta.boxes, LocationBox) {
            if !location.location.is_empty() {
                metadata.keys.push(location.fourcc().to_string());
                metadata.values.push(location.location.clone());
            }
        }
    }

    metadata.cover = match keyed_cover {
        Some(cover) => Some(cover),
        None => tagged_cover,
    };

    metadata
}

// All the meta boxes we look at: moov/meta and moov/udta/meta.
fn meta_boxes(moov: &MovieBox) -> Vec<&MetaBox> {
    let mut v: Vec<&MetaBox> = iter_box!(&moov.boxes, MetaBox).collect();
    if let Some(udta) = moov.user_data() {
        v.extend(iter_box!(&udta.boxes, MetaBox));
    }
    v
}

// The keyed form: item tags are 1-based indices into the keys table.
// Out-of-range indices are ignored.
fn collect_keyed(
    keys: &MetadataKeysBox,
    ilst: &AppleItemListBox,
    pairs: &mut Vec<(String, String)>,
    cover: &mut Option<Cover>,
) {
    let count = keys.entries.len();
    let mut values: Vec<Option<String>> = vec![None; count];

    for item in &ilst.items {
        let idx = item.tag.0 as usize;
        if idx < 1 || idx > count {
            continue;
        }
        let data = match item.data.as_ref() {
            Some(data) => data,
            None => continue,
        };
        match &data.data {
            AppleData::Text(text) => {
                values[idx - 1] = Some(text.clone());
            },
            AppleData::Blob { pos, size } => {
                if keys.entries[idx - 1].name == ARTWORK_KEY && cover.is_none() {
                    if let Some(kind) = CoverKind::from_class(data.class) {
                        *cover = Some(Cover {
                            pos: *pos,
                            size: *size,
                            kind,
                        });
                    }
                }
            },
            AppleData::Other => {},
        }
    }

    for (key, value) in keys.entries.iter().zip(values.into_iter()) {
        if let Some(value) = value {
            pairs.push((key.name.clone(), value));
        }
    }
}

// The QuickTime form: item tags are 4-byte atoms.
fn collect_tagged(
    ilst: &AppleItemListBox,
    pairs: &mut Vec<(String, String)>,
    cover: &mut Option<Cover>,
) {
    for item in &ilst.items {
        let data = match item.data.as_ref() {
            Some(data) => data,
            None => continue,
        };
        match &data.data {
            AppleData::Text(text) => {
                if APPLE_TAGS.iter().any(|&tag| item.tag == tag) {
                    pairs.push((item.tag.to_string(), text.clone()));
                }
            },
            AppleData::Blob { pos, size } => {
                if item.tag == b"covr" && cover.is_none() {
                    if let Some(kind) = CoverKind::from_class(data.class) {
                        *cover = Some(Cover {
                            pos: *pos,
                            size: *size,
                            kind,
                        });
                    }
                }
            },
            AppleData::Other => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{AppleData, AppleItem, IDataBox, LocationBox, MetadataKey};

    fn text_item(tag: FourCC, text: &str) -> AppleItem {
        AppleItem {
            tag,
            data: Some(IDataBox {
                class: 1,
                data: AppleData::Text(text.to_string()),
            }),
        }
    }

    fn keyed_meta(keys: Vec<&str>, items: Vec<AppleItem>) -> MetaBox {
        MetaBox {
            boxes: vec![
                MP4Box::MetadataKeysBox(MetadataKeysBox {
                    entries: keys
                        .into_iter()
                        .map(|name| MetadataKey {
                            namespace: FourCC::new("mdta"),
                            name: name.to_string(),
                        })
                        .collect(),
                }),
                MP4Box::AppleItemListBox(AppleItemListBox { items }),
            ],
        }
    }

    #[test]
    fn merge_precedence() {
        let moov = MovieBox {
            boxes: vec![
                MP4Box::MetaBox(keyed_meta(
                    vec!["com.apple.quicktime.make"],
                    vec![text_item(FourCC(1), "Widget Corp")],
                )),
                MP4Box::UserDataBox(UserDataBox {
                    boxes: vec![
                        MP4Box::MetaBox(MetaBox {
                            boxes: vec![MP4Box::AppleItemListBox(AppleItemListBox {
                                items: vec![text_item(
                                    FourCC(u32::from_be_bytes(*b"\xa9mak")),
                                    "Widget Corp (udta)",
                                )],
                            })],
                        }),
                        MP4Box::LocationBox(LocationBox {
                            location: "+48.8584+002.2945/".to_string(),
                        }),
                    ],
                }),
            ],
        };

        let metadata = build(&moov);
        assert_eq!(metadata.keys.len(), 3);
        assert_eq!(metadata.values.len(), 3);
        assert_eq!(metadata.keys[0], "com.apple.quicktime.make");
        assert_eq!(metadata.values[0], "Widget Corp");
        assert_eq!(metadata.keys[1], "\u{a9}mak");
        assert_eq!(metadata.values[1], "Widget Corp (udta)");
        assert_eq!(metadata.keys[2], "\u{a9}xyz");
        assert_eq!(metadata.values[2], "+48.8584+002.2945/");
        assert!(metadata.cover.is_none());
    }

    #[test]
    fn out_of_range_key_index_is_ignored() {
        let moov = MovieBox {
            boxes: vec![MP4Box::MetaBox(keyed_meta(
                vec!["com.apple.quicktime.title"],
                vec![
                    text_item(FourCC(1), "A title"),
                    text_item(FourCC(7), "dangling index"),
                ],
            ))],
        };
        let metadata = build(&moov);
        assert_eq!(metadata.keys, vec!["com.apple.quicktime.title"]);
        assert_eq!(metadata.values, vec!["A title"]);
    }

    #[test]
    fn empty_values_are_dropped() {
        let moov = MovieBox {
            boxes: vec![MP4Box::MetaBox(keyed_meta(
                vec!["a", "b"],
                vec![text_item(FourCC(1), ""), text_item(FourCC(2), "kept")],
            ))],
        };
        let metadata = build(&moov);
        assert_eq!(metadata.keys, vec!["b"]);
        assert_eq!(metadata.values, vec!["kept"]);
    }

    #[test]
    fn keyed_cover_wins() {
        let mut keyed = keyed_meta(
            vec![ARTWORK_KEY],
            vec![AppleItem {
                tag: FourCC(1),
                data: Some(IDataBox {
                    class: 14,
                    data: AppleData::Blob { pos: 1000, size: 50 },
                }),
            }],
        );
        let tagged = MetaBox {
            boxes: vec![MP4Box::AppleItemListBox(AppleItemListBox {
                items: vec![AppleItem {
                    tag: FourCC(u32::from_be_bytes(*b"covr")),
                    data: Some(IDataBox {
                        class: 13,
                        data: AppleData::Blob { pos: 2000, size: 60 },
                    }),
                }],
            })],
        };
        keyed.boxes.push(MP4Box::GenericBox(crate::mp4box::GenericBox {
            fourcc: FourCC::new("free"),
            size: 0,
        }));

        let moov = MovieBox {
            boxes: vec![
                MP4Box::MetaBox(keyed),
                MP4Box::UserDataBox(UserDataBox {
                    boxes: vec![MP4Box::MetaBox(tagged)],
                }),
            ],
        };
        let metadata = build(&moov);
        let cover = metadata.cover.unwrap();
        assert_eq!(cover.pos, 1000);
        assert_eq!(cover.kind, CoverKind::Png);
    }
}
