//! Codec for the JP2 / JPX box container format.
//!
//! Boxes are parsed from byte buffers into a typed tree ([`Jp2Box`]),
//! re-serialized losslessly, and bridged to a generic metadata tree
//! ([`MetadataNode`]). Unknown box types survive a read-write cycle
//! byte-for-byte as opaque boxes.

pub mod boxes;
pub mod error;
pub mod known_boxes;
pub mod metadata;
pub mod options;
pub mod parser;
pub mod registry;
pub mod util;

pub use boxes::{BoxHeader, ContainerBox, FourCC, Jp2Box, OpaqueBox, tags};
pub use error::{BoxError, Result};
pub use known_boxes::BoxCodec;
pub use metadata::{MetadataNode, boxes_from_tree, boxes_to_tree, from_tree, to_tree};
pub use options::{EncodeOptions, ParseOptions};
pub use parser::{
    BoxReader, PartialParse, encode_boxes, encode_boxes_with, parse_boxes, parse_boxes_partial,
    parse_boxes_partial_with, parse_boxes_with, parse_children, parse_children_partial,
    read_box_header, read_boxes, write_box_header,
};
pub use registry::{BoxShape, BoxSpec, Registry, default_registry, standard_registry};
