use crate::error::Result;
use crate::known_boxes::{
    BitsPerComponentBox, BoxCodec, CaptureResolutionBox, ChannelDefinitionBox, CodestreamBox,
    ColourSpecificationBox, ComponentMappingBox, DataEntryUrlBox, DisplayResolutionBox,
    FileTypeBox, ImageHeaderBox, IntellectualPropertyBox, LabelBox, PaletteBox, SignatureBox,
    UuidBox, UuidListBox, XmlBox,
};
use crate::metadata::MetadataNode;
use crate::options::EncodeOptions;
use crate::parser::{header_len, write_box_header};
use crate::registry::{Registry, default_registry};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub const fn from_u32(v: u32) -> Self {
        FourCC(v.to_be_bytes())
    }

    pub const fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// True when all four bytes are printable ASCII (space included).
    pub fn is_printable(&self) -> bool {
        self.0.iter().all(|c| (32..=126).contains(c))
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl From<u32> for FourCC {
    fn from(v: u32) -> Self {
        FourCC::from_u32(v)
    }
}

impl From<FourCC> for u32 {
    fn from(cc: FourCC) -> Self {
        cc.as_u32()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

/// Type tags of the JP2 / JPX box family.
pub mod tags {
    use super::FourCC;

    /// JP2 signature box - 'jP\040\040'.
    pub const SIGNATURE: FourCC = FourCC(*b"jP  ");
    /// File Type box - 'ftyp'.
    pub const FILE_TYPE: FourCC = FourCC(*b"ftyp");
    /// JP2 Header superbox - 'jp2h'.
    pub const JP2_HEADER: FourCC = FourCC(*b"jp2h");
    /// Image Header box - 'ihdr'.
    pub const IMAGE_HEADER: FourCC = FourCC(*b"ihdr");
    /// Bits Per Component box - 'bpcc'.
    pub const BITS_PER_COMPONENT: FourCC = FourCC(*b"bpcc");
    /// Colour Specification box - 'colr'.
    pub const COLOUR_SPECIFICATION: FourCC = FourCC(*b"colr");
    /// Palette box - 'pclr'.
    pub const PALETTE: FourCC = FourCC(*b"pclr");
    /// Component Mapping box - 'cmap'.
    pub const COMPONENT_MAPPING: FourCC = FourCC(*b"cmap");
    /// Channel Definition box - 'cdef'.
    pub const CHANNEL_DEFINITION: FourCC = FourCC(*b"cdef");
    /// Resolution superbox - 'res\x20'.
    pub const RESOLUTION: FourCC = FourCC(*b"res ");
    /// Capture Resolution box - 'resc'.
    pub const CAPTURE_RESOLUTION: FourCC = FourCC(*b"resc");
    /// Default Display Resolution box - 'resd'.
    pub const DISPLAY_RESOLUTION: FourCC = FourCC(*b"resd");
    /// Contiguous Codestream box - 'jp2c'.
    pub const CONTIGUOUS_CODESTREAM: FourCC = FourCC(*b"jp2c");
    /// Intellectual Property box - 'jp2i'.
    pub const INTELLECTUAL_PROPERTY: FourCC = FourCC(*b"jp2i");
    /// XML box - 'xml\x20'.
    pub const XML: FourCC = FourCC(*b"xml ");
    /// UUID box - 'uuid'.
    pub const UUID: FourCC = FourCC(*b"uuid");
    /// UUID Info superbox - 'uinf'.
    pub const UUID_INFO: FourCC = FourCC(*b"uinf");
    /// UUID List box - 'ulst'.
    pub const UUID_LIST: FourCC = FourCC(*b"ulst");
    /// Data Entry URL box - 'url\x20'.
    pub const URL: FourCC = FourCC(*b"url ");
    /// Association superbox - 'asoc'.
    pub const ASSOCIATION: FourCC = FourCC(*b"asoc");
    /// Label box - 'lbl\x20'.
    pub const LABEL: FourCC = FourCC(*b"lbl ");
    /// Codestream Header superbox - 'jpch'.
    pub const CODESTREAM_HEADER: FourCC = FourCC(*b"jpch");
    /// Compositing Layer Header superbox - 'jplh'.
    pub const COMPOSITING_LAYER_HEADER: FourCC = FourCC(*b"jplh");
    /// Colour Group superbox - 'cgrp'.
    pub const COLOUR_GROUP: FourCC = FourCC(*b"cgrp");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub size: u64,        // total size including header, or 0=to end of enclosing data
    pub typ: FourCC,
    pub header_size: u64, // 8 or 16
    pub start: u64,       // offset of header start within the scanned buffer
}

/// A superbox: its payload is nothing but complete child boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerBox {
    typ: FourCC,
    children: Vec<Jp2Box>,
}

impl ContainerBox {
    pub fn new(typ: FourCC, children: Vec<Jp2Box>) -> Self {
        Self { typ, children }
    }

    /// An `asoc` box grouping its children.
    pub fn association(children: Vec<Jp2Box>) -> Self {
        Self::new(tags::ASSOCIATION, children)
    }

    pub fn typ(&self) -> FourCC {
        self.typ
    }

    pub fn children(&self) -> &[Jp2Box] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Jp2Box> {
        self.children
    }

    pub fn payload_len(&self) -> Result<u64> {
        self.children.iter().map(Jp2Box::length).sum()
    }
}

/// A box kept as raw payload bytes, either because its tag is not
/// registered or because a lenient kind could not decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueBox {
    typ: FourCC,
    data: Vec<u8>,
}

impl OpaqueBox {
    pub fn new(typ: FourCC, data: Vec<u8>) -> Self {
        Self { typ, data }
    }

    pub fn typ(&self) -> FourCC {
        self.typ
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

macro_rules! jp2_boxes {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        /// One decoded box: a typed leaf record, a container of child boxes,
        /// or an opaque payload.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Jp2Box {
            $($variant($ty),)*
            Container(ContainerBox),
            Opaque(OpaqueBox),
        }

        $(
            impl From<$ty> for Jp2Box {
                fn from(b: $ty) -> Self {
                    Jp2Box::$variant(b)
                }
            }
        )*

        impl Jp2Box {
            pub fn type_tag(&self) -> FourCC {
                match self {
                    $(Jp2Box::$variant(_) => <$ty as BoxCodec>::TYPE,)*
                    Jp2Box::Container(c) => c.typ(),
                    Jp2Box::Opaque(o) => o.typ(),
                }
            }

            fn compose_leaf(&self, out: &mut Vec<u8>) -> Result<()> {
                match self {
                    $(Jp2Box::$variant(b) => b.compose(out),)*
                    Jp2Box::Container(_) | Jp2Box::Opaque(_) => Ok(()),
                }
            }

            pub(crate) fn leaf_node(&self) -> Option<MetadataNode> {
                match self {
                    $(Jp2Box::$variant(b) => Some(b.to_node()),)*
                    Jp2Box::Container(_) | Jp2Box::Opaque(_) => None,
                }
            }
        }

        pub(crate) fn register_leaf_kinds(reg: Registry) -> Registry {
            reg $(.with_leaf::<$ty>())*
        }
    };
}

jp2_boxes! {
    Signature(SignatureBox),
    FileType(FileTypeBox),
    ImageHeader(ImageHeaderBox),
    BitsPerComponent(BitsPerComponentBox),
    ColourSpecification(ColourSpecificationBox),
    Palette(PaletteBox),
    ComponentMapping(ComponentMappingBox),
    ChannelDefinition(ChannelDefinitionBox),
    CaptureResolution(CaptureResolutionBox),
    DisplayResolution(DisplayResolutionBox),
    Label(LabelBox),
    Xml(XmlBox),
    Uuid(UuidBox),
    UuidList(UuidListBox),
    DataEntryUrl(DataEntryUrlBox),
    Codestream(CodestreamBox),
    IntellectualProperty(IntellectualPropertyBox),
}

impl From<ContainerBox> for Jp2Box {
    fn from(c: ContainerBox) -> Self {
        Jp2Box::Container(c)
    }
}

impl From<OpaqueBox> for Jp2Box {
    fn from(o: OpaqueBox) -> Self {
        Jp2Box::Opaque(o)
    }
}

impl Jp2Box {
    /// Decode a box of kind `typ` from its payload (header already stripped)
    /// using the default registry and options.
    pub fn parse(typ: FourCC, payload: &[u8]) -> Result<Jp2Box> {
        default_registry().parse_box(typ, payload, &Default::default())
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Jp2Box::Container(_))
    }

    /// Child boxes; empty for anything but a container.
    pub fn children(&self) -> &[Jp2Box] {
        match self {
            Jp2Box::Container(c) => c.children(),
            _ => &[],
        }
    }

    /// Payload size in bytes. Fails when a leaf's fields cannot be encoded.
    pub fn payload_len(&self) -> Result<u64> {
        match self {
            Jp2Box::Container(c) => c.payload_len(),
            Jp2Box::Opaque(o) => Ok(o.data().len() as u64),
            leaf => {
                let mut out = Vec::new();
                leaf.compose_leaf(&mut out)?;
                Ok(out.len() as u64)
            }
        }
    }

    /// Total encoded size, header included.
    pub fn length(&self) -> Result<u64> {
        let payload = self.payload_len()?;
        Ok(header_len(payload) + payload)
    }

    /// Payload bytes without the box header.
    pub fn compose(&self) -> Result<Vec<u8>> {
        self.compose_with(&EncodeOptions::default())
    }

    pub fn compose_with(&self, options: &EncodeOptions) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Jp2Box::Container(c) => {
                for child in c.children() {
                    child.encode_into(&mut out, options)?;
                }
            }
            Jp2Box::Opaque(o) => out.extend_from_slice(o.data()),
            leaf => leaf.compose_leaf(&mut out)?,
        }
        Ok(out)
    }

    /// Header followed by payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out, &EncodeOptions::default())?;
        Ok(out)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>, options: &EncodeOptions) -> Result<()> {
        let payload = self.compose_with(options)?;
        write_box_header(out, self.type_tag(), payload.len() as u64, options)?;
        out.extend_from_slice(&payload);
        Ok(())
    }
}
