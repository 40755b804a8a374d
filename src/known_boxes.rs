use crate::boxes::{FourCC, tags};
use crate::error::{BoxError, Result};
use crate::metadata::{MetadataNode, fourcc_to_attr, join_list};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Binary and metadata-tree codec for one leaf box kind.
///
/// `parse` sees the payload only (header stripped) and must account for every
/// byte of it: too few bytes is `TruncatedBox`, leftover or nonsensical bytes
/// are `InvalidPayload`. `compose` is its exact inverse, and fails with
/// `InvalidPayload` for field values the wire format cannot carry.
pub trait BoxCodec: Sized {
    const TYPE: FourCC;
    /// Canonical name of the metadata-tree node for this kind.
    const NODE_NAME: &'static str;
    /// Keep the payload as an opaque box when it cannot be decoded.
    const LENIENT: bool = false;

    fn parse(data: &[u8]) -> Result<Self>;
    fn compose(&self, out: &mut Vec<u8>) -> Result<()>;
    fn to_node(&self) -> MetadataNode;
    fn from_node(node: &MetadataNode) -> Result<Self>;
}

// ---------- Helpers ----------

fn require(typ: FourCC, data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(BoxError::truncated(typ, needed, data.len()));
    }
    Ok(())
}

fn exact(typ: FourCC, data: &[u8], needed: usize) -> Result<()> {
    require(typ, data, needed)?;
    if data.len() > needed {
        return Err(BoxError::invalid(
            typ,
            format!("{} trailing bytes", data.len() - needed),
        ));
    }
    Ok(())
}

fn utf8(typ: FourCC, data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec()).map_err(|e| BoxError::invalid(typ, e.to_string()))
}

fn count_u16(typ: FourCC, n: usize, what: &str) -> Result<u16> {
    u16::try_from(n).map_err(|_| BoxError::invalid(typ, format!("{n} {what} exceed a 16-bit count")))
}

fn uuid_from_hex(node: &MetadataNode, s: &str) -> Result<[u8; 16]> {
    hex::decode(s)
        .ok()
        .and_then(|v| <[u8; 16]>::try_from(v).ok())
        .ok_or_else(|| node.malformed(format!("`{s}` is not a 16-byte hex UUID")))
}

// ---------- Signature ----------

/// The fixed content of the `jP  ` box.
pub const JP2_SIGNATURE: u32 = 0x0D0A_870A;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignatureBox;

impl BoxCodec for SignatureBox {
    const TYPE: FourCC = tags::SIGNATURE;
    const NODE_NAME: &'static str = "JP2KSignatureBox";

    fn parse(data: &[u8]) -> Result<Self> {
        exact(Self::TYPE, data, 4)?;
        let sig = Cursor::new(data).read_u32::<BigEndian>()?;
        if sig != JP2_SIGNATURE {
            return Err(BoxError::invalid(Self::TYPE, format!("bad signature {sig:#010x}")));
        }
        Ok(SignatureBox)
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&JP2_SIGNATURE.to_be_bytes());
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME).with_attr("Signature", format!("{JP2_SIGNATURE:08x}"))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        let s = node.required("Signature")?;
        match u32::from_str_radix(s, 16) {
            Ok(JP2_SIGNATURE) => Ok(SignatureBox),
            _ => Err(node.malformed(format!("bad signature `{s}`"))),
        }
    }
}

// ---------- File type ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeBox {
    pub brand: FourCC,
    pub minor_version: u32,
    pub compatibility: Vec<FourCC>,
}

impl BoxCodec for FileTypeBox {
    const TYPE: FourCC = tags::FILE_TYPE;
    const NODE_NAME: &'static str = "JP2KFileTypeBox";

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 8)?;
        if data.len() % 4 != 0 {
            return Err(BoxError::invalid(Self::TYPE, "compatibility list is not 4-byte aligned"));
        }
        let mut cur = Cursor::new(data);
        let mut brand = [0u8; 4];
        cur.read_exact(&mut brand)?;
        let minor_version = cur.read_u32::<BigEndian>()?;
        let compatibility = data[8..]
            .chunks_exact(4)
            .map(|c| FourCC([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { brand: FourCC(brand), minor_version, compatibility })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.brand.0);
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        for cc in &self.compatibility {
            out.extend_from_slice(&cc.0);
        }
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME)
            .with_attr("Brand", fourcc_to_attr(self.brand))
            .with_attr("MinorVersion", self.minor_version)
            .with_attr(
                "CompatibilityList",
                join_list(self.compatibility.iter().map(|cc| fourcc_to_attr(*cc))),
            )
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self {
            brand: node.fourcc_attr("Brand")?,
            minor_version: node.parse_attr("MinorVersion")?,
            compatibility: node.fourcc_list_attr("CompatibilityList")?,
        })
    }
}

// ---------- Image header ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeaderBox {
    pub height: u32,
    pub width: u32,
    pub components: u16,
    /// Raw BPC byte: depth minus one, top bit set for signed samples.
    /// 255 means depths vary and live in a `bpcc` box.
    pub bits_per_component: u8,
    pub compression: u8,
    pub colourspace_unknown: u8,
    pub intellectual_property: u8,
}

impl BoxCodec for ImageHeaderBox {
    const TYPE: FourCC = tags::IMAGE_HEADER;
    const NODE_NAME: &'static str = "JP2KImageHeaderBox";

    fn parse(data: &[u8]) -> Result<Self> {
        exact(Self::TYPE, data, 14)?;
        let mut cur = Cursor::new(data);
        Ok(Self {
            height: cur.read_u32::<BigEndian>()?,
            width: cur.read_u32::<BigEndian>()?,
            components: cur.read_u16::<BigEndian>()?,
            bits_per_component: cur.read_u8()?,
            compression: cur.read_u8()?,
            colourspace_unknown: cur.read_u8()?,
            intellectual_property: cur.read_u8()?,
        })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.components.to_be_bytes());
        out.extend_from_slice(&[
            self.bits_per_component,
            self.compression,
            self.colourspace_unknown,
            self.intellectual_property,
        ]);
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME)
            .with_attr("Height", self.height)
            .with_attr("Width", self.width)
            .with_attr("NumComponents", self.components)
            .with_attr("BitDepth", self.bits_per_component)
            .with_attr("CompressionType", self.compression)
            .with_attr("UnknownColorspace", self.colourspace_unknown)
            .with_attr("IntellectualProperty", self.intellectual_property)
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self {
            height: node.parse_attr("Height")?,
            width: node.parse_attr("Width")?,
            components: node.parse_attr("NumComponents")?,
            bits_per_component: node.parse_attr("BitDepth")?,
            compression: node.parse_attr("CompressionType")?,
            colourspace_unknown: node.parse_attr("UnknownColorspace")?,
            intellectual_property: node.parse_attr("IntellectualProperty")?,
        })
    }
}

// ---------- Bits per component ----------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitsPerComponentBox {
    pub bit_depths: Vec<u8>,
}

impl BoxCodec for BitsPerComponentBox {
    const TYPE: FourCC = tags::BITS_PER_COMPONENT;
    const NODE_NAME: &'static str = "JP2KBitsPerComponentBox";

    fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self { bit_depths: data.to_vec() })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.bit_depths);
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME).with_attr("BitDepth", join_list(&self.bit_depths))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self { bit_depths: node.list_attr("BitDepth")? })
    }
}

// ---------- Colour specification ----------

/// Enumerated colourspace method (`METH` = 1).
pub const METHOD_ENUMERATED: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColourData {
    /// Method 1: an enumerated colourspace code (16 = sRGB, 17 = greyscale, ...).
    Enumerated(u32),
    /// Any other method, with its raw trailing bytes (an ICC profile for
    /// methods 2 and 3).
    Other { method: u8, data: Vec<u8> },
}

impl ColourData {
    pub fn method(&self) -> u8 {
        match self {
            ColourData::Enumerated(_) => METHOD_ENUMERATED,
            ColourData::Other { method, .. } => *method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourSpecificationBox {
    pub precedence: i8,
    pub approximation: u8,
    pub colour: ColourData,
}

impl BoxCodec for ColourSpecificationBox {
    const TYPE: FourCC = tags::COLOUR_SPECIFICATION;
    const NODE_NAME: &'static str = "JP2KColorSpecificationBox";

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 3)?;
        let mut cur = Cursor::new(data);
        let method = cur.read_u8()?;
        let precedence = cur.read_i8()?;
        let approximation = cur.read_u8()?;
        let colour = if method == METHOD_ENUMERATED {
            exact(Self::TYPE, data, 7)?;
            ColourData::Enumerated(cur.read_u32::<BigEndian>()?)
        } else {
            ColourData::Other { method, data: data[3..].to_vec() }
        };
        Ok(Self { precedence, approximation, colour })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        if matches!(self.colour, ColourData::Other { method: METHOD_ENUMERATED, .. }) {
            return Err(BoxError::invalid(
                Self::TYPE,
                "enumerated method needs an enumerated colourspace",
            ));
        }
        out.push(self.colour.method());
        out.push(self.precedence as u8);
        out.push(self.approximation);
        match &self.colour {
            ColourData::Enumerated(cs) => out.extend_from_slice(&cs.to_be_bytes()),
            ColourData::Other { data, .. } => out.extend_from_slice(data),
        }
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        let node = MetadataNode::new(Self::NODE_NAME)
            .with_attr("Method", self.colour.method())
            .with_attr("Precedence", self.precedence)
            .with_attr("Approximation", self.approximation);
        match &self.colour {
            ColourData::Enumerated(cs) => node.with_attr("EnumeratedColorSpace", cs),
            ColourData::Other { data, .. } => node.with_attr("Data", hex::encode(data)),
        }
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        let method: u8 = node.parse_attr("Method")?;
        let colour = if method == METHOD_ENUMERATED {
            ColourData::Enumerated(node.parse_attr("EnumeratedColorSpace")?)
        } else {
            ColourData::Other { method, data: node.hex_attr("Data")? }
        };
        Ok(Self {
            precedence: node.parse_attr("Precedence")?,
            approximation: node.parse_attr("Approximation")?,
            colour,
        })
    }
}

// ---------- Palette ----------

/// Bytes used per palette value for a raw column bit-depth byte.
fn column_width(bit_depth: u8) -> usize {
    ((bit_depth & 0x7F) as usize + 1).div_ceil(8)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteBox {
    /// Raw `B` byte per column: depth minus one, top bit set when signed.
    pub bit_depths: Vec<u8>,
    /// One row per palette entry, one value per column.
    pub entries: Vec<Vec<u64>>,
}

impl BoxCodec for PaletteBox {
    const TYPE: FourCC = tags::PALETTE;
    const NODE_NAME: &'static str = "JP2KPaletteBox";

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 3)?;
        let mut cur = Cursor::new(data);
        let num_entries = cur.read_u16::<BigEndian>()? as usize;
        let num_columns = cur.read_u8()? as usize;
        require(Self::TYPE, data, 3 + num_columns)?;
        let mut bit_depths = vec![0u8; num_columns];
        cur.read_exact(&mut bit_depths)?;

        let widths: Vec<usize> = bit_depths.iter().map(|&b| column_width(b)).collect();
        if let Some(w) = widths.iter().find(|&&w| w > 8) {
            return Err(BoxError::invalid(Self::TYPE, format!("{w}-byte palette values")));
        }
        let row: usize = widths.iter().sum();
        exact(Self::TYPE, data, 3 + num_columns + num_entries * row)?;

        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let mut values = Vec::with_capacity(num_columns);
            for &w in &widths {
                values.push(cur.read_uint::<BigEndian>(w)?);
            }
            entries.push(values);
        }
        Ok(Self { bit_depths, entries })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        let num_entries = count_u16(Self::TYPE, self.entries.len(), "palette entries")?;
        let num_columns = u8::try_from(self.bit_depths.len()).map_err(|_| {
            BoxError::invalid(Self::TYPE, format!("{} palette columns", self.bit_depths.len()))
        })?;
        let widths: Vec<usize> = self.bit_depths.iter().map(|&b| column_width(b)).collect();
        if let Some(w) = widths.iter().find(|&&w| w > 8) {
            return Err(BoxError::invalid(Self::TYPE, format!("{w}-byte palette values")));
        }
        for (row, values) in self.entries.iter().enumerate() {
            if values.len() != widths.len() {
                return Err(BoxError::invalid(
                    Self::TYPE,
                    format!("entry {row} has {} values for {} columns", values.len(), widths.len()),
                ));
            }
            if let Some(v) = values
                .iter()
                .zip(&widths)
                .find_map(|(&v, &w)| (w < 8 && v >> (8 * w) != 0).then_some(v))
            {
                return Err(BoxError::invalid(
                    Self::TYPE,
                    format!("entry {row} value {v} does not fit its column"),
                ));
            }
        }

        out.extend_from_slice(&num_entries.to_be_bytes());
        out.push(num_columns);
        out.extend_from_slice(&self.bit_depths);
        for values in &self.entries {
            for (v, &w) in values.iter().zip(&widths) {
                out.extend_from_slice(&v.to_be_bytes()[8 - w..]);
            }
        }
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME)
            .with_attr("BitDepth", join_list(&self.bit_depths))
            .with_children(self.entries.iter().map(|values| {
                MetadataNode::new("PaletteEntry").with_attr("Values", join_list(values))
            }))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        let bit_depths: Vec<u8> = node.list_attr("BitDepth")?;
        if bit_depths.len() > u8::MAX as usize {
            return Err(node.malformed("more than 255 palette columns"));
        }
        if node.children.len() > u16::MAX as usize {
            return Err(node.malformed("more than 65535 palette entries"));
        }
        let mut entries = Vec::with_capacity(node.children.len());
        for child in &node.children {
            child.expect_name("PaletteEntry")?;
            let values: Vec<u64> = child.list_attr("Values")?;
            if values.len() != bit_depths.len() {
                return Err(child.malformed(format!(
                    "{} values for {} columns",
                    values.len(),
                    bit_depths.len()
                )));
            }
            for (&v, &b) in values.iter().zip(&bit_depths) {
                let w = column_width(b);
                if w > 8 || (w < 8 && v >> (8 * w) != 0) {
                    return Err(child.malformed(format!("value {v} does not fit {w} bytes")));
                }
            }
            entries.push(values);
        }
        Ok(Self { bit_depths, entries })
    }
}

// ---------- Component mapping ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentMapping {
    pub component: u16,
    /// 0 = direct use, 1 = palette mapping.
    pub mapping_type: u8,
    pub palette_column: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentMappingBox {
    pub mappings: Vec<ComponentMapping>,
}

impl BoxCodec for ComponentMappingBox {
    const TYPE: FourCC = tags::COMPONENT_MAPPING;
    const NODE_NAME: &'static str = "JP2KComponentMappingBox";

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() % 4 != 0 {
            return Err(BoxError::invalid(Self::TYPE, "length is not a multiple of 4"));
        }
        let mut cur = Cursor::new(data);
        let mut mappings = Vec::with_capacity(data.len() / 4);
        for _ in 0..data.len() / 4 {
            mappings.push(ComponentMapping {
                component: cur.read_u16::<BigEndian>()?,
                mapping_type: cur.read_u8()?,
                palette_column: cur.read_u8()?,
            });
        }
        Ok(Self { mappings })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        for m in &self.mappings {
            out.extend_from_slice(&m.component.to_be_bytes());
            out.push(m.mapping_type);
            out.push(m.palette_column);
        }
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME).with_children(self.mappings.iter().map(|m| {
            MetadataNode::new("ComponentMapping")
                .with_attr("Component", m.component)
                .with_attr("MappingType", m.mapping_type)
                .with_attr("PaletteColumn", m.palette_column)
        }))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        let mappings = node
            .children
            .iter()
            .map(|child| {
                child.expect_name("ComponentMapping")?;
                Ok(ComponentMapping {
                    component: child.parse_attr("Component")?,
                    mapping_type: child.parse_attr("MappingType")?,
                    palette_column: child.parse_attr("PaletteColumn")?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { mappings })
    }
}

// ---------- Channel definition ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDefinition {
    pub index: u16,
    /// 0 = colour, 1 = opacity, 2 = premultiplied opacity.
    pub channel_type: u16,
    /// Colour the channel belongs to; 0 = whole image.
    pub association: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelDefinitionBox {
    pub channels: Vec<ChannelDefinition>,
}

impl BoxCodec for ChannelDefinitionBox {
    const TYPE: FourCC = tags::CHANNEL_DEFINITION;
    const NODE_NAME: &'static str = "JP2KChannelDefinitionBox";

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 2)?;
        let mut cur = Cursor::new(data);
        let count = cur.read_u16::<BigEndian>()? as usize;
        exact(Self::TYPE, data, 2 + count * 6)?;
        let mut channels = Vec::with_capacity(count);
        for _ in 0..count {
            channels.push(ChannelDefinition {
                index: cur.read_u16::<BigEndian>()?,
                channel_type: cur.read_u16::<BigEndian>()?,
                association: cur.read_u16::<BigEndian>()?,
            });
        }
        Ok(Self { channels })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        let count = count_u16(Self::TYPE, self.channels.len(), "channels")?;
        out.extend_from_slice(&count.to_be_bytes());
        for c in &self.channels {
            out.extend_from_slice(&c.index.to_be_bytes());
            out.extend_from_slice(&c.channel_type.to_be_bytes());
            out.extend_from_slice(&c.association.to_be_bytes());
        }
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME).with_children(self.channels.iter().map(|c| {
            MetadataNode::new("Channel")
                .with_attr("Index", c.index)
                .with_attr("Type", c.channel_type)
                .with_attr("Association", c.association)
        }))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        if node.children.len() > u16::MAX as usize {
            return Err(node.malformed("more than 65535 channels"));
        }
        let channels = node
            .children
            .iter()
            .map(|child| {
                child.expect_name("Channel")?;
                Ok(ChannelDefinition {
                    index: child.parse_attr("Index")?,
                    channel_type: child.parse_attr("Type")?,
                    association: child.parse_attr("Association")?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { channels })
    }
}

// ---------- Resolution ----------

/// Grid resolution record shared by `resc` and `resd`, in grid points per
/// metre: `numerator / denominator * 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub vertical_numerator: u16,
    pub vertical_denominator: u16,
    pub horizontal_numerator: u16,
    pub horizontal_denominator: u16,
    pub vertical_exponent: i8,
    pub horizontal_exponent: i8,
}

impl Resolution {
    pub fn vertical(&self) -> Option<f64> {
        scaled(self.vertical_numerator, self.vertical_denominator, self.vertical_exponent)
    }

    pub fn horizontal(&self) -> Option<f64> {
        scaled(self.horizontal_numerator, self.horizontal_denominator, self.horizontal_exponent)
    }

    fn parse(typ: FourCC, data: &[u8]) -> Result<Self> {
        exact(typ, data, 10)?;
        let mut cur = Cursor::new(data);
        Ok(Self {
            vertical_numerator: cur.read_u16::<BigEndian>()?,
            vertical_denominator: cur.read_u16::<BigEndian>()?,
            horizontal_numerator: cur.read_u16::<BigEndian>()?,
            horizontal_denominator: cur.read_u16::<BigEndian>()?,
            vertical_exponent: cur.read_i8()?,
            horizontal_exponent: cur.read_i8()?,
        })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.vertical_numerator.to_be_bytes());
        out.extend_from_slice(&self.vertical_denominator.to_be_bytes());
        out.extend_from_slice(&self.horizontal_numerator.to_be_bytes());
        out.extend_from_slice(&self.horizontal_denominator.to_be_bytes());
        out.push(self.vertical_exponent as u8);
        out.push(self.horizontal_exponent as u8);
        Ok(())
    }

    fn to_node(&self, name: &str) -> MetadataNode {
        MetadataNode::new(name)
            .with_attr("VerticalNumerator", self.vertical_numerator)
            .with_attr("VerticalDenominator", self.vertical_denominator)
            .with_attr("HorizontalNumerator", self.horizontal_numerator)
            .with_attr("HorizontalDenominator", self.horizontal_denominator)
            .with_attr("VerticalExponent", self.vertical_exponent)
            .with_attr("HorizontalExponent", self.horizontal_exponent)
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self {
            vertical_numerator: node.parse_attr("VerticalNumerator")?,
            vertical_denominator: node.parse_attr("VerticalDenominator")?,
            horizontal_numerator: node.parse_attr("HorizontalNumerator")?,
            horizontal_denominator: node.parse_attr("HorizontalDenominator")?,
            vertical_exponent: node.parse_attr("VerticalExponent")?,
            horizontal_exponent: node.parse_attr("HorizontalExponent")?,
        })
    }
}

fn scaled(num: u16, den: u16, exp: i8) -> Option<f64> {
    (den != 0).then(|| num as f64 / den as f64 * 10f64.powi(exp as i32))
}

macro_rules! resolution_box {
    ($name:ident, $tag:expr, $node:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub Resolution);

        impl BoxCodec for $name {
            const TYPE: FourCC = $tag;
            const NODE_NAME: &'static str = $node;

            fn parse(data: &[u8]) -> Result<Self> {
                Resolution::parse(Self::TYPE, data).map($name)
            }

            fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
                self.0.compose(out)
            }

            fn to_node(&self) -> MetadataNode {
                self.0.to_node(Self::NODE_NAME)
            }

            fn from_node(node: &MetadataNode) -> Result<Self> {
                Resolution::from_node(node).map($name)
            }
        }
    };
}

resolution_box!(CaptureResolutionBox, tags::CAPTURE_RESOLUTION, "JP2KCaptureResolutionBox");
resolution_box!(DisplayResolutionBox, tags::DISPLAY_RESOLUTION, "JP2KDefaultDisplayResolutionBox");

// ---------- Text boxes ----------

/// Label box; undecodable text is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelBox {
    pub text: String,
}

impl BoxCodec for LabelBox {
    const TYPE: FourCC = tags::LABEL;
    const NODE_NAME: &'static str = "JP2KLabelBox";
    const LENIENT: bool = true;

    fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self { text: utf8(Self::TYPE, data)? })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.text.as_bytes());
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME).with_attr("Text", &self.text)
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self { text: node.required("Text")?.to_string() })
    }
}

/// XML box; undecodable text is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlBox {
    pub content: String,
}

impl BoxCodec for XmlBox {
    const TYPE: FourCC = tags::XML;
    const NODE_NAME: &'static str = "JP2KXMLBox";
    const LENIENT: bool = true;

    fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self { content: utf8(Self::TYPE, data)? })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.content.as_bytes());
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME).with_attr("Content", &self.content)
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self { content: node.required("Content")?.to_string() })
    }
}

// ---------- UUID boxes ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidBox {
    pub id: [u8; 16],
    pub data: Vec<u8>,
}

impl BoxCodec for UuidBox {
    const TYPE: FourCC = tags::UUID;
    const NODE_NAME: &'static str = "JP2KUUIDBox";

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 16)?;
        let mut id = [0u8; 16];
        id.copy_from_slice(&data[..16]);
        Ok(Self { id, data: data[16..].to_vec() })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&self.data);
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME)
            .with_attr("UUID", hex::encode(self.id))
            .with_attr("Data", hex::encode(&self.data))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(Self {
            id: uuid_from_hex(node, node.required("UUID")?)?,
            data: node.hex_attr("Data")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UuidListBox {
    pub ids: Vec<[u8; 16]>,
}

impl BoxCodec for UuidListBox {
    const TYPE: FourCC = tags::UUID_LIST;
    const NODE_NAME: &'static str = "JP2KUUIDListBox";

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 2)?;
        let count = Cursor::new(data).read_u16::<BigEndian>()? as usize;
        exact(Self::TYPE, data, 2 + count * 16)?;
        let ids = data[2..]
            .chunks_exact(16)
            .map(|c| {
                let mut id = [0u8; 16];
                id.copy_from_slice(c);
                id
            })
            .collect();
        Ok(Self { ids })
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        let count = count_u16(Self::TYPE, self.ids.len(), "UUIDs")?;
        out.extend_from_slice(&count.to_be_bytes());
        for id in &self.ids {
            out.extend_from_slice(id);
        }
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME)
            .with_attr("UUIDs", join_list(self.ids.iter().map(hex::encode)))
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        let raw: Vec<String> = node.list_attr("UUIDs")?;
        if raw.len() > u16::MAX as usize {
            return Err(node.malformed("more than 65535 UUIDs"));
        }
        let ids = raw
            .iter()
            .map(|s| uuid_from_hex(node, s))
            .collect::<Result<_>>()?;
        Ok(Self { ids })
    }
}

/// `url ` box: version, 24-bit flags and a NUL-terminated location.
/// Undecodable payloads are kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntryUrlBox {
    pub version: u8,
    pub flags: u32,
    pub location: String,
}

impl BoxCodec for DataEntryUrlBox {
    const TYPE: FourCC = tags::URL;
    const NODE_NAME: &'static str = "JP2KDataEntryURLBox";
    const LENIENT: bool = true;

    fn parse(data: &[u8]) -> Result<Self> {
        require(Self::TYPE, data, 5)?;
        let mut cur = Cursor::new(data);
        let version = cur.read_u8()?;
        let flags = cur.read_u24::<BigEndian>()?;
        let loc = &data[4..];
        match loc.iter().position(|&b| b == 0) {
            Some(n) if n == loc.len() - 1 => Ok(Self {
                version,
                flags,
                location: utf8(Self::TYPE, &loc[..n])?,
            }),
            _ => Err(BoxError::invalid(Self::TYPE, "location is not a single NUL-terminated string")),
        }
    }

    fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.flags > 0x00FF_FFFF {
            return Err(BoxError::invalid(
                Self::TYPE,
                format!("flags {:#x} exceed 24 bits", self.flags),
            ));
        }
        if self.location.contains('\0') {
            return Err(BoxError::invalid(Self::TYPE, "location contains a NUL byte"));
        }
        out.push(self.version);
        out.extend_from_slice(&self.flags.to_be_bytes()[1..]);
        out.extend_from_slice(self.location.as_bytes());
        out.push(0);
        Ok(())
    }

    fn to_node(&self) -> MetadataNode {
        MetadataNode::new(Self::NODE_NAME)
            .with_attr("Version", self.version)
            .with_attr("Flags", self.flags)
            .with_attr("URL", &self.location)
    }

    fn from_node(node: &MetadataNode) -> Result<Self> {
        let flags: u32 = node.parse_attr("Flags")?;
        if flags > 0x00FF_FFFF {
            return Err(node.malformed(format!("flags {flags:#x} exceed 24 bits")));
        }
        let location = node.required("URL")?;
        if location.contains('\0') {
            return Err(node.malformed("URL contains a NUL byte"));
        }
        Ok(Self {
            version: node.parse_attr("Version")?,
            flags,
            location: location.to_string(),
        })
    }
}

// ---------- Raw payload boxes ----------

macro_rules! raw_box {
    ($(#[$meta:meta])* $name:ident, $tag:expr, $node:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub data: Vec<u8>,
        }

        impl BoxCodec for $name {
            const TYPE: FourCC = $tag;
            const NODE_NAME: &'static str = $node;

            fn parse(data: &[u8]) -> Result<Self> {
                Ok(Self { data: data.to_vec() })
            }

            fn compose(&self, out: &mut Vec<u8>) -> Result<()> {
                out.extend_from_slice(&self.data);
                Ok(())
            }

            fn to_node(&self) -> MetadataNode {
                MetadataNode::new(Self::NODE_NAME).with_attr("Data", hex::encode(&self.data))
            }

            fn from_node(node: &MetadataNode) -> Result<Self> {
                Ok(Self { data: node.hex_attr("Data")? })
            }
        }
    };
}

raw_box!(
    /// Contiguous codestream, carried verbatim.
    CodestreamBox,
    tags::CONTIGUOUS_CODESTREAM,
    "JP2KCodestreamBox"
);
raw_box!(IntellectualPropertyBox, tags::INTELLECTUAL_PROPERTY, "JP2KIntellectualPropertyBox");
