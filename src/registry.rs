use crate::boxes::{ContainerBox, FourCC, Jp2Box, OpaqueBox, register_leaf_kinds, tags};
use crate::error::{BoxError, Result};
use crate::known_boxes::BoxCodec;
use crate::metadata::MetadataNode;
use crate::options::ParseOptions;
use crate::parser::{PartialParse, parse_children, parse_children_partial};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Builds a box from its raw payload.
pub type ParseFn = fn(&[u8]) -> Result<Jp2Box>;
/// Builds a box from its metadata-tree node.
pub type FromNodeFn = fn(&MetadataNode) -> Result<Jp2Box>;

/// How a tag's payload is constructed.
#[derive(Clone, Copy)]
pub enum BoxShape {
    Leaf {
        parse: ParseFn,
        from_node: FromNodeFn,
        /// Fall back to an opaque box when `parse` fails.
        lenient: bool,
    },
    /// Payload is a sequence of complete child boxes.
    Container,
    /// Unregistered tag: payload bytes are kept verbatim.
    Opaque,
}

impl std::fmt::Debug for BoxShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxShape::Leaf { lenient, .. } => write!(f, "Leaf {{ lenient: {lenient} }}"),
            BoxShape::Container => write!(f, "Container"),
            BoxShape::Opaque => write!(f, "Opaque"),
        }
    }
}

/// One registry entry.
#[derive(Debug, Clone, Copy)]
pub struct BoxSpec {
    pub typ: FourCC,
    pub node_name: &'static str,
    pub shape: BoxShape,
}

fn parse_leaf<T: BoxCodec + Into<Jp2Box>>(data: &[u8]) -> Result<Jp2Box> {
    T::parse(data).map(Into::into)
}

fn leaf_from_node<T: BoxCodec + Into<Jp2Box>>(node: &MetadataNode) -> Result<Jp2Box> {
    node.expect_name(T::NODE_NAME)?;
    T::from_node(node).map(Into::into)
}

impl BoxSpec {
    pub fn leaf<T: BoxCodec + Into<Jp2Box>>() -> Self {
        Self {
            typ: T::TYPE,
            node_name: T::NODE_NAME,
            shape: BoxShape::Leaf {
                parse: parse_leaf::<T>,
                from_node: leaf_from_node::<T>,
                lenient: T::LENIENT,
            },
        }
    }

    pub fn container(typ: FourCC, node_name: &'static str) -> Self {
        Self { typ, node_name, shape: BoxShape::Container }
    }
}

/// Lookup table from type tag (and node name) to box kind.
///
/// The registry is immutable once constructed; use [`Registry::with_box`]
/// and friends to build it fluently.
#[derive(Debug, Default)]
pub struct Registry {
    by_tag: HashMap<FourCC, BoxSpec>,
    by_name: HashMap<&'static str, FourCC>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new registry with `spec` added, replacing any entry for the
    /// same tag.
    pub fn with_box(mut self, spec: BoxSpec) -> Self {
        if let Some(old) = self.by_tag.insert(spec.typ, spec) {
            self.by_name.remove(old.node_name);
        }
        self.by_name.insert(spec.node_name, spec.typ);
        self
    }

    pub fn with_leaf<T: BoxCodec + Into<Jp2Box>>(self) -> Self {
        self.with_box(BoxSpec::leaf::<T>())
    }

    pub fn with_container(self, typ: FourCC, node_name: &'static str) -> Self {
        self.with_box(BoxSpec::container(typ, node_name))
    }

    pub fn lookup(&self, typ: FourCC) -> Option<&BoxSpec> {
        self.by_tag.get(&typ)
    }

    /// The construction rule for `typ`; unregistered tags resolve to
    /// [`BoxShape::Opaque`].
    pub fn resolve(&self, typ: FourCC) -> BoxShape {
        self.lookup(typ).map_or(BoxShape::Opaque, |spec| spec.shape)
    }

    pub fn by_node_name(&self, name: &str) -> Option<&BoxSpec> {
        self.by_name.get(name).and_then(|typ| self.by_tag.get(typ))
    }

    pub fn node_name(&self, typ: FourCC) -> Option<&'static str> {
        self.lookup(typ).map(|spec| spec.node_name)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// Decode one box of kind `typ` from its payload.
    pub fn parse_box(&self, typ: FourCC, payload: &[u8], options: &ParseOptions) -> Result<Jp2Box> {
        self.parse_at_depth(typ, payload, options, 0)
    }

    pub(crate) fn parse_at_depth(
        &self,
        typ: FourCC,
        payload: &[u8],
        options: &ParseOptions,
        depth: usize,
    ) -> Result<Jp2Box> {
        match self.resolve(typ) {
            BoxShape::Leaf { parse, lenient, .. } => match parse(payload) {
                Err(err) if lenient => {
                    debug!("keeping `{typ}` payload opaque: {err}");
                    Ok(OpaqueBox::new(typ, payload.to_vec()).into())
                }
                res => res,
            },
            BoxShape::Container => {
                if depth >= options.max_depth {
                    return Err(BoxError::DepthExceeded(options.max_depth));
                }
                let children = parse_children(payload, self, options, depth + 1)?;
                Ok(ContainerBox::new(typ, children).into())
            }
            BoxShape::Opaque => {
                if options.strict {
                    return Err(BoxError::UnknownBoxType(typ));
                }
                trace!("unregistered `{typ}`, keeping {} bytes", payload.len());
                Ok(OpaqueBox::new(typ, payload.to_vec()).into())
            }
        }
    }

    /// Best-effort variant of `parse_at_depth`: a container that fails
    /// part-way is still returned with the children read before the error.
    pub(crate) fn parse_partial_at_depth(
        &self,
        typ: FourCC,
        payload: &[u8],
        options: &ParseOptions,
        depth: usize,
    ) -> (Option<Jp2Box>, Option<BoxError>) {
        if matches!(self.resolve(typ), BoxShape::Container) && depth < options.max_depth {
            let PartialParse { boxes, error } =
                parse_children_partial(payload, self, options, depth + 1);
            return (Some(ContainerBox::new(typ, boxes).into()), error);
        }
        match self.parse_at_depth(typ, payload, options, depth) {
            Ok(b) => (Some(b), None),
            Err(e) => (None, Some(e)),
        }
    }
}

/// Every leaf kind plus the JP2 / JPX superboxes.
pub fn standard_registry() -> Registry {
    register_leaf_kinds(Registry::new())
        .with_container(tags::JP2_HEADER, "JP2KHeaderBox")
        .with_container(tags::RESOLUTION, "JP2KResolutionBox")
        .with_container(tags::UUID_INFO, "JP2KUUIDInfoBox")
        .with_container(tags::ASSOCIATION, "JP2KAsocBox")
        .with_container(tags::CODESTREAM_HEADER, "JP2KCodestreamHeaderBox")
        .with_container(tags::COMPOSITING_LAYER_HEADER, "JP2KCompositingLayerHeaderBox")
        .with_container(tags::COLOUR_GROUP, "JP2KColourGroupBox")
}

static DEFAULT_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Process-wide [`standard_registry`], built on first use.
pub fn default_registry() -> &'static Registry {
    DEFAULT_REGISTRY.get_or_init(standard_registry)
}
