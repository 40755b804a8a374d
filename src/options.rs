/// Container nesting accepted by default before parsing gives up.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Knobs for the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum number of nested container levels.
    pub max_depth: usize,
    /// Reject unregistered tags with `UnknownBoxType` instead of keeping
    /// them as opaque boxes.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Knobs for the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Emit the 16-byte header when a box does not fit a 32-bit length.
    /// When false such boxes fail with `EncodingOverflow`.
    pub allow_extended_length: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            allow_extended_length: true,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extended_length(mut self, allow: bool) -> Self {
        self.allow_extended_length = allow;
        self
    }
}
