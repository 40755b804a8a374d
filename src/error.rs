use crate::boxes::FourCC;

#[derive(thiserror::Error, Debug)]
pub enum BoxError {
    #[error("malformed `{node}` node: {reason}")]
    MalformedTree { node: String, reason: String },
    #[error("truncated {}: needs {needed} bytes, {available} available", describe(.typ))]
    TruncatedBox {
        /// `None` when not even a type tag could be read.
        typ: Option<FourCC>,
        needed: u64,
        available: u64,
    },
    #[error("unknown box type `{0}`")]
    UnknownBoxType(FourCC),
    #[error("`{typ}` payload of {len} bytes needs an extended length")]
    EncodingOverflow { typ: FourCC, len: u64 },
    #[error("invalid length {length} for `{typ}` box")]
    InvalidLength { typ: FourCC, length: u64 },
    #[error("invalid `{typ}` payload: {reason}")]
    InvalidPayload { typ: FourCC, reason: String },
    #[error("boxes nested deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BoxError>;

fn describe(typ: &Option<FourCC>) -> String {
    match typ {
        Some(t) => format!("`{t}` box"),
        None => "box header".to_string(),
    }
}

impl BoxError {
    pub(crate) fn truncated(typ: FourCC, needed: usize, available: usize) -> Self {
        BoxError::TruncatedBox {
            typ: Some(typ),
            needed: needed as u64,
            available: available as u64,
        }
    }

    pub(crate) fn invalid(typ: FourCC, reason: impl Into<String>) -> Self {
        BoxError::InvalidPayload {
            typ,
            reason: reason.into(),
        }
    }
}
