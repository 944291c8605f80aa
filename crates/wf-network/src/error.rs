//! Network-specific error types.

use wf_core::{LinkId, NodeId, WfError};

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Network construction, lookup and write-back errors.
///
/// Malformed lines of a network description are not errors: the parser skips
/// them and records a [`crate::ParseDefect`] instead.
#[derive(Debug)]
pub enum NetworkError {
    /// Two entities of the same family share an identifier.
    DuplicateName { what: &'static str, name: String },

    /// A link refers to a node that doesn't exist.
    InvalidEndpoint { link: LinkId, node: NodeId },

    /// A link starts and ends at the same node.
    SelfLoop { link: LinkId },

    /// A pump refers to a head curve that doesn't exist.
    UnknownCurve { link: String, curve: String },

    /// Lookup by name failed.
    NotFound { what: &'static str, name: String },

    /// A node-kind specific operation was applied to the wrong kind of node.
    WrongKind { name: String, expected: &'static str },

    /// The tuned network does not share the structure of the parsed one.
    StructureMismatch { what: &'static str },

    /// A value failed a numeric check.
    Value(WfError),

    /// Underlying file I/O failed.
    Io(std::io::Error),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::DuplicateName { what, name } => {
                write!(f, "Duplicate {} identifier '{}'", what, name)
            }
            NetworkError::InvalidEndpoint { link, node } => {
                write!(f, "Link {} refers to non-existent node {}", link, node)
            }
            NetworkError::SelfLoop { link } => {
                write!(f, "Link {} connects a node to itself", link)
            }
            NetworkError::UnknownCurve { link, curve } => {
                write!(f, "Pump '{}' refers to unknown curve '{}'", link, curve)
            }
            NetworkError::NotFound { what, name } => {
                write!(f, "{} '{}' not found", what, name)
            }
            NetworkError::WrongKind { name, expected } => {
                write!(f, "Node '{}' is not a {}", name, expected)
            }
            NetworkError::StructureMismatch { what } => {
                write!(f, "Network structure mismatch: {}", what)
            }
            NetworkError::Value(err) => write!(f, "{}", err),
            NetworkError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Io(err) => Some(err),
            NetworkError::Value(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        NetworkError::Io(err)
    }
}

impl From<WfError> for NetworkError {
    fn from(err: WfError) -> Self {
        NetworkError::Value(err)
    }
}

impl From<NetworkError> for WfError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Value(inner) => inner,
            other => WfError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
