use crate::android::binary_xml::BinaryXmlError;
use std::fmt;

/// Raised when a manifest element does not carry every compulsory attribute
/// of the schema it is decoded against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaValidationError {
    pub tag: &'static str,
    pub missing: Vec<&'static str>,
}

impl SchemaValidationError {
    pub(crate) fn new(tag: &'static str, missing: Vec<&'static str>) -> Self {
        SchemaValidationError { tag, missing }
    }
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Not all compulsory attributes are specified in <{}>",
            self.tag
        )?;
        if !self.missing.is_empty() {
            write!(f, " (missing {})", self.missing.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaValidationError {}

/// Result alias for parcel reads.
pub type ParcelResult<T> = Result<T, MalformedRecordError>;

/// Errors surfaced while reading a record back out of a parcel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedRecordError {
    /// The stream ended before the named primitive could be read.
    Truncated { position: usize, wanted: &'static str },
    /// The leading discriminator names no known record kind.
    UnknownDiscriminator(i32),
    /// A string header carried a negative length other than the null marker.
    InvalidStringLength { position: usize, length: i32 },
    /// A string payload was not valid UTF-16.
    InvalidString { position: usize },
}

impl fmt::Display for MalformedRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRecordError::Truncated { position, wanted } => {
                write!(f, "Unexpected end of parcel reading {wanted} at offset {position}")
            }
            MalformedRecordError::UnknownDiscriminator(value) => {
                write!(f, "Unknown record discriminator {value}")
            }
            MalformedRecordError::InvalidStringLength { position, length } => {
                write!(f, "Invalid string length {length} at offset {position}")
            }
            MalformedRecordError::InvalidString { position } => {
                write!(f, "String at offset {position} is not valid UTF-16")
            }
        }
    }
}

impl std::error::Error for MalformedRecordError {}

/// Failure to pull theme records out of a whole manifest.
#[derive(Debug)]
pub enum ThemeParseError {
    Manifest(BinaryXmlError),
    Schema(SchemaValidationError),
}

impl fmt::Display for ThemeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeParseError::Manifest(err) => write!(f, "{err}"),
            ThemeParseError::Schema(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ThemeParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ThemeParseError::Manifest(err) => Some(err),
            ThemeParseError::Schema(err) => Some(err),
        }
    }
}

impl From<BinaryXmlError> for ThemeParseError {
    fn from(value: BinaryXmlError) -> Self {
        ThemeParseError::Manifest(value)
    }
}

impl From<SchemaValidationError> for ThemeParseError {
    fn from(value: SchemaValidationError) -> Self {
        ThemeParseError::Schema(value)
    }
}
