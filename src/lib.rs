//! # Themeinfo
//!
//! A library for decoding Android theme and sound pack records from manifest
//! attributes and moving them between processes as parcels.
//!
//! # Examples
//!
//! ```
//! use themeinfo::theme::decoder::NoResources;
//! use themeinfo::theme::codec::RecordLayout;
//! use themeinfo::{PackageThemes, SchemaSet, ThemeInfo};
//!
//! let xml = r#"<manifest xmlns:t="http://schemas.cyanogenmod.com/apk/res/theme" package="com.example">
//!     <theme t:name="Night" t:thumbnail="thumb.png" t:preview="preview.png"
//!            t:author="A" t:themeId="night" t:styleName="Dark" />
//! </manifest>"#;
//! let found = PackageThemes::from_xml(xml, SchemaSet::shared(), &NoResources).unwrap();
//! let theme = &found.themes[0];
//! assert_eq!(theme.name.as_deref(), Some("Night"));
//!
//! let bytes = theme.to_bytes();
//! assert_eq!(&ThemeInfo::from_bytes(&bytes, RecordLayout::Base).unwrap(), theme);
//! ```

pub mod android;
pub mod error;
pub mod package;
pub mod parcel;
pub mod theme;

pub use crate::error::{MalformedRecordError, SchemaValidationError, ThemeParseError};
pub use crate::package::PackageThemes;
pub use crate::parcel::Parcel;
pub use crate::theme::schema::{SchemaSet, SchemaVariant};
pub use crate::theme::{InfoKind, LegacyResources, ThemeInfo};
