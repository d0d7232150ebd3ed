pub mod binary_xml;
pub mod manifest;
pub mod value;
