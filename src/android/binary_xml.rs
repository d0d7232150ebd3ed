use crate::android::manifest::{attach_element, AndroidManifest, ManifestAttribute, ManifestElement, ManifestValue};
use quick_xml::events::attributes::AttrError;
use quick_xml::Error as QuickXmlError;

const RES_XML_TYPE: u16 = 0x0003;
const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_START_NAMESPACE_TYPE: u16 = 0x0100;
const RES_XML_END_NAMESPACE_TYPE: u16 = 0x0101;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;

/// Every chunk starts with type, header size and total size.
const CHUNK_HEADER_SIZE: u16 = 8;

const NO_ENTRY_INDEX: u32 = 0xFFFF_FFFF;
const STRING_FLAG_UTF8: u32 = 0x0000_0100;

const TYPE_NULL: u8 = 0x00;
const TYPE_REFERENCE: u8 = 0x01;
const TYPE_STRING: u8 = 0x03;
const TYPE_FLOAT: u8 = 0x04;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_HEX: u8 = 0x11;
const TYPE_INT_BOOLEAN: u8 = 0x12;

/// Result alias for manifest reading.
pub type BinaryXmlResult<T> = Result<T, BinaryXmlError>;

/// Errors surfaced by the manifest readers.
#[derive(Debug)]
pub enum BinaryXmlError {
    /// The document is missing the expected structure.
    MalformedDocument(String),
    /// Text XML parsing failure.
    Xml(String),
}

impl std::fmt::Display for BinaryXmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryXmlError::MalformedDocument(msg) => write!(f, "Malformed manifest: {msg}"),
            BinaryXmlError::Xml(msg) => write!(f, "XML error: {msg}"),
        }
    }
}

impl std::error::Error for BinaryXmlError {}

impl From<QuickXmlError> for BinaryXmlError {
    fn from(value: QuickXmlError) -> Self {
        BinaryXmlError::Xml(value.to_string())
    }
}

impl From<AttrError> for BinaryXmlError {
    fn from(value: AttrError) -> Self {
        BinaryXmlError::Xml(value.to_string())
    }
}

fn malformed(msg: &str) -> BinaryXmlError {
    BinaryXmlError::MalformedDocument(msg.to_string())
}

struct ChunkHeader {
    chunk_type: u16,
    header_size: u16,
    chunk_size: u32,
    start: usize,
}

impl ChunkHeader {
    fn end(&self) -> usize {
        self.start + self.chunk_size as usize
    }
}

struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BinaryReader { data, pos: 0 }
    }

    fn read_u8(&mut self) -> BinaryXmlResult<u8> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or_else(|| malformed("Unexpected end of binary XML"))?;
        self.pos += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> BinaryXmlResult<u16> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 2)
            .ok_or_else(|| malformed("Unexpected end of binary XML"))?;
        self.pos += 2;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> BinaryXmlResult<u32> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| malformed("Unexpected end of binary XML"))?;
        self.pos += 4;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn seek(&mut self, offset: usize) -> BinaryXmlResult<()> {
        if offset > self.data.len() {
            return Err(malformed("Attempted to seek past end of document"));
        }
        self.pos = offset;
        Ok(())
    }

    fn chunk_header(&mut self) -> BinaryXmlResult<ChunkHeader> {
        let start = self.pos;
        let chunk_type = self.read_u16()?;
        let header_size = self.read_u16()?;
        let chunk_size = self.read_u32()?;
        if header_size < CHUNK_HEADER_SIZE || chunk_size < header_size as u32 {
            return Err(malformed("Invalid chunk sizing in binary XML"));
        }
        let end = start
            .checked_add(chunk_size as usize)
            .ok_or_else(|| malformed("Chunk size overflow"))?;
        if end > self.data.len() {
            return Err(malformed("Chunk extends past end of document"));
        }
        Ok(ChunkHeader {
            chunk_type,
            header_size,
            chunk_size,
            start,
        })
    }
}

struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    fn parse(reader: &mut BinaryReader<'_>, header: &ChunkHeader) -> BinaryXmlResult<Self> {
        let string_count = reader.read_u32()? as usize;
        reader.read_u32()?; // styleCount
        let flags = reader.read_u32()?;
        let strings_start = reader.read_u32()? as usize;
        reader.read_u32()?; // stylesStart

        let mut offsets = Vec::with_capacity(string_count.min(reader.data.len() / 4));
        for _ in 0..string_count {
            offsets.push(reader.read_u32()? as usize);
        }

        let base = header.start + strings_start;
        let limit = header.end();
        let utf8 = (flags & STRING_FLAG_UTF8) != 0;
        let strings = offsets
            .into_iter()
            .map(|offset| {
                if utf8 {
                    read_utf8_string(reader.data, base + offset, limit)
                } else {
                    read_utf16_string(reader.data, base + offset, limit)
                }
            })
            .collect::<BinaryXmlResult<Vec<_>>>()?;
        Ok(StringPool { strings })
    }

    fn get(&self, idx: u32) -> Option<&str> {
        if idx == NO_ENTRY_INDEX {
            return None;
        }
        self.strings.get(idx as usize).map(|s| s.as_str())
    }
}

fn read_utf8_length(data: &[u8], offset: usize, limit: usize) -> BinaryXmlResult<(usize, usize)> {
    let first = *data
        .get(offset)
        .filter(|_| offset < limit)
        .ok_or_else(|| malformed("Invalid UTF-8 length offset"))?;
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    let second = *data
        .get(offset + 1)
        .filter(|_| offset + 1 < limit)
        .ok_or_else(|| malformed("Truncated UTF-8 length"))?;
    Ok(((((first & 0x7F) as usize) << 8) | second as usize, 2))
}

fn read_utf8_string(data: &[u8], offset: usize, limit: usize) -> BinaryXmlResult<String> {
    // The UTF-16 length comes first and is not needed to decode.
    let (_, skip) = read_utf8_length(data, offset, limit)?;
    let (byte_len, len_size) = read_utf8_length(data, offset + skip, limit)?;
    let start = offset + skip + len_size;
    if start + byte_len > limit {
        return Err(malformed("UTF-8 string exceeds chunk bounds"));
    }
    std::str::from_utf8(&data[start..start + byte_len])
        .map(|text| text.to_string())
        .map_err(|err| BinaryXmlError::MalformedDocument(err.to_string()))
}

fn read_utf16_string(data: &[u8], offset: usize, limit: usize) -> BinaryXmlResult<String> {
    if offset + 2 > limit {
        return Err(malformed("Invalid UTF-16 length offset"));
    }
    let first = u16::from_le_bytes([data[offset], data[offset + 1]]);
    let (count, header) = if first & 0x8000 == 0 {
        (first as usize, 2)
    } else {
        if offset + 4 > limit {
            return Err(malformed("Truncated UTF-16 length"));
        }
        let second = u16::from_le_bytes([data[offset + 2], data[offset + 3]]);
        ((((first & 0x7FFF) as usize) << 16) | second as usize, 4)
    };
    let start = offset + header;
    let end = count
        .checked_mul(2)
        .and_then(|len| start.checked_add(len))
        .filter(|end| *end <= limit)
        .ok_or_else(|| malformed("UTF-16 string exceeds chunk bounds"))?;
    let units: Vec<u16> = data[start..end]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|err| BinaryXmlError::MalformedDocument(err.to_string()))
}

fn decode_value(pool: &StringPool, data_type: u8, data: u32) -> BinaryXmlResult<ManifestValue> {
    match data_type {
        TYPE_NULL => Ok(ManifestValue::String(String::new())),
        TYPE_STRING => pool
            .get(data)
            .map(|s| ManifestValue::String(s.to_string()))
            .ok_or_else(|| malformed("String value references missing pool entry")),
        TYPE_REFERENCE => Ok(ManifestValue::Reference(data)),
        TYPE_INT_BOOLEAN => Ok(ManifestValue::Boolean(data != 0)),
        TYPE_INT_DEC => Ok(ManifestValue::Integer(i64::from(data as i32))),
        TYPE_INT_HEX => Ok(ManifestValue::Hex(data)),
        TYPE_FLOAT => Ok(ManifestValue::String(f32::from_bits(data).to_string())),
        _ => Ok(ManifestValue::Hex(data)),
    }
}

struct NamespaceFrame {
    prefix: Option<String>,
    uri: Option<String>,
}

fn resolve_prefix(namespaces: &[NamespaceFrame], uri: Option<&str>) -> Option<String> {
    let target = uri?;
    namespaces
        .iter()
        .rev()
        .find(|frame| frame.uri.as_deref() == Some(target))
        .and_then(|frame| frame.prefix.clone())
}

fn read_attribute(
    reader: &mut BinaryReader<'_>,
    pool: &StringPool,
    namespaces: &[NamespaceFrame],
) -> BinaryXmlResult<ManifestAttribute> {
    let ns_idx = reader.read_u32()?;
    let name_idx = reader.read_u32()?;
    let raw_idx = reader.read_u32()?;
    let value_size = reader.read_u16()?;
    reader.read_u8()?; // res0
    let data_type = reader.read_u8()?;
    let data = reader.read_u32()?;
    if value_size != 8 {
        return Err(malformed("Attribute value size must be 8"));
    }
    let name = pool
        .get(name_idx)
        .ok_or_else(|| malformed("Attribute name references invalid string index"))?
        .to_string();
    let namespace_uri = pool.get(ns_idx).map(|s| s.to_string());
    Ok(ManifestAttribute {
        namespace_prefix: resolve_prefix(namespaces, namespace_uri.as_deref()),
        namespace_uri,
        name,
        raw_value: pool.get(raw_idx).map(|s| s.to_string()),
        value: decode_value(pool, data_type, data)?,
    })
}

impl AndroidManifest {
    /// Reads a compiled (binary XML) manifest.
    pub fn from_bytes(bytes: &[u8]) -> BinaryXmlResult<Self> {
        let mut reader = BinaryReader::new(bytes);
        let xml_header = reader.chunk_header()?;
        if xml_header.chunk_type != RES_XML_TYPE {
            return Err(malformed("Binary XML does not start with RES_XML_TYPE header"));
        }
        let xml_end = xml_header.end();
        reader.seek(xml_header.start + xml_header.header_size as usize)?;

        let mut pool: Option<StringPool> = None;
        let mut namespaces: Vec<NamespaceFrame> = Vec::new();
        let mut stack: Vec<ManifestElement> = Vec::new();
        let mut root: Option<ManifestElement> = None;

        while reader.pos < xml_end {
            let chunk = reader.chunk_header()?;
            reader.seek(chunk.start + chunk.header_size as usize)?;
            match chunk.chunk_type {
                RES_STRING_POOL_TYPE => {
                    reader.seek(chunk.start + 8)?;
                    pool = Some(StringPool::parse(&mut reader, &chunk)?);
                }
                RES_XML_START_NAMESPACE_TYPE | RES_XML_END_NAMESPACE_TYPE => {
                    let strings = pool
                        .as_ref()
                        .ok_or_else(|| malformed("Namespace chunk encountered before string pool"))?;
                    let prefix_idx = reader.read_u32()?;
                    let uri_idx = reader.read_u32()?;
                    if chunk.chunk_type == RES_XML_START_NAMESPACE_TYPE {
                        namespaces.push(NamespaceFrame {
                            prefix: strings.get(prefix_idx).map(|s| s.to_string()),
                            uri: strings.get(uri_idx).map(|s| s.to_string()),
                        });
                    } else {
                        namespaces.pop();
                    }
                }
                RES_XML_START_ELEMENT_TYPE => {
                    let strings = pool
                        .as_ref()
                        .ok_or_else(|| malformed("Start element encountered before string pool"))?;
                    let ns_idx = reader.read_u32()?;
                    let name_idx = reader.read_u32()?;
                    let attribute_start = reader.read_u16()? as usize;
                    let attribute_size = reader.read_u16()? as usize;
                    let attribute_count = reader.read_u16()? as usize;

                    let tag = strings
                        .get(name_idx)
                        .ok_or_else(|| malformed("Element references invalid string index"))?;
                    let mut element = ManifestElement::new(tag);
                    element.namespace_uri = strings.get(ns_idx).map(|s| s.to_string());
                    element.namespace_prefix =
                        resolve_prefix(&namespaces, element.namespace_uri.as_deref());

                    // attributeStart is relative to the element extension, which
                    // follows the 16-byte node header.
                    let first = chunk.start + chunk.header_size as usize + attribute_start;
                    for i in 0..attribute_count {
                        reader.seek(first + i * attribute_size)?;
                        element
                            .attributes
                            .push(read_attribute(&mut reader, strings, &namespaces)?);
                    }
                    stack.push(element);
                }
                RES_XML_END_ELEMENT_TYPE => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("End element without matching start"))?;
                    attach_element(&mut stack, &mut root, element)?;
                }
                _ => {
                    // Resource maps, CDATA and unknown chunks carry nothing we keep.
                }
            }
            reader.seek(chunk.end())?;
        }

        if !stack.is_empty() {
            return Err(malformed("Unclosed XML elements at end of document"));
        }
        let root = root.ok_or_else(|| malformed("AndroidManifest is empty"))?;
        Ok(AndroidManifest::from_root(root))
    }
}
