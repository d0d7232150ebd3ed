use crate::android::binary_xml::{BinaryXmlError, BinaryXmlResult};
use crate::android::value::parse_manifest_value;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::collections::BTreeMap;

pub const ANDROID_NAMESPACE_URI: &str = "http://schemas.android.com/apk/res/android";

/// Typed attribute values inside the manifest DOM representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Hex(u32),
    Reference(u32),
}

impl ManifestValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ManifestValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_reference_id(&self) -> Option<u32> {
        match self {
            ManifestValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// The text a manifest reader reports for this value when no raw string
    /// was kept. References render as `@<decimal id>`.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            ManifestValue::String(text) => Cow::Borrowed(text),
            ManifestValue::Boolean(true) => Cow::Borrowed("true"),
            ManifestValue::Boolean(false) => Cow::Borrowed("false"),
            ManifestValue::Integer(num) => Cow::Owned(num.to_string()),
            ManifestValue::Hex(value) => Cow::Owned(format!("0x{value:x}")),
            ManifestValue::Reference(id) => Cow::Owned(format!("@{id}")),
        }
    }
}

impl From<&str> for ManifestValue {
    fn from(value: &str) -> Self {
        ManifestValue::String(value.to_owned())
    }
}

impl From<String> for ManifestValue {
    fn from(value: String) -> Self {
        ManifestValue::String(value)
    }
}

/// A single attribute attached to a manifest element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestAttribute {
    pub namespace_prefix: Option<String>,
    pub namespace_uri: Option<String>,
    pub name: String,
    /// The literal text of the value, when the source kept one.
    pub raw_value: Option<String>,
    pub value: ManifestValue,
}

impl ManifestAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<ManifestValue>) -> Self {
        ManifestAttribute {
            namespace_prefix: None,
            namespace_uri: None,
            name: name.into(),
            raw_value: None,
            value: value.into(),
        }
    }

    /// An attribute in namespace `uri` whose value is typed the way a text
    /// manifest would type it.
    pub fn parsed(uri: impl Into<String>, name: impl Into<String>, text: &str) -> Self {
        ManifestAttribute {
            namespace_prefix: None,
            namespace_uri: Some(uri.into()),
            name: name.into(),
            raw_value: Some(text.to_string()),
            value: parse_manifest_value(text),
        }
    }

    pub fn reference(uri: impl Into<String>, name: impl Into<String>, id: u32) -> Self {
        ManifestAttribute {
            namespace_prefix: None,
            namespace_uri: Some(uri.into()),
            name: name.into(),
            raw_value: None,
            value: ManifestValue::Reference(id),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        match &self.raw_value {
            Some(raw) => Cow::Borrowed(raw),
            None => self.value.to_text(),
        }
    }

    pub fn is_in_namespace(&self, uri: &str) -> bool {
        self.namespace_uri
            .as_deref()
            .is_some_and(|ns| ns.eq_ignore_ascii_case(uri))
    }
}

/// DOM-style element node shared by the text and binary manifest readers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestElement {
    pub namespace_prefix: Option<String>,
    pub namespace_uri: Option<String>,
    pub tag: String,
    pub attributes: Vec<ManifestAttribute>,
    pub children: Vec<ManifestElement>,
}

impl ManifestElement {
    pub fn new(tag: impl Into<String>) -> Self {
        ManifestElement {
            namespace_prefix: None,
            namespace_uri: None,
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: ManifestAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, child: ManifestElement) -> Self {
        self.children.push(child);
        self
    }

    /// Looks up an attribute by namespace URI and local name.
    pub fn attribute(&self, uri: Option<&str>, name: &str) -> Option<&ManifestAttribute> {
        self.attributes.iter().find(|attr| {
            attr.name == name
                && match uri {
                    Some(uri) => attr.is_in_namespace(uri),
                    None => attr.namespace_uri.is_none(),
                }
        })
    }

    pub fn has_attribute_in_namespace(&self, uri: &str) -> bool {
        self.attributes.iter().any(|attr| attr.is_in_namespace(uri))
    }

    pub fn find_child(&self, tag: &str) -> Option<&ManifestElement> {
        self.children.iter().find(|child| child.tag == tag)
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ManifestElement> {
        self.children.iter().filter(move |child| child.tag == tag)
    }
}

/// High-level representation of `AndroidManifest.xml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AndroidManifest {
    root: ManifestElement,
}

impl AndroidManifest {
    pub fn from_root(root: ManifestElement) -> Self {
        AndroidManifest { root }
    }

    pub fn root(&self) -> &ManifestElement {
        &self.root
    }

    pub fn package_name(&self) -> Option<&str> {
        self.root
            .attribute(None, "package")
            .and_then(|attr| attr.value.as_str())
    }

    pub fn application(&self) -> Option<&ManifestElement> {
        self.root.find_child("application")
    }

    /// Parses a textual manifest, resolving attribute prefixes to namespace URIs.
    pub fn from_string(xml: &str) -> BinaryXmlResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut stack: Vec<ManifestElement> = Vec::new();
        let mut root: Option<ManifestElement> = None;
        let mut namespace_stack: Vec<BTreeMap<String, String>> = vec![BTreeMap::new()];

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = open_element(&start, &mut namespace_stack)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = open_element(&start, &mut namespace_stack)?;
                    close_scope(&mut namespace_stack)?;
                    attach_element(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        BinaryXmlError::MalformedDocument(
                            "Unbalanced end tag in manifest".to_string(),
                        )
                    })?;
                    close_scope(&mut namespace_stack)?;
                    attach_element(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(BinaryXmlError::MalformedDocument(
                "Unclosed XML elements in manifest".to_string(),
            ));
        }

        let root = root.ok_or_else(|| {
            BinaryXmlError::MalformedDocument("Manifest does not have a root element".to_string())
        })?;
        Ok(AndroidManifest { root })
    }
}

fn open_element(
    start: &BytesStart<'_>,
    namespace_stack: &mut Vec<BTreeMap<String, String>>,
) -> BinaryXmlResult<ManifestElement> {
    let mut declarations = BTreeMap::new();
    let mut pending = Vec::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| BinaryXmlError::MalformedDocument(err.to_string()))?
            .to_string();
        let text = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            declarations.insert(String::new(), text);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.insert(prefix.to_string(), text);
        } else {
            pending.push((key, text));
        }
    }
    namespace_stack.push(declarations);

    let raw_name = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| BinaryXmlError::MalformedDocument(err.to_string()))?
        .to_string();
    let (prefix, local) = split_qname(&raw_name);
    let mut element = ManifestElement::new(local);
    element.namespace_uri = lookup_namespace_uri(namespace_stack, prefix.as_deref());
    element.namespace_prefix = prefix;

    for (key, text) in pending {
        let (prefix, local) = split_qname(&key);
        // Unprefixed attributes have no namespace, even under a default xmlns.
        let namespace_uri = prefix
            .as_deref()
            .and_then(|p| lookup_namespace_uri(namespace_stack, Some(p)));
        element.attributes.push(ManifestAttribute {
            namespace_prefix: prefix,
            namespace_uri,
            name: local,
            value: parse_manifest_value(&text),
            raw_value: Some(text),
        });
    }
    Ok(element)
}

fn close_scope(namespace_stack: &mut Vec<BTreeMap<String, String>>) -> BinaryXmlResult<()> {
    if namespace_stack.len() <= 1 {
        return Err(BinaryXmlError::MalformedDocument(
            "Namespace stack underflow".to_string(),
        ));
    }
    namespace_stack.pop();
    Ok(())
}

pub(crate) fn attach_element(
    stack: &mut Vec<ManifestElement>,
    root: &mut Option<ManifestElement>,
    element: ManifestElement,
) -> BinaryXmlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(BinaryXmlError::MalformedDocument(
            "Multiple root elements in manifest".to_string(),
        ));
    }
    Ok(())
}

fn lookup_namespace_uri(stack: &[BTreeMap<String, String>], prefix: Option<&str>) -> Option<String> {
    let key = prefix.unwrap_or("");
    stack
        .iter()
        .rev()
        .find_map(|frame| frame.get(key))
        .cloned()
}

fn split_qname(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEME_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
          xmlns:theme="http://schemas.example.com/theme"
          package="com.example.theme">
    <theme theme:name="Night" theme:thumbnail="@0x7f020001" plain="x" />
    <application android:label="@string/app_name" />
</manifest>"#;

    #[test]
    fn text_manifest_resolves_prefixes() {
        let manifest = AndroidManifest::from_string(THEME_MANIFEST).expect("parse manifest");
        assert_eq!(manifest.package_name(), Some("com.example.theme"));

        let theme = manifest.root().find_child("theme").expect("theme element");
        let name = theme
            .attribute(Some("http://schemas.example.com/theme"), "name")
            .expect("name attribute");
        assert_eq!(name.namespace_prefix.as_deref(), Some("theme"));
        assert_eq!(name.text(), "Night");

        let thumb = theme
            .attribute(Some("HTTP://SCHEMAS.EXAMPLE.COM/THEME"), "thumbnail")
            .expect("namespace match ignores case");
        assert_eq!(thumb.value, ManifestValue::Reference(0x7f02_0001));
        assert_eq!(thumb.text(), "@0x7f020001");

        let plain = theme.attribute(None, "plain").expect("plain attribute");
        assert!(plain.namespace_uri.is_none());
        assert!(manifest.application().is_some());
    }

    #[test]
    fn reference_text_is_decimal_without_raw_value() {
        let attr = ManifestAttribute::reference("ns", "thumbnail", 0x7f02_0001);
        assert_eq!(attr.text(), "@2130837505");
    }

    #[test]
    fn unbalanced_document_is_rejected() {
        let err = AndroidManifest::from_string("<manifest><theme></manifest>");
        assert!(err.is_err());
        let err = AndroidManifest::from_string("<a/><b/>").expect_err("two roots");
        assert!(matches!(err, BinaryXmlError::MalformedDocument(_)));
    }
}
