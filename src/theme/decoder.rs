use crate::android::manifest::{ManifestAttribute, ManifestElement};
use crate::error::SchemaValidationError;
use crate::theme::schema::AttributeTable;
use crate::theme::{FieldValue, ThemeInfo, ValueKind};
use log::{debug, trace};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// An ordered, indexable list of namespaced attributes, as a manifest tag
/// exposes them.
pub trait AttributeSource {
    fn attribute_count(&self) -> usize;
    fn attribute_namespace(&self, index: usize) -> Option<&str>;
    fn attribute_name(&self, index: usize) -> Option<&str>;
    /// The attribute's literal text.
    fn attribute_value(&self, index: usize) -> Option<Cow<'_, str>>;
    /// The resource id when the attribute is a resource reference.
    fn attribute_resource_value(&self, index: usize) -> Option<u32>;
}

impl AttributeSource for [ManifestAttribute] {
    fn attribute_count(&self) -> usize {
        self.len()
    }

    fn attribute_namespace(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|attr| attr.namespace_uri.as_deref())
    }

    fn attribute_name(&self, index: usize) -> Option<&str> {
        self.get(index).map(|attr| attr.name.as_str())
    }

    fn attribute_value(&self, index: usize) -> Option<Cow<'_, str>> {
        self.get(index).map(|attr| attr.text())
    }

    fn attribute_resource_value(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|attr| attr.value.as_reference_id())
    }
}

impl AttributeSource for ManifestElement {
    fn attribute_count(&self) -> usize {
        self.attributes.attribute_count()
    }

    fn attribute_namespace(&self, index: usize) -> Option<&str> {
        self.attributes.attribute_namespace(index)
    }

    fn attribute_name(&self, index: usize) -> Option<&str> {
        self.attributes.attribute_name(index)
    }

    fn attribute_value(&self, index: usize) -> Option<Cow<'_, str>> {
        self.attributes.attribute_value(index)
    }

    fn attribute_resource_value(&self, index: usize) -> Option<u32> {
        self.attributes.attribute_resource_value(index)
    }
}

/// Turns a string resource id into its display text. Must be cheap and free
/// of side effects; it is called inline during decoding.
pub trait ResourceResolver {
    fn resolve_string(&self, id: u32) -> Option<String>;
}

/// A resolver that knows no resources; references fall back to their text.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResources;

impl ResourceResolver for NoResources {
    fn resolve_string(&self, _id: u32) -> Option<String> {
        None
    }
}

impl ResourceResolver for HashMap<u32, String> {
    fn resolve_string(&self, id: u32) -> Option<String> {
        self.get(&id).cloned()
    }
}

impl ResourceResolver for BTreeMap<u32, String> {
    fn resolve_string(&self, id: u32) -> Option<String> {
        self.get(&id).cloned()
    }
}

fn field_value<S, R>(
    kind: ValueKind,
    default_id: i32,
    source: &S,
    index: usize,
    resolver: &R,
) -> FieldValue
where
    S: AttributeSource + ?Sized,
    R: ResourceResolver + ?Sized,
{
    let reference = source.attribute_resource_value(index).filter(|id| *id != 0);
    let text = || {
        source
            .attribute_value(index)
            .map(Cow::into_owned)
            .unwrap_or_default()
    };
    match kind {
        ValueKind::Text | ValueKind::Path => FieldValue::Text(text()),
        ValueKind::Resolved => FieldValue::Text(
            reference
                .and_then(|id| resolver.resolve_string(id))
                .unwrap_or_else(text),
        ),
        ValueKind::ResourceId => {
            FieldValue::ResourceId(reference.map(|id| id as i32).unwrap_or(default_id))
        }
    }
}

/// Decodes one record from `source` against `table`.
///
/// Attributes outside the table's namespace, unknown names and repeats of an
/// already consumed name are skipped; the first occurrence of a name wins.
/// Fails when any compulsory attribute was never seen.
pub fn decode<S, R>(
    table: &AttributeTable,
    source: &S,
    resolver: &R,
) -> Result<ThemeInfo, SchemaValidationError>
where
    S: AttributeSource + ?Sized,
    R: ResourceResolver + ?Sized,
{
    let mut pending = table.working_set();
    let mut info = if table.is_legacy() {
        ThemeInfo::new_legacy()
    } else {
        ThemeInfo::new(table.kind())
    };

    for i in 0..source.attribute_count() {
        let in_namespace = source
            .attribute_namespace(i)
            .is_some_and(|ns| ns.eq_ignore_ascii_case(table.namespace()));
        if !in_namespace {
            continue;
        }
        let Some(name) = source.attribute_name(i) else {
            continue;
        };
        let Some(index) = pending.remove(name) else {
            trace!("<{}> skipping attribute {}", table.tag(), name);
            continue;
        };
        let Some(field) = table.field(index) else {
            continue;
        };
        let value = field_value(
            field.value_kind(),
            field.default_resource_id(),
            source,
            i,
            resolver,
        );
        info.assign(field, value);
    }

    let missing: Vec<&'static str> = table
        .compulsory_names()
        .filter(|name| pending.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(SchemaValidationError::new(table.tag(), missing));
    }

    debug!(
        "decoded <{}> record {:?} (drm: {})",
        table.tag(),
        info.name,
        info.is_drm_protected()
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::schema::{SchemaSet, SchemaVariant, LEGACY_THEME_NAMESPACE, THEME_NAMESPACE};
    use crate::theme::{InfoKind, UNSET_STYLE_ID};

    fn attr(name: &str, text: &str) -> ManifestAttribute {
        ManifestAttribute::parsed(THEME_NAMESPACE, name, text)
    }

    fn theme_attrs() -> Vec<ManifestAttribute> {
        vec![
            attr("name", "X"),
            attr("thumbnail", "@drawable/t"),
            attr("preview", "@drawable/p"),
            attr("author", "A"),
            attr("themeId", "id1"),
            attr("styleName", "S"),
        ]
    }

    fn theme_table() -> &'static AttributeTable {
        SchemaSet::shared().table(SchemaVariant::Theme)
    }

    #[test]
    fn decodes_compulsory_theme_attributes() {
        let info = decode(theme_table(), theme_attrs().as_slice(), &NoResources).expect("decode");
        assert_eq!(info.kind(), InfoKind::Theme);
        assert_eq!(info.name.as_deref(), Some("X"));
        assert_eq!(info.thumbnail.as_deref(), Some("@drawable/t"));
        assert_eq!(info.preview.as_deref(), Some("@drawable/p"));
        assert_eq!(info.author.as_deref(), Some("A"));
        assert_eq!(info.theme_id.as_deref(), Some("id1"));
        assert_eq!(info.theme_style_name.as_deref(), Some("S"));
        assert_eq!(info.style_resource_id, UNSET_STYLE_ID);
        assert!(!info.is_drm_protected());
        assert!(info.legacy.is_none());
    }

    #[test]
    fn missing_compulsory_attribute_fails() {
        let attrs: Vec<_> = theme_attrs()
            .into_iter()
            .filter(|a| a.name != "styleName")
            .collect();
        let err = decode(theme_table(), attrs.as_slice(), &NoResources).expect_err("must fail");
        assert_eq!(err.tag, "theme");
        assert_eq!(err.missing, vec!["styleName"]);
    }

    #[test]
    fn first_occurrence_wins() {
        let mut attrs = theme_attrs();
        attrs.push(attr("name", "Second"));
        attrs.insert(0, attr("author", "First"));
        let info = decode(theme_table(), attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.name.as_deref(), Some("X"));
        assert_eq!(info.author.as_deref(), Some("First"));
    }

    #[test]
    fn foreign_namespaces_and_unknown_names_are_ignored() {
        let mut attrs = theme_attrs();
        attrs.push(ManifestAttribute::parsed("urn:other", "copyright", "nope"));
        attrs.push(ManifestAttribute::new("copyright", "no namespace"));
        attrs.push(attr("sparkles", "yes"));
        let info = decode(theme_table(), attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.copyright, None);
    }

    #[test]
    fn namespace_match_ignores_case() {
        let attrs: Vec<_> = theme_attrs()
            .into_iter()
            .map(|mut a| {
                a.namespace_uri = Some(THEME_NAMESPACE.to_uppercase());
                a
            })
            .collect();
        assert!(decode(theme_table(), attrs.as_slice(), &NoResources).is_ok());
    }

    #[test]
    fn foreign_namespace_does_not_satisfy_compulsory() {
        let mut attrs = theme_attrs();
        attrs.retain(|a| a.name != "themeId");
        attrs.push(ManifestAttribute::parsed("urn:other", "themeId", "id1"));
        assert!(decode(theme_table(), attrs.as_slice(), &NoResources).is_err());
    }

    #[test]
    fn resolvable_fields_use_resolver() {
        let mut attrs = theme_attrs();
        attrs[0] = ManifestAttribute::reference(THEME_NAMESPACE, "name", 0x7f0a_0001);
        attrs[3] = ManifestAttribute::reference(THEME_NAMESPACE, "author", 0x7f0a_0002);
        attrs.push(attr("copyright", "@0x7f0a0003"));
        attrs.push(attr("soundpackName", "@0x7f0a0004"));
        let strings: HashMap<u32, String> = [
            (0x7f0a_0001, "Resolved Name".to_string()),
            (0x7f0a_0003, "(c) Resolved".to_string()),
            (0x7f0a_0004, "never used".to_string()),
        ]
        .into_iter()
        .collect();
        let info = decode(theme_table(), attrs.as_slice(), &strings).expect("decode");
        assert_eq!(info.name.as_deref(), Some("Resolved Name"));
        // unknown to the resolver: the reference text is kept
        assert_eq!(info.author, Some(format!("@{}", 0x7f0a_0002u32)));
        assert_eq!(info.copyright.as_deref(), Some("(c) Resolved"));
        // plain text fields are never resolved
        assert_eq!(info.sound_pack_name.as_deref(), Some("@0x7f0a0004"));
    }

    #[test]
    fn style_name_and_other_schemas_resolve_references() {
        let strings: BTreeMap<u32, String> = [
            (0x7f0c_0001, "Theme.Night".to_string()),
            (0x7f0a_0010, "Chimes".to_string()),
            (0x7f0a_0011, "(c) Chimes".to_string()),
            (0x7f0a_0020, "Old Night".to_string()),
        ]
        .into_iter()
        .collect();

        let mut attrs = theme_attrs();
        attrs.retain(|a| a.name != "styleName");
        attrs.push(attr("styleName", "@0x7f0c0001"));
        let info = decode(theme_table(), attrs.as_slice(), &strings).expect("decode");
        assert_eq!(info.theme_style_name.as_deref(), Some("Theme.Night"));

        let sounds = vec![
            attr("name", "@0x7f0a0010"),
            attr("author", "B"),
            attr("copyright", "@0x7f0a0011"),
        ];
        let table = SchemaSet::shared().table(SchemaVariant::SoundPack);
        let info = decode(table, sounds.as_slice(), &strings).expect("decode");
        assert_eq!(info.name.as_deref(), Some("Chimes"));
        assert_eq!(info.copyright.as_deref(), Some("(c) Chimes"));

        let legacy = |name: &str, text: &str| ManifestAttribute::parsed(LEGACY_THEME_NAMESPACE, name, text);
        let old = vec![
            legacy("name", "@0x7f0a0020"),
            legacy("thumbnail", "@0x7f020001"),
            legacy("author", "C"),
            legacy("themeId", "old1"),
            legacy("styleId", "@0x7f0b0002"),
        ];
        let table = SchemaSet::shared().table(SchemaVariant::LegacyTheme);
        let info = decode(table, old.as_slice(), &strings).expect("decode");
        assert_eq!(info.name.as_deref(), Some("Old Night"));
        // resource-id fields are captured, never resolved
        assert_eq!(info.style_resource_id, 0x7f0b_0002);
    }

    #[test]
    fn style_id_captures_raw_reference() {
        let mut attrs = theme_attrs();
        attrs.push(attr("styleId", "@0x7f0b0001"));
        let info = decode(theme_table(), attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.style_resource_id, 0x7f0b_0001);

        let mut attrs = theme_attrs();
        attrs.push(attr("styleId", "Theme.Dark"));
        let info = decode(theme_table(), attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.style_resource_id, UNSET_STYLE_ID);
    }

    #[test]
    fn locked_path_sets_drm_flag() {
        let mut attrs = theme_attrs();
        attrs.push(attr("ringtoneFileName", "media/audio/locked/ring.mp3"));
        let info = decode(theme_table(), attrs.as_slice(), &NoResources).expect("decode");
        assert!(info.is_drm_protected());
    }

    #[test]
    fn sound_pack_notification_name_leaves_copyright_alone() {
        let table = SchemaSet::shared().table(SchemaVariant::SoundPack);
        let attrs = vec![
            attr("name", "Chimes"),
            attr("author", "B"),
            attr("notificationRingtoneName", "Ding"),
        ];
        let info = decode(table, attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.kind(), InfoKind::SoundPack);
        assert_eq!(info.notification_ringtone_name.as_deref(), Some("Ding"));
        assert_eq!(info.copyright, None);
    }

    #[test]
    fn sound_pack_ignores_theme_only_attributes() {
        let table = SchemaSet::shared().table(SchemaVariant::SoundPack);
        let attrs = vec![
            attr("name", "Chimes"),
            attr("author", "B"),
            attr("soundpackName", "self"),
            attr("wallpaperImage", "locked/bg.png"),
        ];
        let info = decode(table, attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.sound_pack_name, None);
        assert_eq!(info.wallpaper_image_name, None);
        assert!(!info.is_drm_protected());
    }

    #[test]
    fn legacy_schema_captures_resource_ids() {
        let table = SchemaSet::shared().table(SchemaVariant::LegacyTheme);
        let legacy = |name: &str, text: &str| ManifestAttribute::parsed(LEGACY_THEME_NAMESPACE, name, text);
        let attrs = vec![
            legacy("name", "Old"),
            legacy("thumbnail", "@0x7f020001"),
            legacy("author", "C"),
            legacy("themeId", "old1"),
            legacy("styleId", "@0x7f0b0002"),
            legacy("wallpaperImage", "@0x7f020003"),
            legacy("notificationRingtone", "assets/locked/note.ogg"),
        ];
        let info = decode(table, attrs.as_slice(), &NoResources).expect("decode");
        assert_eq!(info.kind(), InfoKind::Theme);
        assert_eq!(info.style_resource_id, 0x7f0b_0002);
        assert_eq!(info.thumbnail, None);
        let extra = info.legacy.as_ref().expect("legacy block");
        assert_eq!(extra.thumbnail_resource_id, 0x7f02_0001);
        assert_eq!(extra.preview_resource_id, 0);
        assert_eq!(extra.wallpaper_resource_id, 0x7f02_0003);
        assert_eq!(extra.notification_file_name.as_deref(), Some("assets/locked/note.ogg"));
        assert!(info.is_drm_protected());
    }

    #[test]
    fn legacy_schema_requires_its_own_attributes() {
        let table = SchemaSet::shared().table(SchemaVariant::LegacyTheme);
        let attrs: Vec<_> = theme_attrs()
            .into_iter()
            .map(|a| {
                let text = a.text().into_owned();
                ManifestAttribute::parsed(LEGACY_THEME_NAMESPACE, a.name, &text)
            })
            .collect();
        let err = decode(table, attrs.as_slice(), &NoResources).expect_err("no styleId");
        assert_eq!(err.missing, vec!["styleId"]);
    }
}
