use crate::android::manifest::{AndroidManifest, ManifestElement, ANDROID_NAMESPACE_URI};
use crate::error::{SchemaValidationError, ThemeParseError};
use crate::theme::decoder::{decode, ResourceResolver};
use crate::theme::schema::{SchemaSet, SchemaVariant, SOUND_PACK_TAG, THEME_TAG};
use crate::theme::ThemeInfo;
use log::{debug, warn};

/// `<meta-data android:name=...>` value that marks a package as a theme even
/// without a `<theme>` element.
pub const THEME_META_TAG_NAME: &str = "org.cyanogenmod.theme.name";

/// Every theme-related record a package manifest declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageThemes {
    pub package_name: Option<String>,
    pub themes: Vec<ThemeInfo>,
    pub sound_packs: Vec<ThemeInfo>,
    pub legacy_themes: Vec<ThemeInfo>,
    pub is_theme_package: bool,
}

impl PackageThemes {
    /// Decodes each `<theme>` and `<sounds>` element directly under
    /// `<manifest>`. One invalid element invalidates the whole package.
    pub fn from_manifest<R>(
        manifest: &AndroidManifest,
        schemas: &SchemaSet,
        resolver: &R,
    ) -> Result<Self, SchemaValidationError>
    where
        R: ResourceResolver + ?Sized,
    {
        let root = manifest.root();
        let mut found = PackageThemes {
            package_name: manifest.package_name().map(str::to_string),
            ..PackageThemes::default()
        };

        for element in &root.children {
            let Some(variant) = schema_for(element, schemas) else {
                continue;
            };
            let info = decode(schemas.table(variant), element, resolver).map_err(|err| {
                warn!(
                    "{}: {}",
                    found.package_name.as_deref().unwrap_or("<unnamed package>"),
                    err
                );
                err
            })?;
            match variant {
                SchemaVariant::Theme => found.themes.push(info),
                SchemaVariant::SoundPack => found.sound_packs.push(info),
                SchemaVariant::LegacyTheme => found.legacy_themes.push(info),
            }
        }

        found.is_theme_package = !found.themes.is_empty()
            || !found.legacy_themes.is_empty()
            || declares_theme_meta_data(root)
            || manifest.application().is_some_and(declares_theme_meta_data);
        debug!(
            "{:?}: {} themes, {} sound packs, {} legacy themes",
            found.package_name,
            found.themes.len(),
            found.sound_packs.len(),
            found.legacy_themes.len()
        );
        Ok(found)
    }

    /// Parses a text manifest and extracts its records.
    pub fn from_xml<R>(xml: &str, schemas: &SchemaSet, resolver: &R) -> Result<Self, ThemeParseError>
    where
        R: ResourceResolver + ?Sized,
    {
        let manifest = AndroidManifest::from_string(xml)?;
        Ok(PackageThemes::from_manifest(&manifest, schemas, resolver)?)
    }

    /// Parses a compiled manifest and extracts its records.
    pub fn from_binary<R>(bytes: &[u8], schemas: &SchemaSet, resolver: &R) -> Result<Self, ThemeParseError>
    where
        R: ResourceResolver + ?Sized,
    {
        let manifest = AndroidManifest::from_bytes(bytes)?;
        Ok(PackageThemes::from_manifest(&manifest, schemas, resolver)?)
    }
}

/// `<theme>` goes to whichever theme schema owns its attributes, current
/// first; a `<theme>` with neither is decoded as current and fails there.
fn schema_for(element: &ManifestElement, schemas: &SchemaSet) -> Option<SchemaVariant> {
    match element.tag.as_str() {
        SOUND_PACK_TAG => Some(SchemaVariant::SoundPack),
        THEME_TAG => {
            let current = schemas.table(SchemaVariant::Theme).namespace();
            let legacy = schemas.table(SchemaVariant::LegacyTheme).namespace();
            if !element.has_attribute_in_namespace(current)
                && element.has_attribute_in_namespace(legacy)
            {
                Some(SchemaVariant::LegacyTheme)
            } else {
                Some(SchemaVariant::Theme)
            }
        }
        _ => None,
    }
}

fn declares_theme_meta_data(parent: &ManifestElement) -> bool {
    parent.children_named("meta-data").any(|meta| {
        meta.attribute(Some(ANDROID_NAMESPACE_URI), "name")
            .is_some_and(|attr| attr.text() == THEME_META_TAG_NAME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::decoder::NoResources;

    const PACKAGE: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"
          xmlns:theme="http://schemas.cyanogenmod.com/apk/res/theme"
          xmlns:pluto="http://www.w3.org/2001/pluto.html"
          package="com.example.themes">
    <theme theme:name="Night" theme:thumbnail="thumb.png" theme:preview="preview.png"
           theme:author="A" theme:themeId="night" theme:styleName="Dark"
           theme:soundpackName="Chimes" />
    <sounds theme:name="Chimes" theme:author="B" />
    <theme pluto:name="Old" pluto:thumbnail="@0x7f020001" pluto:author="C"
           pluto:themeId="old" pluto:styleId="@0x7f0b0001" />
    <uses-sdk android:minSdkVersion="10" />
</manifest>"#;

    #[test]
    fn sorts_elements_by_schema() {
        let found = PackageThemes::from_xml(PACKAGE, SchemaSet::shared(), &NoResources)
            .expect("valid package");
        assert_eq!(found.package_name.as_deref(), Some("com.example.themes"));
        assert_eq!(found.themes.len(), 1);
        assert_eq!(found.sound_packs.len(), 1);
        assert_eq!(found.legacy_themes.len(), 1);
        assert!(found.is_theme_package);
        assert_eq!(found.themes[0].sound_pack_name.as_deref(), Some("Chimes"));
        assert_eq!(found.sound_packs[0].name.as_deref(), Some("Chimes"));
        let legacy = found.legacy_themes[0].legacy.as_ref().expect("legacy block");
        assert_eq!(legacy.thumbnail_resource_id, 0x7f02_0001);
    }

    #[test]
    fn invalid_element_invalidates_package() {
        let xml = PACKAGE.replace(r#"theme:author="B""#, "");
        let err = PackageThemes::from_xml(&xml, SchemaSet::shared(), &NoResources)
            .expect_err("sound pack lacks author");
        match err {
            ThemeParseError::Schema(err) => {
                assert_eq!(err.tag, "sounds");
                assert_eq!(err.missing, vec!["author"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn meta_data_marks_theme_package() {
        let xml = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="p">
    <application>
        <meta-data android:name="org.cyanogenmod.theme.name" android:value="Night" />
    </application>
</manifest>"#;
        let found = PackageThemes::from_xml(xml, SchemaSet::shared(), &NoResources).unwrap();
        assert!(found.is_theme_package);
        assert!(found.themes.is_empty());
    }

    #[test]
    fn plain_package_is_not_a_theme() {
        let xml = r#"<manifest package="p"><application /></manifest>"#;
        let found = PackageThemes::from_xml(xml, SchemaSet::shared(), &NoResources).unwrap();
        assert!(!found.is_theme_package);
        assert_eq!(found.sound_packs.len(), 0);
    }

    #[test]
    fn sound_pack_alone_is_not_a_theme_package() {
        let xml = r#"<manifest xmlns:t="http://schemas.cyanogenmod.com/apk/res/theme" package="p">
    <sounds t:name="Chimes" t:author="B" />
</manifest>"#;
        let found = PackageThemes::from_xml(xml, SchemaSet::shared(), &NoResources).unwrap();
        assert_eq!(found.sound_packs.len(), 1);
        assert!(!found.is_theme_package);
    }

    #[test]
    fn assembled_manifest_is_read_like_a_parsed_one() {
        use crate::android::manifest::ManifestAttribute;
        use crate::theme::schema::THEME_NAMESPACE;

        let sounds = ManifestElement::new(SOUND_PACK_TAG)
            .with_attribute(ManifestAttribute::parsed(THEME_NAMESPACE, "name", "Chimes"))
            .with_attribute(ManifestAttribute::parsed(THEME_NAMESPACE, "author", "B"));
        let application = ManifestElement::new("application").with_child(
            ManifestElement::new("meta-data").with_attribute(ManifestAttribute::parsed(
                ANDROID_NAMESPACE_URI,
                "name",
                THEME_META_TAG_NAME,
            )),
        );
        let root = ManifestElement::new("manifest")
            .with_attribute(ManifestAttribute::new("package", "com.example.chimes"))
            .with_child(sounds)
            .with_child(application);

        let found = PackageThemes::from_manifest(
            &AndroidManifest::from_root(root),
            SchemaSet::shared(),
            &NoResources,
        )
        .expect("valid package");
        assert_eq!(found.package_name.as_deref(), Some("com.example.chimes"));
        assert_eq!(found.sound_packs.len(), 1);
        assert!(found.is_theme_package);
    }

    #[test]
    fn malformed_xml_is_a_manifest_error() {
        let err = PackageThemes::from_xml("<manifest>", SchemaSet::shared(), &NoResources)
            .expect_err("unclosed");
        assert!(matches!(err, ThemeParseError::Manifest(_)));
    }
}
