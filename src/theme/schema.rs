//! Attribute tables: which manifest attributes a schema variant reads, which
//! of them are compulsory, and the record field each one fills.

use crate::theme::{Field, InfoKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const THEME_NAMESPACE: &str = "http://schemas.cyanogenmod.com/apk/res/theme";
pub const LEGACY_THEME_NAMESPACE: &str = "http://www.w3.org/2001/pluto.html";

pub const THEME_TAG: &str = "theme";
pub const SOUND_PACK_TAG: &str = "sounds";

/// A schema variant as a pair of ordered attribute lists.
#[derive(Clone, Copy, Debug)]
pub struct SchemaDescriptor {
    pub tag: &'static str,
    pub kind: InfoKind,
    pub legacy: bool,
    pub compulsory: &'static [(&'static str, Field)],
    pub optional: &'static [(&'static str, Field)],
}

pub const THEME_DESCRIPTOR: SchemaDescriptor = SchemaDescriptor {
    tag: THEME_TAG,
    kind: InfoKind::Theme,
    legacy: false,
    compulsory: &[
        ("name", Field::Name),
        ("thumbnail", Field::Thumbnail),
        ("preview", Field::Preview),
        ("author", Field::Author),
        ("themeId", Field::ThemeId),
        ("styleName", Field::StyleName),
    ],
    optional: &[
        ("styleId", Field::StyleId),
        ("wallpaperImage", Field::WallpaperImage),
        ("favesBackground", Field::FavesBackground),
        ("favesAppsBackground", Field::FavesAppsBackground),
        ("copyright", Field::Copyright),
        ("ringtoneFileName", Field::RingtoneFile),
        ("notificationRingtoneFileName", Field::NotificationRingtoneFile),
        ("ringtoneName", Field::RingtoneName),
        ("notificationRingtoneName", Field::NotificationRingtoneName),
        ("soundpackName", Field::SoundPackName),
    ],
};

pub const SOUND_PACK_DESCRIPTOR: SchemaDescriptor = SchemaDescriptor {
    tag: SOUND_PACK_TAG,
    kind: InfoKind::SoundPack,
    legacy: false,
    compulsory: &[("name", Field::Name), ("author", Field::Author)],
    optional: &[
        ("copyright", Field::Copyright),
        ("ringtoneFileName", Field::RingtoneFile),
        ("notificationRingtoneFileName", Field::NotificationRingtoneFile),
        ("ringtoneName", Field::RingtoneName),
        ("notificationRingtoneName", Field::NotificationRingtoneName),
    ],
};

pub const LEGACY_THEME_DESCRIPTOR: SchemaDescriptor = SchemaDescriptor {
    tag: THEME_TAG,
    kind: InfoKind::Theme,
    legacy: true,
    compulsory: &[
        ("name", Field::Name),
        ("thumbnail", Field::LegacyThumbnail),
        ("author", Field::Author),
        ("themeId", Field::ThemeId),
        ("styleId", Field::StyleId),
    ],
    optional: &[
        ("preview", Field::LegacyPreview),
        ("wallpaperImage", Field::LegacyWallpaper),
        ("ringtone", Field::LegacyRingtoneFile),
        ("notificationRingtone", Field::LegacyNotificationFile),
        ("ringtoneName", Field::RingtoneName),
        ("notificationRingtoneName", Field::NotificationRingtoneName),
        ("copyright", Field::Copyright),
    ],
};

/// Maps each name to its position: compulsory names take `[0, C)`, optional
/// names `[C, C + O)`. Names must be unique across both lists.
pub fn build_lookup<'a>(compulsory: &[&'a str], optional: &[&'a str]) -> HashMap<&'a str, usize> {
    compulsory
        .iter()
        .chain(optional.iter())
        .enumerate()
        .map(|(index, name)| (*name, index))
        .collect()
}

/// A schema variant ready for decoding. Built once and shared read-only; each
/// decode works on its own copy of [`AttributeTable::lookup`].
#[derive(Clone, Debug)]
pub struct AttributeTable {
    descriptor: SchemaDescriptor,
    namespace: String,
    lookup: HashMap<&'static str, usize>,
    fields: Vec<Field>,
}

impl AttributeTable {
    pub fn new(descriptor: SchemaDescriptor, namespace: impl Into<String>) -> Self {
        let names = |list: &[(&'static str, Field)]| list.iter().map(|(name, _)| *name).collect::<Vec<_>>();
        let lookup = build_lookup(&names(descriptor.compulsory), &names(descriptor.optional));
        let fields = descriptor
            .compulsory
            .iter()
            .chain(descriptor.optional.iter())
            .map(|(_, field)| *field)
            .collect();
        AttributeTable {
            descriptor,
            namespace: namespace.into(),
            lookup,
            fields,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.descriptor.tag
    }

    pub fn kind(&self) -> InfoKind {
        self.descriptor.kind
    }

    pub fn is_legacy(&self) -> bool {
        self.descriptor.legacy
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn compulsory_count(&self) -> usize {
        self.descriptor.compulsory.len()
    }

    pub fn lookup(&self) -> &HashMap<&'static str, usize> {
        &self.lookup
    }

    /// A private, consumable copy of the lookup for one decode.
    pub fn working_set(&self) -> HashMap<&'static str, usize> {
        self.lookup.clone()
    }

    pub fn field(&self, index: usize) -> Option<Field> {
        self.fields.get(index).copied()
    }

    pub fn is_compulsory(&self, index: usize) -> bool {
        index < self.compulsory_count()
    }

    pub fn compulsory_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptor.compulsory.iter().map(|(name, _)| *name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    Theme,
    SoundPack,
    LegacyTheme,
}

impl SchemaVariant {
    pub fn descriptor(self) -> SchemaDescriptor {
        match self {
            SchemaVariant::Theme => THEME_DESCRIPTOR,
            SchemaVariant::SoundPack => SOUND_PACK_DESCRIPTOR,
            SchemaVariant::LegacyTheme => LEGACY_THEME_DESCRIPTOR,
        }
    }
}

/// The three attribute tables a manifest loader decodes against. This is the
/// crate's configuration: namespaces are the only tunable.
#[derive(Clone, Debug)]
pub struct SchemaSet {
    theme: AttributeTable,
    sound_pack: AttributeTable,
    legacy_theme: AttributeTable,
}

static STANDARD: Lazy<SchemaSet> = Lazy::new(SchemaSet::standard);

impl SchemaSet {
    pub fn standard() -> Self {
        SchemaSet::with_namespaces(THEME_NAMESPACE, LEGACY_THEME_NAMESPACE)
    }

    pub fn with_namespaces(theme_namespace: &str, legacy_namespace: &str) -> Self {
        SchemaSet {
            theme: AttributeTable::new(THEME_DESCRIPTOR, theme_namespace),
            sound_pack: AttributeTable::new(SOUND_PACK_DESCRIPTOR, theme_namespace),
            legacy_theme: AttributeTable::new(LEGACY_THEME_DESCRIPTOR, legacy_namespace),
        }
    }

    /// Process-wide standard tables, built on first use.
    pub fn shared() -> &'static SchemaSet {
        &STANDARD
    }

    pub fn table(&self, variant: SchemaVariant) -> &AttributeTable {
        match variant {
            SchemaVariant::Theme => &self.theme,
            SchemaVariant::SoundPack => &self.sound_pack,
            SchemaVariant::LegacyTheme => &self.legacy_theme,
        }
    }
}
