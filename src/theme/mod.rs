//! Theme and sound pack records.
//!
//! A [`ThemeInfo`] is the single record shape shared by every schema variant.
//! Which optional fields carry meaning depends on [`ThemeInfo::kind`] and on
//! the schema that decoded it; the record itself does not police that.

pub mod codec;
pub mod decoder;
pub mod schema;

use serde::{Deserialize, Serialize};

/// Reserved path segment marking a DRM protected asset.
pub const LOCKED_SEGMENT: &str = "locked/";

/// Sentinel for "no style resource". `0` is a valid id for other fields.
pub const UNSET_STYLE_ID: i32 = -1;

/// Record discriminator. The wire value is the ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfoKind {
    Theme,
    SoundPack,
}

impl InfoKind {
    pub fn discriminator(self) -> i32 {
        match self {
            InfoKind::Theme => 0,
            InfoKind::SoundPack => 1,
        }
    }

    pub fn from_discriminator(value: i32) -> Option<Self> {
        match value {
            0 => Some(InfoKind::Theme),
            1 => Some(InfoKind::SoundPack),
            _ => None,
        }
    }
}

/// Fields only the legacy theme schema carries: its images are resource ids
/// rather than asset paths, and its audio paths live under older names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResources {
    pub preview_resource_id: i32,
    pub thumbnail_resource_id: i32,
    pub wallpaper_resource_id: i32,
    pub ringtone_file_name: Option<String>,
    pub notification_file_name: Option<String>,
}

/// Field order here is the wire order; see [`codec`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeInfo {
    kind: InfoKind,
    pub name: Option<String>,
    pub author: Option<String>,
    pub copyright: Option<String>,
    pub thumbnail: Option<String>,
    pub preview: Option<String>,
    pub theme_id: Option<String>,
    pub style_resource_id: i32,
    pub theme_style_name: Option<String>,
    pub wallpaper_image_name: Option<String>,
    pub faves_image_name: Option<String>,
    pub faves_app_image_name: Option<String>,
    pub ringtone_file_name: Option<String>,
    pub ringtone_name: Option<String>,
    pub notification_ringtone_file_name: Option<String>,
    pub notification_ringtone_name: Option<String>,
    pub sound_pack_name: Option<String>,
    is_drm_protected: bool,
    pub legacy: Option<LegacyResources>,
}

impl ThemeInfo {
    pub fn new(kind: InfoKind) -> Self {
        ThemeInfo {
            kind,
            name: None,
            author: None,
            copyright: None,
            thumbnail: None,
            preview: None,
            theme_id: None,
            style_resource_id: UNSET_STYLE_ID,
            theme_style_name: None,
            wallpaper_image_name: None,
            faves_image_name: None,
            faves_app_image_name: None,
            ringtone_file_name: None,
            ringtone_name: None,
            notification_ringtone_file_name: None,
            notification_ringtone_name: None,
            sound_pack_name: None,
            is_drm_protected: false,
            legacy: None,
        }
    }

    /// A theme record carrying the legacy extension block.
    pub fn new_legacy() -> Self {
        ThemeInfo {
            legacy: Some(LegacyResources::default()),
            ..ThemeInfo::new(InfoKind::Theme)
        }
    }

    pub fn kind(&self) -> InfoKind {
        self.kind
    }

    pub fn is_drm_protected(&self) -> bool {
        self.is_drm_protected
    }

    /// Folds an asset path into the DRM flag. The flag only ever turns on.
    pub fn track_drm(&mut self, path: &str) {
        if path.contains(LOCKED_SEGMENT) {
            self.is_drm_protected = true;
        }
    }

    /// Restores a flag read off the wire, where it is not re-derived.
    pub(crate) fn set_drm_protected(&mut self, value: bool) {
        self.is_drm_protected = value;
    }

    fn legacy_mut(&mut self) -> &mut LegacyResources {
        self.legacy.get_or_insert_with(LegacyResources::default)
    }

    /// The asset to install for the given sound slot. Legacy records keep
    /// their own paths, which take precedence.
    pub fn audible_asset(&self, kind: AudibleKind) -> Option<&str> {
        let legacy = self.legacy.as_ref().and_then(|legacy| match kind {
            AudibleKind::Ringtone => legacy.ringtone_file_name.as_deref(),
            AudibleKind::Notification => legacy.notification_file_name.as_deref(),
        });
        legacy.or(match kind {
            AudibleKind::Ringtone => self.ringtone_file_name.as_deref(),
            AudibleKind::Notification => self.notification_ringtone_file_name.as_deref(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudibleKind {
    Ringtone,
    Notification,
}

/// How an attribute's value is turned into a field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// Raw attribute text.
    Text,
    /// Inline text or a string resource reference.
    Resolved,
    /// Raw attribute text naming an asset; feeds the DRM flag.
    Path,
    /// The referenced resource id itself, unresolved.
    ResourceId,
}

/// Every record field a schema can bind an attribute to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Author,
    Copyright,
    Thumbnail,
    Preview,
    ThemeId,
    StyleId,
    StyleName,
    WallpaperImage,
    FavesBackground,
    FavesAppsBackground,
    RingtoneFile,
    RingtoneName,
    NotificationRingtoneFile,
    NotificationRingtoneName,
    SoundPackName,
    LegacyThumbnail,
    LegacyPreview,
    LegacyWallpaper,
    LegacyRingtoneFile,
    LegacyNotificationFile,
}

/// A decoded attribute value, shaped by the target field's [`ValueKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    ResourceId(i32),
}

impl Field {
    pub fn value_kind(self) -> ValueKind {
        match self {
            Field::Name | Field::Author | Field::Copyright | Field::StyleName => ValueKind::Resolved,
            Field::ThemeId
            | Field::RingtoneName
            | Field::NotificationRingtoneName
            | Field::SoundPackName => ValueKind::Text,
            Field::Thumbnail
            | Field::Preview
            | Field::WallpaperImage
            | Field::FavesBackground
            | Field::FavesAppsBackground
            | Field::RingtoneFile
            | Field::NotificationRingtoneFile
            | Field::LegacyRingtoneFile
            | Field::LegacyNotificationFile => ValueKind::Path,
            Field::StyleId
            | Field::LegacyThumbnail
            | Field::LegacyPreview
            | Field::LegacyWallpaper => ValueKind::ResourceId,
        }
    }

    /// Value a resource-id field takes when the attribute is not a reference.
    pub fn default_resource_id(self) -> i32 {
        match self {
            Field::StyleId => UNSET_STYLE_ID,
            _ => 0,
        }
    }
}

impl ThemeInfo {
    /// Stores `value` into `field`. Each field maps to exactly one slot; a
    /// value of the wrong shape for the field is ignored.
    pub fn assign(&mut self, field: Field, value: FieldValue) {
        let text = match value {
            FieldValue::ResourceId(id) => {
                match field {
                    Field::StyleId => self.style_resource_id = id,
                    Field::LegacyThumbnail => self.legacy_mut().thumbnail_resource_id = id,
                    Field::LegacyPreview => self.legacy_mut().preview_resource_id = id,
                    Field::LegacyWallpaper => self.legacy_mut().wallpaper_resource_id = id,
                    _ => {}
                }
                return;
            }
            FieldValue::Text(text) => text,
        };
        if field.value_kind() == ValueKind::Path {
            self.track_drm(&text);
        }
        match field {
            Field::Name => self.name = Some(text),
            Field::Author => self.author = Some(text),
            Field::Copyright => self.copyright = Some(text),
            Field::Thumbnail => self.thumbnail = Some(text),
            Field::Preview => self.preview = Some(text),
            Field::ThemeId => self.theme_id = Some(text),
            Field::StyleName => self.theme_style_name = Some(text),
            Field::WallpaperImage => self.wallpaper_image_name = Some(text),
            Field::FavesBackground => self.faves_image_name = Some(text),
            Field::FavesAppsBackground => self.faves_app_image_name = Some(text),
            Field::RingtoneFile => self.ringtone_file_name = Some(text),
            Field::RingtoneName => self.ringtone_name = Some(text),
            Field::NotificationRingtoneFile => self.notification_ringtone_file_name = Some(text),
            Field::NotificationRingtoneName => self.notification_ringtone_name = Some(text),
            Field::SoundPackName => self.sound_pack_name = Some(text),
            Field::LegacyRingtoneFile => self.legacy_mut().ringtone_file_name = Some(text),
            Field::LegacyNotificationFile => self.legacy_mut().notification_file_name = Some(text),
            Field::StyleId | Field::LegacyThumbnail | Field::LegacyPreview | Field::LegacyWallpaper => {}
        }
    }
}
