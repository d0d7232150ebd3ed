//! Parcel form of [`ThemeInfo`].
//!
//! The layout is positional and versionless: a discriminator word, then every
//! base field in declaration order, then the legacy block when the record has
//! one. Reordering anything here breaks every parcel already in flight.

use crate::error::{MalformedRecordError, ParcelResult};
use crate::parcel::Parcel;
use crate::theme::{InfoKind, LegacyResources, ThemeInfo};
use log::warn;

/// Which layout the receiver expects. A parcel does not say whether a legacy
/// block follows; the reader has to know, as it knows the record type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordLayout {
    Base,
    Legacy,
}

impl ThemeInfo {
    pub fn layout(&self) -> RecordLayout {
        if self.legacy.is_some() {
            RecordLayout::Legacy
        } else {
            RecordLayout::Base
        }
    }

    pub fn write_to_parcel(&self, dest: &mut Parcel) {
        dest.write_i32(self.kind.discriminator());
        dest.write_string(self.name.as_deref());
        dest.write_string(self.author.as_deref());
        dest.write_string(self.copyright.as_deref());
        dest.write_string(self.thumbnail.as_deref());
        dest.write_string(self.preview.as_deref());
        dest.write_string(self.theme_id.as_deref());
        dest.write_i32(self.style_resource_id);
        dest.write_string(self.theme_style_name.as_deref());
        dest.write_string(self.wallpaper_image_name.as_deref());
        dest.write_string(self.faves_image_name.as_deref());
        dest.write_string(self.faves_app_image_name.as_deref());
        dest.write_string(self.ringtone_file_name.as_deref());
        dest.write_string(self.ringtone_name.as_deref());
        dest.write_string(self.notification_ringtone_file_name.as_deref());
        dest.write_string(self.notification_ringtone_name.as_deref());
        dest.write_string(self.sound_pack_name.as_deref());
        dest.write_bool(self.is_drm_protected);

        if let Some(legacy) = &self.legacy {
            dest.write_i32(legacy.preview_resource_id);
            dest.write_i32(legacy.thumbnail_resource_id);
            dest.write_i32(legacy.wallpaper_resource_id);
            dest.write_string(legacy.ringtone_file_name.as_deref());
            dest.write_string(legacy.notification_file_name.as_deref());
        }
    }

    /// Reads a record in `layout`. An unknown discriminator is logged and read
    /// as a theme so the receiver still has something to show.
    pub fn from_parcel(source: &mut Parcel, layout: RecordLayout) -> ParcelResult<Self> {
        let discriminator = source.read_i32()?;
        let kind = InfoKind::from_discriminator(discriminator).unwrap_or_else(|| {
            warn!(
                "{}; reading record as a theme",
                MalformedRecordError::UnknownDiscriminator(discriminator)
            );
            InfoKind::Theme
        });

        let mut info = ThemeInfo::new(kind);
        info.name = source.read_string()?;
        info.author = source.read_string()?;
        info.copyright = source.read_string()?;
        info.thumbnail = source.read_string()?;
        info.preview = source.read_string()?;
        info.theme_id = source.read_string()?;
        info.style_resource_id = source.read_i32()?;
        info.theme_style_name = source.read_string()?;
        info.wallpaper_image_name = source.read_string()?;
        info.faves_image_name = source.read_string()?;
        info.faves_app_image_name = source.read_string()?;
        info.ringtone_file_name = source.read_string()?;
        info.ringtone_name = source.read_string()?;
        info.notification_ringtone_file_name = source.read_string()?;
        info.notification_ringtone_name = source.read_string()?;
        info.sound_pack_name = source.read_string()?;
        info.set_drm_protected(source.read_bool()?);

        if layout == RecordLayout::Legacy {
            info.legacy = Some(LegacyResources {
                preview_resource_id: source.read_i32()?,
                thumbnail_resource_id: source.read_i32()?,
                wallpaper_resource_id: source.read_i32()?,
                ringtone_file_name: source.read_string()?,
                notification_file_name: source.read_string()?,
            });
        }
        Ok(info)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut parcel = Parcel::new();
        self.write_to_parcel(&mut parcel);
        parcel.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8], layout: RecordLayout) -> ParcelResult<Self> {
        ThemeInfo::from_parcel(&mut Parcel::from_bytes(bytes), layout)
    }
}

/// Writes a list as a length word followed by each record, as a typed array.
pub fn write_records(dest: &mut Parcel, records: &[ThemeInfo]) {
    dest.write_i32(records.len() as i32);
    for record in records {
        record.write_to_parcel(dest);
    }
}

/// Reads a list written by [`write_records`]. A length of `-1` is an absent
/// list and reads as empty.
pub fn read_records(source: &mut Parcel, layout: RecordLayout) -> ParcelResult<Vec<ThemeInfo>> {
    let count = source.read_i32()?;
    if count < 0 {
        return Ok(Vec::new());
    }
    let mut records = Vec::with_capacity((count as usize).min(source.remaining() / 4));
    for _ in 0..count {
        records.push(ThemeInfo::from_parcel(source, layout)?);
    }
    Ok(records)
}
