//! # CLI Subcommands
//!
//! Contains the glue that runs the subcommands: argument shapes shared by
//! several verbs, property evaluation for the listing formats, and the
//! modules that do the work.

pub mod list;
pub mod transfer;

use std::str::FromStr;
use crate::image::Image;
use crate::props::{PropValue,FileProperty,SideProperty,ImageProperty};
use crate::fs::digest::{self,DigestMode};
use crate::DYNERR;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("Property name is unknown")]
    UnknownProperty,
    #[error("File not found")]
    FileNotFound,
    #[error("An .inf sidecar was required but not found")]
    InfRequired
}

/// An image argument of the form `PATH` or `PATH:N`, where N selects a
/// slot inside an MMB container.
pub struct ImageSpec {
    pub path: String,
    pub index: Option<usize>
}

impl FromStr for ImageSpec {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        if let Some((path,index)) = s.rsplit_once(':') {
            // windows drive letters also use a colon, demand digits
            if index.len() > 0 && index.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(Self {
                    path: path.to_string(),
                    index: Some(usize::from_str(index).map_err(|_| CommandError::OutOfRange)?)
                });
            }
        }
        Ok(Self { path: s.to_string(), index: None })
    }
}

/// Parse a hex address argument, no prefix expected
pub fn parse_addr(s: &str) -> Result<u32,DYNERR> {
    match u32::from_str_radix(s,16) {
        Ok(v) => Ok(v),
        Err(_) => Err(Box::new(CommandError::OutOfRange))
    }
}

/// Evaluate a file property against an entry of the image
pub fn file_prop(image: &Image,head: usize,index: usize,prop: FileProperty) -> Result<PropValue,DYNERR> {
    let side = image.side(head);
    let entry = match side.entry(index) {
        Some(e) => e,
        None => return Err(Box::new(CommandError::OutOfRange))
    };
    Ok(match prop {
        FileProperty::Index => PropValue::Int(index as i64 + 1),
        FileProperty::FullName => PropValue::Str(entry.full_name()),
        FileProperty::Directory => PropValue::Str(crate::bbc_to_display(&[entry.dir])),
        FileProperty::FileName => PropValue::Str(entry.name_string()),
        FileProperty::LoadAddr => PropValue::Hex6(entry.load_addr),
        FileProperty::ExecAddr => PropValue::Hex6(entry.exec_addr),
        FileProperty::Access => PropValue::Str(entry.access_string()),
        FileProperty::Locked => PropValue::Bool(entry.locked),
        FileProperty::Size => PropValue::Hex6(entry.length),
        FileProperty::StartSector => PropValue::Int(entry.start_sector as i64),
        FileProperty::EndSector => PropValue::Int(entry.end_sector() as i64),
        FileProperty::Sectors => PropValue::Int(entry.sectors() as i64),
        FileProperty::Drive => PropValue::Int(side.drive() as i64),
        FileProperty::Head => PropValue::Int(head as i64),
        FileProperty::Sha1 => PropValue::Str(
            digest::entry_digest(side,image.store(),index,DigestMode::File,digest::Sha1::new())?),
        FileProperty::Sha1Data => PropValue::Str(
            digest::entry_digest(side,image.store(),index,DigestMode::Data,digest::Sha1::new())?),
        FileProperty::Sha1All => PropValue::Str(
            digest::entry_digest(side,image.store(),index,DigestMode::All,digest::Sha1::new())?)
    })
}

/// Evaluate a side property
pub fn side_prop(image: &Image,head: usize,prop: SideProperty) -> Result<PropValue,DYNERR> {
    let side = image.side(head);
    Ok(match prop {
        SideProperty::Side => PropValue::Int(head as i64 + 1),
        SideProperty::Title => PropValue::Str(side.title()),
        SideProperty::Sequence => PropValue::Int(crate::from_bcd(side.sequence()) as i64),
        SideProperty::OptStr => PropValue::Str(side.boot_option().to_string()),
        SideProperty::Opt => PropValue::Int(side.boot_option() as i64),
        SideProperty::OptByte => PropValue::Int(side.catalog().opt_byte() as i64),
        SideProperty::IsValid => PropValue::Bool(side.is_valid()),
        SideProperty::NumberOfFiles => PropValue::Int(side.number_of_files() as i64),
        SideProperty::Sectors => PropValue::Int(side.total_sectors() as i64),
        SideProperty::Tracks => PropValue::Int(side.tracks() as i64),
        SideProperty::FreeSectors => PropValue::Int(side.free_sectors() as i64),
        SideProperty::FreeBytes => PropValue::Int(side.free_bytes() as i64),
        SideProperty::UsedSectors => PropValue::Int(side.used_sectors() as i64),
        SideProperty::MaxFreeBlock => PropValue::Int((side.largest_free_block() * crate::img::SECTOR_SIZE) as i64),
        SideProperty::LastUsedSector => PropValue::Int(side.last_used_sector() as i64),
        SideProperty::EndOffset => PropValue::Int(side.catalog().end_offset() as i64),
        SideProperty::Drive => PropValue::Int(side.drive() as i64),
        SideProperty::Head => PropValue::Int(head as i64),
        SideProperty::Sha1 => PropValue::Str(
            digest::side_digest(side,image.store(),DigestMode::All,digest::Sha1::new())?),
        SideProperty::Sha1Files => PropValue::Str(
            digest::side_digest(side,image.store(),DigestMode::File,digest::Sha1::new())?),
        SideProperty::Sha1Used => PropValue::Str(
            digest::side_digest(side,image.store(),DigestMode::Used,digest::Sha1::new())?)
    })
}

/// Evaluate an image property
pub fn image_prop(image: &Image,prop: ImageProperty) -> Result<PropValue,DYNERR> {
    Ok(match prop {
        ImageProperty::Path => PropValue::Str(image.path().to_string()),
        ImageProperty::FileName => PropValue::Str(image.file_name()),
        ImageProperty::Sides => PropValue::Int(image.heads() as i64),
        ImageProperty::Tracks => PropValue::Int(image.geometry().tracks as i64),
        ImageProperty::Layout => PropValue::Str(image.geometry().layout.to_string()),
        ImageProperty::Size => PropValue::Int(image.store().committed() as i64),
        ImageProperty::MinSize => PropValue::Int(image.min_size() as i64),
        ImageProperty::MaxSize => PropValue::Int(image.max_size() as i64),
        ImageProperty::IsValid => PropValue::Bool((0..image.heads()).all(|h| image.side(h).is_valid()))
    })
}
