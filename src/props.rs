//! # Listing properties
//!
//! Custom listing formats name fields like `{title}` or `{load_addr}`.
//! Each scope (file, side, image) has a sum type enumerating its fields,
//! so a format string is checked against a closed vocabulary instead of a
//! reflective property bag.  One rendering function substitutes the fields
//! into the format string.

use std::fmt;
use std::str::FromStr;
use regex::Regex;
use crate::DYNERR;
use crate::commands::CommandError;

/// A property value ready for display or JSON
#[derive(Clone,PartialEq)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Hex6(u32),
    Bool(bool)
}

impl fmt::Display for PropValue {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f,"{}",s),
            Self::Int(i) => write!(f,"{}",i),
            Self::Hex6(x) => write!(f,"{:06X}",x),
            Self::Bool(b) => write!(f,"{}",b)
        }
    }
}

impl PropValue {
    pub fn to_json(&self) -> json::JsonValue {
        match self {
            Self::Str(s) => json::JsonValue::String(s.clone()),
            Self::Int(i) => json::JsonValue::from(*i),
            Self::Hex6(x) => json::JsonValue::String(format!("{:06X}",x)),
            Self::Bool(b) => json::JsonValue::Boolean(*b)
        }
    }
}

/// Fields of one file entry
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum FileProperty {
    Index,
    FullName,
    Directory,
    FileName,
    LoadAddr,
    ExecAddr,
    Access,
    Locked,
    Size,
    StartSector,
    EndSector,
    Sectors,
    Drive,
    Head,
    Sha1,
    Sha1Data,
    Sha1All
}

impl FromStr for FileProperty {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "fullname" => Ok(Self::FullName),
            "directory" => Ok(Self::Directory),
            "filename" => Ok(Self::FileName),
            "load_addr" => Ok(Self::LoadAddr),
            "exec_addr" => Ok(Self::ExecAddr),
            "access" => Ok(Self::Access),
            "locked" => Ok(Self::Locked),
            "size" => Ok(Self::Size),
            "start_sector" => Ok(Self::StartSector),
            "end_sector" => Ok(Self::EndSector),
            "sectors" => Ok(Self::Sectors),
            "drive" => Ok(Self::Drive),
            "head" => Ok(Self::Head),
            "sha1" => Ok(Self::Sha1),
            "sha1_data" => Ok(Self::Sha1Data),
            "sha1_all" => Ok(Self::Sha1All),
            _ => Err(CommandError::UnknownProperty)
        }
    }
}

/// Fields of one disk side
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum SideProperty {
    Side,
    Title,
    Sequence,
    OptStr,
    Opt,
    OptByte,
    IsValid,
    NumberOfFiles,
    Sectors,
    Tracks,
    FreeSectors,
    FreeBytes,
    UsedSectors,
    MaxFreeBlock,
    LastUsedSector,
    EndOffset,
    Drive,
    Head,
    Sha1,
    Sha1Files,
    Sha1Used
}

impl FromStr for SideProperty {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "side" => Ok(Self::Side),
            "title" => Ok(Self::Title),
            "sequence" => Ok(Self::Sequence),
            "opt_str" => Ok(Self::OptStr),
            "opt" => Ok(Self::Opt),
            "opt_byte" => Ok(Self::OptByte),
            "is_valid" => Ok(Self::IsValid),
            "number_of_files" => Ok(Self::NumberOfFiles),
            "sectors" => Ok(Self::Sectors),
            "tracks" => Ok(Self::Tracks),
            "free_sectors" => Ok(Self::FreeSectors),
            "free_bytes" => Ok(Self::FreeBytes),
            "used_sectors" => Ok(Self::UsedSectors),
            "max_free_blk" => Ok(Self::MaxFreeBlock),
            "last_used_sector" => Ok(Self::LastUsedSector),
            "end_offset" => Ok(Self::EndOffset),
            "drive" => Ok(Self::Drive),
            "head" => Ok(Self::Head),
            "sha1" => Ok(Self::Sha1),
            "sha1_files" => Ok(Self::Sha1Files),
            "sha1_used" => Ok(Self::Sha1Used),
            _ => Err(CommandError::UnknownProperty)
        }
    }
}

/// Fields of the image as a whole
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum ImageProperty {
    Path,
    FileName,
    Sides,
    Tracks,
    Layout,
    Size,
    MinSize,
    MaxSize,
    IsValid
}

impl FromStr for ImageProperty {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "path" => Ok(Self::Path),
            "filename" => Ok(Self::FileName),
            "sides" => Ok(Self::Sides),
            "tracks" => Ok(Self::Tracks),
            "layout" => Ok(Self::Layout),
            "size" => Ok(Self::Size),
            "min_size" => Ok(Self::MinSize),
            "max_size" => Ok(Self::MaxSize),
            "is_valid" => Ok(Self::IsValid),
            _ => Err(CommandError::UnknownProperty)
        }
    }
}

/// Substitute `{field}` references in a custom format string.  The lookup
/// closure maps a field name to its value; unknown names are an error so
/// typos surface instead of printing blanks.
pub fn render_format(fmt: &str,lookup: &dyn Fn(&str) -> Option<PropValue>) -> Result<String,DYNERR> {
    let field_patt = Regex::new(r"\{([a-z_0-9]+)\}").expect("unreachable");
    let mut ans = String::new();
    let mut curs = 0;
    for m in field_patt.captures_iter(fmt) {
        let whole = m.get(0).unwrap();
        let name = m.get(1).unwrap().as_str();
        ans += &fmt[curs..whole.start()];
        match lookup(name) {
            Some(val) => ans += &val.to_string(),
            None => return Err(Box::new(CommandError::UnknownProperty))
        }
        curs = whole.end();
    }
    ans += &fmt[curs..];
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution() {
        let lookup = |name: &str| match name {
            "title" => Some(PropValue::Str("GAMES".to_string())),
            "sectors" => Some(PropValue::Int(800)),
            "load_addr" => Some(PropValue::Hex6(0x1900)),
            _ => None
        };
        let out = render_format("{title} has {sectors} sectors at {load_addr}",&lookup).unwrap();
        assert_eq!(out,"GAMES has 800 sectors at 001900");
        assert!(render_format("{nope}",&lookup).is_err());
    }

    #[test]
    fn property_vocabulary() {
        assert!(FileProperty::from_str("load_addr").is_ok());
        assert!(FileProperty::from_str("bogus").is_err());
        assert!(SideProperty::from_str("max_free_blk").is_ok());
        assert!(ImageProperty::from_str("min_size").is_ok());
    }
}
