//! # DFS File System Module
//!
//! This module imposes the Acorn DFS catalog structure on the sector data
//! held by a backing store.  Each side of a floppy carries an independent
//! catalog in its first two sectors; the `Side` type owns the decoded
//! catalog and every invariant tied to it.
//!
//! The error messages follow the wording the 8-bit DFS ROM would print.

pub mod catalog;
pub mod entry;
pub mod side;
pub mod validate;
pub mod digest;

use std::fmt;
use std::str::FromStr;
use crate::img::SECTOR_SIZE;

pub use validate::WarnMode;

/// Sectors 0 and 1 of each side hold the catalog
pub const CATALOG_SECTORS: usize = 2;
/// A catalog holds at most 31 file entries
pub const MAX_FILES: usize = 31;
/// Default directory character
pub const ROOT_DIR: u8 = b'$';

/// Enumerates DFS errors.  The `Display` trait will print the equivalent
/// DFS ROM message such as `Disk full`.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("Bad name")]
    NameInvalid,
    #[error("Name too long")]
    NameTooLong,
    #[error("Bad dir")]
    DirInvalid,
    #[error("Bad drive")]
    DriveInvalid,
    #[error("Bad option")]
    OptionInvalid,
    #[error("File exists")]
    Exists,
    #[error("Not found")]
    NotFound,
    #[error("Locked")]
    Locked,
    #[error("Cat full")]
    Full,
    #[error("Disk full")]
    NoSpace,
    #[error("Bad catalogue")]
    CatalogCorrupt,
    #[error("Disk fault during compact")]
    IoDuringCompact
}

/// Check a single catalog name byte, codes 32-126 are acceptable.
pub fn is_name_char(b: u8) -> bool {
    b >= 0x20 && b < 0x7f
}

/// A parsed DFS file name: optional drive, directory character, name.
///
/// Accepted forms are `name`, `dir.name`, `:drive.name` and
/// `:drive.dir.name`, where drive 0 selects side 0 and drive 2 side 1.
/// The directory defaults to `$`.
#[derive(Clone,PartialEq,Eq)]
pub struct FileSpec {
    pub head: Option<usize>,
    pub dir: u8,
    pub name: String
}

impl FileSpec {
    pub fn new(dir: u8,name: &str) -> Self {
        Self { head: None, dir, name: name.to_string() }
    }
    /// Parse and validate, applying the default directory.
    pub fn parse(raw: &str) -> Result<Self,Error> {
        let mut s = raw;
        let mut head = None;
        if let Some(rest) = s.strip_prefix(':') {
            let (drive,tail) = match rest.split_once('.') {
                Some(x) => x,
                None => return Err(Error::DriveInvalid)
            };
            head = match drive {
                "0" => Some(0),
                "2" => Some(1),
                _ => return Err(Error::DriveInvalid)
            };
            s = tail;
        }
        let (dir,name) = match s.split_once('.') {
            Some((d,n)) if d.len()==1 => (d.as_bytes()[0],n),
            Some(_) => return Err(Error::DirInvalid),
            None => (ROOT_DIR,s)
        };
        if !is_name_char(dir) {
            return Err(Error::DirInvalid);
        }
        if name.len() < 1 {
            return Err(Error::NameInvalid);
        }
        if name.len() > 7 {
            return Err(Error::NameTooLong);
        }
        if name.bytes().any(|b| !is_name_char(b) || b==b'.' || b==b':') {
            return Err(Error::NameInvalid);
        }
        Ok(Self { head, dir, name: name.to_string() })
    }
    /// Case insensitive name comparison, the way DFS matches names.
    pub fn matches(&self,dir: u8,name: &[u8]) -> bool {
        if !self.dir.eq_ignore_ascii_case(&dir) {
            return false;
        }
        let mut trimmed: Vec<u8> = name.iter().map(|b| b & 0x7f).collect();
        while trimmed.last()==Some(&b' ') || trimmed.last()==Some(&0) {
            trimmed.pop();
        }
        self.name.as_bytes().eq_ignore_ascii_case(&trimmed)
    }
}

impl FromStr for FileSpec {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FileSpec {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}.{}",self.dir as char,self.name)
    }
}

/// Boot action taken by the BBC Micro when the disk is started with SHIFT-BREAK.
#[derive(num_derive::FromPrimitive,PartialEq,Eq,Clone,Copy,Debug)]
pub enum BootOption {
    None = 0,
    Load = 1,
    Run = 2,
    Exec = 3
}

impl FromStr for BootOption {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        use num_traits::FromPrimitive;
        // string can be the number itself
        if let Ok(num) = u8::from_str(s) {
            return match BootOption::from_u8(num) {
                Some(opt) => Ok(opt),
                _ => Err(Error::OptionInvalid)
            };
        }
        // or a mnemonic
        match s.to_lowercase().as_str() {
            "off" => Ok(Self::None),
            "load" => Ok(Self::Load),
            "run" => Ok(Self::Run),
            "exec" => Ok(Self::Exec),
            _ => Err(Error::OptionInvalid)
        }
    }
}

impl fmt::Display for BootOption {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f,"off"),
            Self::Load => write!(f,"LOAD"),
            Self::Run => write!(f,"RUN"),
            Self::Exec => write!(f,"EXEC")
        }
    }
}

/// Flags threaded through batch operations instead of global state.
#[derive(Clone,Copy)]
pub struct OpContext {
    pub warn_mode: WarnMode,
    pub continue_on_error: bool,
    pub silent: bool
}

impl Default for OpContext {
    fn default() -> Self {
        Self { warn_mode: WarnMode::First, continue_on_error: false, silent: false }
    }
}

/// Options accepted by `Side::add_file`
#[derive(Clone,Copy)]
pub struct AddFileOptions {
    /// replace an existing file of the same name
    pub replace: bool,
    /// allow replacing or deleting locked files
    pub ignore_access: bool,
    /// compact the side if no contiguous free block fits
    pub compact: bool
}

impl Default for AddFileOptions {
    fn default() -> Self {
        Self { replace: false, ignore_access: false, compact: true }
    }
}

/// Number of sectors needed to hold `len` bytes
pub fn sectors_for(len: usize) -> usize {
    (len + SECTOR_SIZE - 1) / SECTOR_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        let spec = FileSpec::parse("HELLO").unwrap();
        assert_eq!(spec.dir,b'$');
        assert_eq!(spec.name,"HELLO");
        assert_eq!(spec.head,None);
        let spec = FileSpec::parse("A.PROG").unwrap();
        assert_eq!(spec.dir,b'A');
        assert_eq!(spec.name,"PROG");
        let spec = FileSpec::parse(":2.B.GAME").unwrap();
        assert_eq!(spec.head,Some(1));
        assert_eq!(spec.dir,b'B');
        assert_eq!(spec.name,"GAME");
        let spec = FileSpec::parse(":0.BOOT").unwrap();
        assert_eq!(spec.head,Some(0));
        assert_eq!(spec.dir,b'$');
    }

    #[test]
    fn reject_bad_names() {
        assert!(matches!(FileSpec::parse("TOOLONGNAME"),Err(Error::NameTooLong)));
        assert!(matches!(FileSpec::parse(""),Err(Error::NameInvalid)));
        assert!(matches!(FileSpec::parse(":1.X"),Err(Error::DriveInvalid)));
        assert!(matches!(FileSpec::parse("AB.X"),Err(Error::DirInvalid)));
        assert!(matches!(FileSpec::parse("BAD\u{7}"),Err(Error::NameInvalid)));
    }

    #[test]
    fn match_is_case_insensitive() {
        let spec = FileSpec::parse("$.hello").unwrap();
        assert!(spec.matches(b'$',b"HELLO  "));
        assert!(!spec.matches(b'A',b"HELLO  "));
    }

    #[test]
    fn boot_options() {
        assert_eq!(BootOption::from_str("run").unwrap(),BootOption::Run);
        assert_eq!(BootOption::from_str("3").unwrap(),BootOption::Exec);
        assert!(BootOption::from_str("4").is_err());
        assert_eq!(BootOption::Load.to_string(),"LOAD");
    }
}
