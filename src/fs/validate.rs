//! # Catalog validation
//!
//! A cursory structural check run when a side is opened, and again on
//! demand.  Warnings come out in a fixed order; the warn mode decides how
//! many are reported.  Cosmetic problems (strange characters in names) do
//! not invalidate the side; structural ones (bad sector numbers, overlap,
//! misordered entries) do, which blocks later mutation.

use std::fmt;
use log::warn;
use crate::img::{SINGLE_SECTORS,DOUBLE_SECTORS};
use super::{CATALOG_SECTORS,is_name_char};
use super::side::Side;

/// How many validation problems to surface.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum WarnMode {
    /// report only the first problem
    First,
    /// report nothing
    None,
    /// report everything found
    All
}

impl std::str::FromStr for WarnMode {
    type Err = super::Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            _ => Err(super::Error::OptionInvalid)
        }
    }
}

/// What kind of problem a warning describes.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum WarningKind {
    TotalSectors,
    SectorsBeyondPhysical,
    EndOffset,
    OptionByte,
    Sequence,
    BadName,
    BadDirectory,
    DuplicateName,
    StartSector,
    EndSector,
    OutOfOrder,
    OverlapsCatalog,
    OverlapsFile
}

/// One validation finding.  Cosmetic findings leave the side usable.
#[derive(Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub fatal: bool
}

impl fmt::Display for Warning {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}",self.message)
    }
}

/// Validate a side against the physical sector count of its backing store.
/// Returns the ordered warning list; the side is valid if none of them are
/// fatal.  Warnings are also logged according to `mode`.
pub fn validate_side(side: &Side,mode: WarnMode) -> Vec<Warning> {
    let mut list = Vec::new();
    let physical = side.physical_sectors();
    let cat = side.catalog();

    let total = cat.total_sectors();
    if total != SINGLE_SECTORS && total != DOUBLE_SECTORS {
        fatal(&mut list,WarningKind::TotalSectors,
            format!("invalid total number of sectors ({})",total));
    }
    if total > physical {
        fatal(&mut list,WarningKind::SectorsBeyondPhysical,
            format!("number of sectors in catalog ({}) greater than physical sectors ({})",total,physical));
    }
    if cat.end_offset() & 7 != 0 {
        fatal(&mut list,WarningKind::EndOffset,
            format!("invalid end of catalog offset (0x{:02x})",cat.end_offset()));
    }
    if cat.opt_byte() & 0xcc != 0 {
        fatal(&mut list,WarningKind::OptionByte,
            format!("invalid option byte or unsupported format (0x{:02x})",cat.opt_byte()));
    }
    if cat.sequence() & 0x0f > 9 || cat.sequence() >> 4 > 9 {
        cosmetic(&mut list,WarningKind::Sequence,
            format!("sequence byte is not BCD (0x{:02x})",cat.sequence()));
    }

    let entries = cat.entries();
    let mut floor = total;
    let mut bad_order = false;
    for (i,entry) in entries.iter().enumerate() {
        if entry.name.iter().any(|b| !is_name_char(b & 0x7f)) {
            // strange names happen in the wild, do not invalidate the disk
            cosmetic(&mut list,WarningKind::BadName,
                format!("invalid file name in catalog entry #{}",i+1));
        }
        if !is_name_char(entry.dir) {
            cosmetic(&mut list,WarningKind::BadDirectory,
                format!("invalid directory name in catalog entry #{}",i+1));
        }
        for other in entries.iter().take(i) {
            if other.dir.eq_ignore_ascii_case(&entry.dir)
                && other.name.map(|b| (b & 0x7f).to_ascii_uppercase())==entry.name.map(|b| (b & 0x7f).to_ascii_uppercase()) {
                cosmetic(&mut list,WarningKind::DuplicateName,
                    format!("file name in catalog entry #{} duplicates an earlier entry",i+1));
            }
        }
        if (entry.start_sector as usize) < CATALOG_SECTORS || entry.start_sector as usize > total {
            fatal(&mut list,WarningKind::StartSector,
                format!("invalid start sector ({}) in catalog entry #{}",entry.start_sector,i+1));
        }
        if entry.end_sector() > total || entry.end_sector() < entry.start_sector as usize {
            fatal(&mut list,WarningKind::EndSector,
                format!("invalid end sector ({}) in catalog entry #{}",entry.end_sector(),i+1));
        }
        if entry.end_sector() > floor {
            fatal(&mut list,WarningKind::OutOfOrder,
                format!("catalog entries are not ordered properly at entry #{}",i+1));
            bad_order = true;
        }
        floor = entry.start_sector as usize;
    }

    if bad_order {
        check_allocation(side,&mut list);
    }

    report(&list,mode,&side.describe());
    list
}

/// Build the occupancy map and warn about any sector claimed twice.
/// Only reached when the ordering invariant already failed.
fn check_allocation(side: &Side,list: &mut Vec<Warning>) {
    let total = side.catalog().total_sectors();
    let mut map = vec![0u8;total];
    map[0] = 0xfe;
    map[1] = 0xfe;
    for (i,entry) in side.catalog().entries().iter().enumerate() {
        if entry.end_sector() > total || (entry.start_sector as usize) > total {
            continue;
        }
        for lsec in entry.start_sector as usize..entry.end_sector() {
            match map[lsec] {
                0xfe => fatal(list,WarningKind::OverlapsCatalog,
                    format!("file #{} overlaps catalog sectors",i+1)),
                0 => map[lsec] = (i + 1) as u8,
                n => fatal(list,WarningKind::OverlapsFile,
                    format!("file #{} overlaps file #{}",i+1,n))
            }
        }
    }
}

fn fatal(list: &mut Vec<Warning>,kind: WarningKind,message: String) {
    list.push(Warning { kind, message, fatal: true });
}

fn cosmetic(list: &mut Vec<Warning>,kind: WarningKind,message: String) {
    list.push(Warning { kind, message, fatal: false });
}

fn report(list: &Vec<Warning>,mode: WarnMode,context: &str) {
    match mode {
        WarnMode::None => {},
        WarnMode::First => {
            if let Some(w) = list.first() {
                warn!("{}: {}",context,w);
            }
        },
        WarnMode::All => {
            for w in list {
                warn!("{}: {}",context,w);
            }
        }
    }
}

/// True when no fatal warning is present
pub fn is_clean(list: &Vec<Warning>) -> bool {
    list.iter().all(|w| !w.fatal)
}
