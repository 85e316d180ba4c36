//! # Disk Geometry Module
//!
//! This module models the physical arrangement of a DFS disk image:
//! how many sides, how many tracks, and how the tracks of a double sided
//! disk are ordered within the image file.  It also contains the backing
//! store, which presents the image file as a fixed-geometry byte array.
//!
//! The catalog structure is deliberately not interpreted here; that is the
//! business of the `fs` module.
//!
//! ## Addressing
//!
//! A sector is addressed physically as `(side, track, sector)` or
//! logically as `(side, L)` with `L = track*10 + sector`.  Both forms are
//! translated to file offsets according to the layout:
//! * `Linear`: all tracks of side 0, then all tracks of side 1
//! * `Interleaved`: track N of side 0, then track N of side 1, for each N
//!
//! Single sided images use the same formulas with one head, where the two
//! layouts coincide.

pub mod store;

use std::fmt;
use std::str::FromStr;

pub const SECTOR_SIZE: usize = 256;
pub const SECTORS_PER_TRACK: usize = 10;
pub const TRACK_SIZE: usize = SECTORS_PER_TRACK * SECTOR_SIZE;
pub const SINGLE_TRACKS: usize = 40;
pub const DOUBLE_TRACKS: usize = 80;
pub const SINGLE_SECTORS: usize = SINGLE_TRACKS * SECTORS_PER_TRACK;
pub const DOUBLE_SECTORS: usize = DOUBLE_TRACKS * SECTORS_PER_TRACK;

/// Enumerates geometry and store errors.  The `Display` trait will print the long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file is not a DFS image")]
    NotAnImage,
    #[error("disk geometry is ambiguous, override with explicit options")]
    GeometryAmbiguous,
    #[error("track address out of range")]
    AddressOutOfRange,
    #[error("sector number out of range")]
    SectorOutOfRange,
    #[error("image is open for read only")]
    ReadOnly,
    #[error("image file already exists")]
    Exists,
    #[error("image file not found")]
    NotFound,
    #[error("unknown option value")]
    UnknownOption
}

/// How the open call treats an existing or missing file.
#[derive(PartialEq,Eq,Clone,Copy)]
pub enum OpenMode {
    /// Create new or open existing file
    Always,
    /// Create new file, fail if the file already exists
    New,
    /// Open existing file, fail if the file doesn't exist
    Existing
}

/// How the image file is sized when saved.
#[derive(PartialEq,Eq,Clone,Copy)]
pub enum SizeOption {
    /// Keep size, possibly expanding as needed
    Keep,
    /// Expand to maximum size for the geometry
    Expand,
    /// Shrink to minimum size that includes the last used sector
    Shrink
}

/// Ordering of the two sides of a double sided image within the file.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Layout {
    /// all tracks of side 0, then all tracks of side 1 (double sided `.ssd`)
    Linear,
    /// track N of side 0 followed by track N of side 1 (`.dsd`)
    Interleaved
}

impl FromStr for Layout {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "interleaved" => Ok(Self::Interleaved),
            _ => Err(Error::UnknownOption)
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f,"linear"),
            Self::Interleaved => write!(f,"interleaved")
        }
    }
}

/// Physical shape of a disk image: side count, tracks per side, layout.
#[derive(PartialEq,Eq,Clone,Copy)]
pub struct Geometry {
    pub heads: usize,
    pub tracks: usize,
    pub layout: Layout
}

impl Geometry {
    pub fn new(heads: usize,tracks: usize,layout: Layout) -> Self {
        Self { heads, tracks, layout }
    }
    /// Number of sectors on one side
    pub fn sectors_per_side(&self) -> usize {
        self.tracks * SECTORS_PER_TRACK
    }
    /// Size in bytes of the complete image
    pub fn byte_capacity(&self) -> usize {
        self.heads * self.tracks * TRACK_SIZE
    }
    /// Offset of the start of a track within the image file
    pub fn track_offset(&self,head: usize,track: usize) -> Result<usize,Error> {
        if head >= self.heads || track >= self.tracks {
            return Err(Error::AddressOutOfRange);
        }
        match self.layout {
            Layout::Linear => Ok((head * self.tracks + track) * TRACK_SIZE),
            Layout::Interleaved => Ok((track * self.heads + head) * TRACK_SIZE)
        }
    }
    /// Offset of a sector given the physical address
    pub fn sector_offset(&self,head: usize,track: usize,sector: usize) -> Result<usize,Error> {
        if sector >= SECTORS_PER_TRACK {
            return Err(Error::SectorOutOfRange);
        }
        Ok(self.track_offset(head,track)? + sector * SECTOR_SIZE)
    }
    /// Offset of a sector given the logical sector number on a side
    pub fn logical_offset(&self,head: usize,lsec: usize) -> Result<usize,Error> {
        let (track,sector) = logical_to_physical(lsec);
        self.sector_offset(head,track,sector)
    }
    /// Offset of the first byte after the given logical sector
    pub fn logical_end(&self,head: usize,lsec: usize) -> Result<usize,Error> {
        Ok(self.logical_offset(head,lsec)? + SECTOR_SIZE)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{} side{} {} tracks {}",self.heads,
            match self.heads { 1 => "", _ => "s" },self.tracks,self.layout)
    }
}

/// Convert a logical sector number to physical track and sector numbers.
pub fn logical_to_physical(lsec: usize) -> (usize,usize) {
    (lsec / SECTORS_PER_TRACK, lsec % SECTORS_PER_TRACK)
}

/// Convert a physical track and sector number to a logical sector number.
/// Sector 10 is accepted as pointing just past the end of a track.
pub fn physical_to_logical(track: usize,sector: usize) -> Result<usize,Error> {
    if sector > SECTORS_PER_TRACK {
        return Err(Error::SectorOutOfRange);
    }
    Ok(track * SECTORS_PER_TRACK + sector)
}
