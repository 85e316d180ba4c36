//! # MMB containers
//!
//! An MMB file packs up to 511 single sided 80 track SSD payloads behind a
//! fixed index, the format used by MMC storage solutions for the BBC Micro.
//! The index is 512 slots of 16 bytes; slot 0 is the header, carrying the
//! four "onboot" drive assignments, and each following slot holds a disk
//! title and a status byte at offset 15.
//!
//! Status byte values are `0x00` locked, `0x0F` unlocked, and anything with
//! the high nibble `0xF` uninitialized.  Unknown values are classified by
//! that rule but always round-trip unchanged.
//!
//! Slot payloads survive `dkill`; only the status byte changes, so
//! `drestore` brings the disk back intact.

use std::fmt;
use log::{info,warn};
use crate::img::{OpenMode,TRACK_SIZE,DOUBLE_TRACKS};
use crate::img::store::FileStore;
use crate::image::Image;
use crate::fs::WarnMode;
use crate::{DYNERR,STDRESULT};

pub const MMB_MAX_ENTRIES: usize = 511;
pub const MMB_ENTRY_SIZE: usize = 16;
pub const MMB_INDEX_SIZE: usize = (MMB_MAX_ENTRIES + 1) * MMB_ENTRY_SIZE;
pub const MMB_DISK_SIZE: usize = DOUBLE_TRACKS * TRACK_SIZE;
pub const MMB_SIZE: usize = MMB_INDEX_SIZE + MMB_MAX_ENTRIES * MMB_DISK_SIZE;

const STATUS_OFFSET: usize = 15;
const STATUS_LOCKED: u8 = 0x00;
const STATUS_UNLOCKED: u8 = 0x0f;
const STATUS_UNINIT: u8 = 0xf0;
const STATUS_UNINIT_MASK: u8 = 0xf0;
const TITLE_LEN: usize = 12;

/// Enumerates MMB errors.  The `Display` trait will print the long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file is not an MMB container")]
    NotAnMmb,
    #[error("image index out of range")]
    SlotOutOfRange,
    #[error("image is not initialized")]
    SlotUninitialized,
    #[error("image is locked")]
    SlotLocked,
    #[error("image index is required for an MMB file")]
    SlotRequired,
    #[error("MMB file is open for read only")]
    ReadOnly
}

/// How many index entries an MMB file of the given size can address
pub fn slot_count_for_size(fsize: u64) -> usize {
    if fsize < (MMB_INDEX_SIZE + MMB_DISK_SIZE) as u64 {
        return 0;
    }
    let slots = (fsize as usize - MMB_INDEX_SIZE) / MMB_DISK_SIZE;
    slots.min(MMB_MAX_ENTRIES)
}

/// Snapshot of one index entry
#[derive(Clone)]
pub struct MmbEntry {
    pub index: usize,
    raw: [u8;MMB_ENTRY_SIZE]
}

impl MmbEntry {
    pub fn status_byte(&self) -> u8 {
        self.raw[STATUS_OFFSET]
    }
    pub fn locked(&self) -> bool {
        self.status_byte() == STATUS_LOCKED
    }
    pub fn initialized(&self) -> bool {
        self.status_byte() & STATUS_UNINIT_MASK != STATUS_UNINIT
    }
    pub fn title(&self) -> String {
        let mut raw = self.raw[0..TITLE_LEN].to_vec();
        while raw.last()==Some(&0) {
            raw.pop();
        }
        crate::bbc_to_display(&raw)
    }
    /// One character status as shown by *DCAT: locked, uninitialized,
    /// invalid flag, or clear
    pub fn status_char(&self) -> char {
        match self.status_byte() {
            STATUS_LOCKED => 'P',
            STATUS_UNLOCKED => ' ',
            b if b & STATUS_UNINIT_MASK == STATUS_UNINIT => 'U',
            _ => 'I'
        }
    }
}

impl fmt::Display for MmbEntry {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{:5} {:12} {}",self.index,self.title(),self.status_char())
    }
}

/// An open MMB container file.  The index is buffered through a `FileStore`
/// window; slot payloads are reached through `Image` views.
pub struct MmbFile {
    store: FileStore,
    path: String,
    count: usize
}

impl MmbFile {
    /// Open an existing MMB file
    pub fn open(path: &str,for_write: bool) -> Result<Self,DYNERR> {
        let fsize = std::fs::metadata(path)?.len();
        let count = slot_count_for_size(fsize);
        if count == 0 {
            return Err(Box::new(Error::NotAnMmb));
        }
        let store = FileStore::open(path,OpenMode::Existing,for_write,0,MMB_INDEX_SIZE)?;
        Ok(Self { store, path: path.to_string(), count })
    }
    /// Create a new MMB file with 511 zero filled slots, all marked
    /// uninitialized, and drives 0-3 pointing at images 0-3
    pub fn create(path: &str) -> Result<Self,DYNERR> {
        let mut store = FileStore::open(path,OpenMode::New,true,0,MMB_INDEX_SIZE)?;
        for i in 0..MMB_MAX_ENTRIES {
            store.write((i + 1) * MMB_ENTRY_SIZE + STATUS_OFFSET,&[STATUS_UNINIT])?;
        }
        let mut ans = Self { store, path: path.to_string(), count: MMB_MAX_ENTRIES };
        for drive in 0..4 {
            ans.set_onboot(drive,drive)?;
        }
        ans.store.save(MMB_INDEX_SIZE,false)?;
        ans.grow_to_full_size()?;
        info!("created MMB file with {} slots",MMB_MAX_ENTRIES);
        Ok(ans)
    }
    fn grow_to_full_size(&self) -> STDRESULT {
        let file = std::fs::OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(MMB_SIZE as u64)?;
        Ok(())
    }
    pub fn path(&self) -> &str {
        &self.path
    }
    /// Number of index entries this file can hold
    pub fn count(&self) -> usize {
        self.count
    }
    pub fn is_read_only(&self) -> bool {
        self.store.is_read_only()
    }
    fn check_index(&self,index: usize) -> Result<usize,DYNERR> {
        match index < self.count {
            true => Ok((index + 1) * MMB_ENTRY_SIZE),
            false => Err(Box::new(Error::SlotOutOfRange))
        }
    }
    /// Snapshot the index entry for image `index`, 0 based
    pub fn entry(&self,index: usize) -> Result<MmbEntry,DYNERR> {
        let offset = self.check_index(index)?;
        let mut raw = [0;MMB_ENTRY_SIZE];
        raw.copy_from_slice(self.store.read(offset,MMB_ENTRY_SIZE)?);
        Ok(MmbEntry { index, raw })
    }
    /// All entries, including uninitialized ones
    pub fn all_entries(&self) -> Result<Vec<MmbEntry>,DYNERR> {
        (0..self.count).map(|i| self.entry(i)).collect()
    }
    /// Byte offset of a slot payload within the MMB file
    pub fn slot_offset(&self,index: usize) -> u64 {
        (MMB_INDEX_SIZE + index * MMB_DISK_SIZE) as u64
    }
    /// Open the payload of image `index` as a single sided 80 track image.
    /// All reads and writes route through the 200K window.
    pub fn open_image(&self,index: usize,for_write: bool,warn_mode: WarnMode) -> Result<Image,DYNERR> {
        self.check_index(index)?;
        Image::open_mmb_slot(&self.path,self.slot_offset(index),for_write,warn_mode)
    }
    /// Replace the title recorded in the index
    pub fn set_title(&mut self,index: usize,title: &str) -> STDRESULT {
        let offset = self.check_index(index)?;
        let raw = crate::display_to_bbc(title)?;
        if raw.len() > TITLE_LEN {
            return Err(Box::new(crate::fs::Error::NameTooLong));
        }
        let mut padded = [0u8;TITLE_LEN];
        padded[0..raw.len()].copy_from_slice(&raw);
        self.store.write(offset,&padded)
    }
    fn set_status(&mut self,index: usize,status: u8) -> STDRESULT {
        let offset = self.check_index(index)?;
        self.store.write(offset + STATUS_OFFSET,&[status])
    }
    /// Mark an image uninitialized, preserving its payload.
    /// Returns false with a warning if it already was.
    pub fn dkill(&mut self,index: usize,unlock: bool) -> Result<bool,DYNERR> {
        let entry = self.entry(index)?;
        if !entry.initialized() {
            warn!("image {} already uninitialized",index);
            return Ok(false);
        }
        if entry.locked() && !unlock {
            return Err(Box::new(Error::SlotLocked));
        }
        self.set_status(index,STATUS_UNINIT)?;
        Ok(true)
    }
    /// Mark an image initialized again, optionally locking it.
    /// Returns false with a warning if it already was.
    pub fn drestore(&mut self,index: usize,lock: bool) -> Result<bool,DYNERR> {
        let entry = self.entry(index)?;
        if entry.initialized() {
            warn!("image {} already initialized",index);
            return Ok(false);
        }
        self.set_status(index,match lock { true => STATUS_LOCKED, false => STATUS_UNLOCKED })?;
        Ok(true)
    }
    /// Lock or unlock an initialized image
    pub fn set_locked(&mut self,index: usize,locked: bool) -> STDRESULT {
        let entry = self.entry(index)?;
        if !entry.initialized() {
            return Err(Box::new(Error::SlotUninitialized));
        }
        self.set_status(index,match locked { true => STATUS_LOCKED, false => STATUS_UNLOCKED })
    }
    /// Image index inserted into `drive` at boot time
    pub fn onboot(&self,drive: usize) -> Result<usize,DYNERR> {
        if drive > 3 {
            return Err(Box::new(Error::SlotOutOfRange));
        }
        let header = self.store.read(0,8)?;
        Ok(header[drive] as usize | ((header[drive + 4] as usize) << 8))
    }
    /// Point `drive` at `image` for boot time
    pub fn set_onboot(&mut self,drive: usize,image: usize) -> STDRESULT {
        if drive > 3 || image >= MMB_MAX_ENTRIES {
            return Err(Box::new(Error::SlotOutOfRange));
        }
        self.store.write(drive,&[(image & 0xff) as u8])?;
        self.store.write(drive + 4,&[(image >> 8) as u8])
    }
    /// Refresh every initialized entry's title from the catalog inside its
    /// slot.  Returns how many titles changed.
    pub fn drecat(&mut self,warn_mode: WarnMode) -> Result<usize,DYNERR> {
        let mut count = 0;
        for index in 0..self.count {
            let entry = self.entry(index)?;
            if !entry.initialized() {
                continue;
            }
            let image = self.open_image(index,false,warn_mode)?;
            let title = image.side(0).title();
            image.close(false)?;
            if title != entry.title() {
                self.set_title(index,&title)?;
                count += 1;
            }
        }
        Ok(count)
    }
    /// Write the index back to the file
    pub fn save(&mut self) -> STDRESULT {
        self.store.save(MMB_INDEX_SIZE,false)
    }
    /// Close, saving the index first unless told otherwise
    pub fn close(mut self,save: bool) -> STDRESULT {
        let mut result = Ok(());
        if save && !self.store.is_read_only() && self.store.is_dirty() {
            result = self.save();
        }
        self.store.close();
        result
    }
}
