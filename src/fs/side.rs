//! # Side model
//!
//! A `Side` is the in-memory model of one cataloged side of a DFS floppy:
//! the decoded catalog plus the geometry needed to reach its sectors in the
//! backing store.  All catalog invariants are enforced here.
//!
//! Mutating operations are all-or-nothing at the model level: the catalog
//! is snapshotted on entry and restored on any failure, and exactly one BCD
//! sequence bump accompanies each successful operation's catalog write.
//!
//! The side does not own the backing store; the owning `Image` passes it in.

use log::{debug,info};
use crate::img::{Geometry,SECTOR_SIZE};
use crate::img::store::FileStore;
use crate::DYNERR;
use crate::STDRESULT;
use super::catalog::Catalog;
use super::entry::Entry;
use super::validate::{self,WarnMode,Warning};
use super::{AddFileOptions,BootOption,Error,FileSpec,CATALOG_SECTORS,MAX_FILES,sectors_for,is_name_char};

pub struct Side {
    head: usize,
    geom: Geometry,
    cat: Catalog,
    is_valid: bool
}

impl Side {
    /// Decode the side's catalog out of the backing store
    pub fn from_store(store: &FileStore,geom: Geometry,head: usize) -> Result<Self,DYNERR> {
        let off0 = geom.logical_offset(head,0)?;
        let off1 = geom.logical_offset(head,1)?;
        let sec0 = store.read(off0,SECTOR_SIZE)?.to_vec();
        let sec1 = store.read(off1,SECTOR_SIZE)?.to_vec();
        Ok(Self {
            head,
            geom,
            cat: Catalog::from_sectors(&sec0,&sec1),
            is_valid: false
        })
    }
    pub fn head(&self) -> usize {
        self.head
    }
    /// DFS drive number: 0 for side 0, 2 for side 1
    pub fn drive(&self) -> usize {
        self.head * 2
    }
    pub fn catalog(&self) -> &Catalog {
        &self.cat
    }
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }
    /// Physical sectors available on this side of the backing geometry
    pub fn physical_sectors(&self) -> usize {
        self.geom.sectors_per_side()
    }
    pub fn describe(&self) -> String {
        format!("side {}",self.head)
    }
    /// Run the validator, record the result, and return the findings
    pub fn validate(&mut self,mode: WarnMode) -> Vec<Warning> {
        let list = validate::validate_side(self,mode);
        self.is_valid = validate::is_clean(&list);
        list
    }

    // catalog header accessors

    pub fn title(&self) -> String {
        let raw = self.cat.title_bytes();
        let mut trimmed = raw.to_vec();
        while trimmed.last()==Some(&0) {
            trimmed.pop();
        }
        crate::bbc_to_display(&trimmed)
    }
    /// Raw BCD sequence byte
    pub fn sequence(&self) -> u8 {
        self.cat.sequence()
    }
    pub fn boot_option(&self) -> BootOption {
        use num_traits::FromPrimitive;
        BootOption::from_u8(self.cat.boot_option_bits()).unwrap_or(BootOption::None)
    }
    pub fn total_sectors(&self) -> usize {
        self.cat.total_sectors()
    }
    pub fn tracks(&self) -> usize {
        self.cat.total_sectors() / crate::img::SECTORS_PER_TRACK
    }
    /// Number of files; a side that failed validation reports 0 so garbage
    /// entries stay hidden.
    pub fn number_of_files(&self) -> usize {
        match self.is_valid {
            true => self.cat.file_count(),
            false => 0
        }
    }
    pub fn entries(&self) -> Vec<Entry> {
        match self.is_valid {
            true => self.cat.entries(),
            false => Vec::new()
        }
    }
    pub fn entry(&self,index: usize) -> Option<Entry> {
        match index < self.number_of_files() {
            true => Some(self.cat.entry(index)),
            false => None
        }
    }
    /// Find the catalog index of a file by name, DFS case folding applied
    pub fn find_entry(&self,spec: &FileSpec) -> Option<usize> {
        for i in 0..self.number_of_files() {
            let e = self.cat.entry(i);
            if spec.matches(e.dir,&e.name) {
                return Some(i);
            }
        }
        None
    }

    // free space map, derived from the entry table

    /// Sectors occupied by the catalog and all files
    pub fn used_sectors(&self) -> usize {
        if !self.is_valid {
            return self.total_sectors();
        }
        CATALOG_SECTORS + self.entries().iter().map(|e| e.sectors()).sum::<usize>()
    }
    pub fn free_sectors(&self) -> usize {
        self.total_sectors() - self.used_sectors()
    }
    pub fn free_bytes(&self) -> usize {
        self.free_sectors() * SECTOR_SIZE
    }
    /// First sector after the last one occupied by any file.  An invalid
    /// side reports the whole surface so nothing gets truncated away.
    pub fn last_used_sector(&self) -> usize {
        if !self.is_valid {
            return self.physical_sectors();
        }
        match self.entry(0) {
            Some(e) => e.end_sector(),
            None => CATALOG_SECTORS
        }
    }
    /// Size of the largest contiguous free block in sectors
    pub fn largest_free_block(&self) -> usize {
        if !self.is_valid {
            return 0;
        }
        let mut largest = 0;
        let mut ceiling = self.total_sectors();
        for e in self.entries() {
            largest = largest.max(ceiling.saturating_sub(e.end_sector()));
            ceiling = e.start_sector as usize;
        }
        largest.max(ceiling.saturating_sub(CATALOG_SECTORS))
    }
    /// Find a home for a file of `sectors` sectors: the highest-starting
    /// free block that fits, so new files land on top and the catalog stays
    /// ordered by descending start sector without resorting.
    /// Returns the start sector and the catalog index for insertion.
    fn find_free_block(&self,sectors: usize) -> Option<(usize,usize)> {
        let entries = self.entries();
        let mut ceiling = self.total_sectors();
        for (i,e) in entries.iter().enumerate() {
            if ceiling.saturating_sub(e.end_sector()) >= sectors {
                return Some((ceiling - sectors,i));
            }
            ceiling = e.start_sector as usize;
        }
        if ceiling.saturating_sub(CATALOG_SECTORS) >= sectors {
            return Some((ceiling - sectors,entries.len()));
        }
        None
    }
    /// Check whether a file of the given size could be added at all
    pub fn can_add_file(&self,size: usize,compact: bool) -> bool {
        if !self.is_valid || self.number_of_files()==MAX_FILES {
            return false;
        }
        if self.largest_free_block() >= sectors_for(size) {
            return true;
        }
        compact && self.free_sectors() >= sectors_for(size)
    }

    // sector I/O helpers

    /// Read a logical sector range into one buffer
    pub fn read_range(&self,store: &FileStore,start: usize,end: usize) -> Result<Vec<u8>,DYNERR> {
        let mut ans = Vec::new();
        for lsec in start..end {
            let offset = self.geom.logical_offset(self.head,lsec)?;
            ans.extend_from_slice(store.read(offset,SECTOR_SIZE)?);
        }
        Ok(ans)
    }
    /// Write a buffer starting at a logical sector, zero filling the tail
    /// of the last sector
    pub fn write_range(&self,store: &mut FileStore,start: usize,data: &[u8]) -> STDRESULT {
        let sectors = sectors_for(data.len());
        for i in 0..sectors {
            let offset = self.geom.logical_offset(self.head,start+i)?;
            let lo = i * SECTOR_SIZE;
            let hi = data.len().min(lo + SECTOR_SIZE);
            let mut buf = [0u8;SECTOR_SIZE];
            buf[0..hi-lo].copy_from_slice(&data[lo..hi]);
            store.write(offset,&buf)?;
        }
        Ok(())
    }
    /// Read the entire side surface
    pub fn read_all(&self,store: &FileStore) -> Result<Vec<u8>,DYNERR> {
        self.read_range(store,0,self.physical_sectors())
    }
    /// Read the data of the file at catalog index `index`
    pub fn read_file(&self,store: &FileStore,index: usize) -> Result<Vec<u8>,DYNERR> {
        let entry = match self.entry(index) {
            Some(e) => e,
            None => return Err(Box::new(Error::NotFound))
        };
        let mut dat = self.read_range(store,entry.start_sector as usize,entry.end_sector())?;
        dat.truncate(entry.length as usize);
        Ok(dat)
    }

    // mutations

    fn check_valid(&self) -> Result<(),Error> {
        match self.is_valid {
            true => Ok(()),
            false => Err(Error::CatalogCorrupt)
        }
    }
    /// Write the catalog sectors back to the store without sequence bump
    fn write_catalog(&self,store: &mut FileStore) -> STDRESULT {
        let (sec0,sec1) = self.cat.to_sectors();
        store.write(self.geom.logical_offset(self.head,0)?,&sec0)?;
        store.write(self.geom.logical_offset(self.head,1)?,&sec1)?;
        Ok(())
    }
    /// Finish a successful mutation: one BCD sequence bump, then the
    /// catalog goes to the store.
    fn commit(&mut self,store: &mut FileStore) -> STDRESULT {
        self.cat.set_sequence(crate::bcd_next(self.cat.sequence()));
        self.write_catalog(store)
    }

    /// Add a file to this side.
    /// Allocation is highest-fit, so on an empty side the file lands
    /// directly under the top of the disk.  When no contiguous block fits
    /// and `opts.compact` is set, free space is compacted first.
    pub fn add_file(&mut self,store: &mut FileStore,spec: &FileSpec,data: &[u8],
                    load_addr: Option<u32>,exec_addr: Option<u32>,locked: bool,
                    opts: &AddFileOptions) -> Result<Entry,DYNERR> {
        self.check_valid()?;
        check_name(spec)?;
        let saved = self.cat.clone();
        match self.add_file_inner(store,spec,data,load_addr,exec_addr,locked,opts) {
            Ok(entry) => {
                self.commit_or_restore(store,saved)?;
                Ok(entry)
            },
            Err(e) => {
                self.cat = saved;
                Err(e)
            }
        }
    }
    fn add_file_inner(&mut self,store: &mut FileStore,spec: &FileSpec,data: &[u8],
                      load_addr: Option<u32>,exec_addr: Option<u32>,locked: bool,
                      opts: &AddFileOptions) -> Result<Entry,DYNERR> {
        if let Some(i) = self.find_entry(spec) {
            if !opts.replace {
                return Err(Box::new(Error::Exists));
            }
            if self.cat.entry(i).locked && !opts.ignore_access {
                return Err(Box::new(Error::Locked));
            }
            self.cat.remove_entry(i);
        }
        if self.cat.file_count() >= MAX_FILES {
            return Err(Box::new(Error::Full));
        }
        let needed = sectors_for(data.len());
        if needed > self.free_sectors() {
            info!("{} sectors needed, {} free",needed,self.free_sectors());
            return Err(Box::new(Error::NoSpace));
        }
        let found = match self.find_free_block(needed) {
            Some(f) => Some(f),
            None if opts.compact => {
                self.compact_data(store)?;
                self.find_free_block(needed)
            },
            None => None
        };
        let (start,index) = match found {
            Some(f) => f,
            None => return Err(Box::new(Error::NoSpace))
        };
        debug!("file {} gets {} sectors at {}",spec,needed,start);
        self.write_range(store,start,data)?;
        let mut entry = Entry::new();
        entry.set_name(spec.name.as_bytes());
        entry.dir = spec.dir;
        entry.locked = locked;
        entry.length = data.len() as u32;
        entry.start_sector = start as u16;
        entry.load_addr = load_addr.unwrap_or(0) & 0xffffff;
        entry.exec_addr = exec_addr.unwrap_or(entry.load_addr) & 0xffffff;
        self.cat.insert_entry(index,&entry)?;
        Ok(entry)
    }

    /// Delete a file.  The data sectors are left in place, only the
    /// catalog entry goes away.
    pub fn delete(&mut self,store: &mut FileStore,spec: &FileSpec,ignore_access: bool) -> STDRESULT {
        self.check_valid()?;
        let i = match self.find_entry(spec) {
            Some(i) => i,
            None => return Err(Box::new(Error::NotFound))
        };
        if self.cat.entry(i).locked && !ignore_access {
            return Err(Box::new(Error::Locked));
        }
        let saved = self.cat.clone();
        self.cat.remove_entry(i);
        self.commit_or_restore(store,saved)
    }

    /// Rename a file, no data is moved
    pub fn rename(&mut self,store: &mut FileStore,from: &FileSpec,to: &FileSpec,
                  replace: bool,ignore_access: bool) -> STDRESULT {
        self.check_valid()?;
        check_name(to)?;
        let saved = self.cat.clone();
        match self.rename_inner(from,to,replace,ignore_access) {
            Ok(()) => self.commit_or_restore(store,saved),
            Err(e) => {
                self.cat = saved;
                Err(e)
            }
        }
    }
    fn rename_inner(&mut self,from: &FileSpec,to: &FileSpec,replace: bool,ignore_access: bool) -> STDRESULT {
        let mut i = match self.find_entry(from) {
            Some(i) => i,
            None => return Err(Box::new(Error::NotFound))
        };
        if self.cat.entry(i).locked && !ignore_access {
            return Err(Box::new(Error::Locked));
        }
        if let Some(j) = self.find_entry(to) {
            if j != i {
                if !replace {
                    return Err(Box::new(Error::Exists));
                }
                if self.cat.entry(j).locked && !ignore_access {
                    return Err(Box::new(Error::Locked));
                }
                self.cat.remove_entry(j);
                if j < i {
                    i -= 1;
                }
            }
        }
        let mut entry = self.cat.entry(i);
        entry.set_name(to.name.as_bytes());
        entry.dir = to.dir;
        self.cat.set_entry(i,&entry);
        Ok(())
    }

    /// Change the locked flag and/or addresses of a file
    pub fn set_attrib(&mut self,store: &mut FileStore,spec: &FileSpec,
                      locked: Option<bool>,load_addr: Option<u32>,exec_addr: Option<u32>) -> STDRESULT {
        self.check_valid()?;
        let i = match self.find_entry(spec) {
            Some(i) => i,
            None => return Err(Box::new(Error::NotFound))
        };
        let saved = self.cat.clone();
        let mut entry = self.cat.entry(i);
        if let Some(l) = locked {
            entry.locked = l;
        }
        if let Some(a) = load_addr {
            entry.load_addr = a & 0xffffff;
        }
        if let Some(a) = exec_addr {
            entry.exec_addr = a & 0xffffff;
        }
        self.cat.set_entry(i,&entry);
        self.commit_or_restore(store,saved)
    }

    /// Compact fragmented free space.  File regions slide down so that each
    /// starts where the previous one ends, beginning at sector 2; entry
    /// order is unchanged because relative order is preserved.  One
    /// sequence bump covers the whole operation.
    pub fn compact(&mut self,store: &mut FileStore) -> STDRESULT {
        self.check_valid()?;
        let saved = self.cat.clone();
        match self.compact_data(store) {
            Ok(true) => self.commit_or_restore(store,saved),
            Ok(false) => Ok(()),
            Err(_) => {
                self.cat = saved;
                Err(Box::new(Error::IoDuringCompact))
            }
        }
    }
    /// Perform the region moves of a compaction without touching the
    /// on-disk catalog.  Regions move strictly downward through a scratch
    /// buffer, so a partially applied pass never clobbers unmoved data.
    fn compact_data(&mut self,store: &mut FileStore) -> Result<bool,DYNERR> {
        let tail = self.last_used_sector();
        let count = self.cat.file_count();
        let mut next = CATALOG_SECTORS;
        let mut moved = false;
        for i in (0..count).rev() {
            let mut entry = self.cat.entry(i);
            if entry.start_sector as usize != next {
                let scratch = self.read_range(store,entry.start_sector as usize,entry.end_sector())?;
                self.write_range(store,next,&scratch)?;
                entry.start_sector = next as u16;
                self.cat.set_entry(i,&entry);
                moved = true;
            }
            next += entry.sectors();
        }
        if next < tail {
            let zeros = vec![0u8;(tail - next) * SECTOR_SIZE];
            self.write_range(store,next,&zeros)?;
            moved = true;
        }
        Ok(moved)
    }

    /// Initialize the side: the surface is filled with 0xE5, the catalog is
    /// zeroed, then title, boot option and total sector count are written.
    /// The sequence number starts over at zero.
    pub fn format(&mut self,store: &mut FileStore,title: &str,boot: BootOption) -> STDRESULT {
        let filler = vec![0xe5u8;self.physical_sectors() * SECTOR_SIZE];
        self.write_range(store,0,&filler)?;
        self.cat = Catalog::new();
        self.cat.set_total_sectors(self.physical_sectors());
        self.cat.set_title(&crate::display_to_bbc(title)?)?;
        self.cat.set_boot_option_bits(boot as u8);
        self.is_valid = true;
        self.write_catalog(store)
    }

    /// Change the title of the side
    pub fn set_title(&mut self,store: &mut FileStore,title: &str) -> STDRESULT {
        self.check_valid()?;
        self.cat.set_title(&crate::display_to_bbc(title)?)?;
        self.commit(store)
    }

    /// Change the boot option of the side
    pub fn set_boot_option(&mut self,store: &mut FileStore,boot: BootOption) -> STDRESULT {
        self.check_valid()?;
        self.cat.set_boot_option_bits(boot as u8);
        self.commit(store)
    }

    /// Finish a mutation; if the catalog write itself fails, put the model
    /// back the way it was.
    fn commit_or_restore(&mut self,store: &mut FileStore,saved: Catalog) -> STDRESULT {
        match self.commit(store) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.cat = saved;
                Err(e)
            }
        }
    }
}

fn check_name(spec: &FileSpec) -> Result<(),Error> {
    if spec.name.len() < 1 {
        return Err(Error::NameInvalid);
    }
    if spec.name.len() > 7 {
        return Err(Error::NameTooLong);
    }
    if spec.name.bytes().any(|b| !is_name_char(b)) {
        return Err(Error::NameInvalid);
    }
    if !is_name_char(spec.dir) {
        return Err(Error::DirInvalid);
    }
    Ok(())
}
