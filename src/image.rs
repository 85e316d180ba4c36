//! # Disk image
//!
//! An `Image` binds one or two `fs::Side` objects to one backing store and
//! makes the open-time decisions: side count, track count, and layout,
//! either from explicit options or from the size and extension heuristics.
//!
//! Opening and closing an image without mutating it leaves the underlying
//! file byte-identical; sides flush their catalogs into the store buffer as
//! part of each mutation, and the buffer only reaches the file on `save`.

use std::str::FromStr;
use log::{debug,info,warn};
use crate::img::{self,Geometry,Layout,OpenMode,SizeOption,SECTOR_SIZE,TRACK_SIZE,
    SINGLE_TRACKS,DOUBLE_TRACKS,SINGLE_SECTORS,DOUBLE_SECTORS};
use crate::img::store::FileStore;
use crate::fs::{self,AddFileOptions,BootOption,FileSpec,OpContext,WarnMode};
use crate::fs::entry::Entry;
use crate::fs::side::Side;
use crate::{DYNERR,STDRESULT};

/// Options controlling how an image file is opened.
/// Geometry fields left `None` are inferred from the file.
#[derive(Clone,Copy)]
pub struct OpenOptions {
    pub heads: Option<usize>,
    pub tracks: Option<usize>,
    pub layout: Option<Layout>,
    pub open_mode: OpenMode,
    pub for_write: bool,
    pub warn_mode: WarnMode
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            heads: None,
            tracks: None,
            layout: None,
            open_mode: OpenMode::Always,
            for_write: false,
            warn_mode: WarnMode::First
        }
    }
}

/// Options for copying files between images
#[derive(Clone,Copy)]
pub struct CopyOptions {
    pub replace: bool,
    pub ignore_access: bool,
    pub compact: bool,
    /// carry the locked attribute over to the destination
    pub preserve_attr: bool
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self { replace: false, ignore_access: false, compact: true, preserve_attr: false }
    }
}

pub struct Image {
    store: FileStore,
    geom: Geometry,
    sides: Vec<Side>,
    default_head: Option<usize>,
    path: String
}

impl Image {
    /// Open a disk image file.  A missing file is created when the open
    /// mode allows it and write access was requested.
    pub fn open(path: &str,opt: &OpenOptions) -> Result<Self,DYNERR> {
        let exists = std::path::Path::new(path).exists();
        if !exists && opt.open_mode != OpenMode::Existing && opt.for_write {
            return Self::create(path,opt.heads,opt.tracks,opt.layout);
        }
        if opt.open_mode == OpenMode::New {
            if exists {
                return Err(Box::new(img::Error::Exists));
            }
            return Err(Box::new(img::Error::ReadOnly));
        }
        let fsize = std::fs::metadata(path)?.len() as usize;
        let geom = infer_geometry(path,fsize,opt)?;
        info!("{}: opening as {}",path,geom);
        let store = FileStore::open(path,opt.open_mode,opt.for_write,0,geom.byte_capacity())?;
        let mut sides = Vec::new();
        for head in 0..geom.heads {
            let mut side = Side::from_store(&store,geom,head)?;
            side.validate(opt.warn_mode);
            sides.push(side);
        }
        Ok(Self {
            store,
            geom,
            sides,
            default_head: match geom.heads { 1 => Some(0), _ => None },
            path: path.to_string()
        })
    }
    /// Open a 200K window inside an MMB file as a single sided 80 track image
    pub fn open_mmb_slot(path: &str,base: u64,for_write: bool,warn_mode: WarnMode) -> Result<Self,DYNERR> {
        let geom = Geometry::new(1,DOUBLE_TRACKS,Layout::Linear);
        let store = FileStore::open(path,OpenMode::Existing,for_write,base,geom.byte_capacity())?;
        let mut side = Side::from_store(&store,geom,0)?;
        side.validate(warn_mode);
        Ok(Self {
            store,
            geom,
            sides: vec![side],
            default_head: Some(0),
            path: path.to_string()
        })
    }
    /// Create a new image file.  Defaults follow the extension: `.dsd`
    /// means two interleaved sides, a double sided `.ssd` is linear.
    pub fn create(path: &str,heads: Option<usize>,tracks: Option<usize>,layout: Option<Layout>) -> Result<Self,DYNERR> {
        let ext = path_extension(path);
        let heads = heads.unwrap_or(match ext.as_str() { "dsd" => 2, _ => 1 });
        let tracks = tracks.unwrap_or(DOUBLE_TRACKS);
        let layout = resolve_layout(layout,heads,&ext);
        check_geometry(heads,tracks)?;
        let geom = Geometry::new(heads,tracks,layout);
        info!("{}: creating {}",path,geom);
        let mut store = FileStore::open(path,OpenMode::New,true,0,geom.byte_capacity())?;
        let mut sides = Vec::new();
        for head in 0..geom.heads {
            let mut side = Side::from_store(&store,geom,head)?;
            side.format(&mut store,"",BootOption::None)?;
            sides.push(side);
        }
        Ok(Self {
            store,
            geom,
            sides,
            default_head: match geom.heads { 1 => Some(0), _ => None },
            path: path.to_string()
        })
    }
    pub fn path(&self) -> &str {
        &self.path
    }
    pub fn file_name(&self) -> String {
        match std::path::Path::new(&self.path).file_name() {
            Some(s) => s.to_string_lossy().to_string(),
            None => self.path.clone()
        }
    }
    pub fn geometry(&self) -> Geometry {
        self.geom
    }
    pub fn heads(&self) -> usize {
        self.geom.heads
    }
    pub fn side(&self,head: usize) -> &Side {
        &self.sides[head]
    }
    pub fn side_mut(&mut self,head: usize) -> &mut Side {
        &mut self.sides[head]
    }
    pub fn store(&self) -> &FileStore {
        &self.store
    }
    pub fn is_read_only(&self) -> bool {
        self.store.is_read_only()
    }
    pub fn modified(&self) -> bool {
        self.store.is_dirty()
    }
    /// Narrow mutating operations to one side, 0 or 1
    pub fn set_default_side(&mut self,head: Option<usize>) -> STDRESULT {
        match head {
            Some(h) if h >= self.geom.heads => Err(Box::new(fs::Error::DriveInvalid)),
            Some(h) => {
                self.default_head = Some(h);
                Ok(())
            },
            None => {
                if self.geom.heads > 1 {
                    self.default_head = None;
                }
                Ok(())
            }
        }
    }
    /// Heads that operations apply to: the default side, or all of them
    pub fn default_heads(&self) -> Vec<usize> {
        match self.default_head {
            Some(h) => vec![h],
            None => (0..self.geom.heads).collect()
        }
    }
    /// Find a file on the allowed sides
    pub fn find_file(&self,spec: &FileSpec) -> Option<(usize,usize)> {
        let heads = match spec.head {
            Some(h) if h < self.geom.heads => vec![h],
            Some(_) => return None,
            None => self.default_heads()
        };
        for head in heads {
            if let Some(i) = self.sides[head].find_entry(spec) {
                return Some((head,i));
            }
        }
        None
    }
    /// Read a file's entry and data
    pub fn read_file(&self,spec: &FileSpec) -> Result<(Entry,Vec<u8>),DYNERR> {
        let (head,index) = match self.find_file(spec) {
            Some(x) => x,
            None => return Err(Box::new(fs::Error::NotFound))
        };
        let entry = self.sides[head].entry(index).unwrap();
        let dat = self.sides[head].read_file(&self.store,index)?;
        Ok((entry,dat))
    }
    /// Add a file.  The target side is taken from the spec or the default
    /// side; with neither, the first side that can take the file wins.
    pub fn add_file(&mut self,spec: &FileSpec,data: &[u8],load_addr: Option<u32>,
                    exec_addr: Option<u32>,locked: bool,opts: &AddFileOptions) -> Result<Entry,DYNERR> {
        let head = match (spec.head,self.default_head) {
            (Some(h),_) if h >= self.geom.heads => return Err(Box::new(fs::Error::DriveInvalid)),
            (Some(h),_) => h,
            (None,Some(d)) => d,
            (None,None) => {
                let candidates = self.default_heads();
                *candidates.iter()
                    .find(|h| self.sides[**h].can_add_file(data.len(),opts.compact))
                    .unwrap_or(&candidates[0])
            }
        };
        self.sides[head].add_file(&mut self.store,spec,data,load_addr,exec_addr,locked,opts)
    }
    pub fn delete(&mut self,spec: &FileSpec,ignore_access: bool) -> STDRESULT {
        let (head,_) = match self.find_file(spec) {
            Some(x) => x,
            None => return Err(Box::new(fs::Error::NotFound))
        };
        self.sides[head].delete(&mut self.store,spec,ignore_access)
    }
    pub fn rename(&mut self,from: &FileSpec,to: &FileSpec,replace: bool,ignore_access: bool) -> STDRESULT {
        let (head,_) = match self.find_file(from) {
            Some(x) => x,
            None => return Err(Box::new(fs::Error::NotFound))
        };
        if let Some(h) = to.head {
            if h != head {
                return Err(Box::new(fs::Error::DriveInvalid));
            }
        }
        self.sides[head].rename(&mut self.store,from,to,replace,ignore_access)
    }
    pub fn set_attrib(&mut self,spec: &FileSpec,locked: Option<bool>,
                      load_addr: Option<u32>,exec_addr: Option<u32>) -> STDRESULT {
        let (head,_) = match self.find_file(spec) {
            Some(x) => x,
            None => return Err(Box::new(fs::Error::NotFound))
        };
        self.sides[head].set_attrib(&mut self.store,spec,locked,load_addr,exec_addr)
    }
    /// Compact the default side, or every side
    pub fn compact(&mut self) -> STDRESULT {
        for head in self.default_heads() {
            self.sides[head].compact(&mut self.store)?;
        }
        Ok(())
    }
    /// Format the default side, or every side
    pub fn format(&mut self,title: &str,boot: BootOption) -> STDRESULT {
        for head in self.default_heads() {
            self.sides[head].format(&mut self.store,title,boot)?;
        }
        Ok(())
    }
    pub fn set_title(&mut self,head: Option<usize>,title: &str) -> STDRESULT {
        let head = self.one_head(head)?;
        self.sides[head].set_title(&mut self.store,title)
    }
    pub fn set_boot_option(&mut self,head: Option<usize>,boot: BootOption) -> STDRESULT {
        let head = self.one_head(head)?;
        self.sides[head].set_boot_option(&mut self.store,boot)
    }
    fn one_head(&self,head: Option<usize>) -> Result<usize,DYNERR> {
        let head = match (head,self.default_head) {
            (Some(h),_) => h,
            (None,Some(d)) => d,
            (None,None) => return Err(Box::new(fs::Error::DriveInvalid))
        };
        match head < self.geom.heads {
            true => Ok(head),
            false => Err(Box::new(fs::Error::DriveInvalid))
        }
    }
    /// Re-run validation on all sides; true when every side is valid
    pub fn validate(&mut self,mode: WarnMode) -> bool {
        let mut ans = true;
        for side in &mut self.sides {
            side.validate(mode);
            ans &= side.is_valid();
        }
        ans
    }
    /// Read one physical sector
    pub fn read_sector(&self,head: usize,track: usize,sector: usize) -> Result<Vec<u8>,DYNERR> {
        let offset = self.geom.sector_offset(head,track,sector)?;
        Ok(self.store.read(offset,SECTOR_SIZE)?.to_vec())
    }
    /// Overwrite one physical sector, no catalog bookkeeping
    pub fn write_sector(&mut self,head: usize,track: usize,sector: usize,dat: &[u8]) -> STDRESULT {
        if dat.len() > SECTOR_SIZE {
            return Err(Box::new(img::Error::SectorOutOfRange));
        }
        let offset = self.geom.sector_offset(head,track,sector)?;
        self.store.write(offset,dat)
    }
    /// Smallest file size holding every used sector of every side
    pub fn min_size(&self) -> usize {
        let mut end = 0;
        for head in 0..self.geom.heads {
            let last = self.sides[head].last_used_sector();
            if let Ok(offset) = self.geom.logical_end(head,last - 1) {
                end = end.max(offset);
            }
        }
        end
    }
    pub fn max_size(&self) -> usize {
        self.geom.byte_capacity()
    }
    /// Copy all sector data from another image, side by side.  Layout
    /// translation falls out of the per-side addressing.
    pub fn backup(&mut self,source: &Image) -> STDRESULT {
        if source.geom.tracks > self.geom.tracks {
            return Err(Box::new(img::Error::GeometryAmbiguous));
        }
        if source.geom.heads != self.geom.heads {
            return Err(Box::new(img::Error::GeometryAmbiguous));
        }
        for head in 0..self.geom.heads {
            let dat = source.sides[head].read_all(&source.store)?;
            self.sides[head].write_range(&mut self.store,0,&dat)?;
        }
        // the raw copy replaced the catalog sectors, re-decode the sides
        for head in 0..self.geom.heads {
            let mut side = Side::from_store(&self.store,self.geom,head)?;
            side.validate(WarnMode::None);
            self.sides[head] = side;
        }
        Ok(())
    }
    /// Copy cataloged files over from another image.
    /// An empty spec list means every file on the source's default sides.
    pub fn copy_over(&mut self,source: &Image,specs: &[FileSpec],opts: &CopyOptions,
                     ctx: &OpContext) -> Result<usize,DYNERR> {
        let mut todo: Vec<(usize,usize)> = Vec::new();
        if specs.is_empty() {
            for head in source.default_heads() {
                for i in 0..source.sides[head].number_of_files() {
                    todo.push((head,i));
                }
            }
        } else {
            for spec in specs {
                match source.find_file(spec) {
                    Some(x) => todo.push(x),
                    None => {
                        if !ctx.silent {
                            return Err(Box::new(fs::Error::NotFound));
                        }
                    }
                }
            }
        }
        let mut count = 0;
        let add_opts = AddFileOptions {
            replace: opts.replace,
            ignore_access: opts.ignore_access,
            compact: opts.compact
        };
        for (head,index) in &todo {
            let entry = source.sides[*head].entry(*index).unwrap();
            let dat = source.sides[*head].read_file(&source.store,*index)?;
            let spec = FileSpec::new(entry.dir & 0x7f,&entry.name_string());
            let locked = entry.locked && opts.preserve_attr;
            match self.add_file(&spec,&dat,Some(entry.load_addr),Some(entry.exec_addr),locked,&add_opts) {
                Ok(_) => count += 1,
                Err(e) => {
                    if !ctx.continue_on_error {
                        return Err(e);
                    }
                    warn!("{}: {} not copied: {}",self.file_name(),spec,e);
                }
            }
        }
        if count != todo.len() {
            warn!("{}: {} files not copied",self.file_name(),todo.len() - count);
        }
        Ok(count)
    }
    /// Write the buffered image back to the file
    pub fn save(&mut self,size_option: SizeOption) -> STDRESULT {
        if self.store.is_read_only() {
            return Err(Box::new(img::Error::ReadOnly));
        }
        if self.store.is_window() {
            return self.store.save(self.geom.byte_capacity(),false);
        }
        let len = match size_option {
            SizeOption::Expand => self.max_size(),
            SizeOption::Shrink => self.min_size(),
            SizeOption::Keep => {
                if self.store.is_new() {
                    self.max_size()
                } else if self.store.is_dirty() && self.store.committed() < self.min_size() {
                    self.min_size()
                } else {
                    self.store.committed()
                }
            }
        };
        debug!("{}: saving {} bytes",self.path,len);
        self.store.save(len,size_option==SizeOption::Shrink)
    }
    /// Close the image, saving first unless told otherwise.  An unsaved
    /// brand new file is removed.
    pub fn close(mut self,save: bool) -> STDRESULT {
        let mut result = Ok(());
        if save && !self.store.is_read_only() && self.store.is_dirty() {
            result = self.save(SizeOption::Keep);
        }
        self.store.close();
        result
    }
}

fn path_extension(path: &str) -> String {
    match std::path::Path::new(path).extension() {
        Some(e) => e.to_string_lossy().to_lowercase(),
        None => String::new()
    }
}

fn check_geometry(heads: usize,tracks: usize) -> Result<(),DYNERR> {
    if heads < 1 || heads > 2 {
        return Err(Box::new(fs::Error::DriveInvalid));
    }
    if tracks != SINGLE_TRACKS && tracks != DOUBLE_TRACKS {
        return Err(Box::new(img::Error::GeometryAmbiguous));
    }
    Ok(())
}

fn resolve_layout(layout: Option<Layout>,heads: usize,ext: &str) -> Layout {
    if heads == 1 {
        return Layout::Linear;
    }
    match layout {
        Some(l) => l,
        None => match ext {
            "ssd" => Layout::Linear,
            _ => Layout::Interleaved
        }
    }
}

/// Read the total-sector field out of the first catalog on disk, used to
/// tell 40 from 80 track images when nothing else decides it
fn peek_total_sectors(path: &str) -> Option<usize> {
    use std::io::Read;
    let mut dat = [0u8;2 * SECTOR_SIZE];
    let mut file = std::fs::File::open(path).ok()?;
    file.read_exact(&mut dat).ok()?;
    let total = dat[263] as usize | (((dat[262] & 3) as usize) << 8);
    match total {
        SINGLE_SECTORS | DOUBLE_SECTORS => Some(total),
        _ => None
    }
}

/// The geometry heuristics of the toolkit.  Explicit options always win;
/// otherwise the extension and size speak, then the catalog's own
/// total-sector field, and any remaining tie goes to the single sided
/// 80 track reading.
fn infer_geometry(path: &str,fsize: usize,opt: &OpenOptions) -> Result<Geometry,DYNERR> {
    if fsize < 2 * SECTOR_SIZE {
        info!("image size was {}",fsize);
        return Err(Box::new(img::Error::NotAnImage));
    }
    if fsize % SECTOR_SIZE != 0 {
        info!("image size {} is not a sector multiple",fsize);
        return Err(Box::new(img::Error::NotAnImage));
    }
    let ext = path_extension(path);
    let mut heads = match opt.heads {
        Some(h) => h,
        None => match ext.as_str() {
            "dsd" => 2,
            _ if fsize > DOUBLE_TRACKS * TRACK_SIZE => 2,
            _ => 1
        }
    };
    let mut tracks = match opt.tracks {
        Some(t) => t,
        None => match peek_total_sectors(path) {
            Some(SINGLE_SECTORS) => SINGLE_TRACKS,
            Some(_) => DOUBLE_TRACKS,
            // truncated images promote to the smallest canonical geometry
            None => match fsize <= heads * SINGLE_TRACKS * TRACK_SIZE {
                true => SINGLE_TRACKS,
                false => DOUBLE_TRACKS
            }
        }
    };
    // reconcile an inferred geometry that came out too small for the file
    if fsize > heads * tracks * TRACK_SIZE && opt.tracks.is_none() {
        tracks = DOUBLE_TRACKS;
    }
    if fsize > heads * tracks * TRACK_SIZE && opt.heads.is_none() {
        heads = 2;
    }
    check_geometry(heads,tracks)?;
    if fsize > heads * tracks * TRACK_SIZE {
        info!("image size {} exceeds {} tracks on {} sides",fsize,tracks,heads);
        return Err(Box::new(img::Error::GeometryAmbiguous));
    }
    let layout = resolve_layout(opt.layout,heads,&ext);
    // a double sided image must at least reach its second catalog
    if heads == 2 {
        let side1_catalog_end = match layout {
            Layout::Interleaved => TRACK_SIZE + 2 * SECTOR_SIZE,
            Layout::Linear => tracks * TRACK_SIZE + 2 * SECTOR_SIZE
        };
        if fsize < side1_catalog_end {
            info!("image too small for second catalog of {} layout",layout);
            return Err(Box::new(img::Error::NotAnImage));
        }
    }
    Ok(Geometry::new(heads,tracks,layout))
}

impl FromStr for SizeOption {
    type Err = img::Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "keep" => Ok(Self::Keep),
            "expand" => Ok(Self::Expand),
            "shrink" => Ok(Self::Shrink),
            _ => Err(img::Error::UnknownOption)
        }
    }
}
