//! # Backing store for disk images
//!
//! A `FileStore` buffers a window of the image file in memory and tracks
//! how much of it has to be written back.  Plain images use a window that
//! starts at the beginning of the file; an MMB slot uses a 200K window at
//! the slot offset.
//!
//! Reads past the end of the file return zeros, so a truncated image
//! behaves like a shrunk one.  Writes beyond the committed size extend the
//! committed size to the containing sector boundary.  Nothing reaches the
//! file until `save` is called.

use std::fs::{File,OpenOptions};
use std::io::{Read,Seek,SeekFrom,Write};
use std::path::PathBuf;
use log::{debug,warn};
use crate::{DYNERR,STDRESULT};
use super::{Error,OpenMode,SECTOR_SIZE};

pub struct FileStore {
    path: PathBuf,
    file: Option<File>,
    data: Vec<u8>,
    base: u64,
    committed: usize,
    read_only: bool,
    is_new: bool,
    dirty: bool
}

impl FileStore {
    /// Open a backing file and buffer `capacity` bytes starting at `base`.
    /// If the file is shorter than the window the remainder reads as zeros.
    /// With `OpenMode::New` (or `Always` on a missing file) an empty file is
    /// created; it is removed again if the store is discarded unsaved.
    pub fn open(path: &str,mode: OpenMode,for_write: bool,base: u64,capacity: usize) -> Result<Self,DYNERR> {
        let exists = std::path::Path::new(path).exists();
        let create = match (mode,exists) {
            (OpenMode::New,true) => return Err(Box::new(Error::Exists)),
            (OpenMode::Existing,false) => return Err(Box::new(Error::NotFound)),
            (OpenMode::New,false) => true,
            (OpenMode::Always,false) => true,
            (_,true) => false
        };
        if create && !for_write {
            return Err(Box::new(Error::NotFound));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(for_write)
            .create_new(create)
            .open(path)?;
        let mut data = vec![0;capacity];
        let mut committed = 0;
        if !create {
            let fsize = file.metadata()?.len();
            if fsize > base {
                let mut handle = &file;
                handle.seek(SeekFrom::Start(base))?;
                let avail = std::cmp::min((fsize - base) as usize,capacity);
                handle.read_exact(&mut data[0..avail])?;
                committed = avail;
            }
        }
        debug!("opened {} with {} of {} bytes on file",path,committed,capacity);
        Ok(Self {
            path: PathBuf::from(path),
            file: Some(file),
            data,
            base,
            committed,
            read_only: !for_write,
            is_new: create,
            dirty: false
        })
    }
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
    /// Size of the window buffer
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
    /// How many bytes of the window are backed by (or destined for) the file
    pub fn committed(&self) -> usize {
        self.committed
    }
    pub fn is_new(&self) -> bool {
        self.is_new
    }
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub fn is_window(&self) -> bool {
        self.base > 0
    }
    /// Read bytes from the window.  Requests past the window end are an error,
    /// requests past the committed size return zeros.
    pub fn read(&self,offset: usize,len: usize) -> Result<&[u8],DYNERR> {
        if offset + len > self.data.len() {
            return Err(Box::new(Error::AddressOutOfRange));
        }
        Ok(&self.data[offset..offset+len])
    }
    /// Write bytes into the window.  The committed size is extended to the
    /// sector boundary containing the last byte written.
    pub fn write(&mut self,offset: usize,buf: &[u8]) -> STDRESULT {
        if self.read_only {
            return Err(Box::new(Error::ReadOnly));
        }
        if offset + buf.len() > self.data.len() {
            return Err(Box::new(Error::AddressOutOfRange));
        }
        self.data[offset..offset+buf.len()].copy_from_slice(buf);
        let end = offset + buf.len();
        if end > self.committed {
            self.committed = (end + SECTOR_SIZE - 1) / SECTOR_SIZE * SECTOR_SIZE;
        }
        self.dirty = true;
        Ok(())
    }
    /// Fill a range with one byte value
    pub fn fill(&mut self,offset: usize,len: usize,value: u8) -> STDRESULT {
        let buf = vec![value;len];
        self.write(offset,&buf)
    }
    /// Write `len` bytes of the window back to the file at the window base.
    /// `truncate` additionally cuts the file off at the end of the window,
    /// which only makes sense for un-windowed stores.
    pub fn save(&mut self,len: usize,truncate: bool) -> STDRESULT {
        let file = match &mut self.file {
            Some(f) => f,
            None => return Err(Box::new(Error::NotFound))
        };
        file.seek(SeekFrom::Start(self.base))?;
        file.write_all(&self.data[0..len])?;
        if truncate && self.base==0 {
            file.set_len(len as u64)?;
        }
        file.flush()?;
        self.committed = len;
        self.dirty = false;
        self.is_new = false;
        Ok(())
    }
    /// Close the store.  A freshly created file that was never saved is removed.
    pub fn close(&mut self) {
        self.file = None;
        if self.is_new && self.dirty {
            warn!("discarding unsaved new image {}",self.path.display());
        }
        if self.is_new {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("could not remove unsaved image: {}",e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        let mut p = std::env::temp_dir();
        p.push(name);
        p.to_str().unwrap().to_string()
    }

    #[test]
    fn new_file_roundtrip() {
        let path = temp_path("dfskit-store-test1.ssd");
        let _ = std::fs::remove_file(&path);
        let mut store = FileStore::open(&path,OpenMode::New,true,0,1024).unwrap();
        store.write(256,&[1,2,3]).unwrap();
        assert_eq!(store.committed(),512);
        store.save(512,false).unwrap();
        let store2 = FileStore::open(&path,OpenMode::Existing,false,0,1024).unwrap();
        assert_eq!(store2.committed(),512);
        assert_eq!(store2.read(256,3).unwrap(),&[1,2,3]);
        assert_eq!(store2.read(512,4).unwrap(),&[0,0,0,0]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_mode_guards() {
        let path = temp_path("dfskit-store-test2.ssd");
        let _ = std::fs::remove_file(&path);
        assert!(FileStore::open(&path,OpenMode::Existing,true,0,512).is_err());
        let mut store = FileStore::open(&path,OpenMode::New,true,0,512).unwrap();
        store.write(0,&[9]).unwrap();
        store.save(256,false).unwrap();
        assert!(FileStore::open(&path,OpenMode::New,true,0,512).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_only_guard() {
        let path = temp_path("dfskit-store-test3.ssd");
        let _ = std::fs::remove_file(&path);
        std::fs::write(&path,&[0;512]).unwrap();
        let mut store = FileStore::open(&path,OpenMode::Existing,false,0,512).unwrap();
        assert!(store.write(0,&[1]).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
