//! # Digests of files and disk surfaces
//!
//! Digests identify file or disk content regardless of where the sectors
//! happen to sit.  The byte recipes match the established dfsimage tool so
//! digests can be compared across tools:
//! * `Data`: file bytes only
//! * `File`: load and exec addresses (3 bytes each, little endian, masked
//!   to 18 bits), then file bytes
//! * `All`: addresses, access byte, then file bytes
//!
//! Over a whole side, `All` hashes the raw surface, `Used` hashes the used
//! catalog region and every file's data, and `File`/`Data` hash all files
//! sorted by name with their catalog attributes.
//!
//! The hash primitive is pluggable through the `Digest` trait; SHA-1 is
//! provided.

use std::str::FromStr;
use crate::img::store::FileStore;
use crate::DYNERR;
use super::side::Side;
use super::Error;

/// What goes into a digest.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DigestMode {
    /// everything, including unused sectors
    All,
    /// used catalog bytes and file data only
    Used,
    /// file data with names and addresses
    File,
    /// file data without access attributes
    Data
}

impl FromStr for DigestMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "used" => Ok(Self::Used),
            "file" => Ok(Self::File),
            "data" => Ok(Self::Data),
            _ => Err(Error::OptionInvalid)
        }
    }
}

/// A hash primitive: bytes in, digest out.
pub trait Digest {
    fn update(&mut self,data: &[u8]);
    fn finish(self: Box<Self>) -> Vec<u8>;
}

/// The default SHA-1 primitive
pub struct Sha1 {
    inner: sha1_smol::Sha1
}

impl Sha1 {
    pub fn new() -> Box<dyn Digest> {
        Box::new(Self { inner: sha1_smol::Sha1::new() })
    }
}

impl Digest for Sha1 {
    fn update(&mut self,data: &[u8]) {
        self.inner.update(data);
    }
    fn finish(self: Box<Self>) -> Vec<u8> {
        self.inner.digest().bytes().to_vec()
    }
}

/// Look up a hash primitive by name
pub fn new_digest(algorithm: &str) -> Result<Box<dyn Digest>,DYNERR> {
    match algorithm {
        "sha1" => Ok(Sha1::new()),
        _ => Err(Box::new(Error::OptionInvalid))
    }
}

fn addr_bytes(addr: u32) -> [u8;3] {
    let masked = addr & 0x3ffff;
    [(masked & 0xff) as u8,((masked >> 8) & 0xff) as u8,((masked >> 16) & 0xff) as u8]
}

/// Digest of one file's content per the mode.  `Used` behaves as `All`.
pub fn entry_digest(side: &Side,store: &FileStore,index: usize,mode: DigestMode,
                    mut hasher: Box<dyn Digest>) -> Result<String,DYNERR> {
    let entry = match side.entry(index) {
        Some(e) => e,
        None => return Err(Box::new(Error::NotFound))
    };
    let data = side.read_file(store,index)?;
    match mode {
        DigestMode::All | DigestMode::Used => {
            hasher.update(&addr_bytes(entry.load_addr));
            hasher.update(&addr_bytes(entry.exec_addr));
            hasher.update(&[entry.locked as u8]);
        },
        DigestMode::File => {
            hasher.update(&addr_bytes(entry.load_addr));
            hasher.update(&addr_bytes(entry.exec_addr));
        },
        DigestMode::Data => {}
    }
    hasher.update(&data);
    Ok(hex::encode(hasher.finish()))
}

/// Digest of a whole side per the mode
pub fn side_digest(side: &Side,store: &FileStore,mode: DigestMode,
                   mut hasher: Box<dyn Digest>) -> Result<String,DYNERR> {
    match mode {
        DigestMode::All => {
            hasher.update(&side.read_all(store)?);
        },
        DigestMode::Used => {
            // catalog length byte first makes the used region provably unique
            let (sec0,sec1) = side.catalog().to_sectors();
            let cend = side.catalog().end_offset() as usize;
            hasher.update(&[cend as u8]);
            hasher.update(&sec0[0..cend+8]);
            hasher.update(&sec1[0..cend+8]);
            for i in 0..side.number_of_files() {
                hasher.update(&side.read_file(store,i)?);
            }
        },
        DigestMode::File | DigestMode::Data => {
            let mut order: Vec<usize> = (0..side.number_of_files()).collect();
            order.sort_by_key(|i| side.entry(*i).unwrap().sort_key());
            for i in order {
                let entry = side.entry(i).unwrap();
                let mut raw = [0u8;8];
                raw[0..7].copy_from_slice(&entry.name);
                raw[7] = entry.dir;
                for b in raw.iter_mut() {
                    *b &= 0x7f;
                }
                hasher.update(&raw);
                hasher.update(&addr_bytes(entry.load_addr));
                hasher.update(&addr_bytes(entry.exec_addr));
                hasher.update(&entry.length.to_le_bytes()[0..3]);
                hasher.update(&side.read_file(store,i)?);
            }
        }
    }
    Ok(hex::encode(hasher.finish()))
}

/// Digest of a raw logical sector range of a side
pub fn sector_digest(side: &Side,store: &FileStore,start: usize,end: usize,
                     mut hasher: Box<dyn Digest>) -> Result<String,DYNERR> {
    hasher.update(&side.read_range(store,start,end)?);
    Ok(hex::encode(hasher.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_known_answer() {
        let mut h = Sha1::new();
        h.update(b"abc");
        assert_eq!(hex::encode(h.finish()),"a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(new_digest("md5").is_err());
        assert!(new_digest("sha1").is_ok());
    }
}
