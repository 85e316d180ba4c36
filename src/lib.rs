//! # `dfskit` main library
//!
//! This library manipulates Acorn DFS floppy disk images as used by the
//! BBC Micro, including MMB container files that pack many single-sided
//! images into one archive.  Manipulations can be done at a level as low as
//! raw sectors, or as high as whole files with their load and execution
//! addresses.
//!
//! ## Architecture
//!
//! Disk operations are built around three layers:
//! * `img` models disk geometry and the backing file, it does not try to
//!   interpret the catalog
//! * `fs` imposes the DFS catalog structure on the decoded sector data and
//!   owns the catalog invariants
//! * `image::Image` binds one or two `fs::Side` objects to one backing store
//!
//! When an `Image` is created it takes ownership of an `img::FileStore`.
//! Any changes are not permanent until the image is saved back to the file
//! system hosting dfskit.
//!
//! ## Disk Layouts
//!
//! A side has 40 or 80 tracks of ten 256 byte sectors.  Double sided images
//! store the two sides either track-interleaved (the usual `.dsd` layout)
//! or one side after the other (`.ssd` linear layout).  Geometry is
//! inferred from the file size and extension, and can always be overridden.
//!
//! ## MMB Containers
//!
//! The `mmb` module exposes the MMB index and hands out `Image` views over
//! individual 200K slots.

pub mod img;
pub mod fs;
pub mod image;
pub mod mmb;
pub mod inf;
pub mod props;
pub mod commands;

use log::info;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// BBC character code displayed as the pound sign.
pub const BBC_POUND: u8 = 0x60;

/// Convert raw catalog bytes to a display string.
/// Code 0x60 becomes the unicode pound sign, the high bit is stripped,
/// and anything unprintable becomes a dot.  The catalog itself always
/// keeps the raw bytes.
pub fn bbc_to_display(bytes: &[u8]) -> String {
    let mut ans = String::new();
    for b in bytes {
        let b = b & 0x7f;
        match b {
            BBC_POUND => ans.push('\u{a3}'),
            x if x>=0x20 && x<0x7f => ans.push(x as char),
            _ => ans.push('.')
        }
    }
    ans
}

/// Convert a display string to raw catalog bytes.
/// The unicode pound sign becomes code 0x60; non-ASCII characters are an error.
pub fn display_to_bbc(s: &str) -> Result<Vec<u8>,DYNERR> {
    let mut ans = Vec::new();
    for c in s.chars() {
        match c {
            '\u{a3}' => ans.push(BBC_POUND),
            x if x.is_ascii() => ans.push(x as u8),
            _ => return Err(Box::new(fs::Error::NameInvalid))
        }
    }
    Ok(ans)
}

/// Decode a binary coded decimal byte, e.g. 0x42 -> 42.
pub fn from_bcd(val: u8) -> u8 {
    (val % 16) + (val >> 4) * 10
}

/// Encode a value 0-99 as binary coded decimal, e.g. 42 -> 0x42.
pub fn to_bcd(val: u8) -> u8 {
    (val % 10) + ((val / 10) << 4)
}

/// Advance a BCD sequence byte by one, wrapping 0x99 to 0x00.
/// Nibbles outside 0-9 are folded into range first.
pub fn bcd_next(val: u8) -> u8 {
    to_bcd((from_bcd(val) + 1) % 100)
}

/// Open a disk image file with default options.
/// Geometry is inferred from the file size and extension.
pub fn open_image(img_path: &str,for_write: bool) -> Result<image::Image,DYNERR> {
    let mut opt = image::OpenOptions::default();
    opt.for_write = for_write;
    image::Image::open(img_path,&opt)
}

/// Test whether a file looks like an MMB container based on its size.
/// Returns the number of catalog entries the file can hold, or 0.
pub fn mmb_slot_count(img_path: &str) -> usize {
    match std::fs::metadata(img_path) {
        Ok(meta) => mmb::slot_count_for_size(meta.len()),
        Err(_) => 0
    }
}

/// Open either a plain image or one slot of an MMB container.
/// The `index` is required when the path refers to an MMB file.
pub fn open_image_or_slot(img_path: &str,index: Option<usize>,opt: &image::OpenOptions) -> Result<image::Image,DYNERR> {
    if mmb_slot_count(img_path) > 0 {
        let slot = match index {
            Some(i) => i,
            None => return Err(Box::new(mmb::Error::SlotRequired))
        };
        info!("opening {} as MMB slot {}",img_path,slot);
        let mmb_file = mmb::MmbFile::open(img_path,opt.for_write)?;
        return mmb_file.open_image(slot,opt.for_write,opt.warn_mode);
    }
    image::Image::open(img_path,opt)
}

#[test]
fn test_bcd() {
    assert_eq!(from_bcd(0x42),42);
    assert_eq!(to_bcd(99),0x99);
    assert_eq!(bcd_next(0x09),0x10);
    assert_eq!(bcd_next(0x99),0x00);
    assert_eq!(bcd_next(0x00),0x01);
}

#[test]
fn test_pound_translation() {
    assert_eq!(bbc_to_display(&[0x48,0x49,0x60]),"HI\u{a3}");
    assert_eq!(display_to_bbc("HI\u{a3}").unwrap(),vec![0x48,0x49,0x60]);
}
