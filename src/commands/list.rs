//! # Catalog listings
//!
//! Renders the catalog of an image in the formats the old tools print:
//! the two column `*CAT` screen, `*INFO` lines, `.inf` lines, the MMC
//! `*DCAT` index, a fixed table, JSON, or a custom `{field}` format string.

use std::str::FromStr;
use crate::image::Image;
use crate::mmb::MmbFile;
use crate::fs::entry::Entry;
use crate::fs::WarnMode;
use crate::inf::Inf;
use crate::props::{self,FileProperty,SideProperty};
use crate::DYNERR;
use super::{file_prop,side_prop,CommandError};

/// Listing format selection
#[derive(Clone,PartialEq)]
pub enum ListFormat {
    /// file names only
    Raw,
    /// as displayed by `*INFO`
    Info,
    /// as stored in `.inf` files
    Inf,
    /// as displayed by `*CAT`
    Cat,
    /// fixed width text table
    Table,
    /// JSON with all properties
    Json,
    /// as displayed by the MMC `*DCAT` command
    Dcat,
    /// custom `{field}` format string
    Custom(String)
}

impl FromStr for ListFormat {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "info" => Ok(Self::Info),
            "inf" => Ok(Self::Inf),
            "cat" => Ok(Self::Cat),
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "dcat" => Ok(Self::Dcat),
            other => Ok(Self::Custom(other.to_string()))
        }
    }
}

const TABLE_FORMAT: &str = "{filename}|{index}|{fullname}|{access}|{load_addr}|{exec_addr}|{size}|{sha1_data}";

fn info_line(entry: &Entry) -> String {
    let access = match entry.locked { true => "L", false => " " };
    format!("{:<10} {:1}  {:06X} {:06X} {:06X} {:03X}",
        entry.full_name(),access,entry.load_addr,entry.exec_addr,entry.length,entry.start_sector)
}

fn inf_line(entry: &Entry) -> String {
    let mut inf = Inf::new(&entry.full_name());
    inf.load_addr = entry.load_addr;
    inf.exec_addr = Some(entry.exec_addr);
    inf.size = Some(entry.length);
    inf.locked = entry.locked;
    inf.to_string()
}

fn cat_name(entry: &Entry) -> String {
    let dirstr = match entry.dir {
        b'$' => "".to_string(),
        d => format!("{}.",crate::bbc_to_display(&[d]))
    };
    let access = match entry.locked { true => "L", false => " " };
    format!("{:>4}{:<7}  {:1}",dirstr,entry.name_string(),access)
}

/// Print the `*CAT` screen for one side
fn cat_side(image: &Image,head: usize) {
    let side = image.side(head);
    println!("{} ({:02})",side.title(),crate::from_bcd(side.sequence()));
    println!("{:<20}{}",format!("Drive {}",side.drive()),
        format!("Option {} ({})",side.boot_option() as u8,side.boot_option()));
    println!("{:<20}{}",format!("Dir. :{}.$",side.drive()),"Lib. :0.$");
    println!();
    let mut entries = side.entries();
    entries.sort_by_key(|e| e.sort_key());
    // current directory files first, then the rest
    let mut lines: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut gap_done = false;
    for pass in 0..2 {
        for e in &entries {
            let in_root = e.dir==b'$';
            if (pass==0 && !in_root) || (pass==1 && in_root) {
                continue;
            }
            if pass==1 && !gap_done {
                if !row.is_empty() {
                    lines.push(row.join("     "));
                    row.clear();
                }
                lines.push(String::new());
                gap_done = true;
            }
            row.push(cat_name(e));
            if row.len()==2 {
                lines.push(row.join("     "));
                row.clear();
            }
        }
    }
    if !row.is_empty() {
        lines.push(row.join("     "));
    }
    for line in lines {
        println!("{}",line);
    }
    println!();
}

/// Gather one side of the catalog as JSON
fn json_side(image: &Image,head: usize) -> Result<json::JsonValue,DYNERR> {
    let mut side_obj = json::JsonValue::new_object();
    for prop in ["side","title","sequence","opt_str","is_valid","number_of_files",
                 "sectors","free_sectors","max_free_blk","sha1","sha1_files","sha1_used"] {
        let val = side_prop(image,head,SideProperty::from_str(prop)?)?;
        side_obj[prop] = val.to_json();
    }
    let mut files = json::JsonValue::new_array();
    for i in 0..image.side(head).number_of_files() {
        let mut file_obj = json::JsonValue::new_object();
        for prop in ["index","fullname","load_addr","exec_addr","access","size",
                     "start_sector","sectors","sha1","sha1_data","sha1_all"] {
            let val = file_prop(image,head,i,FileProperty::from_str(prop)?)?;
            file_obj[prop] = val.to_json();
        }
        files.push(file_obj).expect("unreachable");
    }
    side_obj["files"] = files;
    Ok(side_obj)
}

/// Print the catalog of the image's default sides in the chosen format
pub fn listing(image: &Image,fmt: &ListFormat,indent: u16) -> crate::STDRESULT {
    match fmt {
        ListFormat::Json => {
            let mut root = json::JsonValue::new_array();
            for head in image.default_heads() {
                root.push(json_side(image,head)?).expect("unreachable");
            }
            match indent {
                0 => println!("{}",json::stringify(root)),
                sp => println!("{}",json::stringify_pretty(root,sp))
            }
            return Ok(());
        },
        ListFormat::Dcat => {
            for head in image.default_heads() {
                let side = image.side(head);
                println!("{:5} {:12}",head,side.title());
            }
            return Ok(());
        },
        _ => {}
    }
    for head in image.default_heads() {
        let side = image.side(head);
        match fmt {
            ListFormat::Cat => cat_side(image,head),
            ListFormat::Raw => {
                for e in side.entries() {
                    println!("{}",e.full_name());
                }
            },
            ListFormat::Info => {
                for e in side.entries() {
                    println!("{}",info_line(&e));
                }
            },
            ListFormat::Inf => {
                for e in side.entries() {
                    println!("{}",inf_line(&e));
                }
            },
            ListFormat::Table | ListFormat::Custom(_) => {
                let custom = match fmt {
                    ListFormat::Custom(s) => s.clone(),
                    _ => TABLE_FORMAT.to_string()
                };
                for i in 0..side.number_of_files() {
                    let line = props::render_format(&custom,&|name| {
                        match FileProperty::from_str(name) {
                            Ok(p) => file_prop(image,head,i,p).ok(),
                            Err(_) => match SideProperty::from_str(name) {
                                Ok(p) => side_prop(image,head,p).ok(),
                                Err(_) => None
                            }
                        }
                    })?;
                    println!("{}",line);
                }
            },
            _ => {}
        }
    }
    Ok(())
}

/// Print the MMC `*DCAT` style index of an MMB file, four entries per line
pub fn dcat(mmb_file: &MmbFile,start: Option<usize>,end: Option<usize>) -> crate::STDRESULT {
    let start = start.unwrap_or(0);
    let end = end.unwrap_or(mmb_file.count());
    let mut line = String::new();
    let mut count = 0;
    for index in start..end.min(mmb_file.count()) {
        let entry = mmb_file.entry(index)?;
        if !entry.initialized() && end - start > 1 {
            continue;
        }
        line += &format!("{:5} {:12} {:1} ",entry.index,entry.title(),entry.status_char());
        count += 1;
        if count==4 {
            println!("{}",line.trim_end());
            line.clear();
            count = 0;
        }
    }
    if count != 0 {
        println!("{}",line.trim_end());
    }
    Ok(())
}

/// Display binary to stdout in columns of hex and ascii
pub fn display_sector(start_addr: usize,block: &[u8]) {
    let mut slice_start = 0;
    while slice_start < block.len() {
        let slice_end = (slice_start + 16).min(block.len());
        let slice = &block[slice_start..slice_end];
        print!("{:06X}  ",start_addr + slice_start);
        for byte in slice {
            print!("{:02X} ",byte);
        }
        for _blank in slice_end..slice_start+16 {
            print!("   ");
        }
        println!(" {}",crate::bbc_to_display(slice));
        slice_start += 16;
    }
}

/// Validate all sides of an image and print the verdict
pub fn validate(image: &mut Image,warn_mode: WarnMode) -> crate::STDRESULT {
    let ok = image.validate(warn_mode);
    for head in 0..image.heads() {
        println!("side {}: {}",head,match image.side(head).is_valid() {
            true => "ok",
            false => "invalid"
        });
    }
    match ok {
        true => Ok(()),
        false => Err(Box::new(crate::fs::Error::CatalogCorrupt))
    }
}
