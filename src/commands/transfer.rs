//! # Import and export
//!
//! Moves files between the host file system and a disk image.  DFS
//! attributes travel in `.inf` sidecars according to the chosen policy:
//! `auto` uses sidecars when they are present (and writes them when there
//! is something to record), `always` demands them, `never` ignores them.

use std::path::Path;
use std::str::FromStr;
use log::warn;
use crate::image::Image;
use crate::fs::{AddFileOptions,FileSpec,OpContext};
use crate::inf::Inf;
use crate::{DYNERR,STDRESULT};
use super::CommandError;

/// When `.inf` sidecars are consulted or produced
#[derive(PartialEq,Eq,Clone,Copy)]
pub enum InfMode {
    Auto,
    Always,
    Never
}

impl FromStr for InfMode {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(CommandError::InvalidCommand)
        }
    }
}

fn sidecar_path(host_path: &str) -> String {
    format!("{}.inf",host_path)
}

fn read_sidecar(host_path: &str) -> Option<Inf> {
    let line = std::fs::read_to_string(sidecar_path(host_path)).ok()?;
    Inf::from_str(line.lines().next()?).ok()
}

/// Import one host file, honoring its sidecar per the mode.
/// Explicit addresses override whatever the sidecar says.
pub fn import_file(image: &mut Image,host_path: &str,dfs_name: Option<&str>,
                   load_addr: Option<u32>,exec_addr: Option<u32>,locked: bool,
                   inf_mode: InfMode,opts: &AddFileOptions) -> STDRESULT {
    let data = std::fs::read(host_path)?;
    let inf = match inf_mode {
        InfMode::Never => None,
        _ => read_sidecar(host_path)
    };
    if inf_mode==InfMode::Always && inf.is_none() {
        return Err(Box::new(CommandError::InfRequired));
    }
    let name = match (dfs_name,&inf) {
        (Some(n),_) => n.to_string(),
        (None,Some(i)) => i.filename.clone(),
        (None,None) => match Path::new(host_path).file_name() {
            Some(base) => base.to_string_lossy().to_string(),
            None => return Err(Box::new(CommandError::FileNotFound))
        }
    };
    let spec = FileSpec::parse(&name)?;
    let load = load_addr.or(inf.as_ref().map(|i| i.load_addr));
    let exec = exec_addr.or(inf.as_ref().and_then(|i| i.exec_addr));
    let locked = locked || inf.as_ref().map(|i| i.locked).unwrap_or(false);
    image.add_file(&spec,&data,load,exec,locked,opts)?;
    Ok(())
}

/// Import a batch of host files
pub fn import_files(image: &mut Image,host_paths: &[String],inf_mode: InfMode,
                    opts: &AddFileOptions,ctx: &OpContext) -> Result<usize,DYNERR> {
    let mut count = 0;
    for path in host_paths {
        if path.to_lowercase().ends_with(".inf") {
            continue;
        }
        match import_file(image,path,None,None,None,false,inf_mode,opts) {
            Ok(()) => count += 1,
            Err(e) => {
                if !ctx.continue_on_error {
                    return Err(e);
                }
                warn!("{}: not imported: {}",path,e);
            }
        }
    }
    Ok(count)
}

fn host_name_for(entry_fullname: &str) -> String {
    // root directory files drop the `$.` prefix on the host side
    match entry_fullname.strip_prefix("$.") {
        Some(tail) => tail.to_string(),
        None => entry_fullname.to_string()
    }
}

/// Export files to a host directory.  An empty spec list exports every
/// file on the image's default sides.
pub fn export_files(image: &Image,specs: &[FileSpec],output_dir: &str,
                    inf_mode: InfMode,ctx: &OpContext) -> Result<usize,DYNERR> {
    let mut todo: Vec<(usize,usize)> = Vec::new();
    if specs.is_empty() {
        for head in image.default_heads() {
            for i in 0..image.side(head).number_of_files() {
                todo.push((head,i));
            }
        }
    } else {
        for spec in specs {
            match image.find_file(spec) {
                Some(x) => todo.push(x),
                None => {
                    if !ctx.silent {
                        return Err(Box::new(crate::fs::Error::NotFound));
                    }
                }
            }
        }
    }
    let mut count = 0;
    for (head,index) in todo {
        let side = image.side(head);
        let entry = side.entry(index).unwrap();
        let result = (|| -> STDRESULT {
            let data = side.read_file(image.store(),index)?;
            let host_name = host_name_for(&entry.full_name());
            let host_path = Path::new(output_dir).join(&host_name);
            std::fs::write(&host_path,&data)?;
            let needs_inf = match inf_mode {
                InfMode::Never => false,
                InfMode::Always => true,
                InfMode::Auto => entry.load_addr != 0 || entry.exec_addr != 0
                    || entry.locked || host_name != entry.full_name()
            };
            if needs_inf {
                let mut inf = Inf::new(&entry.full_name());
                inf.load_addr = entry.load_addr;
                inf.exec_addr = Some(entry.exec_addr);
                inf.size = Some(entry.length);
                inf.locked = entry.locked;
                std::fs::write(sidecar_path(host_path.to_string_lossy().as_ref()),
                    format!("{}\n",inf))?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => count += 1,
            Err(e) => {
                if !ctx.continue_on_error {
                    return Err(e);
                }
                warn!("{}: not exported: {}",entry.full_name(),e);
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_names() {
        assert_eq!(host_name_for("$.MENU"),"MENU");
        assert_eq!(host_name_for("A.PROG"),"A.PROG");
    }

    #[test]
    fn inf_mode_parsing() {
        assert!(InfMode::from_str("auto").is_ok());
        assert!(InfMode::from_str("sometimes").is_err());
    }
}
