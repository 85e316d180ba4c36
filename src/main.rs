//! # Command Line Interface
//!
//! Simple subcommands are directly in `main.rs`.
//! More elaborate subcommands are in the `commands` module.

use clap::{Arg,ArgAction,ArgMatches,Command};
use env_logger;
use std::str::FromStr;
use dfskit::img::{Layout,OpenMode,SizeOption};
use dfskit::image::{CopyOptions,Image,OpenOptions};
use dfskit::fs::{AddFileOptions,BootOption,FileSpec,OpContext,WarnMode};
use dfskit::fs::digest::{self,DigestMode};
use dfskit::commands::{self,list,transfer,ImageSpec};
use dfskit::commands::list::ListFormat;
use dfskit::commands::transfer::InfMode;
use dfskit::mmb::MmbFile;
use dfskit::STDRESULT;

const RCH: &str = "unreachable was reached";

fn dimg_arg() -> Arg {
    Arg::new("dimg").short('d').long("dimg").help("path to disk image, MMB slots as PATH:N")
        .value_name("PATH").required(true)
}

fn file_arg() -> Arg {
    Arg::new("file").short('f').long("file").help("DFS file name, e.g. $.MENU or :2.A.PROG")
        .value_name("NAME").required(true)
}

fn side_arg() -> Arg {
    Arg::new("side").short('s').long("side").help("restrict to one side of a double sided image")
        .value_name("SIDE").value_parser(["1","2"]).required(false)
}

fn geometry_args(cmd: Command) -> Command {
    cmd
    .arg(Arg::new("sides").long("sides").help("number of disk sides")
        .value_name("SIDES").value_parser(["1","2"]).required(false))
    .arg(Arg::new("tracks").long("tracks").help("tracks per side")
        .value_name("TRACKS").value_parser(["40","80"]).required(false))
    .arg(Arg::new("layout").long("layout").help("layout of a double sided image")
        .value_name("LAYOUT").value_parser(["linear","interleaved"]).required(false))
    .arg(Arg::new("mode").long("mode").help("how to treat an existing or missing file")
        .value_name("MODE").value_parser(["always","new","existing"]).required(false))
    .arg(Arg::new("warn").long("warn").help("validation warning mode")
        .value_name("WARN").value_parser(["first","none","all"]).required(false))
    .arg(side_arg())
}

fn batch_args(cmd: Command) -> Command {
    cmd
    .arg(Arg::new("replace").long("replace").help("replace existing files").action(ArgAction::SetTrue))
    .arg(Arg::new("ignore-access").long("ignore-access").help("allow replacing or deleting locked files").action(ArgAction::SetTrue))
    .arg(Arg::new("no-compact").long("no-compact").help("fail rather than compact free space").action(ArgAction::SetTrue))
    .arg(Arg::new("continue").long("continue").help("continue batch after an error").action(ArgAction::SetTrue))
}

fn build_cli() -> Command {
    let long_help = "dfskit manipulates Acorn DFS disk images (.ssd/.dsd) and MMB containers.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
create an image:     `dfskit create -d games.ssd --title GAMES`
import files:        `dfskit import -d games.ssd MENU LOADER`
catalog:             `dfskit cat -d games.ssd`
copy between disks:  `dfskit copy --from old.ssd --to new.ssd $.MENU`
MMB slot access:     `dfskit info -d beeb.mmb:12`";
    let digest_modes = ["all","used","file","data"];
    let inf_modes = ["auto","always","never"];
    Command::new("dfskit")
        .about("Manipulates Acorn DFS disk images and MMB containers.")
        .after_long_help(long_help)
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
    .subcommand(geometry_args(Command::new("create"))
        .arg(dimg_arg())
        .arg(Arg::new("title").long("title").help("disk title, up to 12 characters").value_name("TITLE").required(false))
        .arg(Arg::new("opt").long("opt").help("boot option").value_name("OPT").value_parser(["off","load","run","exec","0","1","2","3"]).required(false))
        .about("create a blank disk image"))
    .subcommand(geometry_args(Command::new("cat"))
        .arg(dimg_arg())
        .about("display catalog the way *CAT does"))
    .subcommand(geometry_args(Command::new("info"))
        .arg(dimg_arg())
        .about("display catalog the way *INFO does"))
    .subcommand(geometry_args(Command::new("list"))
        .arg(dimg_arg())
        .arg(Arg::new("fmt").long("fmt").help("format: raw,info,inf,cat,table,json,dcat, or a {field} string")
            .value_name("FORMAT").required(false))
        .arg(Arg::new("indent").long("indent").help("JSON indentation, omit to minify")
            .value_name("SPACES").required(false))
        .about("display catalog in a chosen format"))
    .subcommand(batch_args(geometry_args(Command::new("import")))
        .arg(dimg_arg())
        .arg(Arg::new("files").help("host files to import").value_name("FILES").num_args(1..).required(true))
        .arg(Arg::new("inf").long("inf").help("sidecar policy").value_name("MODE").value_parser(inf_modes).required(false))
        .about("import host files into the image"))
    .subcommand(geometry_args(Command::new("export"))
        .arg(dimg_arg())
        .arg(Arg::new("output").short('o').long("output").help("host directory to write into").value_name("DIR").required(true))
        .arg(Arg::new("files").help("DFS file names, all files if omitted").value_name("FILES").num_args(0..))
        .arg(Arg::new("inf").long("inf").help("sidecar policy").value_name("MODE").value_parser(inf_modes).required(false))
        .arg(Arg::new("continue").long("continue").help("continue batch after an error").action(ArgAction::SetTrue))
        .about("export files to the host file system"))
    .subcommand(batch_args(Command::new("copy"))
        .arg(Arg::new("from").long("from").help("source image").value_name("PATH").required(true))
        .arg(Arg::new("to").long("to").help("destination image").value_name("PATH").required(true))
        .arg(Arg::new("files").help("DFS file names, all files if omitted").value_name("FILES").num_args(0..))
        .arg(Arg::new("preserve").long("preserve").help("carry the locked attribute over").action(ArgAction::SetTrue))
        .about("copy files from one image to another"))
    .subcommand(geometry_args(Command::new("delete"))
        .arg(dimg_arg())
        .arg(file_arg())
        .arg(Arg::new("ignore-access").long("ignore-access").help("allow deleting locked files").action(ArgAction::SetTrue))
        .arg(Arg::new("silent").long("silent").help("no error when the file is missing").action(ArgAction::SetTrue))
        .about("delete a file"))
    .subcommand(geometry_args(Command::new("rename"))
        .arg(dimg_arg())
        .arg(file_arg())
        .arg(Arg::new("name").short('n').long("name").help("new DFS name").value_name("NAME").required(true))
        .arg(Arg::new("replace").long("replace").help("replace an existing file").action(ArgAction::SetTrue))
        .arg(Arg::new("ignore-access").long("ignore-access").help("allow renaming over locked files").action(ArgAction::SetTrue))
        .about("rename a file, no data moves"))
    .subcommand(geometry_args(Command::new("access"))
        .arg(dimg_arg())
        .arg(file_arg())
        .arg(Arg::new("locked").short('L').long("locked").help("lock or unlock").value_name("BOOL").value_parser(["true","false"]).required(false))
        .arg(Arg::new("load").long("load").help("new load address in hex").value_name("ADDR").required(false))
        .arg(Arg::new("exec").long("exec").help("new exec address in hex").value_name("ADDR").required(false))
        .about("change file attributes"))
    .subcommand(geometry_args(Command::new("compact"))
        .arg(dimg_arg())
        .about("compact fragmented free space"))
    .subcommand(geometry_args(Command::new("format"))
        .arg(dimg_arg())
        .arg(Arg::new("title").long("title").help("disk title").value_name("TITLE").required(false))
        .arg(Arg::new("opt").long("opt").help("boot option").value_name("OPT").value_parser(["off","load","run","exec","0","1","2","3"]).required(false))
        .about("re-initialize sides of an existing image"))
    .subcommand(geometry_args(Command::new("title"))
        .arg(dimg_arg())
        .arg(Arg::new("title").help("new disk title").value_name("TITLE").required(true))
        .about("set the disk title"))
    .subcommand(geometry_args(Command::new("opt"))
        .arg(dimg_arg())
        .arg(Arg::new("opt").help("boot option").value_name("OPT").value_parser(["off","load","run","exec","0","1","2","3"]).required(true))
        .about("set the boot option"))
    .subcommand(geometry_args(Command::new("convert"))
        .arg(Arg::new("from").long("from").help("source image").value_name("PATH").required(true))
        .arg(Arg::new("to").long("to").help("destination image").value_name("PATH").required(true))
        .arg(Arg::new("to-layout").long("to-layout").help("layout of the destination").value_name("LAYOUT").value_parser(["linear","interleaved"]).required(false))
        .about("copy an image into another layout"))
    .subcommand(geometry_args(Command::new("backup"))
        .arg(Arg::new("from").long("from").help("source image").value_name("PATH").required(true))
        .arg(Arg::new("to").long("to").help("destination image").value_name("PATH").required(true))
        .about("copy all sector data onto another image"))
    .subcommand(geometry_args(Command::new("digest"))
        .arg(dimg_arg())
        .arg(Arg::new("file").short('f').long("file").help("digest one file instead of the side").value_name("NAME").required(false))
        .arg(Arg::new("dmode").long("dmode").help("what goes into the digest").value_name("MODE").value_parser(digest_modes).required(false))
        .arg(Arg::new("sector").long("sector").help("digest a sector range like 0-1").value_name("RANGE").required(false))
        .arg(Arg::new("algorithm").long("algorithm").help("hash algorithm").value_name("ALG").required(false))
        .about("print content digests"))
    .subcommand(geometry_args(Command::new("validate"))
        .arg(dimg_arg())
        .about("run the catalog validator"))
    .subcommand(geometry_args(Command::new("dump"))
        .arg(dimg_arg())
        .arg(Arg::new("sector").long("sector").help("physical address track/sector").value_name("T/S").required(true))
        .about("hex dump one sector"))
    .subcommand(Command::new("resize")
        .arg(dimg_arg())
        .arg(Arg::new("size").long("size").help("size policy").value_name("POLICY").value_parser(["keep","expand","shrink"]).required(true))
        .about("expand or shrink the image file"))
    .subcommand(Command::new("dnew")
        .arg(dimg_arg())
        .about("create a blank MMB container"))
    .subcommand(Command::new("dcat")
        .arg(dimg_arg())
        .arg(Arg::new("start").long("start").help("first index to list").value_name("N").required(false))
        .arg(Arg::new("end").long("end").help("one past the last index").value_name("N").required(false))
        .about("list the index of an MMB container"))
    .subcommand(Command::new("dkill")
        .arg(dimg_arg())
        .arg(Arg::new("unlock").long("unlock").help("also clear the lock flag").action(ArgAction::SetTrue))
        .about("mark an MMB image uninitialized, keeping its data"))
    .subcommand(Command::new("drestore")
        .arg(dimg_arg())
        .arg(Arg::new("lock").long("lock").help("also set the lock flag").action(ArgAction::SetTrue))
        .about("mark an MMB image initialized again"))
    .subcommand(Command::new("drecat")
        .arg(dimg_arg())
        .about("refresh MMB index titles from the slot catalogs"))
    .subcommand(Command::new("donboot")
        .arg(dimg_arg())
        .arg(Arg::new("drive").long("drive").help("drive 0-3").value_name("DRIVE").value_parser(["0","1","2","3"]).required(false))
        .arg(Arg::new("image").long("image").help("image index to insert").value_name("N").required(false))
        .about("show or set the images loaded at boot"))
}

fn open_options(matches: &ArgMatches,for_write: bool) -> Result<OpenOptions,Box<dyn std::error::Error>> {
    let mut opt = OpenOptions::default();
    opt.for_write = for_write;
    if let Some(s) = matches.try_get_one::<String>("sides").unwrap_or(None) {
        opt.heads = Some(usize::from_str(s)?);
    }
    if let Some(t) = matches.try_get_one::<String>("tracks").unwrap_or(None) {
        opt.tracks = Some(usize::from_str(t)?);
    }
    if let Some(l) = matches.try_get_one::<String>("layout").unwrap_or(None) {
        opt.layout = Some(Layout::from_str(l)?);
    }
    if let Some(m) = matches.try_get_one::<String>("mode").unwrap_or(None) {
        opt.open_mode = match m.as_str() {
            "new" => OpenMode::New,
            "existing" => OpenMode::Existing,
            _ => OpenMode::Always
        };
    }
    if let Some(w) = matches.try_get_one::<String>("warn").unwrap_or(None) {
        opt.warn_mode = WarnMode::from_str(w)?;
    }
    Ok(opt)
}

/// Open the image named by `--dimg`, route MMB slots through the container
fn open_from_matches(matches: &ArgMatches,for_write: bool) -> Result<Image,Box<dyn std::error::Error>> {
    let spec = ImageSpec::from_str(matches.get_one::<String>("dimg").expect(RCH))?;
    let opt = open_options(matches,for_write)?;
    let mut image = dfskit::open_image_or_slot(&spec.path,spec.index,&opt)?;
    if let Some(s) = matches.try_get_one::<String>("side").unwrap_or(None) {
        image.set_default_side(Some(usize::from_str(s)? - 1))?;
    }
    Ok(image)
}

fn add_options(matches: &ArgMatches) -> AddFileOptions {
    AddFileOptions {
        replace: matches.get_flag("replace"),
        ignore_access: matches.get_flag("ignore-access"),
        compact: !matches.get_flag("no-compact")
    }
}

fn context(matches: &ArgMatches) -> OpContext {
    let mut ctx = OpContext::default();
    ctx.continue_on_error = matches.try_get_one::<bool>("continue")
        .map(|v| v==Some(&true)).unwrap_or(false);
    ctx
}

fn boot_option(matches: &ArgMatches) -> Result<BootOption,Box<dyn std::error::Error>> {
    match matches.try_get_one::<String>("opt").unwrap_or(None) {
        Some(s) => Ok(BootOption::from_str(s)?),
        None => Ok(BootOption::None)
    }
}

fn file_specs(matches: &ArgMatches) -> Result<Vec<FileSpec>,Box<dyn std::error::Error>> {
    let mut ans = Vec::new();
    if let Some(names) = matches.try_get_many::<String>("files").unwrap_or(None) {
        for name in names {
            ans.push(FileSpec::parse(name)?);
        }
    }
    Ok(ans)
}

fn mmb_and_slot(matches: &ArgMatches,for_write: bool) -> Result<(MmbFile,usize),Box<dyn std::error::Error>> {
    let spec = ImageSpec::from_str(matches.get_one::<String>("dimg").expect(RCH))?;
    let index = match spec.index {
        Some(i) => i,
        None => return Err(Box::new(dfskit::mmb::Error::SlotRequired))
    };
    Ok((MmbFile::open(&spec.path,for_write)?,index))
}

fn main() -> STDRESULT {
    env_logger::init();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("create",sub)) => {
            let spec = ImageSpec::from_str(sub.get_one::<String>("dimg").expect(RCH))?;
            let opt = open_options(sub,true)?;
            let mut image = Image::create(&spec.path,opt.heads,opt.tracks,opt.layout)?;
            if let Some(title) = sub.get_one::<String>("title") {
                image.format(title,boot_option(sub)?)?;
            } else if sub.get_one::<String>("opt").is_some() {
                image.format("",boot_option(sub)?)?;
            }
            image.close(true)
        },
        Some(("cat",sub)) => {
            let image = open_from_matches(sub,false)?;
            list::listing(&image,&ListFormat::Cat,0)?;
            image.close(false)
        },
        Some(("info",sub)) => {
            let image = open_from_matches(sub,false)?;
            list::listing(&image,&ListFormat::Info,0)?;
            image.close(false)
        },
        Some(("list",sub)) => {
            let image = open_from_matches(sub,false)?;
            let fmt = match sub.get_one::<String>("fmt") {
                Some(s) => ListFormat::from_str(s)?,
                None => ListFormat::Cat
            };
            let indent = match sub.get_one::<String>("indent") {
                Some(s) => u16::from_str(s)?,
                None => 0
            };
            list::listing(&image,&fmt,indent)?;
            image.close(false)
        },
        Some(("import",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            let paths: Vec<String> = sub.get_many::<String>("files").expect(RCH).cloned().collect();
            let inf_mode = match sub.get_one::<String>("inf") {
                Some(s) => InfMode::from_str(s)?,
                None => InfMode::Auto
            };
            let count = transfer::import_files(&mut image,&paths,inf_mode,&add_options(sub),&context(sub))?;
            println!("{} files imported",count);
            image.close(true)
        },
        Some(("export",sub)) => {
            let image = open_from_matches(sub,false)?;
            let inf_mode = match sub.get_one::<String>("inf") {
                Some(s) => InfMode::from_str(s)?,
                None => InfMode::Auto
            };
            let count = transfer::export_files(&image,&file_specs(sub)?,
                sub.get_one::<String>("output").expect(RCH),inf_mode,&context(sub))?;
            println!("{} files exported",count);
            image.close(false)
        },
        Some(("copy",sub)) => {
            let from = ImageSpec::from_str(sub.get_one::<String>("from").expect(RCH))?;
            let to = ImageSpec::from_str(sub.get_one::<String>("to").expect(RCH))?;
            let source = dfskit::open_image_or_slot(&from.path,from.index,&OpenOptions::default())?;
            let mut wopt = OpenOptions::default();
            wopt.for_write = true;
            let mut dest = dfskit::open_image_or_slot(&to.path,to.index,&wopt)?;
            let opts = CopyOptions {
                replace: sub.get_flag("replace"),
                ignore_access: sub.get_flag("ignore-access"),
                compact: !sub.get_flag("no-compact"),
                preserve_attr: sub.get_flag("preserve")
            };
            let count = dest.copy_over(&source,&file_specs(sub)?,&opts,&context(sub))?;
            println!("{} files copied",count);
            source.close(false)?;
            dest.close(true)
        },
        Some(("delete",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            let spec = FileSpec::parse(sub.get_one::<String>("file").expect(RCH))?;
            match image.delete(&spec,sub.get_flag("ignore-access")) {
                Ok(()) => image.close(true),
                Err(e) => {
                    let missing = matches!(e.downcast_ref::<dfskit::fs::Error>(),
                        Some(dfskit::fs::Error::NotFound));
                    image.close(false)?;
                    match sub.get_flag("silent") && missing {
                        true => Ok(()),
                        false => Err(e)
                    }
                }
            }
        },
        Some(("rename",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            let from = FileSpec::parse(sub.get_one::<String>("file").expect(RCH))?;
            let to = FileSpec::parse(sub.get_one::<String>("name").expect(RCH))?;
            image.rename(&from,&to,sub.get_flag("replace"),sub.get_flag("ignore-access"))?;
            image.close(true)
        },
        Some(("access",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            let spec = FileSpec::parse(sub.get_one::<String>("file").expect(RCH))?;
            let locked = sub.get_one::<String>("locked").map(|s| s=="true");
            let load = match sub.get_one::<String>("load") {
                Some(s) => Some(commands::parse_addr(s)?),
                None => None
            };
            let exec = match sub.get_one::<String>("exec") {
                Some(s) => Some(commands::parse_addr(s)?),
                None => None
            };
            image.set_attrib(&spec,locked,load,exec)?;
            image.close(true)
        },
        Some(("compact",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            image.compact()?;
            image.close(true)
        },
        Some(("format",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            let title = match sub.get_one::<String>("title") {
                Some(t) => t.clone(),
                None => String::new()
            };
            image.format(&title,boot_option(sub)?)?;
            image.close(true)
        },
        Some(("title",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            image.set_title(None,sub.get_one::<String>("title").expect(RCH))?;
            image.close(true)
        },
        Some(("opt",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            image.set_boot_option(None,boot_option(sub)?)?;
            image.close(true)
        },
        Some(("convert",sub)) => {
            let source = Image::open(sub.get_one::<String>("from").expect(RCH),&open_options(sub,false)?)?;
            let geom = source.geometry();
            let layout = match sub.get_one::<String>("to-layout") {
                Some(s) => Layout::from_str(s)?,
                None => match geom.layout {
                    Layout::Linear => Layout::Interleaved,
                    Layout::Interleaved => Layout::Linear
                }
            };
            let mut dest = Image::create(sub.get_one::<String>("to").expect(RCH),
                Some(geom.heads),Some(geom.tracks),Some(layout))?;
            dest.backup(&source)?;
            source.close(false)?;
            dest.close(true)
        },
        Some(("backup",sub)) => {
            let source = Image::open(sub.get_one::<String>("from").expect(RCH),&OpenOptions::default())?;
            let mut wopt = open_options(sub,true)?;
            wopt.heads = Some(source.heads());
            wopt.tracks = Some(source.geometry().tracks);
            let mut dest = Image::open(sub.get_one::<String>("to").expect(RCH),&wopt)?;
            dest.backup(&source)?;
            source.close(false)?;
            dest.close(true)
        },
        Some(("digest",sub)) => {
            let image = open_from_matches(sub,false)?;
            let algorithm = match sub.get_one::<String>("algorithm") {
                Some(s) => s.clone(),
                None => "sha1".to_string()
            };
            if let Some(range) = sub.get_one::<String>("sector") {
                let (start,end) = match range.split_once('-') {
                    Some((a,b)) => (usize::from_str(a)?,usize::from_str(b)? + 1),
                    None => {
                        let s = usize::from_str(range)?;
                        (s,s + 1)
                    }
                };
                for head in image.default_heads() {
                    let hash = digest::sector_digest(image.side(head),image.store(),
                        start,end,digest::new_digest(&algorithm)?)?;
                    println!("{}",hash);
                }
            } else if let Some(name) = sub.get_one::<String>("file") {
                let spec = FileSpec::parse(name)?;
                let mode = match sub.get_one::<String>("dmode") {
                    Some(s) => DigestMode::from_str(s)?,
                    None => DigestMode::File
                };
                let (head,index) = match image.find_file(&spec) {
                    Some(x) => x,
                    None => return Err(Box::new(dfskit::fs::Error::NotFound))
                };
                let hash = digest::entry_digest(image.side(head),image.store(),
                    index,mode,digest::new_digest(&algorithm)?)?;
                println!("{}",hash);
            } else {
                let mode = match sub.get_one::<String>("dmode") {
                    Some(s) => DigestMode::from_str(s)?,
                    None => DigestMode::All
                };
                for head in image.default_heads() {
                    let hash = digest::side_digest(image.side(head),image.store(),
                        mode,digest::new_digest(&algorithm)?)?;
                    println!("{}",hash);
                }
            }
            image.close(false)
        },
        Some(("validate",sub)) => {
            let mut image = open_from_matches(sub,false)?;
            let mode = match sub.get_one::<String>("warn") {
                Some(s) => WarnMode::from_str(s)?,
                None => WarnMode::All
            };
            list::validate(&mut image,mode)
        },
        Some(("dump",sub)) => {
            let image = open_from_matches(sub,false)?;
            let addr = sub.get_one::<String>("sector").expect(RCH);
            let (track,sector) = match addr.split_once('/') {
                Some((t,s)) => (usize::from_str(t)?,usize::from_str(s)?),
                None => (0,usize::from_str(addr)?)
            };
            for head in image.default_heads() {
                let dat = image.read_sector(head,track,sector)?;
                list::display_sector((track*10 + sector)*256,&dat);
            }
            image.close(false)
        },
        Some(("resize",sub)) => {
            let mut image = open_from_matches(sub,true)?;
            let policy = SizeOption::from_str(sub.get_one::<String>("size").expect(RCH))?;
            image.save(policy)?;
            image.close(false)
        },
        Some(("dnew",sub)) => {
            let path = sub.get_one::<String>("dimg").expect(RCH);
            let mmb_file = MmbFile::create(path)?;
            println!("created {} with {} slots",path,mmb_file.count());
            mmb_file.close(true)
        },
        Some(("dcat",sub)) => {
            let spec = ImageSpec::from_str(sub.get_one::<String>("dimg").expect(RCH))?;
            let mmb_file = MmbFile::open(&spec.path,false)?;
            let start = match sub.get_one::<String>("start") {
                Some(s) => Some(usize::from_str(s)?),
                None => None
            };
            let end = match sub.get_one::<String>("end") {
                Some(s) => Some(usize::from_str(s)?),
                None => None
            };
            list::dcat(&mmb_file,start,end)?;
            mmb_file.close(false)
        },
        Some(("dkill",sub)) => {
            let (mut mmb_file,index) = mmb_and_slot(sub,true)?;
            mmb_file.dkill(index,sub.get_flag("unlock"))?;
            mmb_file.close(true)
        },
        Some(("drestore",sub)) => {
            let (mut mmb_file,index) = mmb_and_slot(sub,true)?;
            mmb_file.drestore(index,sub.get_flag("lock"))?;
            mmb_file.close(true)
        },
        Some(("drecat",sub)) => {
            let spec = ImageSpec::from_str(sub.get_one::<String>("dimg").expect(RCH))?;
            let mut mmb_file = MmbFile::open(&spec.path,true)?;
            let count = mmb_file.drecat(WarnMode::None)?;
            println!("{} titles updated",count);
            mmb_file.close(true)
        },
        Some(("donboot",sub)) => {
            let spec = ImageSpec::from_str(sub.get_one::<String>("dimg").expect(RCH))?;
            match (sub.get_one::<String>("drive"),sub.get_one::<String>("image")) {
                (Some(d),Some(i)) => {
                    let mut mmb_file = MmbFile::open(&spec.path,true)?;
                    mmb_file.set_onboot(usize::from_str(d)?,usize::from_str(i)?)?;
                    mmb_file.close(true)
                },
                _ => {
                    let mmb_file = MmbFile::open(&spec.path,false)?;
                    for drive in 0..4 {
                        println!("drive {}: image {}",drive,mmb_file.onboot(drive)?);
                    }
                    mmb_file.close(false)
                }
            }
        },
        _ => Err(Box::new(commands::CommandError::InvalidCommand))
    }
}
