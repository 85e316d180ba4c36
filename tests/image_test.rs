// tests of image level behavior: round trips, layouts, conversion
use dfskit::image::{Image,OpenOptions};
use dfskit::img::{Layout,SECTOR_SIZE,SECTORS_PER_TRACK};
use dfskit::fs::{AddFileOptions,BootOption,FileSpec};

fn temp_image(name: &str) -> String {
    let mut p = std::env::temp_dir();
    p.push(name);
    let path = p.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);
    path
}

fn spec(name: &str) -> FileSpec {
    FileSpec::parse(name).expect("bad test name")
}

#[test]
fn open_close_is_byte_identical() {
    let path = temp_image("dfskit-i1.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("ROUNDTRIP",BootOption::Run).unwrap();
    image.add_file(&spec("$.DATA"),&[3;1000],Some(0xFF1900),None,false,
        &AddFileOptions::default()).unwrap();
    image.close(true).unwrap();

    let before = std::fs::read(&path).unwrap();
    // read only open and close
    let image = dfskit::open_image(&path,false).unwrap();
    image.close(false).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(),before);
    // open for write with no mutation must not touch the file either
    let image = dfskit::open_image(&path,true).unwrap();
    image.close(true).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(),before);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn double_sided_catalogs_are_independent() {
    let path = temp_image("dfskit-i2.dsd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    assert_eq!(image.heads(),2);
    assert_eq!(image.geometry().layout,Layout::Interleaved);
    image.set_default_side(Some(0)).unwrap();
    image.format("FRONT",BootOption::None).unwrap();
    image.set_default_side(Some(1)).unwrap();
    image.format("BACK",BootOption::Run).unwrap();
    image.set_default_side(None).unwrap();
    image.add_file(&spec(":0.A"),&[1;256],None,None,false,&AddFileOptions::default()).unwrap();
    image.add_file(&spec(":2.B"),&[2;256],None,None,false,&AddFileOptions::default()).unwrap();
    image.close(true).unwrap();

    let image = dfskit::open_image(&path,false).unwrap();
    assert_eq!(image.side(0).title(),"FRONT");
    assert_eq!(image.side(1).title(),"BACK");
    assert_eq!(image.side(0).number_of_files(),1);
    assert_eq!(image.side(1).number_of_files(),1);
    assert!(image.find_file(&spec(":0.B")).is_none());
    assert!(image.find_file(&spec(":2.B")).is_some());
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn linear_to_interleaved_conversion() {
    let lin_path = temp_image("dfskit-i3.ssd");
    let int_path = temp_image("dfskit-i3.dsd");
    let mut lin = Image::create(&lin_path,Some(2),Some(80),Some(Layout::Linear)).unwrap();
    // salt both sides with addressable patterns
    for head in 0..2 {
        lin.set_default_side(Some(head)).unwrap();
        lin.format(&format!("SIDE{}",head),BootOption::None).unwrap();
        for i in 0..5 {
            let name = format!(":{}.F{}",head*2,i);
            let fill = (head*16 + i + 1) as u8;
            lin.add_file(&spec(&name),&vec![fill;700],None,None,false,
                &AddFileOptions::default()).unwrap();
        }
    }
    lin.set_default_side(None).unwrap();
    let mut int = Image::create(&int_path,Some(2),Some(80),Some(Layout::Interleaved)).unwrap();
    int.backup(&lin).unwrap();

    // every physical sector reads the same through either layout
    for head in 0..2 {
        for track in 0..80 {
            for sector in 0..SECTORS_PER_TRACK {
                let a = lin.read_sector(head,track,sector).unwrap();
                let b = int.read_sector(head,track,sector).unwrap();
                assert_eq!(a,b,"mismatch at side {} track {} sector {}",head,track,sector);
            }
        }
    }
    // and the raw files differ in exactly the interleaving
    int.close(true).unwrap();
    lin.close(true).unwrap();
    let lin_bytes = std::fs::read(&lin_path).unwrap();
    let int_bytes = std::fs::read(&int_path).unwrap();
    let track_size = SECTORS_PER_TRACK * SECTOR_SIZE;
    for track in 0..80 {
        for head in 0..2 {
            let lin_off = (head*80 + track) * track_size;
            let int_off = (track*2 + head) * track_size;
            assert_eq!(lin_bytes[lin_off..lin_off+track_size],
                       int_bytes[int_off..int_off+track_size]);
        }
    }
    std::fs::remove_file(&lin_path).unwrap();
    std::fs::remove_file(&int_path).unwrap();
}

#[test]
fn explicit_geometry_overrides() {
    let path = temp_image("dfskit-i4.dsd");
    let mut image = Image::create(&path,Some(2),Some(40),Some(Layout::Interleaved)).unwrap();
    image.format("",BootOption::None).unwrap();
    image.close(true).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(),204800);
    // the catalog announces 400 sectors so the heuristics can recover the shape
    let image = dfskit::open_image(&path,false).unwrap();
    assert_eq!(image.heads(),2);
    assert_eq!(image.geometry().tracks,40);
    image.close(false).unwrap();
    // explicit options force the single sided reading instead
    let mut opt = OpenOptions::default();
    opt.heads = Some(1);
    opt.tracks = Some(80);
    let image = Image::open(&path,&opt).unwrap();
    assert_eq!(image.heads(),1);
    assert_eq!(image.geometry().tracks,80);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn copy_over_between_images() {
    let src_path = temp_image("dfskit-i5a.ssd");
    let dst_path = temp_image("dfskit-i5b.ssd");
    let mut src = Image::create(&src_path,None,None,None).unwrap();
    src.format("SRC",BootOption::None).unwrap();
    let opts = AddFileOptions::default();
    src.add_file(&spec("$.KEEP"),&[1;100],Some(0x1900),Some(0x8023),true,&opts).unwrap();
    src.add_file(&spec("A.DATA"),&[2;5000],None,None,false,&opts).unwrap();
    let mut dst = Image::create(&dst_path,None,None,None).unwrap();
    dst.format("DST",BootOption::None).unwrap();

    let mut copy_opts = dfskit::image::CopyOptions::default();
    copy_opts.preserve_attr = true;
    let ctx = dfskit::fs::OpContext::default();
    let count = dst.copy_over(&src,&[],&copy_opts,&ctx).unwrap();
    assert_eq!(count,2);
    let (entry,dat) = dst.read_file(&spec("$.KEEP")).unwrap();
    assert_eq!(dat,vec![1;100]);
    assert!(entry.locked);
    assert_eq!((entry.load_addr,entry.exec_addr),(0x1900,0x8023));
    let (entry,_) = dst.read_file(&spec("A.DATA")).unwrap();
    assert!(!entry.locked);
    src.close(false).unwrap();
    dst.close(false).unwrap();
    std::fs::remove_file(&src_path).unwrap();
    std::fs::remove_file(&dst_path).unwrap();
}

#[test]
fn digest_modes_respond_to_attributes() {
    use dfskit::fs::digest::{self,DigestMode};
    let path = temp_image("dfskit-i6.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    image.add_file(&spec("$.X"),&[9;100],Some(0x1900),Some(0x1900),false,
        &AddFileOptions::default()).unwrap();
    let data_before = digest::entry_digest(image.side(0),image.store(),0,
        DigestMode::Data,digest::Sha1::new()).unwrap();
    let all_before = digest::entry_digest(image.side(0),image.store(),0,
        DigestMode::All,digest::Sha1::new()).unwrap();
    // flipping the lock changes the `all` digest but not the `data` digest
    image.set_attrib(&spec("$.X"),Some(true),None,None).unwrap();
    let data_after = digest::entry_digest(image.side(0),image.store(),0,
        DigestMode::Data,digest::Sha1::new()).unwrap();
    let all_after = digest::entry_digest(image.side(0),image.store(),0,
        DigestMode::All,digest::Sha1::new()).unwrap();
    assert_eq!(data_before,data_after);
    assert_ne!(all_before,all_after);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn import_export_roundtrip() {
    use dfskit::commands::transfer::{self,InfMode};
    let path = temp_image("dfskit-i8.ssd");
    let mut host_dir = std::env::temp_dir();
    host_dir.push("dfskit-i8-host");
    let _ = std::fs::remove_dir_all(&host_dir);
    std::fs::create_dir(&host_dir).unwrap();
    let host_file = host_dir.join("MENU");
    std::fs::write(&host_file,&[0xc9;700]).unwrap();
    std::fs::write(host_dir.join("MENU.inf"),"$.MENU FF1900 FF8023 0002BC L\n").unwrap();

    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    transfer::import_file(&mut image,host_file.to_str().unwrap(),None,None,None,false,
        InfMode::Auto,&AddFileOptions::default()).unwrap();
    let (entry,dat) = image.read_file(&spec("$.MENU")).unwrap();
    assert_eq!(dat,vec![0xc9;700]);
    assert_eq!((entry.load_addr,entry.exec_addr),(0xFF1900,0xFF8023));
    assert!(entry.locked);

    let out_dir = std::env::temp_dir().join("dfskit-i8-out");
    let _ = std::fs::remove_dir_all(&out_dir);
    std::fs::create_dir(&out_dir).unwrap();
    let ctx = dfskit::fs::OpContext::default();
    let count = transfer::export_files(&image,&[],out_dir.to_str().unwrap(),
        InfMode::Always,&ctx).unwrap();
    assert_eq!(count,1);
    assert_eq!(std::fs::read(out_dir.join("MENU")).unwrap(),vec![0xc9;700]);
    let inf_line = std::fs::read_to_string(out_dir.join("MENU.inf")).unwrap();
    assert!(inf_line.contains("FF1900"));
    assert!(inf_line.contains("Locked"));

    image.close(false).unwrap();
    std::fs::remove_dir_all(&host_dir).unwrap();
    std::fs::remove_dir_all(&out_dir).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn catalog_sector_digest_matches_raw_sha1() {
    use dfskit::fs::digest;
    let path = temp_image("dfskit-i7.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("HASHME",BootOption::Load).unwrap();
    image.close(true).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let mut reference = sha1_smol::Sha1::new();
    reference.update(&bytes[0..512]);
    let image = dfskit::open_image(&path,false).unwrap();
    let hash = digest::sector_digest(image.side(0),image.store(),0,2,
        digest::Sha1::new()).unwrap();
    assert_eq!(hash,reference.digest().to_string());
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}
