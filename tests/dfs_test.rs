// tests of the DFS side model: allocation, deletion, compaction, invariants
use dfskit::image::Image;
use dfskit::fs::{AddFileOptions,BootOption,Error,FileSpec};
use dfskit::img::SizeOption;

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

fn assert_dfs_err(result: Result<impl Sized,Box<dyn std::error::Error>>,expected: Error) {
    match result {
        Ok(_) => panic!("expected '{}' but operation succeeded",expected),
        Err(e) => assert_eq!(e.to_string(),expected.to_string())
    }
}

#[test]
fn fresh_image_first_import() {
    let path = temp_image("dfskit-t1.ssd");
    let mut image = Image::create(&path,None,None,None).expect("create failed");
    image.format("GAMES",BootOption::None).expect("format failed");
    let data = vec![0x55u8;100];
    let entry = image.add_file(&spec("$.A"),&data,Some(0x1900),Some(0x8023),true,
        &AddFileOptions::default()).expect("import failed");
    // highest fit on an empty 80 track side: one sector just below the top
    assert_eq!(entry.start_sector,799);
    assert_eq!(entry.length,100);
    assert!(entry.locked);
    image.close(true).expect("close failed");

    assert_eq!(std::fs::metadata(&path).unwrap().len(),204800);
    let image = dfskit::open_image(&path,false).expect("reopen failed");
    let side = image.side(0);
    assert!(side.is_valid());
    assert_eq!(side.title(),"GAMES");
    assert_eq!(side.sequence(),0x01);
    assert_eq!(side.number_of_files(),1);
    let entry = side.entry(0).unwrap();
    assert_eq!(entry.full_name(),"$.A");
    assert_eq!(entry.start_sector,799);
    assert_eq!((entry.load_addr,entry.exec_addr),(0x1900,0x8023));
    let data_back = side.read_file(image.store(),0).unwrap();
    assert_eq!(data_back,vec![0x55u8;100]);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn locked_files_guard_deletion() {
    let path = temp_image("dfskit-t2.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("GAMES",BootOption::None).unwrap();
    image.add_file(&spec("$.A"),&[1,2,3],None,None,true,&AddFileOptions::default()).unwrap();
    assert_dfs_err(image.delete(&spec("$.A"),false),Error::Locked);
    image.delete(&spec("$.A"),true).expect("delete with ignore_access failed");
    assert_eq!(image.side(0).sequence(),0x02);
    assert_eq!(image.side(0).number_of_files(),0);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn no_space_without_compaction() {
    let path = temp_image("dfskit-t3.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    let opts = AddFileOptions::default();
    let chunk = |fill: u8| vec![fill;150*256];
    image.add_file(&spec("$.HIGH"),&chunk(1),None,None,false,&opts).unwrap();
    image.add_file(&spec("$.MID"),&chunk(2),None,None,false,&opts).unwrap();
    image.add_file(&spec("$.LOW"),&chunk(3),None,None,false,&opts).unwrap();
    // layout is now HIGH 650..800, MID 500..650, LOW 350..500
    let starts: Vec<u16> = image.side(0).entries().iter().map(|e| e.start_sector).collect();
    assert_eq!(starts,vec![650,500,350]);
    image.delete(&spec("$.MID"),false).unwrap();

    // free space is 2..350 plus 500..650, nothing contiguous holds 400 sectors
    let big = vec![9u8;400*256];
    let mut no_compact = AddFileOptions::default();
    no_compact.compact = false;
    assert_dfs_err(image.add_file(&spec("$.BIG"),&big,None,None,false,&no_compact),Error::NoSpace);

    // compaction packs the survivors down from sector 2 and the import fits
    image.add_file(&spec("$.BIG"),&big,None,None,false,&opts).expect("compacting import failed");
    let side = image.side(0);
    let entries = side.entries();
    assert_eq!(entries.len(),3);
    let by_name: Vec<(String,usize,usize)> = entries.iter()
        .map(|e| (e.name_string(),e.start_sector as usize,e.end_sector())).collect();
    assert!(by_name.contains(&("LOW".to_string(),2,152)));
    assert!(by_name.contains(&("HIGH".to_string(),152,302)));
    assert!(by_name.contains(&("BIG".to_string(),400,800)));
    // file contents survived the moves
    let (_,low) = image.read_file(&spec("$.LOW")).unwrap();
    assert_eq!(low,chunk(3));
    let (_,high) = image.read_file(&spec("$.HIGH")).unwrap();
    assert_eq!(high,chunk(1));
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn entries_stay_disjoint_and_ordered() {
    let path = temp_image("dfskit-t4.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    let opts = AddFileOptions::default();
    let sizes = [700usize,2000,1,256,4096,100,513,90000];
    for (i,size) in sizes.iter().enumerate() {
        let name = format!("$.F{}",i);
        image.add_file(&spec(&name),&vec![i as u8;*size],None,None,false,&opts).unwrap();
    }
    image.delete(&spec("$.F1"),false).unwrap();
    image.delete(&spec("$.F4"),false).unwrap();
    image.add_file(&spec("$.G0"),&vec![0xaa;3000],None,None,false,&opts).unwrap();
    image.add_file(&spec("$.G1"),&vec![0xbb;600],None,None,false,&opts).unwrap();
    let entries = image.side(0).entries();
    let mut floor = image.side(0).total_sectors();
    for e in &entries {
        assert!(e.end_sector() <= floor,"entry {} overlaps or is out of order",e.full_name());
        assert!(e.start_sector as usize >= 2);
        floor = e.start_sector as usize;
    }
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn replace_semantics() {
    let path = temp_image("dfskit-t5.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    let opts = AddFileOptions::default();
    image.add_file(&spec("$.PROG"),&[1;300],None,None,false,&opts).unwrap();
    assert_dfs_err(image.add_file(&spec("$.prog"),&[2;300],None,None,false,&opts),Error::Exists);
    let mut replace = AddFileOptions::default();
    replace.replace = true;
    image.add_file(&spec("$.prog"),&[2;300],None,None,false,&replace).unwrap();
    assert_eq!(image.side(0).number_of_files(),1);
    let (_,dat) = image.read_file(&spec("$.PROG")).unwrap();
    assert_eq!(dat,vec![2;300]);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn rename_and_attributes() {
    let path = temp_image("dfskit-t6.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    let opts = AddFileOptions::default();
    image.add_file(&spec("$.OLD"),&[7;100],Some(0x1900),None,false,&opts).unwrap();
    image.rename(&spec("$.OLD"),&spec("B.NEW"),false,false).unwrap();
    assert!(image.find_file(&spec("$.OLD")).is_none());
    let (entry,_) = image.read_file(&spec("B.NEW")).unwrap();
    // exec defaulted to load on import, rename left data and addresses alone
    assert_eq!((entry.load_addr,entry.exec_addr),(0x1900,0x1900));
    image.set_attrib(&spec("B.NEW"),Some(true),None,Some(0x8023)).unwrap();
    let (entry,_) = image.read_file(&spec("B.NEW")).unwrap();
    assert!(entry.locked);
    assert_eq!(entry.exec_addr,0x8023);
    assert_dfs_err(image.rename(&spec("B.NEW"),&spec("$.X"),false,false),Error::Locked);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn zero_length_file() {
    let path = temp_image("dfskit-t7.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    let entry = image.add_file(&spec("$.EMPTY"),&[],None,None,false,
        &AddFileOptions::default()).unwrap();
    assert_eq!(entry.sectors(),0);
    assert_eq!(entry.start_sector as usize,entry.end_sector());
    let (_,dat) = image.read_file(&spec("$.EMPTY")).unwrap();
    assert_eq!(dat.len(),0);
    image.delete(&spec("$.EMPTY"),false).unwrap();
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn catalog_full_after_31_files() {
    let path = temp_image("dfskit-t8.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("",BootOption::None).unwrap();
    let opts = AddFileOptions::default();
    for i in 0..31 {
        let name = format!("$.F{}",i);
        image.add_file(&spec(&name),&[0;256],None,None,false,&opts).unwrap();
    }
    assert_dfs_err(image.add_file(&spec("$.MORE"),&[0;256],None,None,false,&opts),Error::Full);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn shrink_and_reopen() {
    let path = temp_image("dfskit-t9.ssd");
    let mut image = Image::create(&path,None,None,None).unwrap();
    image.format("DATA",BootOption::Exec).unwrap();
    image.save(SizeOption::Shrink).unwrap();
    image.close(false).unwrap();
    // an empty side shrinks to just the catalog
    assert_eq!(std::fs::metadata(&path).unwrap().len(),512);
    // the catalog still announces 800 sectors, so geometry comes back as 80 tracks
    let image = dfskit::open_image(&path,false).unwrap();
    let side = image.side(0);
    assert!(side.is_valid());
    assert_eq!(side.total_sectors(),800);
    assert_eq!(side.title(),"DATA");
    assert_eq!(side.boot_option(),BootOption::Exec);
    image.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}
