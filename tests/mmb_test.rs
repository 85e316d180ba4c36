// tests of the MMB container: index, status bytes, slot views, onboot
use dfskit::mmb::{MmbFile,MMB_DISK_SIZE,MMB_INDEX_SIZE,MMB_MAX_ENTRIES};
use dfskit::fs::{AddFileOptions,BootOption,FileSpec,WarnMode};

fn temp_mmb(name: &str) -> String {
    let mut p = std::env::temp_dir();
    p.push(name);
    let path = p.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn create_and_index_shape() {
    let path = temp_mmb("dfskit-m1.mmb");
    let mmb_file = MmbFile::create(&path).unwrap();
    assert_eq!(mmb_file.count(),MMB_MAX_ENTRIES);
    // every slot starts uninitialized
    for entry in mmb_file.all_entries().unwrap() {
        assert!(!entry.initialized());
        assert_eq!(entry.status_byte(),0xf0);
    }
    // drives 0-3 boot images 0-3
    for drive in 0..4 {
        assert_eq!(mmb_file.onboot(drive).unwrap(),drive);
    }
    mmb_file.close(true).unwrap();
    let meta = std::fs::metadata(&path).unwrap();
    assert_eq!(meta.len() as usize,MMB_INDEX_SIZE + MMB_MAX_ENTRIES * MMB_DISK_SIZE);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn slot_payload_survives_dkill() {
    let path = temp_mmb("dfskit-m2.mmb");
    let mut mmb_file = MmbFile::create(&path).unwrap();

    // build a disk inside slot 12
    let mut image = mmb_file.open_image(12,true,WarnMode::None).unwrap();
    image.format("GAMES",BootOption::None).unwrap();
    image.add_file(&FileSpec::parse("$.MENU").unwrap(),&[7;1000],Some(0x1900),None,false,
        &AddFileOptions::default()).unwrap();
    image.close(true).unwrap();
    mmb_file.drestore(12,false).unwrap();
    assert!(mmb_file.entry(12).unwrap().initialized());
    assert_eq!(mmb_file.entry(12).unwrap().status_byte(),0x0f);

    // the slot reads back as a valid image
    let image = mmb_file.open_image(12,false,WarnMode::None).unwrap();
    assert!(image.side(0).is_valid());
    assert_eq!(image.side(0).title(),"GAMES");
    let payload_before = image.side(0).read_all(image.store()).unwrap();
    image.close(false).unwrap();

    // dkill flips the status byte and leaves the 200K payload alone
    assert!(mmb_file.dkill(12,false).unwrap());
    assert_eq!(mmb_file.entry(12).unwrap().status_byte(),0xf0);
    let image = mmb_file.open_image(12,false,WarnMode::None).unwrap();
    let payload_after = image.side(0).read_all(image.store()).unwrap();
    image.close(false).unwrap();
    assert_eq!(payload_before,payload_after);

    // drestore brings it back
    assert!(mmb_file.drestore(12,false).unwrap());
    assert_eq!(mmb_file.entry(12).unwrap().status_byte(),0x0f);
    // a second drestore is a no-op signalled by the return value
    assert!(!mmb_file.drestore(12,false).unwrap());

    mmb_file.close(true).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn locked_slots_guard_dkill() {
    let path = temp_mmb("dfskit-m3.mmb");
    let mut mmb_file = MmbFile::create(&path).unwrap();
    mmb_file.drestore(7,true).unwrap();
    assert!(mmb_file.entry(7).unwrap().locked());
    assert!(mmb_file.dkill(7,false).is_err());
    // unlock-and-kill in one step
    assert!(mmb_file.dkill(7,true).unwrap());
    assert!(!mmb_file.entry(7).unwrap().initialized());
    mmb_file.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn drecat_refreshes_titles() {
    let path = temp_mmb("dfskit-m4.mmb");
    let mut mmb_file = MmbFile::create(&path).unwrap();
    let mut image = mmb_file.open_image(3,true,WarnMode::None).unwrap();
    image.format("ARCADE",BootOption::None).unwrap();
    image.close(true).unwrap();
    mmb_file.drestore(3,false).unwrap();
    mmb_file.set_title(3,"WRONG").unwrap();
    let changed = mmb_file.drecat(WarnMode::None).unwrap();
    assert_eq!(changed,1);
    assert_eq!(mmb_file.entry(3).unwrap().title(),"ARCADE");
    // a second pass finds nothing to do
    assert_eq!(mmb_file.drecat(WarnMode::None).unwrap(),0);
    mmb_file.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn onboot_record_layout() {
    let path = temp_mmb("dfskit-m5.mmb");
    let mut mmb_file = MmbFile::create(&path).unwrap();
    mmb_file.set_onboot(1,42).unwrap();
    mmb_file.set_onboot(3,300).unwrap();
    assert!(mmb_file.set_onboot(4,0).is_err());
    assert!(mmb_file.set_onboot(0,MMB_MAX_ENTRIES).is_err());
    mmb_file.close(true).unwrap();

    // low bytes in header bytes 0-3, high bytes in 4-7
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes[1],42);
    assert_eq!(bytes[5],0);
    assert_eq!(bytes[3],0x2c);
    assert_eq!(bytes[7],0x01);

    let mmb_file = MmbFile::open(&path,false).unwrap();
    assert_eq!(mmb_file.onboot(1).unwrap(),42);
    assert_eq!(mmb_file.onboot(3).unwrap(),300);
    mmb_file.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn slot_bounds_checked() {
    let path = temp_mmb("dfskit-m6.mmb");
    let mut mmb_file = MmbFile::create(&path).unwrap();
    assert!(mmb_file.entry(MMB_MAX_ENTRIES).is_err());
    assert!(mmb_file.open_image(MMB_MAX_ENTRIES,false,WarnMode::None).is_err());
    assert!(mmb_file.dkill(600,false).is_err());
    mmb_file.close(false).unwrap();
    std::fs::remove_file(&path).unwrap();
}
