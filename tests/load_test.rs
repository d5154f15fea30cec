// test of the loader working through nested containers
use std::path::Path;
use cpckit::load::{load_bytes,ItemKind,MAX_NESTING};

const HELLO_LISTING: &str =
"10 MODE 1:PRINT \"HELLO\"
20 FOR i=1 TO 10:PRINT i:NEXT
30 GOTO 10";

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(&Path::new("tests").join(name)).expect("failed to read test fixture")
}

/// Build an archive with stored entries
fn stored_zip(files: &[(&str,&[u8])]) -> Vec<u8> {
    let mut ans = Vec::new();
    let mut cd = Vec::new();
    for (name,dat) in files {
        let crc = crc::crc32::checksum_ieee(dat);
        let offset = ans.len() as u32;
        ans.extend_from_slice(&[0x50,0x4b,0x03,0x04,20,0,0,0,0,0,0,0,0,0]);
        ans.extend_from_slice(&crc.to_le_bytes());
        ans.extend_from_slice(&(dat.len() as u32).to_le_bytes());
        ans.extend_from_slice(&(dat.len() as u32).to_le_bytes());
        ans.extend_from_slice(&(name.len() as u16).to_le_bytes());
        ans.extend_from_slice(&[0,0]);
        ans.extend_from_slice(name.as_bytes());
        ans.extend_from_slice(dat);
        cd.extend_from_slice(&[0x50,0x4b,0x01,0x02,20,0,20,0,0,0,0,0,0,0,0,0]);
        cd.extend_from_slice(&crc.to_le_bytes());
        cd.extend_from_slice(&(dat.len() as u32).to_le_bytes());
        cd.extend_from_slice(&(dat.len() as u32).to_le_bytes());
        cd.extend_from_slice(&(name.len() as u16).to_le_bytes());
        cd.extend_from_slice(&[0;12]);
        cd.extend_from_slice(&offset.to_le_bytes());
        cd.extend_from_slice(name.as_bytes());
    }
    let cd_offset = ans.len() as u32;
    let count = files.len() as u16;
    ans.extend_from_slice(&cd);
    ans.extend_from_slice(&[0x50,0x4b,0x05,0x06,0,0,0,0]);
    ans.extend_from_slice(&count.to_le_bytes());
    ans.extend_from_slice(&count.to_le_bytes());
    ans.extend_from_slice(&(cd.len() as u32).to_le_bytes());
    ans.extend_from_slice(&cd_offset.to_le_bytes());
    ans.extend_from_slice(&[0,0]);
    ans
}

#[test]
fn disk_image() {
    let report = load_bytes("twofiles.dsk",&fixture("twofiles.dsk"));
    assert_eq!(report.errors,vec![]);
    assert_eq!(report.items.len(),2);
    assert_eq!(report.items[0].name,"twofiles.dsk/HELLO.BAS");
    assert_eq!(report.items[0].kind,ItemKind::Basic);
    assert_eq!(report.items[0].data.len(),56);
    assert!(report.items[0].header.is_some());
    assert_eq!(report.items[0].text.as_deref(),Some(HELLO_LISTING));
    assert_eq!(report.items[1].name,"twofiles.dsk/README.TXT");
    assert_eq!(report.items[1].kind,ItemKind::Ascii);
    let text = report.items[1].text.as_ref().expect("no text");
    assert_eq!(text.lines().count(),650);
    assert_eq!(text.lines().next(),Some("Line 0000 of the readme file."));
}

#[test]
fn disk_in_archive() {
    let report = load_bytes("twofiles.zip",&fixture("twofiles.zip"));
    assert_eq!(report.errors,vec![]);
    let names: Vec<&str> = report.items.iter().map(|x| x.name.as_str()).collect();
    assert_eq!(names,vec!["twofiles.zip/twofiles.dsk/HELLO.BAS","twofiles.zip/twofiles.dsk/README.TXT"]);
    assert_eq!(report.items[0].text.as_deref(),Some(HELLO_LISTING));
}

#[test]
fn plain_archive() {
    let report = load_bytes("store.zip",&fixture("store.zip"));
    assert_eq!(report.errors,vec![]);
    assert_eq!(report.items.len(),2);
    assert_eq!(report.items[0].name,"store.zip/file1");
    assert_eq!(report.items[0].kind,ItemKind::Ascii);
    assert_eq!(report.items[0].text.as_deref(),Some("abc"));
    assert_eq!(report.items[1].text.as_deref(),Some("xyz"));
}

#[test]
fn nesting_is_capped() {
    assert_eq!(MAX_NESTING,1);
    let dsk = fixture("twofiles.dsk");
    let inner = stored_zip(&[("twofiles.dsk",&dsk[..]),("note.txt",&b"hello"[..])]);
    let outer = stored_zip(&[("inner.zip",&inner[..])]);
    let report = load_bytes("outer.zip",&outer);
    assert_eq!(report.items.len(),1);
    assert_eq!(report.items[0].name,"outer.zip/inner.zip/note.txt");
    assert_eq!(report.errors.len(),1);
    assert_eq!(report.errors[0].name,"outer.zip/inner.zip/twofiles.dsk");
    assert_eq!(report.errors[0].message,"container nested too deeply (depth 2)");
}

#[test]
fn errors_do_not_stop_the_batch() {
    let mut bad_dsk = fixture("twofiles.dsk");
    bad_dsk.truncate(1000);
    let archive = stored_zip(&[("a.dsk",&bad_dsk[..]),("b.txt",&b"10 PRINT \"OK\"\r\n"[..])]);
    let report = load_bytes("mixed.zip",&archive);
    assert_eq!(report.items.len(),1);
    assert_eq!(report.items[0].name,"mixed.zip/b.txt");
    assert_eq!(report.items[0].text.as_deref(),Some("10 PRINT \"OK\"\n"));
    assert_eq!(report.errors.len(),1);
    assert_eq!(report.errors[0].name,"mixed.zip/a.dsk");
}

#[test]
fn binary_file() {
    let report = load_bytes("code.bin",&[0xc3,0x00,0x40,0xff,0x00,0x01]);
    assert_eq!(report.errors,vec![]);
    assert_eq!(report.items[0].kind,ItemKind::Binary);
    assert!(report.items[0].text.is_none());
}
