// test of DSK image and AMSDOS file system modules
use std::path::Path;
use cpckit::img::dsk;
use cpckit::fs::amsdos;
use cpckit::fs::amsdos::types::{parse_amsdos_header,text_to_utf8,FileType};
use cpckit::lang::locomotive::tokenizer::Tokenizer;

// The test image is a 40 track DATA format disk with two files.
// The directory lists README.TXT extent 1 ahead of extent 0 on purpose,
// and the sectors are interleaved C1 C6 C2 C7 ...

const HELLO_LISTING: &str =
"10 MODE 1:PRINT \"HELLO\"
20 FOR i=1 TO 10:PRINT i:NEXT
30 GOTO 10";

fn readme_text() -> String {
    let mut ans = String::new();
    for i in 0..650 {
        ans += &format!("Line {:04} of the readme file.\n",i);
    }
    ans
}

fn image_bytes() -> Vec<u8> {
    std::fs::read(&Path::new("tests").join("twofiles.dsk")).expect("failed to read test image file")
}

/// Rewrite the standard image in the extended form
fn make_extended(std_img: &[u8]) -> Vec<u8> {
    let mut ans = std_img.to_vec();
    ans[0..34].copy_from_slice(b"EXTENDED CPC DSK File\r\nDisk-Info\r\n");
    let track_size = u16::from_le_bytes([ans[50],ans[51]]) as usize;
    ans[50] = 0;
    ans[51] = 0;
    for t in 0..40 {
        ans[52+t] = (track_size/256) as u8;
        let toff = 256 + t*track_size;
        for s in 0..9 {
            ans[toff+24+s*8+6] = 0x00;
            ans[toff+24+s*8+7] = 0x02;
        }
    }
    ans
}

#[test]
fn disk_info() {
    let img = dsk::Dsk::from_bytes(&image_bytes()).expect("could not open image");
    let hdr = img.header();
    assert_eq!(hdr.tracks,40);
    assert_eq!(hdr.heads,1);
    assert_eq!(hdr.extended,false);
    assert_eq!(hdr.creator,"cpckit tests");
    assert_eq!(hdr.track_size,256+9*512);
    assert!(dsk::test_ident(&image_bytes()));
    assert!(!dsk::test_ident(b"PK\x03\x04 not a disk image"));
}

#[test]
fn track_info() {
    let img = dsk::Dsk::from_bytes(&image_bytes()).expect("could not open image");
    let layout = img.read_track_info(5,0).expect("could not read track");
    assert_eq!(layout.track,5);
    assert_eq!(layout.head,0);
    assert_eq!(layout.size_code,2);
    assert_eq!(layout.gap3,0x4e);
    assert_eq!(layout.filler,0xe5);
    assert_eq!(layout.sectors.len(),9);
    assert_eq!(layout.lowest_id(),Some(0xc1));
    let ids: Vec<u8> = layout.sectors.iter().map(|s| s.id).collect();
    assert_eq!(ids,vec![0xc1,0xc6,0xc2,0xc7,0xc3,0xc8,0xc4,0xc9,0xc5]);
    // sector data follows the header in the listed order
    let toff = 256 + 5*(256+9*512);
    assert_eq!(layout.find(0xc1).expect("no sector").offset,toff + 256);
    assert_eq!(layout.find(0xc6).expect("no sector").offset,toff + 256 + 512);
    assert!(layout.find(0x41).is_none());
}

#[test]
fn sector_access() {
    let img = dsk::Dsk::from_bytes(&image_bytes()).expect("could not open image");
    let sec = img.read_sector(0,0,0xc1).expect("could not read sector");
    assert_eq!(sec.len(),512);
    // first directory entry is README.TXT extent 1
    assert_eq!(&sec[0..12],b"\x00README  TXT");
    assert_eq!(sec[12],1);
    match img.read_sector(0,0,0xca) {
        Ok(_) => panic!("sector should not exist"),
        Err(e) => assert_eq!(e.to_string(),"sector CA not found on track 0 head 0")
    }
    match img.read_track_info(40,0) {
        Ok(_) => panic!("track should be out of range"),
        Err(e) => assert_eq!(e.to_string(),"track 40 head 0 is out of range")
    }
}

#[test]
fn bad_idents() {
    let mut buf = image_bytes();
    buf[256] = b'X';
    let img = dsk::Dsk::from_bytes(&buf).expect("disk header should still be good");
    match img.read_track_info(0,0) {
        Ok(_) => panic!("track ident should be bad"),
        Err(e) => assert_eq!(e.to_string(),"Ident not found at offset 256: expected \"Track-Info\", found \"Xrack-Info\"")
    }
    buf[0] = b'X';
    match dsk::Dsk::from_bytes(&buf) {
        Ok(_) => panic!("disk ident should be bad"),
        Err(e) => assert!(e.to_string().starts_with("Ident not found at offset 0"))
    }
}

#[test]
fn truncated_image() {
    let buf = image_bytes();
    assert!(dsk::Dsk::from_bytes(&buf[0..100]).is_err());
    let img = dsk::Dsk::from_bytes(&buf[0..356]).expect("disk header should be good");
    assert!(img.read_track_info(0,0).is_err());
    // the track header is there but the sector data is cut off
    let img = dsk::Dsk::from_bytes(&buf[0..256+256+600]).expect("disk header should be good");
    assert!(img.read_sector(0,0,0xc1).is_ok());
    assert!(img.read_sector(0,0,0xc6).is_err());
}

#[test]
fn directory() {
    let disk = cpckit::create_fs_from_bytestream(&image_bytes()).expect("could not open disk");
    assert_eq!(disk.format().name,"DATA");
    assert_eq!(disk.format().to_string(),"DATA format, 180K");
    let files = disk.read_directory().expect("could not read directory");
    let names: Vec<&String> = files.keys().collect();
    assert_eq!(names,vec!["HELLO.BAS","README.TXT"]);
    let readme = files.get("README.TXT").expect("README missing");
    assert_eq!(readme.len(),2);
    assert_eq!(readme[0].index(),0);
    assert_eq!(readme[1].index(),1);
    assert_eq!(readme[0].records(&disk.format().dpb),128);
    assert_eq!(readme[1].records(&disk.format().dpb),30);
    assert_eq!(readme[1].get_block_list(&disk.format().dpb)[0..4].to_vec(),vec![19,20,21,22]);
}

#[test]
fn read_program() {
    let disk = cpckit::create_fs_from_bytestream(&image_bytes()).expect("could not open disk");
    let dat = disk.get("hello.bas").expect("could not read file");
    assert_eq!(dat.len(),128+56);
    let hdr = parse_amsdos_header(&dat).expect("header missing");
    assert_eq!(hdr.typ(),Some(FileType::Basic));
    assert_eq!(hdr.length(),56);
    assert_eq!(hdr.display_name(),"HELLO.BAS");
    let mut tokenizer = Tokenizer::new();
    assert_eq!(tokenizer.detokenize(&dat[128..]),HELLO_LISTING);
    assert_eq!(tokenizer.diagnostics().len(),0);
}

#[test]
fn read_text() {
    let disk = cpckit::create_fs_from_bytestream(&image_bytes()).expect("could not open disk");
    let dat = disk.get("0:README.TXT").expect("could not read file");
    assert_eq!(dat.len(),158*128);
    assert!(parse_amsdos_header(&dat).is_none());
    assert_eq!(text_to_utf8(&dat),readme_text());
    assert!(disk.get("MISSING.TXT").is_err());
}

#[test]
fn catalog() {
    let disk = cpckit::create_fs_from_bytestream(&image_bytes()).expect("could not open disk");
    let expected =
"HELLO.BAS         1K
README.TXT       20K

157K free";
    assert_eq!(disk.catalog_to_string().expect("catalog failed"),expected);
}

#[test]
fn extended_image() {
    let ext = make_extended(&image_bytes());
    let img = dsk::Dsk::from_bytes(&ext).expect("could not open image");
    assert!(img.header().extended);
    assert_eq!(img.header().track_sizes[39],256+9*512);
    assert!(amsdos::Disk::test_img(&img));
    let disk = amsdos::Disk::from_img(img).expect("could not open disk");
    let dat = disk.get("README.TXT").expect("could not read file");
    assert_eq!(text_to_utf8(&dat),readme_text());
}

#[test]
fn geometry() {
    let img = dsk::Dsk::from_bytes(&image_bytes()).expect("could not open image");
    let geo = json::parse(&img.export_geometry(None).expect("export failed")).expect("bad JSON");
    assert_eq!(geo["package"],"dsk");
    assert_eq!(geo["tracks"],40);
    assert_eq!(geo["track_list"].len(),40);
    assert_eq!(geo["track_list"][0]["addr_map"][1],"C6");
    assert_eq!(geo["track_list"][0]["size_map"][1],512);
}
