// test of ZIP module
use std::path::Path;
use cpckit::zip::ZipFile;

fn archive_bytes(name: &str) -> Vec<u8> {
    std::fs::read(&Path::new("tests").join(name)).expect("failed to read test archive")
}

/// offset of the first central directory header
fn first_cdh(buf: &[u8]) -> usize {
    buf.windows(4).position(|w| w[..]==b"PK\x01\x02"[..]).expect("no central directory")
}

#[test]
fn stored_entries() {
    let zip = ZipFile::from_bytes(&archive_bytes("store.zip")).expect("could not open archive");
    assert_eq!(zip.names(),vec!["file1","file2"]);
    assert_eq!(zip.entries().get("file1").expect("entry missing").method,0);
    assert_eq!(zip.read_data("file1").expect("read failed"),b"abc");
    assert_eq!(zip.read_data("file2").expect("read failed"),b"xyz");
}

#[test]
fn deflated_entries() {
    let zip = ZipFile::from_bytes(&archive_bytes("deflate.zip")).expect("could not open archive");
    assert_eq!(zip.names(),vec!["file1","file2"]);
    assert_eq!(zip.entries().get("file2").expect("entry missing").method,8);
    assert_eq!(zip.read_data("file1").expect("read failed"),b"abc");
    assert_eq!(zip.read_data("file2").expect("read failed"),b"xyz");
}

#[test]
fn archived_disk_image() {
    let zip = ZipFile::from_bytes(&archive_bytes("twofiles.zip")).expect("could not open archive");
    let dsk = zip.read_data("twofiles.dsk").expect("read failed");
    assert_eq!(dsk,archive_bytes("twofiles.dsk"));
    let entry = zip.entries().get("twofiles.dsk").expect("entry missing");
    assert!(entry.compressed_size < entry.size);
}

#[test]
fn catalog() {
    let zip = ZipFile::from_bytes(&archive_bytes("store.zip")).expect("could not open archive");
    let expected = format!("{:24} {:8} stored\n{:24} {:8} stored\n2 entries","file1",3,"file2",3);
    assert_eq!(zip.catalog_to_string().expect("catalog failed"),expected);
}

#[test]
fn missing_entry() {
    let zip = ZipFile::from_bytes(&archive_bytes("store.zip")).expect("could not open archive");
    match zip.read_data("file3") {
        Ok(_) => panic!("entry should not exist"),
        Err(e) => assert_eq!(e.to_string(),"entry `file3` not found")
    }
}

#[test]
fn crc_mismatch() {
    let mut buf = archive_bytes("store.zip");
    // data of file1 starts right after its 30 byte local header and 5 byte name
    assert_eq!(&buf[35..38],b"abc");
    buf[35] = b'x';
    let zip = ZipFile::from_bytes(&buf).expect("could not open archive");
    match zip.read_data("file1") {
        Ok(_) => panic!("CRC should fail"),
        Err(e) => assert!(e.to_string().starts_with("entry `file1` CRC mismatch"))
    }
    assert_eq!(zip.read_data("file2").expect("read failed"),b"xyz");
}

#[test]
fn bad_local_header() {
    let mut buf = archive_bytes("store.zip");
    buf[0] = 0;
    let zip = ZipFile::from_bytes(&buf).expect("central directory should still be good");
    match zip.read_data("file1") {
        Ok(_) => panic!("signature should fail"),
        Err(e) => assert_eq!(e.to_string(),"signature not found at offset 0: expected 04034B50, found 04034B00")
    }
}

#[test]
fn truncated_archive() {
    let buf = archive_bytes("deflate.zip");
    match ZipFile::from_bytes(&buf[0..buf.len()/2]) {
        Ok(_) => panic!("archive should be truncated"),
        Err(e) => assert_eq!(e.to_string(),"EOCD not found")
    }
}

#[test]
fn trailing_comment() {
    let mut buf = archive_bytes("store.zip");
    let n = buf.len();
    // comment length is the last field of the EOCD
    buf[n-2] = 7;
    buf.extend_from_slice(b"comment");
    let zip = ZipFile::from_bytes(&buf).expect("could not open archive");
    assert_eq!(zip.read_data("file2").expect("read failed"),b"xyz");
}

#[test]
fn unsupported_method() {
    let mut buf = archive_bytes("store.zip");
    let cdh = first_cdh(&buf);
    // method 12 is bzip2
    buf[cdh+10] = 12;
    let zip = ZipFile::from_bytes(&buf).expect("could not open archive");
    assert_eq!(zip.entries().get("file1").expect("entry missing").method,12);
    match zip.read_data("file1") {
        Ok(_) => panic!("method should be refused"),
        Err(e) => assert_eq!(e.to_string(),"entry `file1` uses unsupported method 12")
    }
    assert!(zip.catalog_to_string().expect("catalog failed").contains("method 12"));
}

#[test]
fn encrypted_entry() {
    let mut buf = archive_bytes("store.zip");
    let cdh = first_cdh(&buf);
    buf[cdh+8] |= 1;
    let zip = ZipFile::from_bytes(&buf).expect("could not open archive");
    match zip.read_data("file1") {
        Ok(_) => panic!("encrypted entry should be refused"),
        Err(e) => assert_eq!(e.to_string(),"entry `file1` is encrypted")
    }
    assert_eq!(zip.read_data("file2").expect("read failed"),b"xyz");
}

#[test]
fn oversized_claim() {
    let mut buf = archive_bytes("deflate.zip");
    let cdh = first_cdh(&buf);
    buf[cdh+24..cdh+28].copy_from_slice(&[0xff;4]);
    let zip = ZipFile::from_bytes(&buf).expect("could not open archive");
    match zip.read_data("file1") {
        Ok(_) => panic!("size should not match"),
        Err(e) => assert_eq!(e.to_string(),"entry `file1` should have 4294967295 bytes, found 3")
    }
}
