//! # `cpckit` main library
//!
//! This library reads Amstrad CPC programs and the containers they are usually found in.
//! Manipulations go from the raw bytes of a ZIP archive or disk image all the way up to
//! the source text of a Locomotive BASIC program.
//!
//! ## Architecture
//!
//! The layers are:
//! * `img::dsk` decodes the DSK track and sector tables, does not try to interpret a file system
//! * `fs::amsdos` imposes the AMSDOS (CP/M 2.2) file system on the decoded sectors
//! * `zip` reads archives, with its own inflater
//! * `load` sniffs any buffer and works its way down through the containers
//!
//! When a `fs::amsdos::Disk` is created it takes ownership of the `Dsk`.
//! Nothing is ever written back, all of the readers work on buffers held in memory.
//!
//! ## Language Files
//!
//! `lang::locomotive` handles (de)tokenization of Locomotive BASIC 1.1, including
//! the 5-byte floating point format.  Problems found while detokenizing do not
//! stop the decode, they are gathered as `lang::Diagnostic`.
//!
//! ## Disk Formats
//!
//! Both standard (`MV - CPC`) and extended (`EXTENDED`) DSK images are supported.
//! The AMSDOS format is chosen from the sector ids of the first track:
//! * DATA format (sector ids 0xC1..0xC9)
//! * SYSTEM format (sector ids 0x41..0x49)
//! * IBM format (sector ids 0x01..0x08)

pub mod cursor;
pub mod lang;
pub mod bios;
pub mod img;
pub mod fs;
pub mod zip;
pub mod load;
pub mod commands;

use log::info;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Given a bytestream return the AMSDOS file system, or Err if the bytestream cannot be interpreted.
/// The file system takes ownership of the image.
pub fn create_fs_from_bytestream(disk_img_data: &[u8]) -> Result<fs::amsdos::Disk,DYNERR> {
    let img = img::dsk::Dsk::from_bytes(disk_img_data)?;
    info!("identified DSK image");
    fs::amsdos::Disk::from_img(img)
}

/// Format binary in columns of hex and ascii, 16 bytes per row
pub fn block_to_string(start_addr: u16,block: &[u8]) -> String {
    let mut ans = String::new();
    for (row,slice) in block.chunks(16).enumerate() {
        let row_label = start_addr as usize + row*16;
        let txt: String = slice.iter().map(|c| match *c {
            x if x>=32 && x<127 => x as char,
            _ => '.'
        }).collect();
        ans += &format!("{:04X} : ",row_label);
        for byte in slice {
            ans += &format!("{:02X} ",byte);
        }
        for _blank in slice.len()..16 {
            ans += "   ";
        }
        ans += &format!("| {}\n",txt);
    }
    return ans;
}

/// Display binary to stdout in columns of hex and ascii
pub fn display_block(start_addr: u16,block: &[u8]) {
    print!("{}",block_to_string(start_addr,block));
}

#[test]
fn block_display() {
    let s = block_to_string(0x170,b"HELLO\x00\x01 world, this is long");
    let lines: Vec<&str> = s.lines().collect();
    assert_eq!(lines.len(),2);
    assert_eq!(lines[0],"0170 : 48 45 4C 4C 4F 00 01 20 77 6F 72 6C 64 2C 20 74 | HELLO.. world, t");
    assert_eq!(lines[1],"0180 : 68 69 73 20 69 73 20 6C 6F 6E 67                | his is long");
}
