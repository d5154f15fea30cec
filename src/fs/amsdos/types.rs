use std::fmt;
use binrw::{BinRead,BinWrite};
use binrw::io::Cursor;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use log::{debug,trace};
use crate::DYNERR;

/// Status byte for a deleted file, also fill value for unused blocks.
pub const DELETED: u8 = 0xe5;
/// Largest possible user number plus one
pub const USER_END: u8 = 0x10;
/// Unit of data transfer in bytes as seen by the CP/M BDOS.
pub const RECORD_SIZE: usize = 128;
/// Size of the directory entry in bytes, always 32
pub const DIR_ENTRY_SIZE: usize = 32;
/// There is a subdivision of an extent, sometimes called a logical extent,
/// which has a fixed size. See the EXM field in the disk parameter block.
pub const LOGICAL_EXTENT_SIZE: usize = 16384;
/// Size of the AMSDOS header that is prefixed to non-ASCII files
pub const HEADER_SIZE: usize = 128;
/// The header checksum covers this many bytes
const CHECKSUM_SPAN: usize = 67;
/// Largest length the 24-bit length field can hold
const MAX_LENGTH: usize = 0xffffff;
/// CP/M end of file marker for text
const EOF_MARKER: u8 = 0x1a;

/// Keys used by the firmware to scramble protected BASIC
const PROTECT_KEY1: [u8;13] = [0xe2,0x9d,0xdb,0x1a,0x42,0x29,0x39,0xc6,0xb3,0xc6,0x90,0x45,0x8a];
const PROTECT_KEY2: [u8;11] = [0x49,0xb1,0x36,0xf0,0x2e,0x1e,0x06,0x2a,0x28,0x19,0xea];

/// Enumerates AMSDOS errors.  The `Display` trait will print the long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("bad disk format")]
    BadFormat,
    #[error("block {0} is beyond the end of the disk")]
    BlockRange(usize),
    #[error("repeated extent {0}")]
    RepeatedExtent(usize),
    #[error("file not found")]
    FileNotFound,
    #[error("bad file name `{0}`")]
    BadName(String),
    #[error("file too large for header")]
    FileTooLarge
}

/// AMSDOS file types, as stored in the header
/// * u8 to FileType: `FileType::from_u8` (use FromPrimitive trait)
#[derive(FromPrimitive,Clone,Copy,PartialEq,Debug)]
pub enum FileType {
    Basic = 0x00,
    Protected = 0x01,
    Binary = 0x02,
    Ascii = 0x16
}

impl fmt::Display for FileType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f,"BASIC"),
            Self::Protected => write!(f,"protected BASIC"),
            Self::Binary => write!(f,"binary"),
            Self::Ascii => write!(f,"ASCII")
        }
    }
}

/// The 128 byte header AMSDOS puts in front of BASIC and binary files.
/// ASCII files saved by BASIC normally have no header.
#[derive(BinRead,BinWrite,Clone,PartialEq,Debug)]
#[brw(little)]
pub struct AmsdosHeader {
    pub user: u8,
    pub name: [u8;8],
    pub ext: [u8;3],
    pub unused1: [u8;4],
    /// cassette only
    pub block_num: u8,
    /// cassette only
    pub last_block: u8,
    pub file_type: u8,
    pub data_len: u16,
    pub load: u16,
    /// cassette only
    pub first_block: u8,
    pub logical_len: u16,
    pub entry: u16,
    pub unused2: [u8;36],
    /// 24 bit length of the file, not counting the header
    pub file_len: [u8;3],
    /// sum of bytes 0..67
    pub checksum: u16,
    pub unused3: [u8;59]
}

fn checksum(bytes: &[u8]) -> u16 {
    bytes[0..CHECKSUM_SPAN].iter().fold(0u16,|acc,b| acc.wrapping_add(*b as u16))
}

/// Split `NAME.EXT` into space padded, upper case fields
fn split_name(name: &str) -> Result<([u8;8],[u8;3]),DYNERR> {
    let upper = name.to_uppercase();
    let (base,ext) = match upper.split_once('.') {
        Some((b,e)) => (b.to_string(),e.to_string()),
        None => (upper.clone(),String::new())
    };
    if base.len()==0 || base.len()>8 || ext.len()>3 || !upper.is_ascii() || upper.contains(' ') {
        return Err(Box::new(Error::BadName(name.to_string())));
    }
    let mut ans_base = [0x20;8];
    let mut ans_ext = [0x20;3];
    ans_base[0..base.len()].copy_from_slice(base.as_bytes());
    ans_ext[0..ext.len()].copy_from_slice(ext.as_bytes());
    Ok((ans_base,ans_ext))
}

/// Form `NAME.EXT` from the padded fields, attribute bits are stripped
pub fn display_name(name: &[u8],ext: &[u8]) -> String {
    let base: String = name.iter().map(|b| (b & 0x7f) as char).collect();
    let typ: String = ext.iter().map(|b| (b & 0x7f) as char).collect();
    let base = base.trim_end();
    let typ = typ.trim_end();
    match typ.len() {
        0 => base.to_string(),
        _ => [base,".",typ].concat()
    }
}

impl AmsdosHeader {
    /// Create a header for a file going to disk, checksum is computed.
    pub fn create(name: &str,file_type: FileType,load: u16,entry: u16,length: usize) -> Result<Self,DYNERR> {
        if length > MAX_LENGTH {
            return Err(Box::new(Error::FileTooLarge));
        }
        let (name,ext) = split_name(name)?;
        let short_len = usize::min(length,u16::MAX as usize) as u16;
        let mut ans = Self {
            user: 0,
            name,
            ext,
            unused1: [0;4],
            block_num: 0,
            last_block: 0,
            file_type: file_type as u8,
            data_len: short_len,
            load,
            first_block: 0xff,
            logical_len: short_len,
            entry,
            unused2: [0;36],
            file_len: [length as u8,(length >> 8) as u8,(length >> 16) as u8],
            checksum: 0,
            unused3: [0;59]
        };
        let bytes = ans.to_bytes()?;
        ans.checksum = checksum(&bytes);
        Ok(ans)
    }
    pub fn to_bytes(&self) -> Result<Vec<u8>,DYNERR> {
        let mut curs = Cursor::new(Vec::new());
        self.write(&mut curs)?;
        Ok(curs.into_inner())
    }
    /// length of the file not counting the header
    pub fn length(&self) -> usize {
        self.file_len[0] as usize + ((self.file_len[1] as usize) << 8) + ((self.file_len[2] as usize) << 16)
    }
    pub fn typ(&self) -> Option<FileType> {
        FileType::from_u8(self.file_type)
    }
    pub fn display_name(&self) -> String {
        display_name(&self.name,&self.ext)
    }
}

/// Interpret the start of a file as an AMSDOS header.
/// The checksum must match, otherwise there is no header.
/// A block of zeros is not taken as a header even though it sums correctly.
pub fn parse_amsdos_header(bytes: &[u8]) -> Option<AmsdosHeader> {
    if bytes.len() < HEADER_SIZE {
        trace!("too short for a header");
        return None;
    }
    let computed = checksum(bytes);
    let stored = u16::from_le_bytes([bytes[67],bytes[68]]);
    if computed!=stored || computed==0 {
        trace!("header checksum {:04X}, found {:04X}",computed,stored);
        return None;
    }
    match AmsdosHeader::read(&mut Cursor::new(&bytes[0..HEADER_SIZE])) {
        Ok(hdr) => {
            debug!("found header for {}, type {}, length {}",hdr.display_name(),hdr.file_type,hdr.length());
            Some(hdr)
        },
        Err(_) => None
    }
}

/// Scramble or unscramble protected BASIC, the operation is its own inverse.
pub fn un_or_protect(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().enumerate().map(|(i,b)| {
        let j = i & 0x7f;
        b ^ PROTECT_KEY1[j % PROTECT_KEY1.len()] ^ PROTECT_KEY2[j % PROTECT_KEY2.len()]
    }).collect()
}

/// Convert CP/M text to a string.
/// This disposes of CR, nulls negative ASCII, and terminates on 0x1a.
pub fn text_to_utf8(src: &[u8]) -> String {
    let mut ans = String::new();
    for b in src {
        match *b {
            0x0d => continue,
            EOF_MARKER => break,
            x if x>127 => ans.push('\0'),
            x => ans.push(x as char)
        }
    }
    ans
}

#[test]
fn header_round_trip() {
    let hdr = AmsdosHeader::create("hello.bas",FileType::Basic,0x170,0,56).expect("create failed");
    let bytes = hdr.to_bytes().expect("write failed");
    assert_eq!(bytes.len(),HEADER_SIZE);
    assert_eq!(&bytes[1..12],b"HELLO   BAS");
    let parsed = parse_amsdos_header(&bytes).expect("no header");
    assert_eq!(parsed,hdr);
    assert_eq!(parsed.length(),56);
    assert_eq!(parsed.load,0x170);
    assert_eq!(parsed.typ(),Some(FileType::Basic));
    assert_eq!(parsed.display_name(),"HELLO.BAS");
}

#[test]
fn header_checksum_mismatch() {
    let hdr = AmsdosHeader::create("GAME.BIN",FileType::Binary,0x4000,0x4000,0x12345).expect("create failed");
    let mut bytes = hdr.to_bytes().expect("write failed");
    assert_eq!(parse_amsdos_header(&bytes).map(|h| h.length()),Some(0x12345));
    bytes[20] ^= 1;
    assert!(parse_amsdos_header(&bytes).is_none());
    assert!(parse_amsdos_header(&[0;128]).is_none());
    assert!(parse_amsdos_header(&bytes[0..100]).is_none());
}

#[test]
fn bad_names() {
    assert!(AmsdosHeader::create("TOOLONGNAME.BAS",FileType::Basic,0,0,0).is_err());
    assert!(AmsdosHeader::create("A.BASIC",FileType::Basic,0,0,0).is_err());
    assert!(AmsdosHeader::create(".BAS",FileType::Basic,0,0,0).is_err());
    assert!(AmsdosHeader::create("A.B",FileType::Basic,0,0,MAX_LENGTH+1).is_err());
}

#[test]
fn protection_is_involution() {
    let plain: Vec<u8> = (0..300).map(|i| (i*7) as u8).collect();
    let scrambled = un_or_protect(&plain);
    assert_ne!(scrambled,plain);
    assert_eq!(scrambled[0],plain[0] ^ 0xe2 ^ 0x49);
    assert_eq!(scrambled[128],plain[128] ^ 0xe2 ^ 0x49);
    assert_eq!(un_or_protect(&scrambled),plain);
}

#[test]
fn text_conversion() {
    assert_eq!(text_to_utf8(b"10 PRINT\r\n20 END\r\n\x1a\x1a\xe5"),"10 PRINT\n20 END\n");
    assert_eq!(text_to_utf8(b"A\xc1B"),"A\0B");
}
