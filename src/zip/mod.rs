//! # ZIP Module
//!
//! Reads ZIP archives held in memory.  The end of central directory record (EOCD) is
//! found by scanning backward from the end of the buffer, allowing for the longest
//! possible comment.  The central directory gives the name of every entry, and the
//! offset of its local header, which in turn locates the data.
//!
//! Only the stored (0) and deflated (8) methods are supported, see `inflate`.
//! Encrypted entries are refused.  Failures carry the offset into the archive.

pub mod inflate;

use std::collections::BTreeMap;
use std::fmt::Write;
use log::{debug,trace,warn};
use crate::cursor::{ByteCursor,u16_at,u32_at};
use crate::DYNERR;

const EOCD_SIG: u32 = 0x06054b50;
const CDH_SIG: u32 = 0x02014b50;
const LFH_SIG: u32 = 0x04034b50;
const EOCD_SIZE: usize = 22;
const LFH_SIZE: usize = 30;
const MAX_COMMENT: usize = 65535;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;
const FLAG_ENCRYPTED: u16 = 1;

/// Enumerates ZIP errors, including those of the inflater.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("EOCD not found")]
    EocdNotFound,
    #[error("signature not found at offset {offset}: expected {expected:08X}, found {found:08X}")]
    BadSignature {
        offset: usize,
        expected: u32,
        found: u32
    },
    #[error("archive truncated at offset {offset}")]
    Truncated {
        offset: usize
    },
    #[error("entry `{0}` not found")]
    EntryNotFound(String),
    #[error("entry `{0}` is encrypted")]
    Encrypted(String),
    #[error("entry `{name}` uses unsupported method {method}")]
    UnsupportedMethod {
        name: String,
        method: u16
    },
    #[error("entry `{name}` should have {expected} bytes, found {found}")]
    SizeMismatch {
        name: String,
        expected: usize,
        found: usize
    },
    #[error("entry `{name}` CRC mismatch: expected {expected:08X}, found {found:08X}")]
    CrcMismatch {
        name: String,
        expected: u32,
        found: u32
    },
    #[error("invalid deflate block type at offset {offset}")]
    InvalidBlockType {
        offset: usize
    },
    #[error("stored block length check failed at offset {offset}")]
    StoredLength {
        offset: usize
    },
    #[error("bad code lengths at offset {offset}")]
    BadCodeLengths {
        offset: usize
    },
    #[error("incomplete code set at offset {offset}")]
    IncompleteCode {
        offset: usize
    },
    #[error("oversubscribed code set at offset {offset}")]
    OversubscribedCode {
        offset: usize
    },
    #[error("invalid symbol at offset {offset}")]
    InvalidSymbol {
        offset: usize
    },
    #[error("deflate distance {distance} too far back at offset {offset}")]
    DistanceTooFar {
        offset: usize,
        distance: usize
    },
    #[error("deflate output overflow at offset {offset}")]
    OutputOverflow {
        offset: usize
    },
    #[error("deflate stream ended early at offset {offset}")]
    PrematureEnd {
        offset: usize
    }
}

/// Entry in the central directory
#[derive(Clone,Debug)]
pub struct CentralDirectoryEntry {
    pub name: String,
    pub flags: u16,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: usize,
    pub size: usize,
    /// offset of the local file header
    pub local_offset: usize
}

pub struct ZipFile {
    data: Vec<u8>,
    entries: BTreeMap<String,CentralDirectoryEntry>
}

/// Does the buffer start with a local header, or the EOCD of an empty archive
pub fn test_ident(bytes: &[u8]) -> bool {
    match u32_at(bytes,0) {
        Some(sig) => sig==LFH_SIG || sig==EOCD_SIG,
        None => false
    }
}

/// Offset of the EOCD, searching backward from the end
fn find_eocd(buf: &[u8]) -> Result<usize,DYNERR> {
    if buf.len() < EOCD_SIZE {
        return Err(Box::new(Error::EocdNotFound));
    }
    let last = buf.len() - EOCD_SIZE;
    let first = last.saturating_sub(MAX_COMMENT);
    for offset in (first..=last).rev() {
        if u32_at(buf,offset)==Some(EOCD_SIG) {
            trace!("EOCD at {}",offset);
            return Ok(offset);
        }
    }
    Err(Box::new(Error::EocdNotFound))
}

fn check_signature(curs: &mut ByteCursor,expected: u32) -> Result<(),DYNERR> {
    let offset = curs.pos();
    match curs.read_u32() {
        Some(found) if found==expected => Ok(()),
        Some(found) => Err(Box::new(Error::BadSignature { offset, expected, found })),
        None => Err(Box::new(Error::Truncated { offset }))
    }
}

/// Parse one central directory header at the cursor position
fn read_cdh(curs: &mut ByteCursor) -> Result<CentralDirectoryEntry,DYNERR> {
    let start = curs.pos();
    check_signature(curs,CDH_SIG)?;
    let truncated = || -> DYNERR { Box::new(Error::Truncated { offset: start }) };
    let fixed = curs.read_slice(42).ok_or_else(truncated)?;
    let mut f = ByteCursor::new(fixed);
    // version made by, version needed
    f.read_slice(4).ok_or_else(truncated)?;
    let flags = f.read_u16().ok_or_else(truncated)?;
    let method = f.read_u16().ok_or_else(truncated)?;
    // time, date
    f.read_slice(4).ok_or_else(truncated)?;
    let crc32 = f.read_u32().ok_or_else(truncated)?;
    let compressed_size = f.read_u32().ok_or_else(truncated)? as usize;
    let size = f.read_u32().ok_or_else(truncated)? as usize;
    let name_len = f.read_u16().ok_or_else(truncated)? as usize;
    let extra_len = f.read_u16().ok_or_else(truncated)? as usize;
    let comment_len = f.read_u16().ok_or_else(truncated)? as usize;
    // disk, internal attributes, external attributes
    f.read_slice(8).ok_or_else(truncated)?;
    let local_offset = f.read_u32().ok_or_else(truncated)? as usize;
    let name = String::from_utf8_lossy(curs.read_slice(name_len).ok_or_else(truncated)?).to_string();
    curs.read_slice(extra_len + comment_len).ok_or_else(truncated)?;
    Ok(CentralDirectoryEntry {
        name,
        flags,
        method,
        crc32,
        compressed_size,
        size,
        local_offset
    })
}

impl ZipFile {
    /// Take a copy of the buffer and parse the central directory
    pub fn from_bytes(buf: &[u8]) -> Result<Self,DYNERR> {
        let eocd = find_eocd(buf)?;
        let mut curs = ByteCursor::with_range(buf,eocd+10,buf.len());
        let truncated = || -> DYNERR { Box::new(Error::Truncated { offset: eocd }) };
        let count = curs.read_u16().ok_or_else(truncated)? as usize;
        let _cd_size = curs.read_u32().ok_or_else(truncated)?;
        let cd_offset = curs.read_u32().ok_or_else(truncated)? as usize;
        debug!("central directory at {} with {} entries",cd_offset,count);
        let mut curs = ByteCursor::with_range(buf,cd_offset,eocd);
        if cd_offset > eocd {
            return Err(Box::new(Error::Truncated { offset: cd_offset }));
        }
        let mut entries = BTreeMap::new();
        for _i in 0..count {
            let entry = read_cdh(&mut curs)?;
            if entry.name.ends_with('/') {
                trace!("skip directory {}",entry.name);
                continue;
            }
            trace!("entry {} method {} size {}",entry.name,entry.method,entry.size);
            entries.insert(entry.name.clone(),entry);
        }
        Ok(Self {
            data: buf.to_vec(),
            entries
        })
    }
    pub fn entries(&self) -> &BTreeMap<String,CentralDirectoryEntry> {
        &self.entries
    }
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
    /// Check the local header and work out where the data starts
    fn data_start(&self,entry: &CentralDirectoryEntry) -> Result<usize,DYNERR> {
        let mut curs = ByteCursor::with_range(&self.data,entry.local_offset,self.data.len());
        if curs.pos()!=entry.local_offset {
            return Err(Box::new(Error::Truncated { offset: entry.local_offset }));
        }
        check_signature(&mut curs,LFH_SIG)?;
        let name_len = u16_at(&self.data,entry.local_offset+26);
        let extra_len = u16_at(&self.data,entry.local_offset+28);
        match (name_len,extra_len) {
            (Some(n),Some(e)) => Ok(entry.local_offset + LFH_SIZE + n as usize + e as usize),
            _ => Err(Box::new(Error::Truncated { offset: entry.local_offset }))
        }
    }
    /// Get the uncompressed data of the named entry.
    /// The size and CRC are checked against the central directory.
    pub fn read_data(&self,name: &str) -> Result<Vec<u8>,DYNERR> {
        let entry = match self.entries.get(name) {
            Some(e) => e,
            None => return Err(Box::new(Error::EntryNotFound(name.to_string())))
        };
        if entry.flags & FLAG_ENCRYPTED > 0 {
            return Err(Box::new(Error::Encrypted(name.to_string())));
        }
        let start = self.data_start(entry)?;
        let compressed = match self.data.get(start..start+entry.compressed_size) {
            Some(dat) => dat,
            None => return Err(Box::new(Error::Truncated { offset: start }))
        };
        let ans = match entry.method {
            METHOD_STORED => compressed.to_vec(),
            METHOD_DEFLATED => inflate::inflate(compressed,entry.size)?,
            method => return Err(Box::new(Error::UnsupportedMethod { name: name.to_string(), method }))
        };
        if ans.len()!=entry.size {
            return Err(Box::new(Error::SizeMismatch { name: name.to_string(), expected: entry.size, found: ans.len() }));
        }
        let crc = crc::crc32::checksum_ieee(&ans);
        if crc!=entry.crc32 {
            warn!("CRC check failed for {}",name);
            return Err(Box::new(Error::CrcMismatch { name: name.to_string(), expected: entry.crc32, found: crc }));
        }
        Ok(ans)
    }
    /// List entries with sizes and methods
    pub fn catalog_to_string(&self) -> Result<String,DYNERR> {
        let mut ans = String::new();
        for (name,entry) in &self.entries {
            let method = match entry.method {
                METHOD_STORED => "stored".to_string(),
                METHOD_DEFLATED => "deflated".to_string(),
                m => format!("method {}",m)
            };
            writeln!(ans,"{:24} {:8} {}",name,entry.size,method)?;
        }
        write!(ans,"{} entries",self.entries.len())?;
        Ok(ans)
    }
}

#[test]
fn eocd_not_found() {
    match ZipFile::from_bytes(&[0;100]) {
        Err(e) => assert_eq!(e.to_string(),"EOCD not found"),
        Ok(_) => panic!("zip should have failed")
    }
    assert!(ZipFile::from_bytes(b"PK").is_err());
}

#[test]
fn empty_archive() {
    let mut buf = vec![0x50,0x4b,0x05,0x06];
    buf.append(&mut vec![0;18]);
    let zip = ZipFile::from_bytes(&buf).expect("empty zip failed");
    assert_eq!(zip.names().len(),0);
    assert!(test_ident(&buf));
    assert!(zip.read_data("file1").is_err());
}
