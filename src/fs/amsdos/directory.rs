//! ### AMSDOS directory structures
//!
//! AMSDOS uses the CP/M 2.2 directory unchanged.  The directory is a packed
//! sequence of 32-byte entries, each one an "extent" pointing to up to 16 blocks.
//! There is no separate file index or volume bitmap.

use std::collections::BTreeMap;
use binrw::BinRead;
use binrw::io::Cursor;
use log::{debug,trace};
use super::types::*;
use crate::bios::dpb::DiskParameterBlock;
use crate::DYNERR;

/// The extent is in general a partial directory entry.  The bigger the
/// file gets the more extents are needed to point to all the blocks.
#[derive(BinRead,Clone,PartialEq,Debug)]
#[br(little)]
pub struct Extent {
    /// value 0-15 identifies this as a file extent.  value 0xe5 means unused or deleted.
    pub user: u8,
    /// positive ASCII, high bits are attributes
    pub name: [u8;8],
    /// positive ASCII, high bits are read only, system, archived
    pub typ: [u8;3],
    /// bits 0-4 are the low 5-bits of the extent index
    idx_low: u8,
    /// always 0 for AMSDOS
    last_bytes: u8,
    /// bits 0-5 are the high 6-bits of the extent index
    idx_high: u8,
    /// records (128 bytes each) used in the last logical extent
    last_records: u8,
    /// block pointers, 8 or 16 bit depending on the DPB
    pub block_list: [u8;16]
}

impl Extent {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self,DYNERR> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }
    /// Extent index, counting logical extents
    pub fn index(&self) -> usize {
        (self.idx_low & 0x1f) as usize + (((self.idx_high & 0x3f) as usize) << 5)
    }
    /// Number of records in this extent, accounting for logical extents below the last one
    pub fn records(&self,dpb: &DiskParameterBlock) -> usize {
        let full_lx = self.idx_low as usize & dpb.exm as usize;
        full_lx * LOGICAL_EXTENT_SIZE / RECORD_SIZE + self.last_records as usize
    }
    /// Get block pointers, given the DPB (which implies the pointer size).
    /// The pointers are converted to usize unconditionally.
    pub fn get_block_list(&self,dpb: &DiskParameterBlock) -> Vec<usize> {
        match dpb.ptr_size() {
            1 => self.block_list.iter().map(|x| *x as usize).collect(),
            _ => {
                let mut ans: Vec<usize> = Vec::new();
                for i in 0..8 {
                    ans.push(u16::from_le_bytes([self.block_list[i*2],self.block_list[i*2+1]]) as usize);
                }
                ans
            }
        }
    }
    /// Name as it would be displayed by CAT, prefixed by `u:` for users other than 0
    pub fn display_name(&self) -> String {
        let name = display_name(&self.name,&self.typ);
        match self.user {
            0 => name,
            u => format!("{}:{}",u,name)
        }
    }
}

/// Build the file map from the raw directory, keys are display names, extents are sorted.
/// Deleted and non-file entries are skipped.
pub fn build_files(dir: &[u8]) -> Result<BTreeMap<String,Vec<Extent>>,DYNERR> {
    let mut ans: BTreeMap<String,Vec<Extent>> = BTreeMap::new();
    for (i,chunk) in dir.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
        match chunk[0] {
            DELETED => continue,
            x if x>=USER_END => {
                trace!("skip entry {} with status {:02X}",i,x);
                continue;
            },
            _ => {}
        }
        let fx = Extent::from_bytes(chunk)?;
        let key = fx.display_name();
        trace!("entry {} is extent {} of {}",i,fx.index(),key);
        ans.entry(key).or_insert(Vec::new()).push(fx);
    }
    for (name,extents) in ans.iter_mut() {
        extents.sort_by_key(|x| x.index());
        for pair in extents.windows(2) {
            if pair[0].index()==pair[1].index() {
                debug!("{} has a repeated extent",name);
                return Err(Box::new(Error::RepeatedExtent(pair[0].index())));
            }
        }
    }
    Ok(ans)
}

#[cfg(test)]
fn entry(user: u8,name: &[u8;11],ex: u8,rc: u8,blocks: &[u8]) -> Vec<u8> {
    let mut ans = vec![user];
    ans.extend_from_slice(name);
    ans.extend_from_slice(&[ex & 0x1f,0,ex >> 5,rc]);
    let mut ptrs = [0u8;16];
    ptrs[0..blocks.len()].copy_from_slice(blocks);
    ans.extend_from_slice(&ptrs);
    ans
}

#[test]
fn extents_are_grouped_and_sorted() {
    let dpb = crate::bios::dpb::DATA.dpb;
    let mut dir = Vec::new();
    dir.append(&mut entry(0,b"BIG     DAT",1,5,&[20,21]));
    dir.append(&mut entry(0,b"HELLO   BAS",0,2,&[2]));
    dir.append(&mut entry(DELETED,b"OLD     BAS",0,2,&[9]));
    dir.append(&mut entry(3,b"HELLO   BAS",0,1,&[10]));
    dir.append(&mut entry(0,b"BIG     DAT",0,128,&[3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18]));
    dir.append(&mut vec![DELETED;32]);
    let files = build_files(&dir).expect("directory failed");
    assert_eq!(files.keys().cloned().collect::<Vec<String>>(),vec!["3:HELLO.BAS","BIG.DAT","HELLO.BAS"]);
    let big = &files["BIG.DAT"];
    assert_eq!(big[0].index(),0);
    assert_eq!(big[1].index(),1);
    assert_eq!(big[0].records(&dpb),128);
    assert_eq!(big[1].get_block_list(&dpb)[0..3],[20,21,0]);
}

#[test]
fn repeated_extent_is_an_error() {
    let mut dir = Vec::new();
    dir.append(&mut entry(0,b"HELLO   BAS",0,2,&[2]));
    dir.append(&mut entry(0,b"HELLO   BAS",0,2,&[3]));
    assert!(build_files(&dir).is_err());
}
