//! ## Disk Parameter Block Module
//!
//! This contains disk parameter blocks (DPB) for the CPC disk formats.  There is no DPB stored on
//! an AMSDOS disk; the firmware picks one by looking at the sector ids of the first track.
//! We do the same, see `CpcFormat::from_first_sector`.

use std::fmt;
use crate::fs::amsdos::types::{DIR_ENTRY_SIZE,LOGICAL_EXTENT_SIZE,RECORD_SIZE};
use log::debug;

/// The Disk Parameter Block (DPB) was introduced with CP/M v2.
/// This allows CP/M to work with a variety of disk formats.
/// The parameters are interdependent in a complicated way, see `verify` function.
#[derive(Clone,PartialEq,Debug)]
pub struct DiskParameterBlock {
    /// number of 128-byte records per track
    pub spt: u16,
    /// block shift factor, records in block = 1 << bsh, bytes in block = 1 << bsh << 7
    pub bsh: u8,
    /// block mask, 2**bsh - 1, records in a block minus 1
    pub blm: u8,
    /// extent mask = logical extents per extent - 1.  Can be 0,1,3,7,15.
    /// Extent capacity is 16K * (EXM+1).
    /// The extent holds up to 16 8-bit refs for DSM<256, 8 16-bit refs otherwise.
    pub exm: u8,
    /// total blocks minus 1, not counting OS tracks
    pub dsm: u16,
    /// directory entries minus 1
    pub drm: u16,
    /// bitmap of directory blocks 1
    pub al0: u8,
    /// bitmap of directory blocks 2
    pub al1: u8,
    /// size of directory check vector
    pub cks: u16,
    /// number of reserved tracks, also track where directory starts
    pub off: u16,
    /// Physical record shift factor, PSH = log2(sector_bytes/128).
    pub psh: u8,
    /// Physical record mask, PHM = sector_bytes/128 - 1
    pub phm: u8
}

/// Physical layout that goes with a DPB
#[derive(Clone,PartialEq,Debug)]
pub struct CpcFormat {
    pub name: &'static str,
    /// lowest sector id on every track
    pub first_sector: u8,
    pub sectors_per_track: u8,
    pub sector_size: usize,
    pub dpb: DiskParameterBlock
}

/// The usual 178K data disk, no reserved tracks
pub const DATA: CpcFormat = CpcFormat {
    name: "DATA",
    first_sector: 0xc1,
    sectors_per_track: 9,
    sector_size: 512,
    dpb: DiskParameterBlock {
        spt: 36,
        bsh: 3,
        blm: 7,
        exm: 0,
        dsm: 179,
        drm: 63,
        al0: 0b11000000,
        al1: 0b00000000,
        cks: 16,
        off: 0,
        psh: 2,
        phm: 3
    }
};

/// The system (vendor) disk, two tracks reserved for CP/M
pub const SYSTEM: CpcFormat = CpcFormat {
    name: "SYSTEM",
    first_sector: 0x41,
    sectors_per_track: 9,
    sector_size: 512,
    dpb: DiskParameterBlock {
        spt: 36,
        bsh: 3,
        blm: 7,
        exm: 0,
        dsm: 170,
        drm: 63,
        al0: 0b11000000,
        al1: 0b00000000,
        cks: 16,
        off: 2,
        psh: 2,
        phm: 3
    }
};

/// The CP/M-86 compatible format, 8 sectors per track
pub const IBM: CpcFormat = CpcFormat {
    name: "IBM",
    first_sector: 0x01,
    sectors_per_track: 8,
    sector_size: 512,
    dpb: DiskParameterBlock {
        spt: 32,
        bsh: 3,
        blm: 7,
        exm: 0,
        dsm: 155,
        drm: 63,
        al0: 0b11000000,
        al1: 0b00000000,
        cks: 16,
        off: 1,
        psh: 2,
        phm: 3
    }
};

impl CpcFormat {
    /// Select the format by the lowest sector id found on the first track
    pub fn from_first_sector(id: u8) -> Option<CpcFormat> {
        for fmt in [DATA,SYSTEM,IBM] {
            if fmt.first_sector==id {
                return Some(fmt);
            }
        }
        debug!("no format starts with sector {:02X}",id);
        None
    }
    /// Logical track and sector id of each sector in the block, in order.
    /// The logical track still has to be split into cylinder and head.
    pub fn block_sectors(&self,block: usize) -> Vec<(usize,u8)> {
        let spt = self.sectors_per_track as usize;
        let sectors_per_block = self.dpb.block_size() / self.sector_size;
        let mut ans = Vec::new();
        for i in 0..sectors_per_block {
            let lsec = block * sectors_per_block + i;
            let track = self.dpb.off as usize + lsec / spt;
            ans.push((track,self.first_sector + (lsec % spt) as u8));
        }
        ans
    }
}

impl DiskParameterBlock {
    /// Check that parameter dependencies are all satisfied.
    pub fn verify(&self) -> bool {
        // n.b. order of these checks can matter
        if self.bsh<3 || self.bsh>7 {
            debug!("BSH is invalid");
            return false;
        }
        if self.blm as usize!=num_traits::pow(2,self.bsh as usize)-1 {
            debug!("BLM must be 2^BSH-1");
            return false;
        }
        if self.dsm>0x7fff {
            debug!("block count exceeds maximum");
            return false;
        }
        if self.bsh==3 && self.dsm>0xff {
            debug!("block count exceeds maximum for 1K blocks");
            return false;
        }
        let bls = (128 as usize) << self.bsh as usize;
        let max_exm = match self.dsm {
            dsm if dsm<256 => 16*bls/LOGICAL_EXTENT_SIZE - 1,
            _ => 8*bls/LOGICAL_EXTENT_SIZE - 1
        };
        if self.exm as usize > max_exm {
            debug!("too many logical extents");
            return false;
        }
        match self.exm {
            0b0 | 0b1 | 0b11 | 0b111 | 0b1111 => {},
            _ => {
                debug!("invalid extent mask {}",self.exm);
                return false;
            }
        }
        if self.drm as usize + 1 > 16*bls/32 {
            debug!("too many directory entries");
            return false;
        }
        let entry_bits = self.al0.count_ones() + self.al1.count_ones();
        if entry_bits as usize != (self.drm as usize + 1)*32/bls {
            debug!("directory block map mismatch");
            return false;
        }
        if self.dir_blocks() > self.user_blocks() {
            debug!("directory end block out of range");
            return false;
        }
        if (RECORD_SIZE << self.psh as usize) != RECORD_SIZE * (self.phm as usize + 1) {
            debug!("PSH and PHM disagree");
            return false;
        }
        return true;
    }
    /// size of block in bytes
    pub fn block_size(&self) -> usize {
        (128 as usize) << self.bsh as usize
    }
    /// size of block pointer in bytes
    pub fn ptr_size(&self) -> usize {
        match self.dsm {
            dsm if dsm<256 => 1,
            _ => 2
        }
    }
    /// blocks available for directory and data
    pub fn user_blocks(&self) -> usize {
        self.dsm as usize + 1
    }
    /// maximum directory entries
    pub fn dir_entries(&self) -> usize {
        self.drm as usize + 1
    }
    /// number of directory blocks
    pub fn dir_blocks(&self) -> usize {
        self.dir_entries()*DIR_ENTRY_SIZE/self.block_size()
    }
}

impl fmt::Display for CpcFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{} format, {}K",self.name,self.dpb.user_blocks()*self.dpb.block_size()/1024)
    }
}

#[test]
fn formats_are_consistent() {
    for fmt in [DATA,SYSTEM,IBM] {
        assert!(fmt.dpb.verify(),"{} failed",fmt.name);
        assert_eq!(fmt.dpb.spt as usize * RECORD_SIZE,fmt.sectors_per_track as usize * fmt.sector_size);
        assert_eq!(fmt.dpb.dir_blocks(),2);
        assert_eq!(fmt.dpb.ptr_size(),1);
    }
    assert_eq!(DATA.to_string(),"DATA format, 180K");
}

#[test]
fn block_to_sectors() {
    assert_eq!(DATA.block_sectors(0),vec![(0,0xc1),(0,0xc2)]);
    assert_eq!(DATA.block_sectors(4),vec![(0,0xc9),(1,0xc1)]);
    assert_eq!(SYSTEM.block_sectors(0),vec![(2,0x41),(2,0x42)]);
    assert_eq!(IBM.block_sectors(4),vec![(2,0x01),(2,0x02)]);
    assert_eq!(CpcFormat::from_first_sector(0x41).map(|f| f.name),Some("SYSTEM"));
    assert_eq!(CpcFormat::from_first_sector(0x81),None);
}
