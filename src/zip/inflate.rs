//! ### Raw DEFLATE decoder
//!
//! Decodes stored, fixed Huffman, and dynamic Huffman blocks.  Huffman codes are
//! canonical, so a code is fully described by a count of codes of each length and
//! the symbols in code order.  Decoding walks the counts one bit at a time.
//!
//! The output is bounded by the caller's limit, and every error carries the offset
//! into the compressed stream where it was detected.

use log::{debug,trace};
use super::Error;
use crate::DYNERR;

const MAXBITS: usize = 15;
const MAXLCODES: usize = 286;
const MAXDCODES: usize = 30;
const FIXLCODES: usize = 288;
const END_OF_BLOCK: u16 = 256;

const LEN_BASE: [u16;29] = [3,4,5,6,7,8,9,10,11,13,15,17,19,23,27,31,35,43,51,59,67,83,99,115,131,163,195,227,258];
const LEN_EXTRA: [u32;29] = [0,0,0,0,0,0,0,0,1,1,1,1,2,2,2,2,3,3,3,3,4,4,4,4,5,5,5,5,0];
const DIST_BASE: [u16;30] = [1,2,3,4,5,7,9,13,17,25,33,49,65,97,129,193,257,385,513,769,1025,1537,2049,3073,4097,6145,8193,12289,16385,24577];
const DIST_EXTRA: [u32;30] = [0,0,0,0,1,1,2,2,3,3,4,4,5,5,6,6,7,7,8,8,9,9,10,10,11,11,12,12,13,13];
/// order in which code length code lengths are sent
const CL_ORDER: [usize;19] = [16,17,18,0,8,7,9,6,10,5,11,4,12,3,13,2,14,1,15];

/// Canonical Huffman code
struct Huffman {
    /// number of codes of each length
    count: [u16;MAXBITS+1],
    /// symbols ordered by code
    symbol: Vec<u16>
}

impl Huffman {
    /// Build the code from the code lengths of each symbol.
    /// Also returns the codes left over: 0 means complete, positive incomplete, negative oversubscribed.
    fn new(lengths: &[u8]) -> (Self,i32) {
        let mut ans = Self {
            count: [0;MAXBITS+1],
            symbol: vec![0;lengths.len()]
        };
        for len in lengths {
            ans.count[*len as usize] += 1;
        }
        if ans.count[0] as usize==lengths.len() {
            return (ans,0);
        }
        let mut left: i32 = 1;
        for len in 1..=MAXBITS {
            left <<= 1;
            left -= ans.count[len] as i32;
            if left < 0 {
                return (ans,left);
            }
        }
        let mut offs = [0usize;MAXBITS+1];
        for len in 1..MAXBITS {
            offs[len+1] = offs[len] + ans.count[len] as usize;
        }
        for (sym,len) in lengths.iter().enumerate() {
            if *len!=0 {
                ans.symbol[offs[*len as usize]] = sym as u16;
                offs[*len as usize] += 1;
            }
        }
        (ans,left)
    }
    /// number of symbols that have a code
    fn used(&self) -> usize {
        self.symbol.len() - self.count[0] as usize
    }
}

struct Inflater<'a> {
    input: &'a [u8],
    pos: usize,
    bitbuf: u32,
    bitcnt: u32,
    out: Vec<u8>,
    limit: usize
}

impl<'a> Inflater<'a> {
    fn new(input: &'a [u8],limit: usize) -> Self {
        Self {
            input,
            pos: 0,
            bitbuf: 0,
            bitcnt: 0,
            // limit is an untrusted size field
            out: Vec::with_capacity(usize::min(limit,input.len().saturating_mul(4))),
            limit
        }
    }
    /// Take `need` bits, least significant first
    fn bits(&mut self,need: u32) -> Result<u32,DYNERR> {
        while self.bitcnt < need {
            let byte = match self.input.get(self.pos) {
                Some(b) => *b as u32,
                None => return Err(Box::new(Error::PrematureEnd { offset: self.pos }))
            };
            self.bitbuf |= byte << self.bitcnt;
            self.pos += 1;
            self.bitcnt += 8;
        }
        let ans = self.bitbuf & ((1u32 << need) - 1);
        self.bitbuf >>= need;
        self.bitcnt -= need;
        Ok(ans)
    }
    fn push(&mut self,byte: u8) -> Result<(),DYNERR> {
        if self.out.len() >= self.limit {
            return Err(Box::new(Error::OutputOverflow { offset: self.pos }));
        }
        self.out.push(byte);
        Ok(())
    }
    fn stored(&mut self) -> Result<(),DYNERR> {
        // discard bits up to the byte boundary
        self.bitbuf = 0;
        self.bitcnt = 0;
        let hdr = match self.input.get(self.pos..self.pos+4) {
            Some(h) => h,
            None => return Err(Box::new(Error::PrematureEnd { offset: self.pos }))
        };
        let len = u16::from_le_bytes([hdr[0],hdr[1]]);
        let nlen = u16::from_le_bytes([hdr[2],hdr[3]]);
        if len != !nlen {
            return Err(Box::new(Error::StoredLength { offset: self.pos }));
        }
        self.pos += 4;
        let len = len as usize;
        let dat = match self.input.get(self.pos..self.pos+len) {
            Some(d) => d,
            None => return Err(Box::new(Error::PrematureEnd { offset: self.input.len() }))
        };
        if self.out.len() + len > self.limit {
            return Err(Box::new(Error::OutputOverflow { offset: self.pos }));
        }
        self.out.extend_from_slice(dat);
        self.pos += len;
        trace!("stored block of {} bytes",len);
        Ok(())
    }
    /// Decode one symbol, the code bits come most significant first
    fn decode(&mut self,h: &Huffman) -> Result<u16,DYNERR> {
        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;
        for len in 1..=MAXBITS {
            code |= self.bits(1)? as i32;
            let count = h.count[len] as i32;
            if code - count < first {
                return Ok(h.symbol[(index + (code - first)) as usize]);
            }
            index += count;
            first += count;
            first <<= 1;
            code <<= 1;
        }
        Err(Box::new(Error::InvalidSymbol { offset: self.pos }))
    }
    /// Decode literals and length/distance pairs until end of block
    fn codes(&mut self,lencode: &Huffman,distcode: &Huffman) -> Result<(),DYNERR> {
        loop {
            let symbol = self.decode(lencode)?;
            if symbol < END_OF_BLOCK {
                self.push(symbol as u8)?;
                continue;
            }
            if symbol==END_OF_BLOCK {
                return Ok(());
            }
            let sym = (symbol - 257) as usize;
            if sym >= LEN_BASE.len() {
                return Err(Box::new(Error::InvalidSymbol { offset: self.pos }));
            }
            let len = LEN_BASE[sym] as usize + self.bits(LEN_EXTRA[sym])? as usize;
            let dsym = self.decode(distcode)? as usize;
            if dsym >= DIST_BASE.len() {
                return Err(Box::new(Error::InvalidSymbol { offset: self.pos }));
            }
            let dist = DIST_BASE[dsym] as usize + self.bits(DIST_EXTRA[dsym])? as usize;
            if dist > self.out.len() {
                return Err(Box::new(Error::DistanceTooFar { offset: self.pos, distance: dist }));
            }
            if self.out.len() + len > self.limit {
                return Err(Box::new(Error::OutputOverflow { offset: self.pos }));
            }
            for _i in 0..len {
                let byte = self.out[self.out.len() - dist];
                self.out.push(byte);
            }
        }
    }
    fn fixed(&mut self) -> Result<(),DYNERR> {
        let mut lengths = [0u8;FIXLCODES];
        for sym in 0..FIXLCODES {
            lengths[sym] = match sym {
                s if s < 144 => 8,
                s if s < 256 => 9,
                s if s < 280 => 7,
                _ => 8
            };
        }
        let (lencode,_) = Huffman::new(&lengths);
        let (distcode,_) = Huffman::new(&[5;MAXDCODES]);
        self.codes(&lencode,&distcode)
    }
    fn dynamic(&mut self) -> Result<(),DYNERR> {
        let nlen = self.bits(5)? as usize + 257;
        let ndist = self.bits(5)? as usize + 1;
        let ncode = self.bits(4)? as usize + 4;
        if nlen > MAXLCODES || ndist > MAXDCODES {
            return Err(Box::new(Error::BadCodeLengths { offset: self.pos }));
        }
        let mut lengths = [0u8;MAXLCODES+MAXDCODES];
        for i in 0..ncode {
            lengths[CL_ORDER[i]] = self.bits(3)? as u8;
        }
        let (lencode,left) = Huffman::new(&lengths[0..19]);
        if left!=0 {
            return Err(Box::new(Error::IncompleteCode { offset: self.pos }));
        }
        let mut index = 0;
        while index < nlen + ndist {
            let mut symbol = self.decode(&lencode)? as usize;
            if symbol < 16 {
                lengths[index] = symbol as u8;
                index += 1;
                continue;
            }
            let mut len = 0;
            if symbol==16 {
                if index==0 {
                    return Err(Box::new(Error::BadCodeLengths { offset: self.pos }));
                }
                len = lengths[index-1];
                symbol = 3 + self.bits(2)? as usize;
            } else if symbol==17 {
                symbol = 3 + self.bits(3)? as usize;
            } else {
                symbol = 11 + self.bits(7)? as usize;
            }
            if index + symbol > nlen + ndist {
                return Err(Box::new(Error::BadCodeLengths { offset: self.pos }));
            }
            for _i in 0..symbol {
                lengths[index] = len;
                index += 1;
            }
        }
        if lengths[END_OF_BLOCK as usize]==0 {
            debug!("dynamic block has no end code");
            return Err(Box::new(Error::BadCodeLengths { offset: self.pos }));
        }
        // a single code of length 1 is allowed to be incomplete
        let (lencode,left) = Huffman::new(&lengths[0..nlen]);
        if left < 0 {
            return Err(Box::new(Error::OversubscribedCode { offset: self.pos }));
        }
        if left > 0 && lencode.used()!=1 {
            return Err(Box::new(Error::IncompleteCode { offset: self.pos }));
        }
        let (distcode,left) = Huffman::new(&lengths[nlen..nlen+ndist]);
        if left < 0 {
            return Err(Box::new(Error::OversubscribedCode { offset: self.pos }));
        }
        if left > 0 && distcode.used()!=1 {
            return Err(Box::new(Error::IncompleteCode { offset: self.pos }));
        }
        self.codes(&lencode,&distcode)
    }
}

/// Decompress a raw DEFLATE stream, producing at most `limit` bytes.
pub fn inflate(input: &[u8],limit: usize) -> Result<Vec<u8>,DYNERR> {
    let mut inf = Inflater::new(input,limit);
    loop {
        let last = inf.bits(1)?;
        let typ = inf.bits(2)?;
        trace!("block type {} at offset {}",typ,inf.pos);
        match typ {
            0 => inf.stored()?,
            1 => inf.fixed()?,
            2 => inf.dynamic()?,
            _ => return Err(Box::new(Error::InvalidBlockType { offset: inf.pos }))
        }
        if last==1 {
            break;
        }
    }
    debug!("inflated {} bytes to {}",inf.pos,inf.out.len());
    Ok(inf.out)
}

#[cfg(test)]
fn expect_error(input: &str,limit: usize,expected: &str) {
    let bytes = hex::decode(input).expect("bad hex");
    match inflate(&bytes,limit) {
        Ok(_) => panic!("inflate should have failed"),
        Err(e) => assert_eq!(e.to_string(),expected)
    }
}

#[test]
fn stored_block() {
    let bytes = hex::decode("010c00f3ff73746f72656420626c6f636b").expect("bad hex");
    assert_eq!(inflate(&bytes,100).expect("inflate failed"),b"stored block");
}

#[test]
fn fixed_blocks() {
    assert_eq!(inflate(&[0x4b,0x4c,0x4a,0x06,0x00],3).expect("inflate failed"),b"abc");
    assert_eq!(inflate(&[0x4b,0x4c,0x4a,0x4e,0x44,0x45,0x00],18).expect("inflate failed"),b"abcabcabcabcabcabc");
}

#[test]
fn dynamic_block() {
    let compressed = hex::decode([
        "6dd7b18ddd301000d1dc551c5c81861429b10007071807c370ffb5d8a931936e34fba1cf47727dfcfafdf9f5e7e3fbcfcfaf",
        "1f1fd7f76ffc3f4193a1c9d4e4d66469b23579347935392e8c6857e36cdc8dc371394ec7ed381ed70fd78ff8cd5d3f5c3f5c",
        "3f5c3f5c3f5c3f5c3f5c3f5d3f5d3fe39371fd74fd74fd74fd74fd74fd74fdedfadbf5b7ebeff8e25d7fbbfe76fdedfadbf5",
        "b7eb97eb97eb97eb97eb57fc615dbf5cbf5cbf5cbf5cbf5dbf5dbf5dbf5dbf5dbfe3bc71fd76fd76fd76fde3fac7f58feb1f",
        "d73fae7f5cffc471e9fac7f58feb5fd7bfae7f5dffbafe75fdebfad7f56f9cf6ae7f5d7f5c7f5c7f5c7f5c7f5c7f5c7f5c7f",
        "5c7f02abd22ab8bac2ab2bc0ba42ac2bc8bac2ac2bd0ba42ad2bd8ba628f6437f628784bdea2b7ec2d7c4bdfe237fc250066",
        "d4fd21f60883098409850986098709880989098a098b9975118a3d8263c263026442648264c264026542658265eebad1c51e",
        "2133413361338133a133c133e13301342134abaea6b147204d284d304d384d404d484d504d584d60cdae3b76ec115e136013",
        "62136413661368136a136c136ef3d46321f608ba09bb09bc09bd09be09bf09c009c109c279ebd5137b84e204e384e304e484",
        "e404e584e504e684e69c7abefddbe32f"
    ].concat()).expect("bad hex");
    let expected: String = (0..200).map(|i| format!("10 PRINT \"LINE {}\"\n",i)).collect();
    assert_eq!(compressed[0] & 0x07,0x05);
    let actual = inflate(&compressed,expected.len()).expect("inflate failed");
    assert_eq!(String::from_utf8_lossy(&actual),expected);
}

#[test]
fn corrupt_streams() {
    expect_error("",10,"deflate stream ended early at offset 0");
    expect_error("07",10,"invalid deflate block type at offset 1");
    expect_error("0105000000",10,"stored block length check failed at offset 1");
    expect_error("030200",10,"deflate distance 1 too far back at offset 2");
    expect_error("fd0000",10,"bad code lengths at offset 3");
    expect_error("4b4c4a0600",2,"deflate output overflow at offset 4");
    expect_error("4b4c",10,"deflate stream ended early at offset 2");
}

#[test]
fn bad_dynamic_codes() {
    // literal/length code with three 1-bit codes
    expect_error("05c0010400000080a002000000000000000000000000000000000000000000000000000000000000000a",10,
        "oversubscribed code set at offset 42");
    // literal/length code using only 1 of 2 and 1 of 4 code spaces
    expect_error("05c0010400000080a0000000000000000000000000000000000000000000000000000000000000000007",10,
        "incomplete code set at offset 42");
    // distance code with three 1-bit codes
    expect_error("05c2010400000080a0000000000000000000000000000000000000000000000000000000000000000055",10,
        "oversubscribed code set at offset 42");
}

#[test]
fn large_limit_is_not_reserved() {
    assert_eq!(inflate(&[0x4b,0x4c,0x4a,0x06,0x00],u32::MAX as usize).expect("inflate failed"),b"abc");
}
