//! # Byte Cursor
//!
//! Sequential reader over a byte slice.  Every read is bounded by `end`, which may be
//! shorter than the slice (e.g. the end of a BASIC line).  Reads that would cross the
//! bound return `None` and leave the position unchanged, so callers can decide how
//! to recover.

/// Cursor over a borrowed buffer, positions are absolute offsets into the buffer.
#[derive(Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize
}

impl<'a> ByteCursor<'a> {
    /// Cursor over the whole buffer
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: buf.len()
        }
    }
    /// Cursor over `buf[pos..end]`, `end` is clamped to the buffer length
    pub fn with_range(buf: &'a [u8],pos: usize,end: usize) -> Self {
        let end = usize::min(end,buf.len());
        Self {
            buf,
            pos: usize::min(pos,end),
            end
        }
    }
    pub fn pos(&self) -> usize {
        self.pos
    }
    pub fn end(&self) -> usize {
        self.end
    }
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }
    /// bytes left before the bound
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }
    /// Move the bound, clamped to the buffer.  The position is pulled back if needed.
    pub fn set_end(&mut self,end: usize) {
        self.end = usize::min(end,self.buf.len());
        if self.pos > self.end {
            self.pos = self.end;
        }
    }
    /// Move the position, clamped to the bound.
    pub fn seek(&mut self,pos: usize) {
        self.pos = usize::min(pos,self.end);
    }
    /// Advance to the bound.
    pub fn skip_to_end(&mut self) {
        self.pos = self.end;
    }
    pub fn peek_u8(&self) -> Option<u8> {
        match self.pos < self.end {
            true => Some(self.buf[self.pos]),
            false => None
        }
    }
    pub fn read_u8(&mut self) -> Option<u8> {
        let ans = self.peek_u8()?;
        self.pos += 1;
        Some(ans)
    }
    pub fn read_u16(&mut self) -> Option<u16> {
        let s = self.read_slice(2)?;
        Some(u16::from_le_bytes([s[0],s[1]]))
    }
    pub fn read_u32(&mut self) -> Option<u32> {
        let s = self.read_slice(4)?;
        Some(u32::from_le_bytes([s[0],s[1],s[2],s[3]]))
    }
    /// Read exactly `len` bytes or nothing
    pub fn read_slice(&mut self,len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let ans = &self.buf[self.pos..self.pos+len];
        self.pos += len;
        Some(ans)
    }
    /// Read up to `len` bytes, returning fewer if the bound is reached
    pub fn read_upto(&mut self,len: usize) -> &'a [u8] {
        let n = usize::min(len,self.remaining());
        let ans = &self.buf[self.pos..self.pos+n];
        self.pos += n;
        ans
    }
    /// Offset of the first byte at or after the position matching `pred`, if any before the bound
    pub fn find(&self,mut pred: impl FnMut(u8) -> bool) -> Option<usize> {
        self.buf[self.pos..self.end].iter().position(|b| pred(*b)).map(|i| self.pos + i)
    }
}

/// little endian u16 at an absolute offset, None if out of range
pub fn u16_at(buf: &[u8],offset: usize) -> Option<u16> {
    match buf.get(offset..offset+2) {
        Some(s) => Some(u16::from_le_bytes([s[0],s[1]])),
        None => None
    }
}

/// little endian u32 at an absolute offset, None if out of range
pub fn u32_at(buf: &[u8],offset: usize) -> Option<u32> {
    match buf.get(offset..offset+4) {
        Some(s) => Some(u32::from_le_bytes([s[0],s[1],s[2],s[3]])),
        None => None
    }
}

#[test]
fn bounded_reads() {
    let buf = [1,2,3,4,5,6];
    let mut curs = ByteCursor::with_range(&buf,1,5);
    assert_eq!(curs.read_u16(),Some(0x0302));
    assert_eq!(curs.read_u32(),None);
    assert_eq!(curs.pos(),3);
    assert_eq!(curs.read_upto(8),&[4,5]);
    assert_eq!(curs.remaining(),0);
    assert_eq!(curs.read_u8(),None);
}

#[test]
fn find_stops_at_bound() {
    let buf = [0x41,0x42,0xc3,0x44];
    let curs = ByteCursor::with_range(&buf,0,2);
    assert_eq!(curs.find(|b| b>=0x80),None);
    let curs = ByteCursor::new(&buf);
    assert_eq!(curs.find(|b| b>=0x80),Some(2));
}
