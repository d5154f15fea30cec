//! # Load Module
//!
//! Takes any buffer the user hands us and works out what it is: a ZIP archive, a DSK
//! image, a file with an AMSDOS header, a program image, ASCII text, or binary.
//! Containers are opened and their contents put back on the work queue, so that
//! a program inside a disk inside an archive comes out as text.
//!
//! Nesting is bounded by `MAX_NESTING`.  Errors are collected per item, a bad entry
//! never stops the rest of the batch.

use std::collections::VecDeque;
use std::fmt;
use log::{debug,info,warn};
use crate::fs::amsdos;
use crate::fs::amsdos::types::{AmsdosHeader,FileType,HEADER_SIZE,parse_amsdos_header,un_or_protect,text_to_utf8};
use crate::img::dsk;
use crate::lang::Diagnostic;
use crate::lang::locomotive;
use crate::lang::locomotive::tokenizer::Tokenizer;
use crate::zip;
use crate::DYNERR;

/// Containers are opened only up to this depth, the top level is depth 0
pub const MAX_NESTING: usize = 1;

/// Enumerates loader errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("container nested too deeply (depth {0})")]
    TooDeep(usize)
}

/// What a buffer was found to be
#[derive(Clone,Debug,PartialEq)]
pub enum Format {
    Zip,
    Dsk,
    Amsdos(AmsdosHeader),
    Tokenized,
    Ascii,
    Binary
}

/// How a loaded item was decoded
#[derive(Clone,Copy,Debug,PartialEq)]
pub enum ItemKind {
    Basic,
    Protected,
    Ascii,
    Binary
}

impl fmt::Display for ItemKind {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f,"BASIC"),
            Self::Protected => write!(f,"protected BASIC"),
            Self::Ascii => write!(f,"ASCII"),
            Self::Binary => write!(f,"binary")
        }
    }
}

/// A file that came out of the loader.
/// `data` is the file without any AMSDOS header, `text` is present for everything but binary.
#[derive(Clone,Debug)]
pub struct LoadedItem {
    pub name: String,
    pub kind: ItemKind,
    pub header: Option<AmsdosHeader>,
    pub data: Vec<u8>,
    pub text: Option<String>,
    pub diagnostics: Vec<Diagnostic>
}

#[derive(Clone,Debug,PartialEq)]
pub struct LoadError {
    pub name: String,
    pub message: String
}

#[derive(Clone,Debug,Default)]
pub struct LoadReport {
    pub items: Vec<LoadedItem>,
    pub errors: Vec<LoadError>
}

struct WorkItem {
    name: String,
    data: Vec<u8>,
    depth: usize
}

/// Printable ASCII, allowing CR, LF, and TAB, up to the end of file marker
fn is_text(bytes: &[u8]) -> bool {
    let end = match bytes.iter().position(|b| *b==0x1a) {
        Some(e) => e,
        None => bytes.len()
    };
    end > 0 && bytes[0..end].iter().all(|b| (*b>=0x20 && *b<0x7f) || *b==0x0d || *b==0x0a || *b==0x09)
}

/// Work out what the buffer is, containers are tested first
pub fn sniff(bytes: &[u8]) -> Format {
    if zip::test_ident(bytes) {
        return Format::Zip;
    }
    if dsk::test_ident(bytes) {
        return Format::Dsk;
    }
    if let Some(hdr) = parse_amsdos_header(bytes) {
        return Format::Amsdos(hdr);
    }
    if is_text(bytes) {
        return Format::Ascii;
    }
    if locomotive::is_tokenized(bytes) {
        return Format::Tokenized;
    }
    Format::Binary
}

fn child_name(parent: &str,child: &str) -> String {
    [parent,"/",child].concat()
}

fn detokenize(name: &str,kind: ItemKind,header: Option<AmsdosHeader>,data: Vec<u8>) -> LoadedItem {
    let mut tokenizer = Tokenizer::new();
    let text = tokenizer.detokenize(&data);
    let diagnostics = tokenizer.diagnostics().to_vec();
    if diagnostics.len() > 0 {
        warn!("{} has {} problems",name,diagnostics.len());
    }
    LoadedItem {
        name: name.to_string(),
        kind,
        header,
        data,
        text: Some(text),
        diagnostics
    }
}

fn plain_item(name: &str,kind: ItemKind,header: Option<AmsdosHeader>,data: Vec<u8>) -> LoadedItem {
    let text = match kind {
        ItemKind::Binary => None,
        _ => Some(text_to_utf8(&data))
    };
    LoadedItem {
        name: name.to_string(),
        kind,
        header,
        data,
        text,
        diagnostics: Vec::new()
    }
}

/// Loads buffers through the work queue
struct Loader {
    queue: VecDeque<WorkItem>,
    report: LoadReport
}

impl Loader {
    fn record_error(&mut self,name: &str,e: DYNERR) {
        warn!("{}: {}",name,e);
        self.report.errors.push(LoadError {
            name: name.to_string(),
            message: e.to_string()
        });
    }
    fn check_depth(&self,depth: usize) -> Result<(),DYNERR> {
        match depth > MAX_NESTING {
            true => Err(Box::new(Error::TooDeep(depth))),
            false => Ok(())
        }
    }
    fn open_zip(&mut self,item: &WorkItem) -> Result<(),DYNERR> {
        self.check_depth(item.depth)?;
        let archive = zip::ZipFile::from_bytes(&item.data)?;
        for name in archive.names() {
            let full_name = child_name(&item.name,&name);
            match archive.read_data(&name) {
                Ok(data) => self.queue.push_back(WorkItem { name: full_name, data, depth: item.depth + 1 }),
                Err(e) => self.record_error(&full_name,e)
            }
        }
        Ok(())
    }
    fn open_dsk(&mut self,item: &WorkItem) -> Result<(),DYNERR> {
        self.check_depth(item.depth)?;
        let img = dsk::Dsk::from_bytes(&item.data)?;
        let disk = amsdos::Disk::from_img(img)?;
        for (name,extents) in disk.read_directory()? {
            let full_name = child_name(&item.name,&name);
            match disk.read_file(&extents) {
                Ok(data) => self.queue.push_back(WorkItem { name: full_name, data, depth: item.depth + 1 }),
                Err(e) => self.record_error(&full_name,e)
            }
        }
        Ok(())
    }
    fn process(&mut self,item: WorkItem) -> Result<(),DYNERR> {
        let fmt = sniff(&item.data);
        debug!("{} at depth {} is {}",item.name,item.depth,match &fmt {
            Format::Amsdos(_) => "AMSDOS",
            Format::Zip => "zip",
            Format::Dsk => "dsk",
            Format::Tokenized => "tokenized",
            Format::Ascii => "ascii",
            Format::Binary => "binary"
        });
        let loaded = match fmt {
            Format::Zip => return self.open_zip(&item),
            Format::Dsk => return self.open_dsk(&item),
            Format::Amsdos(hdr) => {
                let data = item.data[HEADER_SIZE..].to_vec();
                match hdr.typ() {
                    Some(FileType::Basic) => detokenize(&item.name,ItemKind::Basic,Some(hdr),data),
                    Some(FileType::Protected) => detokenize(&item.name,ItemKind::Protected,Some(hdr),un_or_protect(&data)),
                    Some(FileType::Ascii) => plain_item(&item.name,ItemKind::Ascii,Some(hdr),data),
                    _ => plain_item(&item.name,ItemKind::Binary,Some(hdr),data)
                }
            },
            Format::Tokenized => detokenize(&item.name,ItemKind::Basic,None,item.data),
            Format::Ascii => plain_item(&item.name,ItemKind::Ascii,None,item.data),
            Format::Binary => plain_item(&item.name,ItemKind::Binary,None,item.data)
        };
        info!("loaded {} as {}",loaded.name,loaded.kind);
        self.report.items.push(loaded);
        Ok(())
    }
}

/// Load everything that can be found in the buffer.
/// Containers are opened up to `MAX_NESTING`, failures are collected in the report.
pub fn load_bytes(name: &str,bytes: &[u8]) -> LoadReport {
    let mut loader = Loader {
        queue: VecDeque::new(),
        report: LoadReport::default()
    };
    loader.queue.push_back(WorkItem { name: name.to_string(), data: bytes.to_vec(), depth: 0 });
    while let Some(item) = loader.queue.pop_front() {
        let name = item.name.clone();
        if let Err(e) = loader.process(item) {
            loader.record_error(&name,e);
        }
    }
    loader.report
}

#[test]
fn sniff_formats() {
    assert_eq!(sniff(b"10 PRINT \"HI\"\r\n\x1a\x1a"),Format::Ascii);
    assert_eq!(sniff(&[0x0e,0x00,0x0a,0x00,0xbf,0x20,0x22,0x48,0x49,0x22,0x00,0x00,0x00]),Format::Binary);
    assert_eq!(sniff(&hex::decode("09001e00a01e0a00000000").expect("bad hex")),Format::Tokenized);
    assert_eq!(sniff(b"PK\x03\x04"),Format::Zip);
    assert_eq!(sniff(b"EXTENDED CPC DSK File"),Format::Dsk);
    assert_eq!(sniff(&[]),Format::Binary);
    let hdr = AmsdosHeader::create("A.BAS",FileType::Basic,0x170,0,11).expect("create failed");
    let mut buf = hdr.to_bytes().expect("write failed");
    buf.append(&mut hex::decode("09001e00a01e0a00000000").expect("bad hex"));
    assert_eq!(sniff(&buf),Format::Amsdos(hdr));
}

#[test]
fn protected_program() {
    let prog = hex::decode("09001e00a01e0a00000000").expect("bad hex");
    let hdr = AmsdosHeader::create("A.BAS",FileType::Protected,0x170,0,prog.len()).expect("create failed");
    let mut buf = hdr.to_bytes().expect("write failed");
    buf.append(&mut un_or_protect(&prog));
    let report = load_bytes("A.BAS",&buf);
    assert_eq!(report.errors.len(),0);
    assert_eq!(report.items.len(),1);
    assert_eq!(report.items[0].kind,ItemKind::Protected);
    assert_eq!(report.items[0].text.as_deref(),Some("30 GOTO 10"));
}

#[test]
fn bad_container_is_reported() {
    let report = load_bytes("broken.dsk",b"MV - CPC but far too short");
    assert_eq!(report.items.len(),0);
    assert_eq!(report.errors.len(),1);
    assert_eq!(report.errors[0].name,"broken.dsk");
}
