//! ## Language Transformations

use std::io::{Read,Write};
use colored::Colorize;
use super::CommandError;
use crate::fs::amsdos::types::{AmsdosHeader,FileType,HEADER_SIZE,parse_amsdos_header,un_or_protect};
use crate::lang::Diagnostic;
use crate::lang::locomotive::tokenizer::Tokenizer;
use crate::STDRESULT;

/// Where BASIC programs are loaded on the CPC
pub const BASIC_START: u16 = 0x170;

/// List diagnostics on stderr with a count at the end
pub fn eprint_diagnostics(name: &str,diags: &[Diagnostic]) {
    for diag in diags {
        eprintln!("{}: {}",name,diag);
    }
    if diags.len() > 0 {
        eprintln!("! {} {}",diags.len().to_string().bright_yellow(),"warnings".bright_yellow());
    }
}

pub fn tokenize(cmd: &clap::ArgMatches) -> STDRESULT {
    if atty::is(atty::Stream::Stdin) {
        log::error!("line entry is not supported for `tokenize`, please pipe something in");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let mut program = String::new();
    match std::io::stdin().read_to_string(&mut program) {
        Ok(_) => {},
        Err(e) => {
            log::error!("the file to tokenize could not be interpreted as a string");
            return Err(Box::new(e));
        }
    }
    if program.len()==0 {
        log::error!("tokenize did not receive any data from previous node");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let mut tokenizer = Tokenizer::new();
    let mut object = tokenizer.tokenize(&program)?;
    if let Some(name) = cmd.get_one::<String>("header") {
        let hdr = AmsdosHeader::create(name,FileType::Basic,BASIC_START,0,object.len())?;
        let mut with_header = hdr.to_bytes()?;
        with_header.append(&mut object);
        object = with_header;
    }
    if atty::is(atty::Stream::Stdout) || cmd.get_flag("console") {
        crate::display_block(0,&object);
    } else {
        std::io::stdout().write_all(&object)?;
    }
    Ok(())
}

pub fn detokenize(cmd: &clap::ArgMatches) -> STDRESULT {
    if atty::is(atty::Stream::Stdin) {
        log::error!("line entry is not supported for `detokenize`, please pipe something in");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let mut tok: Vec<u8> = Vec::new();
    std::io::stdin().read_to_end(&mut tok)?;
    if tok.len()==0 {
        log::error!("detokenize did not receive any data from previous node");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let mut protected = cmd.get_flag("protected");
    if let Some(hdr) = parse_amsdos_header(&tok) {
        log::info!("found AMSDOS header for {}",hdr.display_name());
        match hdr.typ() {
            Some(FileType::Basic) => {},
            Some(FileType::Protected) => protected = true,
            _ => {
                log::error!("AMSDOS header says this is not a BASIC program");
                return Err(Box::new(CommandError::UnsupportedFormat));
            }
        }
        let end = usize::min(tok.len(),HEADER_SIZE + hdr.length());
        tok = tok[HEADER_SIZE..end].to_vec();
    }
    if protected {
        tok = un_or_protect(&tok);
    }
    let mut tokenizer = Tokenizer::new();
    let program = tokenizer.detokenize(&tok);
    for line in program.lines() {
        println!("{}",line);
    }
    eprint_diagnostics("stdin",tokenizer.diagnostics());
    Ok(())
}
