//! Module containing the Locomotive BASIC tokenizer and detokenizer
//!
//! Spaces are not kept in the tokenized form.  Upon detokenization a space is put
//! back wherever the previous token would otherwise run into the next one, so that
//! the text re-tokenizes to the same bytes.

use std::collections::HashMap;
use log::{trace,warn,error};
use crate::lang;
use crate::lang::{Diagnostic,DiagnosticKind};
use crate::cursor::ByteCursor;
use super::token_maps;
use super::token_maps::{Entry,Operand};
use super::token_maps::{STATEMENT_SEP,INT_VAR,STR_VAR,REAL_VAR,BARE_VAR,SMALL_INT_BASE,NUM8,NUM16,
    BIN16,HEX16,LINE_NUM,REAL,QUOTE,RSX,ELSE_TOK,APOSTROPHE_TOK,FN_TOK,EXTENDED_PREFIX};
use super::real;
use crate::{STDRESULT,DYNERR};

/// keywords whose numeric arguments are line numbers
const LINE_NUM_KEYWORDS: [&str;13] = [
    "GOTO","GOSUB","THEN","ELSE","RESTORE","RESUME","RUN","LIST","DELETE","EDIT","RENUM","AUTO","ON ERROR GOTO"
];

/// State carried between tokens of a line during tokenization
struct LineState {
    /// numbers are line number references
    line_num_context: bool,
    /// last token was a statement separator
    separated: bool
}

fn scan(bytes: &[u8],start: usize,pred: impl Fn(u8) -> bool) -> usize {
    let mut i = start;
    while i < bytes.len() && pred(bytes[i]) {
        i += 1;
    }
    i
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c==b'.'
}

/// Handles tokenization and detokenization of Locomotive BASIC
pub struct Tokenizer
{
    tokenized_program: Vec<u8>,
    tokenized_line: Vec<u8>,
    tok_map: HashMap<&'static str,Vec<u8>>,
    diagnostics: Vec<Diagnostic>
}

impl Tokenizer
{
    /// Create a new `Tokenizer` structure
    pub fn new() -> Self
    {
        Self {
            tokenized_program: Vec::new(),
            tokenized_line: Vec::new(),
            tok_map: token_maps::keyword_map(),
            diagnostics: Vec::new()
        }
    }
    /// Problems found during the most recent detokenization
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
    fn diagnose(&mut self,offset: usize,kind: DiagnosticKind) {
        warn!("{} at offset {}",kind,offset);
        self.diagnostics.push(Diagnostic { offset, kind });
    }
    fn push_bit7(&mut self,name: &[u8]) {
        if let Some((last,init)) = name.split_last() {
            self.tokenized_line.extend_from_slice(init);
            self.tokenized_line.push(last | 0x80);
        }
    }
    fn push_keyword_bytes(&mut self,key: &str) -> STDRESULT {
        match self.tok_map.get(key) {
            Some(toks) => {
                let toks = toks.clone();
                self.tokenized_line.extend(toks);
                Ok(())
            },
            None => {
                error!("no token for {}",key);
                Err(Box::new(lang::Error::Tokenization))
            }
        }
    }
    /// Emit a keyword found at the position before `i`, returns the position where scanning resumes
    fn push_keyword(&mut self,key: &str,line: &str,i: usize,state: &mut LineState) -> Result<usize,DYNERR> {
        let bytes = line.as_bytes();
        if key=="ELSE" && self.tokenized_line.len() > 0 && !state.separated {
            self.tokenized_line.push(STATEMENT_SEP);
        }
        self.push_keyword_bytes(key)?;
        state.separated = false;
        state.line_num_context = LINE_NUM_KEYWORDS.contains(&key);
        match key {
            "REM" => {
                self.tokenized_line.extend_from_slice(&bytes[i..]);
                Ok(bytes.len())
            },
            "DATA" => {
                let mut quoted = false;
                let mut end = i;
                while end < bytes.len() && (quoted || bytes[end]!=b':') {
                    if bytes[end]==b'"' {
                        quoted = !quoted;
                    }
                    end += 1;
                }
                self.tokenized_line.extend_from_slice(&bytes[i..end]);
                Ok(end)
            },
            _ => Ok(i)
        }
    }
    /// `ON` may begin `ON BREAK`, `ON ERROR GOTO`, or `ON SQ`
    fn match_on_forms(line: &str,i: usize) -> (&'static str,usize) {
        let bytes = line.as_bytes();
        let next_word = |start: usize| {
            let beg = scan(bytes,start,|c| c==b' ' || c==b'\t');
            let end = scan(bytes,beg,is_name_char);
            (line[beg..end].to_ascii_uppercase(),end)
        };
        let (w1,end1) = next_word(i);
        match w1.as_str() {
            "BREAK" => ("ON BREAK",end1),
            "SQ" => ("ON SQ",end1),
            "ERROR" => match next_word(end1) {
                (w2,end2) if w2=="GOTO" => ("ON ERROR GOTO",end2),
                _ => ("ON",i)
            },
            _ => ("ON",i)
        }
    }
    fn push_number(&mut self,val: f64,plain_int: bool,state: &LineState) -> STDRESULT {
        if state.line_num_context && plain_int && val <= u16::MAX as f64 {
            self.tokenized_line.push(LINE_NUM);
            self.tokenized_line.extend_from_slice(&u16::to_le_bytes(val as u16));
        } else if val.fract()==0.0 && val <= i16::MAX as f64 {
            match val as u16 {
                n if n <= 10 => self.tokenized_line.push(SMALL_INT_BASE + n as u8),
                n if n <= 255 => self.tokenized_line.extend_from_slice(&[NUM8,n as u8]),
                n => {
                    self.tokenized_line.push(NUM16);
                    self.tokenized_line.extend_from_slice(&u16::to_le_bytes(n));
                }
            }
        } else {
            match real::encode(val) {
                Some(bytes) => {
                    self.tokenized_line.push(REAL);
                    self.tokenized_line.extend_from_slice(&bytes);
                },
                None => {
                    error!("number {} is out of range",val);
                    return Err(Box::new(lang::Error::Syntax));
                }
            }
        }
        Ok(())
    }
    fn tokenize_line(&mut self,line: &str) -> STDRESULT {
        self.tokenized_line = Vec::new();
        if !line.is_ascii() {
            error!("non-ASCII character in line: {}",line);
            return Err(Box::new(lang::Error::Tokenization));
        }
        let bytes = line.as_bytes();
        let num_end = scan(bytes,0,|c| c.is_ascii_digit());
        let line_num = match line[0..num_end].parse::<u16>() {
            Ok(n) if n > 0 => n,
            _ => {
                error!("line number missing or out of range: {}",line);
                return Err(Box::new(lang::Error::LineNumber));
            }
        };
        let mut state = LineState { line_num_context: false, separated: false };
        let mut i = num_end;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b' ' | b'\t' => {
                    i += 1;
                    continue;
                },
                b':' => {
                    self.tokenized_line.push(STATEMENT_SEP);
                    state = LineState { line_num_context: false, separated: true };
                    i += 1;
                    continue;
                },
                b'"' => {
                    let end = match bytes[i+1..].iter().position(|b| *b==b'"') {
                        Some(p) => i + 2 + p,
                        None => bytes.len()
                    };
                    self.tokenized_line.extend_from_slice(&bytes[i..end]);
                    i = end;
                },
                b'\'' => {
                    if self.tokenized_line.len() > 0 && !state.separated {
                        self.tokenized_line.push(STATEMENT_SEP);
                    }
                    self.tokenized_line.push(APOSTROPHE_TOK);
                    self.tokenized_line.extend_from_slice(&bytes[i+1..]);
                    i = bytes.len();
                },
                b'?' => {
                    i = self.push_keyword("PRINT",line,i+1,&mut state)?;
                    continue;
                },
                b'|' => {
                    let end = scan(bytes,i+1,is_name_char);
                    if end==i+1 {
                        error!("RSX name is missing");
                        return Err(Box::new(lang::Error::Syntax));
                    }
                    let name = line[i+1..end].to_ascii_uppercase();
                    self.tokenized_line.push(RSX);
                    self.tokenized_line.push(name.len() as u8);
                    self.push_bit7(name.as_bytes());
                    i = end;
                },
                b'&' => {
                    let (radix,tok,beg) = match bytes.get(i+1) {
                        Some(b'X') | Some(b'x') => (2,BIN16,i+2),
                        Some(b'H') | Some(b'h') => (16,HEX16,i+2),
                        _ => (16,HEX16,i+1)
                    };
                    let end = scan(bytes,beg,|c| (c as char).is_digit(radix));
                    if end==beg {
                        self.tokenized_line.push(c);
                        i += 1;
                    } else {
                        let val = match u16::from_str_radix(&line[beg..end],radix) {
                            Ok(v) => v,
                            Err(_) => {
                                error!("number {} is out of range",&line[i..end]);
                                return Err(Box::new(lang::Error::Syntax));
                            }
                        };
                        self.tokenized_line.push(tok);
                        self.tokenized_line.extend_from_slice(&u16::to_le_bytes(val));
                        i = end;
                    }
                },
                c if c.is_ascii_digit() || c==b'.' && bytes.get(i+1).map_or(false,|d| d.is_ascii_digit()) => {
                    let mut end = scan(bytes,i,|c| c.is_ascii_digit());
                    let mut plain_int = true;
                    if end < bytes.len() && bytes[end]==b'.' {
                        plain_int = false;
                        end = scan(bytes,end+1,|c| c.is_ascii_digit());
                    }
                    if end < bytes.len() && (bytes[end]==b'E' || bytes[end]==b'e') {
                        let mut j = end + 1;
                        if j < bytes.len() && (bytes[j]==b'+' || bytes[j]==b'-') {
                            j += 1;
                        }
                        if j < bytes.len() && bytes[j].is_ascii_digit() {
                            plain_int = false;
                            end = scan(bytes,j,|c| c.is_ascii_digit());
                        }
                    }
                    let val = match line[i..end].parse::<f64>() {
                        Ok(v) => v,
                        Err(_) => {
                            error!("could not parse number {}",&line[i..end]);
                            return Err(Box::new(lang::Error::Syntax));
                        }
                    };
                    self.push_number(val,plain_int,&state)?;
                    state.separated = false;
                    i = end;
                    // stay in line number context for lists and ranges
                    continue;
                },
                c if c.is_ascii_alphabetic() => {
                    let start = i;
                    i = scan(bytes,i+1,is_name_char);
                    let upper = line[start..i].to_ascii_uppercase();
                    let suffix = bytes.get(i).copied();
                    if suffix==Some(b'$') {
                        let with_dollar = upper.clone() + "$";
                        if self.tok_map.contains_key(with_dollar.as_str()) {
                            i = self.push_keyword(&with_dollar,line,i+1,&mut state)?;
                            continue;
                        }
                    }
                    if upper=="ON" {
                        let (key,end) = Self::match_on_forms(line,i);
                        i = self.push_keyword(key,line,end,&mut state)?;
                        continue;
                    }
                    if self.tok_map.contains_key(upper.as_str()) {
                        i = self.push_keyword(&upper,line,i,&mut state)?;
                        continue;
                    }
                    let mut name_start = start;
                    if upper.len() > 2 && upper.starts_with("FN") {
                        self.tokenized_line.push(FN_TOK);
                        name_start += 2;
                    }
                    let tok = match suffix {
                        Some(b'%') => INT_VAR,
                        Some(b'$') => STR_VAR,
                        Some(b'!') => REAL_VAR,
                        _ => BARE_VAR
                    };
                    self.tokenized_line.extend_from_slice(&[tok,0,0]);
                    self.push_bit7(&bytes[name_start..i]);
                    if tok!=BARE_VAR {
                        i += 1;
                    }
                },
                b'<' | b'>' | b'=' => {
                    let (op,len) = match line.get(i..i+2) {
                        Some(">=") | Some("=>") => (">=",2),
                        Some("<>") => ("<>",2),
                        Some("<=") | Some("=<") => ("<=",2),
                        _ => (&line[i..i+1],1)
                    };
                    self.push_keyword_bytes(op)?;
                    state = LineState { line_num_context: false, separated: false };
                    i += len;
                    continue;
                },
                b'+' | b'*' | b'/' | b'^' | b'\\' => {
                    self.push_keyword_bytes(&line[i..i+1])?;
                    state = LineState { line_num_context: false, separated: false };
                    i += 1;
                    continue;
                },
                b'-' => {
                    self.push_keyword_bytes("-")?;
                    state.separated = false;
                    i += 1;
                    continue;
                },
                b',' => {
                    self.tokenized_line.push(c);
                    state.separated = false;
                    i += 1;
                    continue;
                },
                0x20..=0x7e => {
                    self.tokenized_line.push(c);
                    i += 1;
                },
                _ => {
                    error!("control character {:02X} in line {}",c,line_num);
                    return Err(Box::new(lang::Error::Tokenization));
                }
            }
            state = LineState { line_num_context: false, separated: false };
        }
        self.tokenized_line.push(0);
        let line_len = self.tokenized_line.len() + 4;
        if line_len > u16::MAX as usize {
            error!("line {} is too long",line_num);
            return Err(Box::new(lang::Error::LineTooLong));
        }
        let mut header = u16::to_le_bytes(line_len as u16).to_vec();
        header.extend_from_slice(&u16::to_le_bytes(line_num));
        header.append(&mut self.tokenized_line);
        self.tokenized_line = header;
        Ok(())
    }
    /// Tokenize a program contained in a UTF8 string, result is an array of bytes
    /// terminated by a zero line length.
    pub fn tokenize(&mut self,program: &str) -> Result<Vec<u8>,DYNERR> {
        self.tokenized_program = Vec::new();
        for line in program.lines() {
            if line.trim().len()==0 {
                continue;
            }
            self.tokenize_line(line.trim_start())?;
            self.tokenized_program.append(&mut self.tokenized_line);
        }
        self.tokenized_program.extend_from_slice(&[0,0]);
        Ok(self.tokenized_program.clone())
    }
    /// Read a bit 7 terminated name.  Without a terminator the name is cut off
    /// at the end of line byte or the bound, whichever comes first.
    fn read_bit7_name(&mut self,curs: &mut ByteCursor) -> String {
        let start = curs.pos();
        let raw = match curs.find(|b| b & 0x80 > 0 || b==0) {
            Some(stop) if curs.buf()[stop] > 0 => curs.read_upto(stop + 1 - start),
            stop => {
                self.diagnose(start,DiagnosticKind::Unterminated);
                curs.read_upto(stop.unwrap_or(curs.end()) - start)
            }
        };
        raw.iter().map(|b| (b & 0x7f) as char).collect()
    }
    /// Quoted string including the quotes, embedded CR and LF are spliced out so the text stays on one line.
    /// An unterminated string ends at the end of line byte or the bound.
    fn read_quoted(&mut self,curs: &mut ByteCursor,offset: usize) -> String {
        let start = curs.pos();
        let raw = match curs.find(|b| b==QUOTE || b==0) {
            Some(stop) if curs.buf()[stop]==QUOTE => curs.read_upto(stop + 1 - start),
            stop => {
                self.diagnose(offset,DiagnosticKind::Unterminated);
                curs.read_upto(stop.unwrap_or(curs.end()) - start)
            }
        };
        let mut ans = String::from("\"");
        for i in 0..raw.len() {
            match raw[i] {
                0x0d => ans += "\"+chr$(13)+\"",
                0x0a if i+1 < raw.len() && raw[i+1].is_ascii_digit() => ans += "\"+chr$(10)+\"",
                b => ans.push(b as char)
            }
        }
        ans
    }
    fn decode_operand(&mut self,op: Operand,curs: &mut ByteCursor,offset: usize) -> String {
        let ans = match op {
            Operand::Num8 => curs.read_u8().map(|v| v.to_string()),
            Operand::Num16 | Operand::LineAddr | Operand::LineNum => curs.read_u16().map(|v| v.to_string()),
            Operand::Bin16 => curs.read_u16().map(|v| format!("&X{:b}",v)),
            Operand::Hex16 => curs.read_u16().map(|v| format!("&{:X}",v)),
            Operand::Real => curs.read_slice(5).map(|b| real::decode([b[0],b[1],b[2],b[3]],b[4])),
            Operand::IntVar | Operand::StrVar | Operand::RealVar | Operand::Var => match curs.read_slice(2) {
                Some(_) => {
                    let suffix = match op {
                        Operand::IntVar => "%",
                        Operand::StrVar => "$",
                        Operand::RealVar => "!",
                        _ => ""
                    };
                    Some(self.read_bit7_name(curs) + suffix)
                },
                None => None
            },
            Operand::Rsx => match curs.read_u8() {
                Some(_) => Some(String::from("|") + &self.read_bit7_name(curs)),
                None => None
            },
            Operand::QuotedString => Some(self.read_quoted(curs,offset)),
            Operand::Rem | Operand::Apostrophe | Operand::Data => {
                let start = curs.pos();
                let end = match op {
                    Operand::Data => {
                        let mut quoted = false;
                        curs.find(|b| {
                            if b==QUOTE {
                                quoted = !quoted;
                            }
                            b==0 || b==STATEMENT_SEP && !quoted
                        })
                    },
                    _ => curs.find(|b| b==0)
                }.unwrap_or(curs.end());
                let verbatim: String = curs.read_upto(end - start).iter().map(|b| *b as char).collect();
                let prefix = match op {
                    Operand::Rem => "REM",
                    Operand::Apostrophe => "'",
                    _ => "DATA"
                };
                Some(prefix.to_string() + &verbatim)
            }
        };
        match ans {
            Some(s) => s,
            None => {
                self.diagnose(offset,DiagnosticKind::TruncatedOperand);
                curs.skip_to_end();
                String::new()
            }
        }
    }
    /// Decode tokens from the cursor position up to its bound
    fn decode_tokens(&mut self,curs: &mut ByteCursor) -> String {
        let mut code = String::new();
        let mut need_space = false;
        while let Some(mut tok) = curs.read_u8() {
            let mut offset = curs.pos() - 1;
            if tok==STATEMENT_SEP {
                match curs.peek_u8() {
                    Some(ELSE_TOK) | Some(APOSTROPHE_TOK) => {
                        offset += 1;
                        tok = curs.read_u8().unwrap_or(tok);
                    },
                    _ => {}
                }
            }
            let text = match tok {
                EXTENDED_PREFIX => match curs.read_u8() {
                    Some(ext) => match token_maps::extended(ext) {
                        Entry::Literal(s) => s.to_string(),
                        _ => {
                            self.diagnose(offset,DiagnosticKind::UnrecognizedExtendedToken(ext));
                            String::new()
                        }
                    },
                    None => {
                        self.diagnose(offset,DiagnosticKind::TruncatedOperand);
                        String::new()
                    }
                },
                _ => match token_maps::primary(tok) {
                    Entry::Literal(s) => s.to_string(),
                    Entry::Decode(op) => self.decode_operand(op,curs,offset),
                    Entry::Undefined => match tok {
                        0x20..=0x7e => (tok as char).to_string(),
                        _ => {
                            self.diagnose(offset,DiagnosticKind::UnrecognizedToken(tok));
                            String::new()
                        }
                    }
                }
            };
            let operand_class = (INT_VAR..=REAL).contains(&tok);
            let starts_word = match text.chars().next() {
                Some(c) => c.is_ascii_alphanumeric() || c=='$' || c=='%' || c=='!',
                None => false
            };
            if need_space && text.len() > 0 && (starts_word || operand_class) {
                code.push(' ');
            }
            code += &text;
            if operand_class || tok==RSX {
                need_space = true;
            } else if let Some(c) = text.chars().last() {
                need_space = (c.is_ascii_alphanumeric() || c=='.') && tok!=FN_TOK;
            }
        }
        code
    }
    /// Detokenize a run of tokens without line framing, e.g. part of a line
    pub fn detokenize_fragment(&mut self,buf: &[u8],offset: usize,length: usize) -> String {
        self.diagnostics = Vec::new();
        let mut curs = ByteCursor::with_range(buf,offset,offset+length);
        self.decode_tokens(&mut curs)
    }
    /// Detokenize from byte array into a UTF8 string, lines are separated by `\n`.
    /// Damage is recorded in `diagnostics` rather than returned as an error.
    pub fn detokenize(&mut self,img: &[u8]) -> String {
        self.diagnostics = Vec::new();
        let mut lines: Vec<String> = Vec::new();
        let mut curs = ByteCursor::new(img);
        loop {
            let line_start = curs.pos();
            let line_len = match curs.read_u16() {
                Some(0) => break,
                Some(l) => l as usize,
                None => {
                    trace!("program ended without terminator");
                    break;
                }
            };
            let line_num = match curs.read_u16() {
                Some(n) => n,
                None => {
                    self.diagnose(line_start,DiagnosticKind::LineOverrun);
                    break;
                }
            };
            if line_len < 4 {
                self.diagnose(line_start,DiagnosticKind::BadLineLength(line_len as u16));
                break;
            }
            let line_end = line_start + line_len;
            if line_end > img.len() {
                self.diagnose(line_start,DiagnosticKind::LineOverrun);
            }
            curs.set_end(line_end);
            let code = self.decode_tokens(&mut curs);
            lines.push(format!("{} {}",line_num,code));
            curs.set_end(img.len());
            curs.seek(line_end);
        }
        lines.join("\n")
    }
}
