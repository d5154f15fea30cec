//! Token tables for Locomotive BASIC 1.1 (CPC 664/6128).
//!
//! The primary table covers single byte tokens, the extended table covers
//! the byte following the 0xFF prefix.  Entries that need to pull operand
//! bytes out of the stream are tagged with an `Operand`.

use std::collections::HashMap;

pub const STATEMENT_SEP: u8 = 0x01;
pub const INT_VAR: u8 = 0x02;
pub const STR_VAR: u8 = 0x03;
pub const REAL_VAR: u8 = 0x04;
pub const BARE_VAR: u8 = 0x0d;
pub const SMALL_INT_BASE: u8 = 0x0e;
pub const NUM8: u8 = 0x19;
pub const NUM16: u8 = 0x1a;
pub const BIN16: u8 = 0x1b;
pub const HEX16: u8 = 0x1c;
pub const LINE_NUM: u8 = 0x1e;
pub const REAL: u8 = 0x1f;
pub const QUOTE: u8 = 0x22;
pub const RSX: u8 = 0x7c;
pub const DATA_TOK: u8 = 0x8c;
pub const ELSE_TOK: u8 = 0x97;
pub const APOSTROPHE_TOK: u8 = 0xc0;
pub const REM_TOK: u8 = 0xc5;
pub const FN_TOK: u8 = 0xe4;
pub const EXTENDED_PREFIX: u8 = 0xff;

/// Ways a token can consume bytes after itself
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Operand {
    /// variable with `%` suffix
    IntVar,
    /// variable with `$` suffix
    StrVar,
    /// variable with `!` suffix
    RealVar,
    /// variable without suffix
    Var,
    /// 8 bit decimal
    Num8,
    /// 16 bit decimal
    Num16,
    /// 16 bit binary, `&X`
    Bin16,
    /// 16 bit hex, `&`
    Hex16,
    /// 16 bit line address (only found in memory dumps)
    LineAddr,
    /// 16 bit line number reference
    LineNum,
    /// 5 byte real
    Real,
    QuotedString,
    Rsx,
    Rem,
    Apostrophe,
    Data
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Entry {
    Literal(&'static str),
    Decode(Operand),
    Undefined
}

const SMALL_INTS: [&str;11] = ["0","1","2","3","4","5","6","7","8","9","10"];

/// keywords and operators for 0x80 through 0xFE, empty string is unused
pub const KEYWORDS: [&str;127] = [
    "AFTER","AUTO","BORDER","CALL","CAT","CHAIN","CLEAR","CLG",
    "CLOSEIN","CLOSEOUT","CLS","CONT","DATA","DEF","DEFINT","DEFREAL",
    "DEFSTR","DEG","DELETE","DIM","DRAW","DRAWR","EDIT","ELSE",
    "END","ENT","ENV","ERASE","ERROR","EVERY","FOR","GOSUB",
    "GOTO","IF","INK","INPUT","KEY","LET","LINE","LIST",
    "LOAD","LOCATE","MEMORY","MERGE","MID$","MODE","MOVE","MOVER",
    "NEXT","NEW","ON","ON BREAK","ON ERROR GOTO","ON SQ","OPENIN","OPENOUT",
    "ORIGIN","OUT","PAPER","PEN","PLOT","PLOTR","POKE","PRINT",
    "'","RAD","RANDOMIZE","READ","RELEASE","REM","RENUM","RESTORE",
    "RESUME","RETURN","RUN","SAVE","SOUND","SPEED","STOP","SYMBOL",
    "TAG","TAGOFF","TROFF","TRON","WAIT","WEND","WHILE","WIDTH",
    "WINDOW","WRITE","ZONE","DI","EI","FILL","GRAPHICS","MASK",
    "FRAME","CURSOR","","ERL","FN","SPC","STEP","SWAP",
    "","","TAB","THEN","TO","USING",">","=",
    ">=","<","<>","<=","+","-","*","/",
    "^","\\","AND","MOD","OR","XOR","NOT"
];

/// functions with one argument, FF 00 through FF 1D
const EXT_FN1: [&str;30] = [
    "ABS","ASC","ATN","CHR$","CINT","COS","CREAL","EXP",
    "FIX","FRE","INKEY","INP","INT","JOY","LEN","LOG",
    "LOG10","LOWER$","PEEK","REMAIN","SGN","SIN","SPACE$","SQ",
    "SQR","STR$","TAN","UNT","UPPER$","VAL"
];

/// functions without arguments, FF 40 through FF 49
const EXT_FN0: [&str;10] = [
    "EOF","ERR","HIMEM","INKEY$","PI","RND","TIME","XPOS","YPOS","DERR"
];

/// functions with several arguments, FF 71 through FF 7F
const EXT_FN2: [&str;15] = [
    "BIN$","DEC$","HEX$","INSTR","LEFT$","MAX","MIN","POS",
    "RIGHT$","ROUND","STRING$","TEST","TESTR","COPYCHR$","VPOS"
];

/// Look up a single byte token.  0xFF is the extended prefix and is `Undefined` here.
pub fn primary(tok: u8) -> Entry {
    match tok {
        0x00 => Entry::Literal(""),
        STATEMENT_SEP => Entry::Literal(":"),
        INT_VAR => Entry::Decode(Operand::IntVar),
        STR_VAR => Entry::Decode(Operand::StrVar),
        REAL_VAR => Entry::Decode(Operand::RealVar),
        0x0b..=0x0d => Entry::Decode(Operand::Var),
        0x0e..=0x18 => Entry::Literal(SMALL_INTS[(tok-SMALL_INT_BASE) as usize]),
        NUM8 => Entry::Decode(Operand::Num8),
        NUM16 => Entry::Decode(Operand::Num16),
        BIN16 => Entry::Decode(Operand::Bin16),
        HEX16 => Entry::Decode(Operand::Hex16),
        0x1d => Entry::Decode(Operand::LineAddr),
        LINE_NUM => Entry::Decode(Operand::LineNum),
        REAL => Entry::Decode(Operand::Real),
        0x20 => Entry::Literal(" "),
        0x21 => Entry::Literal("!"),
        QUOTE => Entry::Decode(Operand::QuotedString),
        RSX => Entry::Decode(Operand::Rsx),
        DATA_TOK => Entry::Decode(Operand::Data),
        APOSTROPHE_TOK => Entry::Decode(Operand::Apostrophe),
        REM_TOK => Entry::Decode(Operand::Rem),
        0x80..=0xfe => match KEYWORDS[(tok-0x80) as usize] {
            "" => Entry::Undefined,
            s => Entry::Literal(s)
        },
        _ => Entry::Undefined
    }
}

/// Look up the byte following the 0xFF prefix
pub fn extended(tok: u8) -> Entry {
    match tok {
        0x00..=0x1d => Entry::Literal(EXT_FN1[tok as usize]),
        0x40..=0x49 => Entry::Literal(EXT_FN0[(tok-0x40) as usize]),
        0x71..=0x7f => Entry::Literal(EXT_FN2[(tok-0x71) as usize]),
        _ => Entry::Undefined
    }
}

/// Map from upper case keyword to its token bytes, used for tokenization.
/// Includes the multi-word forms such as `ON ERROR GOTO`.
pub fn keyword_map() -> HashMap<&'static str,Vec<u8>> {
    let mut ans = HashMap::new();
    for i in 0..KEYWORDS.len() {
        if KEYWORDS[i].len() > 0 {
            ans.insert(KEYWORDS[i],vec![0x80 + i as u8]);
        }
    }
    for tok in 0..0x80 {
        if let Entry::Literal(s) = extended(tok) {
            ans.insert(s,vec![EXTENDED_PREFIX,tok]);
        }
    }
    ans
}

#[test]
fn keyword_positions() {
    assert_eq!(primary(DATA_TOK),Entry::Decode(Operand::Data));
    assert_eq!(primary(ELSE_TOK),Entry::Literal("ELSE"));
    assert_eq!(primary(0xbf),Entry::Literal("PRINT"));
    assert_eq!(primary(FN_TOK),Entry::Literal("FN"));
    assert_eq!(primary(0xe2),Entry::Undefined);
    assert_eq!(primary(0xfe),Entry::Literal("NOT"));
    assert_eq!(primary(0x18),Entry::Literal("10"));
    assert_eq!(extended(0x1d),Entry::Literal("VAL"));
    assert_eq!(extended(0x44),Entry::Literal("PI"));
    assert_eq!(extended(0x7f),Entry::Literal("VPOS"));
    assert_eq!(extended(0x20),Entry::Undefined);
}

#[test]
fn keyword_map_is_complete() {
    let map = keyword_map();
    assert_eq!(map.get("ON ERROR GOTO"),Some(&vec![0xb4]));
    assert_eq!(map.get("INKEY$"),Some(&vec![0xff,0x43]));
    assert_eq!(map.get("INKEY"),Some(&vec![0xff,0x0a]));
    assert_eq!(map.get("'"),Some(&vec![APOSTROPHE_TOK]));
    assert_eq!(map.len(),124 + 30 + 10 + 15);
}
