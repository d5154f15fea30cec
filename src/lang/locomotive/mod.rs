//! # Locomotive BASIC module
//! Tokenization and detokenization of Amstrad CPC BASIC programs.
//!
//! A program image is a sequence of lines, each `[length][line number][tokens]`
//! with 16 bit little endian fields, terminated by a zero length.
//! The detokenizer is tolerant of damaged images, see `Tokenizer::diagnostics`.

mod token_maps;
mod detokenize_test;
pub mod real;
pub mod tokenizer;

use crate::cursor::ByteCursor;

/// Heuristic test for a program image: at least one line, every line framed
/// consistently, ascending line numbers, and a terminating zero length.
pub fn is_tokenized(img: &[u8]) -> bool {
    let mut curs = ByteCursor::new(img);
    let mut prev_line_num: Option<u16> = None;
    loop {
        let line_start = curs.pos();
        let line_len = match curs.read_u16() {
            Some(l) => l as usize,
            None => return false
        };
        if line_len==0 {
            return prev_line_num.is_some();
        }
        let line_num = match curs.read_u16() {
            Some(n) => n,
            None => return false
        };
        if line_len < 5 || line_start + line_len > img.len() || img[line_start + line_len - 1] != 0 {
            return false;
        }
        if let Some(prev) = prev_line_num {
            if line_num <= prev {
                return false;
            }
        }
        prev_line_num = Some(line_num);
        curs.seek(line_start + line_len);
    }
}

#[test]
fn sniff_program_image() {
    let good = hex::decode("09001e00a01e0a00000000").expect("hex error");
    assert!(is_tokenized(&good));
    // unterminated
    assert!(!is_tokenized(&good[0..9]));
    // descending line numbers
    let bad = hex::decode("09001e00a01e0a000009000a00a01e0a00000000").expect("hex error");
    assert!(!is_tokenized(&bad));
    assert!(!is_tokenized(b"10 PRINT \"HELLO\"\n"));
    assert!(!is_tokenized(&[0,0]));
}
