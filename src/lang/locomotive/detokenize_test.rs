#[cfg(test)]
use super::tokenizer::Tokenizer;
#[cfg(test)]
use crate::lang::{Diagnostic,DiagnosticKind};

#[cfg(test)]
fn test_detokenizer(hex_tokens: &str,expected: &str) {
    let tokens = hex::decode(hex_tokens).expect("hex error");
    let mut tokenizer = Tokenizer::new();
    let actual = tokenizer.detokenize(&tokens);
    assert_eq!(actual,expected);
    assert_eq!(tokenizer.diagnostics().len(),0);
}

#[cfg(test)]
fn test_fragment(hex_tokens: &str,expected: &str) -> Vec<Diagnostic> {
    let tokens = hex::decode(hex_tokens).expect("hex error");
    let mut tokenizer = Tokenizer::new();
    let actual = tokenizer.detokenize_fragment(&tokens,0,tokens.len());
    assert_eq!(actual,expected);
    tokenizer.diagnostics().to_vec()
}

mod output_tests {
    #[test]
    fn stored_spaces() {
        // as saved by a CPC 6128
        let tokens = "12000a00ad200f01bf202248454c4c4f22001a0014009e200d0000e9ef0f20ec201801bf200d0000e901b0000a001e00a0201e0a00000000";
        let expected = "10 MODE 1:PRINT \"HELLO\"\n20 FOR i=1 TO 10:PRINT i:NEXT\n30 GOTO 10";
        super::test_detokenizer(tokens,expected);
    }
    #[test]
    fn restored_spaces() {
        super::test_detokenizer("160014009E0D0000E9EF0FEC1801BF0D0000E901B000","20 FOR i=1 TO 10:PRINT i:NEXT");
        super::test_detokenizer("17000A00A10D0000E1EE13EB1E64000197BF226E6F22000000","10 IF a>5 THEN 100 ELSE PRINT\"no\"");
    }
    #[test]
    fn user_function() {
        super::test_detokenizer("1C000A008DE40D000073F1280D0000F829EF0D0000F8F60D0000F8000000","10 DEF FNsq(x)=x*x");
    }
    #[test]
    fn variables_and_functions() {
        super::test_detokenizer("14000A00030000E1EFFF7528030000E22C1029000000","10 a$=LEFT$(b$,2)");
        super::test_detokenizer("0A000A00BF020000E1000000","10 PRINT a%");
        super::test_fragment("bfff00280d0000e129","PRINT ABS(a)");
        super::test_fragment("040000f8","x!");
    }
    #[test]
    fn rsx() {
        super::test_fragment("7c004449d2","|DIR");
        super::test_fragment("7c004449d2202c2222","|DIR ,\"\"");
    }
}

mod number_tests {
    #[test]
    fn integers() {
        super::test_fragment("0e","0");
        super::test_fragment("18","10");
        super::test_fragment("19ff","255");
        super::test_fragment("1a0001","256");
        super::test_fragment("1e0a00","10");
        super::test_fragment("1d0a01","266");
    }
    #[test]
    fn hex_and_binary() {
        super::test_fragment("1cff00","&FF");
        super::test_fragment("1c0a00","&A");
        super::test_fragment("1b0500","&X101");
    }
    #[test]
    fn reals() {
        super::test_fragment("1fa2da0f4982","3.14159265");
        super::test_fragment("1f0000247494","1000000");
        super::test_fragment("0d0000e1ef1f0000000000","a=0");
    }
    #[test]
    fn space_between_numbers_and_words() {
        super::test_fragment("0f20ec","1 TO");
        super::test_fragment("0fec18","1 TO 10");
    }
}

mod string_tests {
    #[test]
    fn embedded_cr() {
        super::test_fragment("22610d6222","\"a\"+chr$(13)+\"b\"");
    }
    #[test]
    fn embedded_lf() {
        super::test_fragment("22610a3122","\"a\"+chr$(10)+\"1\"");
        // LF not followed by a digit is left alone
        super::test_fragment("22610a6222","\"a\nb\"");
    }
    #[test]
    fn unterminated() {
        let diag = super::test_fragment("226869","\"hi");
        assert_eq!(diag,vec![crate::lang::Diagnostic { offset: 0, kind: crate::lang::DiagnosticKind::Unterminated }]);
        // the end of line byte is not part of the string
        let tokens = hex::decode("09000a00bf226869000000").expect("hex error");
        let mut tokenizer = super::Tokenizer::new();
        assert_eq!(tokenizer.detokenize(&tokens),"10 PRINT\"hi");
        assert_eq!(tokenizer.diagnostics().len(),1);
        assert_eq!(tokenizer.diagnostics()[0].offset,5);
    }
    #[test]
    fn rem_and_apostrophe() {
        super::test_fragment("c520782031","REM x 1");
        super::test_detokenizer("0D000A008A01C0636C65617200","10 CLS'clear");
        super::test_fragment("c0202201","' \"\u{1}");
    }
    #[test]
    fn data_is_verbatim() {
        super::test_fragment("8c20312c22613a62222c3301bf","DATA 1,\"a:b\",3:PRINT");
        super::test_fragment("8c2061206220","DATA a b ");
    }
}

mod separator_tests {
    #[test]
    fn else_elides_separator() {
        super::test_fragment("0197","ELSE");
    }
    #[test]
    fn apostrophe_elides_separator() {
        super::test_fragment("01c0686d","'hm");
    }
    #[test]
    fn separator_otherwise_kept() {
        super::test_fragment("01bf",":PRINT");
        super::test_fragment("01",":");
    }
}

mod framing_tests {
    #[cfg(test)]
    use super::Tokenizer;
    #[cfg(test)]
    use super::{Diagnostic,DiagnosticKind};
    #[test]
    fn missing_terminator() {
        super::test_detokenizer("09001e00a01e0a0000","30 GOTO 10");
        super::test_detokenizer("09001e00a01e0a000000","30 GOTO 10");
    }
    #[test]
    fn no_trailing_garbage() {
        super::test_detokenizer("09001e00a01e0a0000000041424344","30 GOTO 10");
    }
    #[test]
    fn bad_line_length() {
        let tokens = hex::decode("09001e00a01e0a000002000a00").expect("hex error");
        let mut tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.detokenize(&tokens),"30 GOTO 10");
        assert_eq!(tokenizer.diagnostics(),&[Diagnostic { offset: 9, kind: DiagnosticKind::BadLineLength(2) }]);
    }
    #[test]
    fn line_overrun() {
        let tokens = hex::decode("20000a00bf").expect("hex error");
        let mut tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.detokenize(&tokens),"10 PRINT");
        assert_eq!(tokenizer.diagnostics(),&[Diagnostic { offset: 0, kind: DiagnosticKind::LineOverrun }]);
    }
    #[test]
    fn fragment_within_buffer() {
        let tokens = hex::decode("09001e00a01e0a000000").expect("hex error");
        let mut tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.detokenize_fragment(&tokens,4,4),"GOTO 10");
    }
}

mod corruption_tests {
    #[cfg(test)]
    use super::{Diagnostic,DiagnosticKind};
    #[test]
    fn unrecognized_token() {
        let diag = super::test_fragment("bfe2","PRINT");
        assert_eq!(diag,vec![Diagnostic { offset: 1, kind: DiagnosticKind::UnrecognizedToken(0xe2) }]);
    }
    #[test]
    fn unrecognized_extended_token() {
        let diag = super::test_fragment("ff30bf","PRINT");
        assert_eq!(diag,vec![Diagnostic { offset: 0, kind: DiagnosticKind::UnrecognizedExtendedToken(0x30) }]);
    }
    #[test]
    fn truncated_operand() {
        let diag = super::test_fragment("bf1a05","PRINT");
        assert_eq!(diag,vec![Diagnostic { offset: 1, kind: DiagnosticKind::TruncatedOperand }]);
        let diag = super::test_fragment("1fa2da0f","");
        assert_eq!(diag,vec![Diagnostic { offset: 0, kind: DiagnosticKind::TruncatedOperand }]);
    }
    #[test]
    fn unterminated_name() {
        let diag = super::test_fragment("0d00006162","ab");
        assert_eq!(diag,vec![Diagnostic { offset: 3, kind: DiagnosticKind::Unterminated }]);
    }
    #[test]
    fn name_stops_at_line_end() {
        // the name would run into the next line without the bound
        let tokens = hex::decode("0a000a000d0000616200090014000d0000e1000000").expect("hex error");
        let mut tokenizer = super::Tokenizer::new();
        let listing = tokenizer.detokenize(&tokens);
        assert_eq!(listing,"10 ab\n20 a");
        assert_eq!(tokenizer.diagnostics().len(),1);
    }
}
