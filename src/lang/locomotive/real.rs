//! ## Locomotive BASIC reals
//!
//! A real occupies 5 bytes: a 32 bit little endian mantissa followed by an
//! exponent biased by 0x81.  Bit 31 of the mantissa holds the sign, and the
//! leading mantissa bit, which is always 1, is implied in its place.
//! An exponent byte of 0 means the value is zero.
//!
//! Values are printed with 9 significant digits, as the firmware does.

use log::trace;

const BIAS: i32 = 0x81;
const SIGNIFICANT_DIGITS: usize = 9;

/// Unpack the 5 byte real into a float, exact since f64 holds a 32 bit mantissa.
pub fn to_f64(mantissa: [u8;4],exponent: u8) -> f64 {
    if exponent==0 {
        return 0.0;
    }
    let stored = u32::from_le_bytes(mantissa);
    let negative = stored & 0x8000_0000 != 0;
    let m = (stored | 0x8000_0000) as f64;
    let magnitude = m * 2.0_f64.powi(exponent as i32 - BIAS - 31);
    match negative {
        true => -magnitude,
        false => magnitude
    }
}

/// Decode the 5 byte real into its decimal form, e.g., `[0xa2,0xda,0x0f,0x49,0x82]` gives `3.14159265`.
pub fn decode(mantissa: [u8;4],exponent: u8) -> String {
    if exponent==0 {
        return "0".to_string();
    }
    let val = to_f64(mantissa,exponent);
    trace!("real {:02X?} {:02X} is {}",mantissa,exponent,val);
    format_significant(val,SIGNIFICANT_DIGITS)
}

/// Pack a float into the 5 byte form, None if it cannot be represented.
pub fn encode(val: f64) -> Option<[u8;5]> {
    if !val.is_finite() {
        return None;
    }
    if val==0.0 {
        return Some([0;5]);
    }
    let negative = val < 0.0;
    let mag = val.abs();
    // find e such that 2^31 <= mag * 2^(31-e) < 2^32
    let mut e = mag.log2().floor() as i32;
    let mut m = (mag * 2.0_f64.powi(31 - e)).round();
    while m >= 4294967296.0 {
        m = (m / 2.0).round();
        e += 1;
    }
    while m < 2147483648.0 {
        m *= 2.0;
        e -= 1;
    }
    let exponent = e + BIAS;
    if exponent < 1 || exponent > 255 {
        return None;
    }
    let mut stored = (m as u64 as u32) & 0x7fff_ffff;
    if negative {
        stored |= 0x8000_0000;
    }
    let b = u32::to_le_bytes(stored);
    Some([b[0],b[1],b[2],b[3],exponent as u8])
}

/// Round to `digits` significant digits and print without trailing zeros.
/// Plain notation is used for magnitudes from 1e-7 up to 1e21, scientific otherwise.
pub fn format_significant(val: f64,digits: usize) -> String {
    if val==0.0 {
        return "0".to_string();
    }
    let sci = format!("{:.*e}",digits-1,val);
    let (mant,exp) = match sci.split_once('e') {
        Some(pair) => pair,
        None => return sci
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let negative = mant.starts_with('-');
    let all_digits: String = mant.chars().filter(|c| c.is_ascii_digit()).collect();
    let sig = match all_digits.trim_end_matches('0') {
        "" => "0",
        s => s
    };
    let mut ans = String::new();
    if negative {
        ans += "-";
    }
    if exp >= 21 || exp < -7 {
        ans += &sig[0..1];
        if sig.len() > 1 {
            ans += ".";
            ans += &sig[1..];
        }
        ans += &format!("E{}{}",match exp<0 { true => "-", false => "+" },exp.abs());
    } else if exp >= 0 {
        let int_len = exp as usize + 1;
        if sig.len() <= int_len {
            ans += sig;
            ans += &"0".repeat(int_len - sig.len());
        } else {
            ans += &sig[0..int_len];
            ans += ".";
            ans += &sig[int_len..];
        }
    } else {
        ans += "0.";
        ans += &"0".repeat((-exp - 1) as usize);
        ans += sig;
    }
    ans
}

#[cfg(test)]
fn dec(hex_bytes: &str) -> String {
    let b = hex::decode(hex_bytes).expect("hex error");
    decode([b[0],b[1],b[2],b[3]],b[4])
}

#[test]
fn canonical_vectors() {
    assert_eq!(dec("a2da0f4982"),"3.14159265");
    assert_eq!(dec("0000000081"),"1");
    assert_eq!(dec("0000000000"),"0");
    assert_eq!(dec("0000247494"),"1000000");
}

#[test]
fn powers_of_ten() {
    let vectors = [
        ("0000000081","1"),
        ("0000002084","10"),
        ("0000004887","100"),
        ("0000007a8a","1000"),
        ("0000401c8e","10000"),
        ("0000504391","100000"),
        ("0000247494","1000000"),
        ("0080961898","10000000"),
        ("0020bc3e9b","100000000"),
        ("00286b6e9e","1000000000"),
        ("00f90215a2","10000000000"),
        ("40b7433aa5","100000000000"),
        ("10a5d468a8","1000000000000"),
        ("2ae78411ac","10000000000000")
    ];
    for (hex_bytes,expected) in vectors {
        assert_eq!(dec(hex_bytes),expected);
    }
}

#[test]
fn fractions_and_signs() {
    assert_eq!(dec("cdcccc4c7d"),"0.1");
    assert_eq!(dec("0000004081"),"1.5");
    assert_eq!(dec("000000a082"),"-2.5");
    assert_eq!(dec("0000000080"),"0.5");
    assert_eq!(dec("47acc52770"),"0.00001");
    assert_eq!(dec("fe64207191"),"123456.789");
    assert_eq!(dec("b726d758c6"),"1E+21");
    assert_eq!(dec("415f700961"),"2.5E-10");
}

#[test]
fn encode_matches_vectors() {
    assert_eq!(encode(std::f64::consts::PI),Some([0xa2,0xda,0x0f,0x49,0x82]));
    assert_eq!(encode(1000000.0),Some([0x00,0x00,0x24,0x74,0x94]));
    assert_eq!(encode(-2.5),Some([0x00,0x00,0x00,0xa0,0x82]));
    assert_eq!(encode(0.0),Some([0;5]));
    assert_eq!(encode(1e300),None);
    assert_eq!(encode(f64::NAN),None);
}

#[test]
fn exponent_digits() {
    for (val,expected) in [(1e-8,"1E-8"),(2.5e-12,"2.5E-12"),(1e21,"1E+21"),(-3e30,"-3E+30")] {
        let b = encode(val).expect("encode failed");
        assert_eq!(decode([b[0],b[1],b[2],b[3]],b[4]),expected);
    }
}
