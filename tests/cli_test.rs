use assert_cmd::Command; // Run programs, with stdin
use predicates::prelude::*; // Used for writing assertions
use std::path::Path;

#[test]
fn catalog_dsk() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    let expected =
"HELLO.BAS         1K
README.TXT       20K

157K free";
    cmd.arg("catalog")
        .arg("-d").arg(Path::new("tests").join("twofiles.dsk"))
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
    Ok(())
}

#[test]
fn catalog_zip() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("dir")
        .arg("-d").arg(Path::new("tests").join("deflate.zip"))
        .assert()
        .success()
        .stdout(predicate::str::contains("file1"))
        .stdout(predicate::str::contains("deflated"))
        .stdout(predicate::str::contains("2 entries"));
    Ok(())
}

#[test]
fn catalog_unknown() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("catalog")
        .arg("-d").arg(Path::new("tests").join("cli_test.rs"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("neither a DSK image nor a ZIP archive"));
    Ok(())
}

#[test]
fn get_program() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("get")
        .arg("-f").arg("hello.bas")
        .arg("-d").arg(Path::new("tests").join("twofiles.dsk"))
        .assert()
        .success()
        .stdout(predicate::str::contains("20 FOR i=1 TO 10:PRINT i:NEXT\n30 GOTO 10"));
    Ok(())
}

#[test]
fn get_from_archived_disk() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("get")
        .arg("-f").arg("twofiles.dsk/README.TXT")
        .arg("-d").arg(Path::new("tests").join("twofiles.zip"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Line 0000 of the readme file.\nLine 0001"))
        .stdout(predicate::str::contains("Line 0649 of the readme file."));
    Ok(())
}

#[test]
fn get_raw() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    let output = cmd.arg("get")
        .arg("-f").arg("HELLO.BAS")
        .arg("-t").arg("raw")
        .arg("-d").arg(Path::new("tests").join("twofiles.dsk"))
        .output()?;
    assert!(output.status.success());
    assert_eq!(output.stdout.len(),184);
    assert_eq!(&output.stdout[1..12],b"HELLO   BAS");
    Ok(())
}

#[test]
fn get_missing() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("get")
        .arg("-f").arg("GONE.BAS")
        .arg("-d").arg(Path::new("tests").join("twofiles.dsk"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn load_archive() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("load")
        .arg("-d").arg(Path::new("tests").join("twofiles.zip"))
        .assert()
        .success()
        .stdout(predicate::str::contains("=== twofiles.zip/twofiles.dsk/HELLO.BAS (BASIC) ==="))
        .stdout(predicate::str::contains("10 MODE 1:PRINT \"HELLO\""))
        .stdout(predicate::str::contains("=== twofiles.zip/twofiles.dsk/README.TXT (ASCII) ==="));
    Ok(())
}

#[test]
fn tokenize_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    let output = cmd.arg("tokenize")
        .write_stdin("10 MODE 1:PRINT \"HELLO\"\n20 GOTO 10\n")
        .output()?;
    assert!(output.status.success());
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("detokenize")
        .write_stdin(output.stdout)
        .assert()
        .success()
        .stdout("10 MODE 1:PRINT\"HELLO\"\n20 GOTO 10\n");
    Ok(())
}

#[test]
fn tokenize_with_header() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    let output = cmd.arg("tok")
        .arg("--header").arg("HELLO.BAS")
        .write_stdin("30 GOTO 10\n")
        .output()?;
    assert!(output.status.success());
    assert_eq!(output.stdout.len(),128+11);
    assert_eq!(&output.stdout[128..],&[0x09,0x00,0x1e,0x00,0xa0,0x1e,0x0a,0x00,0x00,0x00,0x00]);
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("dtok")
        .write_stdin(output.stdout)
        .assert()
        .success()
        .stdout("30 GOTO 10\n");
    Ok(())
}

#[test]
fn tokenize_bad_line_number() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("tokenize")
        .write_stdin("PRINT \"NO NUMBER\"\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LineNumber"));
    Ok(())
}

#[test]
fn detokenize_protected() -> Result<(), Box<dyn std::error::Error>> {
    let prog: Vec<u8> = vec![0x09,0x00,0x1e,0x00,0xa0,0x1e,0x0a,0x00,0x00,0x00,0x00];
    let scrambled = cpckit::fs::amsdos::types::un_or_protect(&prog);
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("detokenize")
        .arg("--protected")
        .write_stdin(scrambled)
        .assert()
        .success()
        .stdout("30 GOTO 10\n");
    Ok(())
}

#[test]
fn geometry() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("geometry")
        .arg("-d").arg(Path::new("tests").join("twofiles.dsk"))
        .arg("--indent").arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"creator\": \"cpckit tests\""))
        .stdout(predicate::str::contains("\"tracks\": 40"));
    Ok(())
}

#[test]
fn completions() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cpckit")?;
    cmd.arg("completions")
        .arg("-s").arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("cpckit"));
    Ok(())
}
