use std::fs;

use tsvm::{LoadError, Machine, Program, VmError};

const COUNTDOWN: &str = "\
PUSH 3
STORE n
L0:
LOAD n
PUSH 0
CMPGT
JZ L1
LOAD n
PRINT
LOAD n
PUSH 1
SUB
STORE n
JMP L0
L1:
HALT
";

#[test]
fn loads_listing_from_disk_and_runs_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("program.tsi");
    fs::write(&path, COUNTDOWN).unwrap();

    let program = Program::load(&path).unwrap();
    let mut machine = Machine::new(program, Vec::new());
    let steps = machine.run().unwrap();

    assert_eq!(String::from_utf8(machine.into_output()).unwrap(), "3\n2\n1\n");
    // setup 2, three iterations of 12, final test 5, then `L1:` and HALT
    assert_eq!(steps, 2 + 3 * 12 + 5 + 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Program::load(dir.path().join("absent.tsi")).unwrap_err();
    assert!(matches!(err, VmError::IoError { .. }));
}

#[test]
fn malformed_listing_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.tsi");
    fs::write(&path, "PUSH 1\nPOP\nHALT\n").unwrap();

    let err = Program::load(&path).unwrap_err();
    assert!(matches!(
        err,
        VmError::Load(LoadError::UnknownInstruction { line: 2, .. })
    ));
}
