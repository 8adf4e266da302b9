use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;

fn ifprune() -> Command {
    Command::cargo_bin("ifprune").unwrap()
}

#[test]
fn stdin_pass_through_is_identity() {
    ifprune()
        .write_stdin("#ifdef FOO\nX\n#endif\nplain\n")
        .assert()
        .success()
        .stdout("#ifdef FOO\nX\n#endif\nplain\n");
}

#[test]
fn define_collapses_conditional_on_stdin() {
    ifprune()
        .args(["-D", "FOO"])
        .write_stdin("#ifdef FOO\nX\n#else\nY\n#endif\n")
        .assert()
        .code(17)
        .stdout("X\n");
}

#[test]
fn undefine_keeps_the_else_branch() {
    ifprune()
        .arg("-UFOO")
        .write_stdin("#ifdef FOO\nX\n#else\nY\n#endif\n")
        .assert()
        .code(17)
        .stdout("Y\n");
}

#[test]
fn contradiction_reports_on_stderr() {
    ifprune()
        .arg("-DFOO")
        .write_stdin("#undef FOO\nY\n")
        .assert()
        .stderr(predicate::str::contains("contradicts -D"))
        .stdout(predicate::str::contains("inserted by ifprune"));
}

#[test]
fn parse_error_sets_error_bit() {
    ifprune()
        .write_stdin("#if (A && B\nX\n#endif\n")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Missing \")\""));
}

#[test]
fn replace_rewrites_the_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.c");
    std::fs::write(&path, "#ifdef FOO\nX\n#else\nY\n#endif\n").unwrap();
    ifprune()
        .args(["-DFOO", "--replace"])
        .arg(&path)
        .assert()
        .code(17);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "X\n");
}

#[test]
fn backup_keeps_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.c");
    std::fs::write(&path, "#ifdef FOO\nX\n#endif\n").unwrap();
    ifprune()
        .args(["-DFOO", "-r", "-B", ".orig"])
        .arg(&path)
        .assert()
        .code(17);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "X\n");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.c.orig")).unwrap(),
        "#ifdef FOO\nX\n#endif\n"
    );
}

#[test]
fn parse_error_leaves_the_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.c");
    let text = "#ifdef FOO\nno endif here\n";
    std::fs::write(&path, text).unwrap();
    ifprune()
        .args(["-DFOO", "--replace"])
        .arg(&path)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unexpected EOF"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    // No stray temporary files either.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn keepgoing_continues_past_a_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("a.c");
    let good = dir.path().join("b.c");
    std::fs::write(&bad, "#endif\n").unwrap();
    std::fs::write(&good, "#ifdef FOO\nX\n#endif\n").unwrap();
    ifprune()
        .args(["-DFOO", "--replace", "--keepgoing"])
        .args([&bad, &good])
        .assert()
        .code(4 + 16 + 1);
    assert_eq!(std::fs::read_to_string(&bad).unwrap(), "#endif\n");
    assert_eq!(std::fs::read_to_string(&good).unwrap(), "X\n");
}

#[test]
fn recurse_honours_the_extension_filter() {
    let dir = tempfile::tempdir().unwrap();
    let text = "#ifdef FOO\nX\n#endif\n";
    std::fs::write(dir.path().join("a.c"), text).unwrap();
    std::fs::write(dir.path().join("notes.txt"), text).unwrap();
    ifprune()
        .args(["-DFOO", "--recurse", "--filter", "c"])
        .arg(dir.path())
        .assert()
        .code(17);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.c")).unwrap(),
        "X\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        text
    );
}

#[test]
fn symbols_listing_goes_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.c");
    let text = "#if FOO && BAR\nX\n#endif\n";
    std::fs::write(&path, text).unwrap();
    ifprune()
        .args(["--symbols", "all"])
        .arg(&path)
        .assert()
        .success()
        .stdout("FOO\nBAR\n");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn replacing_stdin_is_refused() {
    ifprune()
        .arg("--replace")
        .write_stdin("x\n")
        .assert()
        .code(8)
        .stderr(predicate::str::contains("Cannot replace standard input"));
}

#[test]
fn bad_assumption_is_refused() {
    ifprune()
        .args(["-D", "1BAD"])
        .write_stdin("x\n")
        .assert()
        .code(8)
        .stderr(predicate::str::contains("Identifier needed"));
}
