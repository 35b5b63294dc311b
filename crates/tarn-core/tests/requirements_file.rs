use std::fs;

use tarn_core::requirements_file::RequirementsFile;

#[test]
fn test_parse_requirements_with_includes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("base.txt"), "six==1.16.0\n").unwrap();
    fs::write(dir.path().join("constraints.txt"), "urllib3<2\n").unwrap();
    fs::write(
        dir.path().join("requirements.txt"),
        "-r base.txt\n-c constraints.txt\nrequests[socks]>=2\n",
    )
    .unwrap();

    let file = RequirementsFile::parse(&dir.path().join("requirements.txt")).unwrap();
    let names: Vec<&str> = file.requirements.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["six", "requests"]);
    assert_eq!(file.constraints.len(), 1);
    assert!(file.constraints[0].constraint);
    assert!(!file.constraints[0].user_supplied);
}

#[test]
fn test_parse_constraints_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.txt");
    fs::write(&path, "idna<3\ncharset-normalizer==3.3.2\n").unwrap();
    let file = RequirementsFile::parse_constraints(&path).unwrap();
    assert!(file.requirements.is_empty());
    assert_eq!(file.constraints.len(), 2);
}

#[test]
fn test_include_cycle_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "-r b.txt\n").unwrap();
    fs::write(dir.path().join("b.txt"), "-r a.txt\n").unwrap();
    assert!(RequirementsFile::parse(&dir.path().join("a.txt")).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(RequirementsFile::parse(&dir.path().join("nope.txt")).is_err());
}

#[test]
fn test_invalid_line_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("r.txt");
    fs::write(&path, "requests >>> 2\n").unwrap();
    assert!(RequirementsFile::parse(&path).is_err());
}
