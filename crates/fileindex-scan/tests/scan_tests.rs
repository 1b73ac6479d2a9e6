use fileindex_scan::{
    AttributeReader, FileAttributes, IndexConfig, Indexer, MetadataExtractor, SortKey, TreeWalker,
};
use std::collections::BTreeSet;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

struct FailingAttributes;

impl AttributeReader for FailingAttributes {
    fn read(&self, _path: &Path, _metadata: &Metadata) -> io::Result<FileAttributes> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

fn quick_config() -> IndexConfig {
    IndexConfig::builder()
        .batch_size(3usize)
        .batch_delay(Duration::ZERO)
        .memory_ceiling(0u64)
        .build()
        .unwrap()
}

fn create_nested_tree(width: usize, depth: usize) -> (TempDir, usize) {
    let temp = TempDir::new().unwrap();
    let mut count = 0;
    for w in 0..width {
        let mut dir = temp.path().join(format!("branch{w}"));
        for d in 0..depth {
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("file{d}.dat")), vec![b'x'; d + 1]).unwrap();
            count += 1;
            dir = dir.join(format!("level{d}"));
        }
    }
    (temp, count)
}

#[test]
fn test_walker_completeness_on_nested_tree() {
    let (temp, expected) = create_nested_tree(4, 6);
    let records: Vec<_> = TreeWalker::new().walk(temp.path()).collect();

    assert_eq!(records.len(), expected);
    let unique: BTreeSet<_> = records.iter().map(|r| r.path.clone()).collect();
    assert_eq!(unique.len(), expected);
}

#[test]
fn test_attribute_failure_keeps_record() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("plain.txt");
    fs::write(&file, "12345").unwrap();

    let extractor = MetadataExtractor::with_attributes(FailingAttributes);
    let record = extractor.extract(&file).into_record().unwrap();

    assert_eq!(record.name, "plain.txt");
    assert_eq!(record.size, 5);
    assert_eq!(record.attributes, FileAttributes::default());
}

#[test]
fn test_walker_with_failing_attributes_still_complete() {
    let (temp, expected) = create_nested_tree(2, 3);
    let walker = TreeWalker::with_extractor(MetadataExtractor::with_attributes(FailingAttributes));
    let records: Vec<_> = walker.walk(temp.path()).collect();

    assert_eq!(records.len(), expected);
    assert!(records.iter().all(|r| !r.attributes.is_hidden && !r.attributes.is_readonly));
}

#[test]
fn test_pipeline_report_totals() {
    let (temp, expected) = create_nested_tree(3, 4);
    let root = temp.path().to_string_lossy().into_owned();

    let run = Indexer::new(quick_config()).run(&[root.clone()]);
    assert_eq!(run.files_found as usize, expected);
    assert_eq!(run.throttle.committed as usize, expected);

    let report = run.into_report(SortKey::Path);
    assert_eq!(report.total_files() as usize, expected);
    assert_eq!(report.total_size(), report.files.iter().map(|f| f.size).sum::<u64>());
    assert_eq!(report.summary.indexed_paths, vec![root]);

    let paths: Vec<_> = report.files.iter().map(|f| f.path.clone()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn test_repeated_roots_are_not_deduplicated() {
    let (temp, expected) = create_nested_tree(1, 2);
    let root = temp.path().to_string_lossy().into_owned();

    let report = Indexer::new(quick_config())
        .run(&[root.clone(), root.clone()])
        .into_report(SortKey::Name);

    assert_eq!(report.summary.indexed_paths, vec![root.clone(), root]);
    assert_eq!(report.total_files() as usize, expected * 2);
}

#[cfg(unix)]
#[test]
fn test_pipeline_isolates_unreadable_sibling() {
    use std::os::unix::fs::PermissionsExt;

    let (temp, expected) = create_nested_tree(3, 2);
    let locked = temp.path().join("branch1/level0");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still list the directory.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let root = temp.path().to_string_lossy().into_owned();
    let run = Indexer::new(quick_config()).run(&[root]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // Only branch1/level0/file1.dat is unreachable.
    assert_eq!(run.files.len(), expected - 1);
    assert!(!run.warnings.is_empty());
}
