use courier_core::{parse_backup, Article};
use courier_engine::{backup_filename, ensure_output_dir, AtomicFileWriter, BackupStore, PersistError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn atomic_writer_creates_directory_and_replaces_content() {
    let tmp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(tmp.path().join("nested").join("out"));

    let first = writer.write("a.md", "one").unwrap();
    let second = writer.write("a.md", "two").unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(&second).unwrap(), "two");
    let entries = std::fs::read_dir(writer.dir()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn output_dir_must_be_a_directory() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("plain");
    std::fs::write(&file, "x").unwrap();

    assert!(matches!(ensure_output_dir(&file), Err(PersistError::OutputDir(_))));
}

#[test]
fn backup_names_carry_timestamp_and_content_hash() {
    let a = backup_filename("20261018_101500", "# A\n\n---\n\nbody");
    let b = backup_filename("20261018_101500", "# B\n\n---\n\nbody");

    assert!(a.starts_with("article_20261018_101500--"));
    assert!(a.ends_with(".md"));
    assert_eq!(a.len(), "article_20261018_101500--".len() + 8 + 3);
    assert_ne!(a, b);
    assert_eq!(a, backup_filename("20261018_101500", "# A\n\n---\n\nbody"));
}

#[test]
fn saved_backup_parses_back_into_the_article() {
    let tmp = TempDir::new().unwrap();
    let store = BackupStore::new(tmp.path().to_path_buf());
    let article = Article::new("保存テスト", "本文\n\n===ここから有料===\n\n続き").with_tags(["x"]);

    let path = store.save(&article, "20261018_101500").unwrap();
    let doc = parse_backup(&std::fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(doc.title, "保存テスト");
    assert_eq!(doc.tags, vec!["x".to_string()]);
    assert_eq!(doc.body, article.body());
}
