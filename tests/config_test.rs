//! Integration tests for configuration files

use std::fs;

use heapdb::buffer::ReplacementPolicy;
use heapdb::catalog::Database;
use heapdb::common::{DbConfig, HeapDbError};
use tempfile::tempdir;

#[test]
fn test_load_config_file_and_open() {
    let dir = tempdir().unwrap();
    let db_dir = dir.path().join("DB");
    let config_path = dir.path().join("config.txt");
    fs::write(
        &config_path,
        format!(
            "# engine settings\n\
             dbpath = '{}'\n\
             pagesize = 512\n\
             dm_maxfilecount = 3\n\
             bm_buffercount = 5\n\
             bm_policy = 'MRU'\n",
            db_dir.display()
        ),
    )
    .unwrap();

    let config = DbConfig::load(&config_path).unwrap();
    assert_eq!(config.db_path, db_dir);
    assert_eq!(config.page_size, 512);
    assert_eq!(config.max_file_count, 3);
    assert_eq!(config.buffer_count, 5);
    assert_eq!(config.policy, ReplacementPolicy::Mru);

    let db = Database::open(config).unwrap();
    assert!(db_dir.is_dir());
    assert_eq!(db.disk_manager().max_file_count(), 3);
    assert_eq!(db.buffer_pool().pool_size(), 5);
    assert_eq!(db.table_count(), 0);
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        DbConfig::load(dir.path().join("absent.txt")),
        Err(HeapDbError::ConfigInvalid(_))
    ));
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config: DbConfig = "dbpath = 'db'\npagesize = 64\ndm_maxfilecount = 1\ncolor = blue\n"
        .parse()
        .unwrap();
    assert_eq!(config.page_size, 64);
}
