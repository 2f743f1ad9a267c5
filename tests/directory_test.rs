//! Directory abstraction tests: moves, sorts, selections and the registry

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wadstore_rs::vfs::{indexes_are_contiguous, is_move_noop};
use wadstore_rs::{Directory, EntryKind, FileSet, Target, Vfs, WadError, WadFile};

/// Helper: temporary directory holding one WAD with the given lumps
fn wad_in_tempdir(lumps: &[(&str, &[u8])]) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("test.wad");
    WadFile::create(&path).unwrap();

    let mut wad = WadFile::open(&path).unwrap();
    for (i, (name, data)) in lumps.iter().enumerate() {
        wad.add_lump(i, name, data).unwrap();
    }
    wad.commit().unwrap();
    wad.close().unwrap();

    (temp_dir, path)
}

fn names(dir: &Directory) -> Vec<String> {
    dir.entries().iter().map(|e| e.name.clone()).collect()
}

fn contents(path: &Path) -> Vec<(String, Vec<u8>)> {
    let wad = WadFile::open(path).unwrap();
    (0..wad.num_lumps())
        .map(|i| (wad.entry(i).unwrap().name(), wad.read_lump(i).unwrap()))
        .collect()
}

#[test]
fn test_move_last_to_front() {
    let (_temp_dir, path) = wad_in_tempdir(&[("A", b"aaaa"), ("B", b"bbbbbbbb"), ("C", b"cc")]);
    let mut dir = Directory::open(&path).unwrap();
    let serial_a = dir.entry(0).unwrap().serial;
    let serial_b = dir.entry(1).unwrap().serial;

    let mut tagged = FileSet::new();
    tagged.add(dir.entry(2).unwrap().serial);
    let description = dir.describe_set(&tagged);

    let landed = dir.move_entries(&tagged, 0).unwrap();
    assert_eq!(landed, 0);
    dir.commit(&format!("move of {}", description)).unwrap();

    assert_eq!(names(&dir), vec!["C", "A", "B"]);
    assert_eq!(dir.entry(1).unwrap().serial, serial_a);
    assert_eq!(dir.entry(2).unwrap().serial, serial_b);
    assert_eq!(dir.last_commit_message(), Some("move of 'C'"));

    // Only table order changed; data is untouched
    let wad = dir.wad_file().unwrap();
    assert_eq!(wad.read_lump(0).unwrap(), b"cc");
    assert_eq!(wad.read_lump(1).unwrap(), b"aaaa");
    assert_eq!(wad.read_lump(2).unwrap(), b"bbbbbbbb");

    drop(dir);
    assert_eq!(
        contents(&path),
        vec![
            ("C".to_string(), b"cc".to_vec()),
            ("A".to_string(), b"aaaa".to_vec()),
            ("B".to_string(), b"bbbbbbbb".to_vec()),
        ]
    );

    println!("✓ Move of C to the front gave C, A, B");
}

#[test]
fn test_move_scattered_selection() {
    let lumps: Vec<(String, Vec<u8>)> = (0..8)
        .map(|i| (format!("L{}", i), vec![i as u8; i + 1]))
        .collect();
    let borrowed: Vec<(&str, &[u8])> = lumps.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
    let (_temp_dir, path) = wad_in_tempdir(&borrowed);
    let mut dir = Directory::open(&path).unwrap();

    let mut tagged = FileSet::new();
    for index in [1, 4, 6] {
        tagged.add(dir.entry(index).unwrap().serial);
    }
    let indexes = dir.indexes_for_set(&tagged);
    assert_eq!(indexes, vec![1, 4, 6]);
    assert!(!indexes_are_contiguous(&indexes));
    assert!(!is_move_noop(&indexes, 5));

    // Land before L5: two tagged entries precede it, so the run starts at 3
    let landed = dir.move_entries(&tagged, 5).unwrap();
    assert_eq!(landed, 3);
    assert_eq!(names(&dir), vec!["L0", "L2", "L3", "L1", "L4", "L6", "L5", "L7"]);

    // Selection follows the entries, not their old indexes
    assert_eq!(dir.indexes_for_set(&tagged), vec![3, 4, 5]);
    assert!(is_move_noop(&dir.indexes_for_set(&tagged), 4));

    dir.commit("move of 3 lumps").unwrap();
    drop(dir);
    let reopened = contents(&path);
    assert_eq!(reopened[3], ("L1".to_string(), vec![1u8; 2]));
    assert_eq!(reopened[6], ("L5".to_string(), vec![5u8; 6]));
}

#[test]
fn test_sort_and_reverse_subrange() {
    let (_temp_dir, path) = wad_in_tempdir(&[
        ("ZZZ", b"z"),
        ("DELTA", b"d"),
        ("ALPHA", b"a"),
        ("CHARLIE", b"c"),
        ("BRAVO", b"b"),
        ("AAA", b"0"),
    ]);
    let mut dir = Directory::open(&path).unwrap();

    // Sort only the middle four; the ends stay put
    let range = [1, 2, 3, 4];
    assert!(!dir.is_sorted(&range));
    dir.sort_entries(&range).unwrap();
    assert_eq!(names(&dir), vec!["ZZZ", "ALPHA", "BRAVO", "CHARLIE", "DELTA", "AAA"]);
    assert!(dir.is_sorted(&range));

    dir.reverse_entries(&range).unwrap();
    assert_eq!(names(&dir), vec!["ZZZ", "DELTA", "CHARLIE", "BRAVO", "ALPHA", "AAA"]);

    dir.commit("sort of 4 lumps").unwrap();
    drop(dir);
    let reopened = contents(&path);
    assert_eq!(reopened[1], ("DELTA".to_string(), b"d".to_vec()));
}

#[test]
fn test_sort_non_contiguous_selection() {
    let (_temp_dir, path) = wad_in_tempdir(&[
        ("D", b""),
        ("X", b""),
        ("B", b""),
        ("Y", b""),
        ("A", b""),
        ("C", b""),
    ]);
    let mut dir = Directory::open(&path).unwrap();

    let mut tagged = FileSet::new();
    for index in [0, 2, 4, 5] {
        tagged.add(dir.entry(index).unwrap().serial);
    }
    let indexes = dir.indexes_for_set(&tagged);
    dir.sort_entries(&indexes).unwrap();
    assert_eq!(names(&dir), vec!["A", "X", "B", "Y", "C", "D"]);
}

#[test]
fn test_undo_after_sort_restores_serials() {
    let (_temp_dir, path) = wad_in_tempdir(&[("B", b"1"), ("A", b"2"), ("B", b"3"), ("A", b"4")]);
    let mut dir = Directory::open(&path).unwrap();
    let before: Vec<u64> = dir.entries().iter().map(|e| e.serial).collect();

    dir.sort_entries(&[0, 1, 2, 3]).unwrap();
    dir.commit("sort of 4 lumps").unwrap();
    assert_eq!(names(&dir), vec!["A", "A", "B", "B"]);

    dir.undo().unwrap();
    let after: Vec<u64> = dir.entries().iter().map(|e| e.serial).collect();
    assert_eq!(after, before);
}

#[test]
fn test_glob_selection_survives_reorder() {
    let (_temp_dir, path) = wad_in_tempdir(&[
        ("E1M1", b""),
        ("THINGS", b""),
        ("E1M2", b""),
        ("THINGS", b""),
    ]);
    let mut dir = Directory::open(&path).unwrap();

    let mut tagged = FileSet::new();
    assert_eq!(dir.add_glob_to_set(&mut tagged, "e1m?").unwrap(), Some(0));
    assert_eq!(dir.describe_set(&tagged), "2 lumps");

    dir.swap_entries(0, 3).unwrap();
    assert_eq!(dir.indexes_for_set(&tagged), vec![2, 3]);
    let selected: Vec<&str> = dir.iter_set(&tagged).map(|(_, e)| e.name.as_str()).collect();
    assert_eq!(selected, vec!["E1M2", "E1M1"]);
}

#[test]
fn test_filesystem_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir(temp_dir.path().join("music")).unwrap();
    fs::write(temp_dir.path().join("readme.txt"), b"read me").unwrap();
    fs::write(temp_dir.path().join(".git"), b"").unwrap();
    WadFile::create(temp_dir.path().join("Doom2.WAD")).unwrap();

    let mut dir = Directory::open(temp_dir.path()).unwrap();
    assert_eq!(names(&dir), vec!["music", "Doom2.WAD", "readme.txt"]);
    assert_eq!(dir.entry(1).unwrap().kind, EntryKind::Wad);

    let serial = dir.entry(2).unwrap().serial;
    dir.rename(2, "README.md").unwrap();
    let index = dir.find_by_serial(serial).unwrap();
    assert_eq!(dir.entry(index).unwrap().name, "README.md");
    assert!(temp_dir.path().join("README.md").exists());

    let mut stream = dir.open_entry(index).unwrap();
    assert_eq!(stream.read_all().unwrap(), b"read me");
    drop(stream);

    let mut tagged = FileSet::new();
    dir.add_glob_to_set(&mut tagged, "*.md").unwrap();
    assert_eq!(dir.describe_set(&tagged), "'README.md'");
    assert_eq!(dir.remove_set(&tagged).unwrap(), 1);
    dir.refresh().unwrap();
    assert_eq!(dir.len(), 2);
}

#[test]
fn test_vfs_navigation() {
    let temp_dir = tempfile::tempdir().unwrap();
    let maps = temp_dir.path().join("maps");
    fs::create_dir(&maps).unwrap();
    WadFile::create(maps.join("e1.wad")).unwrap();

    let vfs = Vfs::new();
    let root = vfs.open_dir(temp_dir.path()).unwrap();
    let maps_dir = vfs.open_subdirectory(&root, Target::Entry(0)).unwrap();
    let wad_dir = vfs.open_subdirectory(&maps_dir, Target::Entry(0)).unwrap();
    assert_eq!(wad_dir.borrow().kind(), EntryKind::Wad);
    assert_eq!(vfs.open_count(), 3);

    // Opening the same WAD again yields the same node, not a second handle
    let again = vfs.open_dir(maps.join("e1.wad")).unwrap();
    assert!(std::rc::Rc::ptr_eq(&wad_dir, &again));

    {
        let mut dir = wad_dir.borrow_mut();
        let wad = dir.wad_file_mut().unwrap();
        wad.add_lump(0, "MAP01", b"").unwrap();
        dir.commit("creation of 'MAP01' lump").unwrap();
    }
    assert_eq!(wad_dir.borrow().len(), 1);

    drop(again);
    drop(wad_dir);
    assert_eq!(vfs.open_count(), 2);
    assert_eq!(contents(&maps.join("e1.wad")).len(), 1);
}

#[test]
fn test_directory_undo_refuses_uncommitted_move() {
    let (_temp_dir, path) = wad_in_tempdir(&[("A", b"a"), ("B", b"b"), ("C", b"c")]);
    let mut dir = Directory::open(&path).unwrap();
    dir.rename(0, "Z").unwrap();
    dir.commit("rename").unwrap();

    let tagged: FileSet = [dir.entry(2).unwrap().serial].into_iter().collect();
    dir.move_entries(&tagged, 0).unwrap();
    assert!(matches!(dir.undo(), Err(WadError::UncommittedChanges)));
    assert_eq!(names(&dir), vec!["C", "Z", "B"]);

    dir.rollback().unwrap();
    dir.undo().unwrap();
    assert_eq!(names(&dir), vec!["A", "B", "C"]);
}

#[test]
fn test_export_lumps_to_host_directory() {
    let (temp_dir, path) = wad_in_tempdir(&[("DEHACKED", b"patch"), ("VILE\\1", b"sprite"), ("E1M1", b"")]);
    let out = temp_dir.path().join("out");
    fs::create_dir(&out).unwrap();

    let mut wad_dir = Directory::open(&path).unwrap();
    let mut host = Directory::open(&out).unwrap();
    let mut tagged = FileSet::new();
    wad_dir.add_glob_to_set(&mut tagged, "[DV]*").unwrap();

    let copied = wad_dir.export_set(&mut host, &tagged).unwrap();
    assert_eq!(copied.len(), 2);
    assert_eq!(names(&host), vec!["dehacked.lmp", "vile^1.lmp"]);
    assert!(host.iter_set(&copied).all(|(_, e)| e.kind == EntryKind::File));
    assert_eq!(fs::read(out.join("vile^1.lmp")).unwrap(), b"sprite");

    // The source is untouched
    assert_eq!(wad_dir.len(), 3);
    assert!(!wad_dir.wad_file().unwrap().need_commit());
}

#[test]
fn test_import_files_into_wad() {
    let (temp_dir, path) = wad_in_tempdir(&[("MAP01", b""), ("THINGS", b"t")]);
    let src = temp_dir.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("dehacked.deh"), b"Patch File").unwrap();
    fs::write(src.join("vile^1.lmp"), b"sprite").unwrap();
    fs::create_dir(src.join("nested")).unwrap();

    let mut host = Directory::open(&src).unwrap();
    let mut wad_dir = Directory::open(&path).unwrap();

    let mut tagged = FileSet::new();
    host.add_glob_to_set(&mut tagged, "*.*").unwrap();
    let copied = wad_dir.import_set(&mut host, &tagged, 1).unwrap();

    assert_eq!(names(&wad_dir), vec!["MAP01", "DEHACKED", "VILE\\1", "THINGS"]);
    assert_eq!(wad_dir.indexes_for_set(&copied), vec![1, 2]);
    assert_eq!(wad_dir.last_commit_message(), Some("import of 2 files"));
    assert!(!wad_dir.wad_file().unwrap().need_commit());

    // One undo step removes the whole import
    wad_dir.undo().unwrap();
    assert_eq!(names(&wad_dir), vec!["MAP01", "THINGS"]);
    wad_dir.redo().unwrap();
    drop(wad_dir);
    assert_eq!(contents(&path)[1], ("DEHACKED".to_string(), b"Patch File".to_vec()));

    // Directories cannot be copied
    let nested: FileSet = [host.entry(0).unwrap().serial].into_iter().collect();
    let mut wad_dir = Directory::open(&path).unwrap();
    assert!(matches!(
        wad_dir.import_set(&mut host, &nested, 0),
        Err(WadError::Unsupported(_))
    ));
    assert!(matches!(
        wad_dir.import_set(&mut host, &FileSet::new(), 0),
        Err(WadError::NotFound(_))
    ));
    assert_eq!(wad_dir.len(), 4);
}

#[test]
fn test_copy_between_wads() {
    let (_a_dir, a_path) = wad_in_tempdir(&[("PLAYPAL", b"pal"), ("COLORMAP", b"cmap")]);
    let (_b_dir, b_path) = wad_in_tempdir(&[("MAP01", b"")]);

    let mut a = Directory::open(&a_path).unwrap();
    let mut b = Directory::open(&b_path).unwrap();
    let tagged: FileSet = [a.entry(1).unwrap().serial].into_iter().collect();
    let copied = b.import_set(&mut a, &tagged, 0).unwrap();

    assert_eq!(names(&b), vec!["COLORMAP", "MAP01"]);
    assert_eq!(b.describe_set(&copied), "'COLORMAP'");
    assert_eq!(b.last_commit_message(), Some("import of 'COLORMAP'"));
}

#[test]
fn test_create_wad_from_selection() {
    let (temp_dir, path) = wad_in_tempdir(&[("E1M1", b""), ("THINGS", b"things"), ("SECRET", b"x")]);
    let mut wad_dir = Directory::open(&path).unwrap();
    let mut host = Directory::open(temp_dir.path()).unwrap();

    let mut tagged = FileSet::new();
    wad_dir.add_glob_to_set(&mut tagged, "e1m1").unwrap();
    wad_dir.add_glob_to_set(&mut tagged, "things").unwrap();

    let index = host.create_wad("episode", &mut wad_dir, &tagged).unwrap();
    assert_eq!(host.entry(index).unwrap().name, "episode.wad");
    assert_eq!(host.entry(index).unwrap().kind, EntryKind::Wad);

    let created = temp_dir.path().join("episode.wad");
    assert_eq!(
        contents(&created),
        vec![
            ("E1M1".to_string(), Vec::new()),
            ("THINGS".to_string(), b"things".to_vec()),
        ]
    );
    assert!(matches!(
        host.create_wad("episode", &mut wad_dir, &tagged),
        Err(WadError::Unsupported(_))
    ));
    // A failed fill leaves no file behind
    assert!(host.create_wad("empty", &mut wad_dir, &FileSet::new()).is_err());
    assert!(!temp_dir.path().join("empty.wad").exists());
}

#[test]
fn test_mkdir() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("a.txt"), b"").unwrap();
    let mut host = Directory::open(temp_dir.path()).unwrap();

    let index = host.mkdir("music").unwrap();
    assert_eq!(index, 0);
    assert_eq!(host.entry(0).unwrap().kind, EntryKind::Directory);
    assert!(temp_dir.path().join("music").is_dir());
    assert!(host.mkdir("a/b").is_err());

    let (_wad_dir, path) = wad_in_tempdir(&[]);
    let mut wad = Directory::open(&path).unwrap();
    assert!(matches!(wad.mkdir("sub"), Err(WadError::Unsupported(_))));
}
