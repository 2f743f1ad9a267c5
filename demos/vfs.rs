/// Example: browse host directories and WADs through the directory VFS
///
/// Run with: cargo run --example vfs
use std::error::Error;
use tempfile::TempDir;
use wadstore_rs::{FileSet, Target, Vfs, WadFile};

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== wadstore-rs VFS Example ===\n");

    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("readme.txt"), b"Map pack")?;
    let wad_path = temp_dir.path().join("maps.wad");
    WadFile::create(&wad_path)?;
    {
        let mut wad = WadFile::open(&wad_path)?;
        for (i, name) in ["MAP03", "MAP01", "MAP02"].iter().enumerate() {
            wad.add_lump(i, name, name.as_bytes())?;
        }
        wad.commit_changes("creation of 3 lumps")?;
    }

    let vfs = Vfs::new();

    println!("1. Listing the host directory...");
    let root = vfs.open_dir(temp_dir.path())?;
    for entry in root.borrow().entries() {
        println!("   - {} ({:?})", entry.name, entry.kind);
    }

    println!("\n2. Opening the WAD as a directory...");
    let index = root
        .borrow()
        .find_by_name("maps.wad")
        .ok_or("maps.wad not listed")?;
    let maps = vfs.open_subdirectory(&root, Target::Entry(index))?;
    {
        let mut dir = maps.borrow_mut();
        let all: Vec<usize> = (0..dir.len()).collect();
        dir.sort_entries(&all)?;
        dir.commit("sort of 3 lumps")?;
        for entry in dir.entries() {
            println!("   - {}", entry.name);
        }
    }

    println!("\n3. Exporting a selection to a new directory...");
    let out = root.borrow_mut().mkdir("lumps")?;
    let lumps = vfs.open_subdirectory(&root, Target::Entry(out))?;
    let mut tagged = FileSet::new();
    maps.borrow().add_glob_to_set(&mut tagged, "MAP0[12]")?;
    let copied = maps.borrow_mut().export_set(&mut lumps.borrow_mut(), &tagged)?;
    println!("   ✓ Exported {}", lumps.borrow().describe_set(&copied));

    println!("\n4. Back up to the parent...");
    let parent = vfs.open_subdirectory(&lumps, Target::Parent)?;
    println!("   ✓ Same handle as root: {}", std::rc::Rc::ptr_eq(&parent, &root));
    println!("   Open directories: {}", vfs.open_count());

    println!("\n✓ Example complete!");
    Ok(())
}
