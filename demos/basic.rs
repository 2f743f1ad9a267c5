/// Basic example: create a WAD, add lumps, commit, undo and redo
///
/// Run with: cargo run --example basic
use std::error::Error;
use tempfile::TempDir;
use wadstore_rs::WadFile;

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== wadstore-rs Basic Example ===\n");

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("example_basic.wad");

    println!("1. Creating WAD...");
    WadFile::create(&path)?;
    let mut wad = WadFile::open(&path)?;

    wad.add_lump(0, "MAP01", b"")?;
    wad.add_lump(1, "THINGS", &[0u8; 10])?;
    wad.add_lump(2, "DEHACKED", b"Patch File for DeHackEd v3.0")?;
    wad.commit_changes("creation of 3 lumps")?;
    print_lumps(&wad);

    println!("\n2. Renaming and rewriting...");
    wad.set_lump_name(0, "MAP02")?;
    wad.commit_changes("rename of 'MAP01'")?;
    wad.write_lump(2, b"Patch File for DeHackEd v3.1")?;
    wad.commit()?;
    print_lumps(&wad);
    println!("   Junk bytes: {}", wad.junk_bytes());

    println!("\n3. Undo and redo...");
    while wad.can_undo() > 0 {
        let message = wad.last_commit_message().unwrap_or_default().to_string();
        wad.undo()?;
        println!("   ✓ Undid: {} ({} lumps)", message, wad.num_lumps());
    }
    wad.redo()?;
    wad.redo()?;
    print_lumps(&wad);

    println!("\n4. Compacting...");
    wad.compact(&mut wadstore_rs::NoProgress)?;
    println!(
        "   ✓ {} bytes, minimum {}",
        wad.file_len()?,
        wad.minimum_size()
    );
    wad.close()?;

    println!("\n✓ Example complete!");
    Ok(())
}

fn print_lumps(wad: &WadFile) {
    for entry in wad.entries() {
        println!("   - {:<8} {:>5} bytes", entry.name(), entry.size());
    }
}
