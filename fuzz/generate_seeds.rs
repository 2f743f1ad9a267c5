//! Generate seed corpus for fuzzing

use std::fs;
use wadstore_rs::WadFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_wad_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Empty archive (no lumps)
    {
        let path = format!("{}/seed_empty.wad", corpus_dir);
        WadFile::create(&path)?;
        println!("Generated: {}", path);
    }

    // Seed 2: Single small lump
    {
        let path = format!("{}/seed_single.wad", corpus_dir);
        WadFile::create(&path)?;
        let mut wad = WadFile::open(&path)?;
        wad.add_lump(0, "DEHACKED", b"Patch File for DeHackEd v3.0")?;
        wad.commit()?;
        wad.close()?;
        println!("Generated: {}", path);
    }

    // Seed 3: Map markers and zero-length lumps
    {
        let path = format!("{}/seed_map.wad", corpus_dir);
        WadFile::create(&path)?;
        let mut wad = WadFile::open(&path)?;
        wad.add_lump(0, "MAP01", b"")?;
        wad.add_lump(1, "THINGS", &[0u8; 10])?;
        wad.add_lump(2, "LINEDEFS", &[1u8; 14])?;
        wad.commit()?;
        wad.close()?;
        println!("Generated: {}", path);
    }

    // Seed 4: Junk left behind by a rewrite
    {
        let path = format!("{}/seed_junk.wad", corpus_dir);
        WadFile::create(&path)?;
        let mut wad = WadFile::open(&path)?;
        wad.add_lump(0, "TEXT", b"first version")?;
        wad.commit()?;
        wad.write_lump(0, b"second, longer version")?;
        wad.commit()?;
        wad.close()?;
        println!("Generated: {}", path);
    }

    println!("\nGenerated 4 seed files in {}", corpus_dir);
    Ok(())
}
