#![no_main]

use libfuzzer_sys::fuzz_target;
use wadstore_rs::{NoProgress, Stream, WadFile};

fuzz_target!(|data: &[u8]| {
    // Skip inputs shorter than a header
    if data.len() < 12 {
        return;
    }

    // Try to open - should never panic
    let mut wad = match WadFile::from_stream(Stream::memory(data.to_vec()), false) {
        Ok(w) => w,
        Err(_) => return, // Expected for invalid data
    };

    // Read every lump and its cached prefix - should never panic
    for index in 0..wad.num_lumps() {
        let _ = wad.read_lump_header(index);
        let _ = wad.read_lump(index);
    }

    let _ = wad.junk_bytes();
    let _ = wad.find_by_name("PLAYPAL");
    let _ = wad.summary_json();

    // Mutate, commit and undo - should never panic
    if wad.num_lumps() >= 2 {
        let _ = wad.swap_entries(0, wad.num_lumps() - 1);
        let _ = wad.commit_changes("swap");
        let _ = wad.undo();
    }

    // Compaction may fail on lumps pointing past the end, but must not panic
    let _ = wad.compact(&mut NoProgress);
    let _ = wad.close();
});
