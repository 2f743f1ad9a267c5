//! Restricted view bounds tests
//!
//! A view must never read or modify bytes outside its window, whatever
//! sequence of seeks, reads and writes is applied to it.

use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;
use wadstore_rs::Stream;

const BACKING_LEN: usize = 64;

fn backing_bytes() -> Vec<u8> {
    (0..BACKING_LEN as u8).collect()
}

#[test]
fn test_writes_never_escape_window() {
    for (start, end) in [(0u64, 8u64), (10, 20), (30, 31), (63, 64), (20, 20)] {
        let inner = Stream::memory(backing_bytes()).shared();
        {
            let mut view = Stream::restricted(&inner, start, Some(end), false).unwrap();
            let len = end - start;

            // Try every seek position, including the boundary, then write
            for offset in 0..=len {
                view.seek(SeekFrom::Start(offset)).unwrap();
                let n = view.write(&[0xFF; 100]).unwrap();
                assert_eq!(n as u64, len - offset);
            }
            assert!(view.seek(SeekFrom::Start(len + 1)).is_err());
            assert!(view.seek(SeekFrom::End(1)).is_err());
        }

        let data = inner.borrow().buffer().unwrap().to_vec();
        assert_eq!(data.len(), BACKING_LEN);
        for (i, &byte) in data.iter().enumerate() {
            let inside = (i as u64) >= start && (i as u64) < end;
            if inside {
                assert_eq!(byte, 0xFF, "byte {} inside [{}, {})", i, start, end);
            } else {
                assert_eq!(byte, i as u8, "byte {} outside [{}, {})", i, start, end);
            }
        }
    }

    println!("✓ Restricted writes stayed inside their windows");
}

#[test]
fn test_reads_never_escape_window() {
    let inner = Stream::memory(backing_bytes()).shared();
    let mut view = Stream::restricted(&inner, 16, Some(24), true).unwrap();

    let mut all = Vec::new();
    view.read_to_end(&mut all).unwrap();
    assert_eq!(all, (16..24).collect::<Vec<u8>>());

    view.seek(SeekFrom::End(-3)).unwrap();
    let mut buf = [0u8; 10];
    let n = view.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], &[21, 22, 23]);
    assert_eq!(view.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_views_over_file() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), b"HEADER..lump-one..lump-two").unwrap();

    let inner = Stream::open_file(temp_file.path(), true).unwrap().shared();
    let mut one = Stream::restricted(&inner, 8, Some(16), false).unwrap();
    let mut two = Stream::restricted(&inner, 18, Some(26), true).unwrap();

    assert_eq!(two.read_all().unwrap(), b"lump-two");
    one.write_all(b"LUMP-ONE").unwrap();
    assert!(one.write_all(b"x").is_err());
    one.close().unwrap();
    two.close().unwrap();

    // Closing views leaves the inner stream usable
    inner.borrow_mut().seek(SeekFrom::Start(0)).unwrap();
    let data = inner.borrow_mut().read_all().unwrap();
    assert_eq!(data, b"HEADER..LUMP-ONE..lump-two");
}

#[test]
fn test_close_hook_sees_final_position() {
    let inner = Stream::memory(Vec::new()).shared();
    let mut view = Stream::restricted(&inner, 4, None, false).unwrap();

    let recorded = std::rc::Rc::new(std::cell::Cell::new(None));
    let sink = std::rc::Rc::clone(&recorded);
    view.on_close(move |s| sink.set(s.tell().ok()));

    view.write_all(b"0123456789").unwrap();
    view.seek(SeekFrom::Start(6)).unwrap();
    drop(view);

    assert_eq!(recorded.get(), Some(6));
    // Unbounded writes grow the inner stream
    assert_eq!(inner.borrow().buffer().unwrap().len(), 14);
}
