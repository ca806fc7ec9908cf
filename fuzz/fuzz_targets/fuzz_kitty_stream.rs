#![no_main]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use libfuzzer_sys::fuzz_target;
use rasterm::kitty::KITTY_CHUNK_SIZE;
use rasterm::{kitty_copy_png_inline, KittyImgOpts, Settings};

fuzz_target!(|data: &[u8]| {
    let mut out = Vec::new();
    kitty_copy_png_inline(&mut out, &mut &data[..], None, &KittyImgOpts::default(), &Settings::default())
        .expect("streaming into memory never fails");

    let text = String::from_utf8(out).expect("frames are ASCII");
    let frames: Vec<&str> = text
        .split("\x1b_G")
        .skip(1)
        .map(|f| f.strip_suffix("\x1b\\").expect("unterminated frame"))
        .collect();

    let (last, data_frames) = frames.split_last().expect("no frames");
    assert_eq!(*last, "m=0;");

    let mut payload = String::new();
    for (i, frame) in data_frames.iter().enumerate() {
        let (params, chunk) = frame.split_once(';').expect("frame without payload");
        assert_eq!(params.starts_with("a=T"), i == 0);
        assert!(params.ends_with("m=1"));
        assert!(chunk.len() <= KITTY_CHUNK_SIZE);
        payload.push_str(chunk);
    }
    assert_eq!(STANDARD.decode(payload).expect("valid base64"), data);
});
