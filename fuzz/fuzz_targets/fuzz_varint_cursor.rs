#![no_main]

use libfuzzer_sys::fuzz_target;

// Exercises component G's raw byte cursor against arbitrary bytes: no input
// should panic, and any successful stop-bit-varint / string read must leave
// the cursor at a valid, non-decreasing offset.
fuzz_target!(|data: &[u8]| {
    let mut cursor = chronicle_wire::RawCursor::new(data, 0);
    let start = cursor.get_offset();
    if let Ok(len) = cursor.read_stop_bit_varint() {
        assert!(cursor.get_offset() > start);
        let _ = len;
    }

    let mut cursor = chronicle_wire::RawCursor::new(data, 0);
    let start = cursor.get_offset();
    if let Ok(s) = cursor.read_string() {
        assert!(cursor.get_offset() >= start);
        let _ = s;
    }

    // Typed fixed-width reads never panic regardless of remaining length.
    let mut cursor = chronicle_wire::RawCursor::new(data, 0);
    let _ = cursor.read_i16();
    let _ = cursor.read_i32();
    let _ = cursor.read_i64();
    let _ = cursor.read_f64();
    let _ = cursor.read_bool();
    let _ = cursor.read_u16_codeunit();
});
