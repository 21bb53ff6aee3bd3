#![no_main]

use arcadia_playlist::fuzz_parse_playlist;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    fuzz_parse_playlist(data);
});
