#![no_main]

use libfuzzer_sys::fuzz_target;
use verity_core::{Decoder, ExecutionContext, NoLibraries, Program};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let (header, rest) = data.split_at(2);
    let limit = u64::from(header[1]) * 256;
    let (code, input) = rest.split_at(usize::from(header[0]).min(rest.len()));

    let _ = Decoder::decode(code, 0);
    let _ = Program::new(code, input);

    if let Ok(mut ctx) = ExecutionContext::load(code, input, input.to_vec(), Some(limit)) {
        let verdict = ctx.run(&NoLibraries);
        assert_eq!(ctx.verdict(), Some(verdict.clone()));
        let _ = verdict.canonical_bytes();
    }
});
