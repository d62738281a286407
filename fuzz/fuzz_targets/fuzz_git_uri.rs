#![no_main]

mod utils;

use libfuzzer_sys::fuzz_target;
use verso_core::Uri;
use verso_vfs::{from_git_uri, to_git_uri, GitUriOptions, MemoryFs, PathResolver};

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };

    // Goal: parsing never panics, and anything that parses re-parses to the same value.
    let Ok(uri) = text.parse::<Uri>() else {
        return;
    };
    let reparsed: Uri = uri
        .to_string()
        .parse()
        .expect("display output should always parse");
    assert_eq!(reparsed, uri);

    // Decoding may fail but must not panic; a successful decode re-encodes with the same ref.
    if let Ok(params) = from_git_uri(&uri) {
        let source = Uri::file(&params.path);
        let encoded = to_git_uri(&source, &params.git_ref, &GitUriOptions::default())
            .expect("decoded params re-encode");
        let decoded = from_git_uri(&encoded).expect("re-encoded params decode");
        assert_eq!(decoded.git_ref, params.git_ref);
    }

    // Resolution never panics, even against an empty file system.
    let resolver = PathResolver::with_fs(MemoryFs::new());
    let _ = resolver.resolve_git_uri(&uri);
    let _ = resolver.resolve_uri(&uri);
});
