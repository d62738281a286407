use proptest::prelude::*;
use verso_core::Uri;
use verso_vfs::{from_git_uri, is_git_uri, to_git_uri, GitUriOptions, GitUriParams};

const PROPTEST_CASES: u32 = 256;

fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._%#?\"{}-]{1,12}"
}

fn arb_path() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_segment(), 1..=4).prop_map(|segments| format!("/{}", segments.join("/")))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        ..ProptestConfig::default()
    })]

    #[test]
    fn decode_inverts_encode(
        path in arb_path(),
        git_ref in "[a-zA-Z0-9:~^/._-]{1,16}",
        submodule_of in prop::option::of(arb_path()),
    ) {
        let source = Uri::file(&path);
        let options = GitUriOptions { replace_file_extension: false, submodule_of: submodule_of.clone() };
        let encoded = to_git_uri(&source, &git_ref, &options).unwrap();

        prop_assert!(is_git_uri(&encoded));
        let expected = GitUriParams { path: source.fs_path(), git_ref, submodule_of };
        prop_assert_eq!(from_git_uri(&encoded).unwrap(), expected.clone());

        // The flat string form carries the same payload.
        let reparsed: Uri = encoded.to_string().parse().unwrap();
        prop_assert_eq!(from_git_uri(&reparsed).unwrap(), expected);
    }
}
