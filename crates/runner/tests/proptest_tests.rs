//! Property-based tests for member parsing, filtering and argument synthesis

use cnb_cargo_runner::args::{add_default_path, filter_install_args};
use cnb_cargo_runner::{
    BuildEnv, InstallArgsRequest, MemberFilter, StaticType, WorkspaceMember, build_install_args,
};
use proptest::prelude::*;
use std::path::Path;

const NAME: &str = "[a-z][a-z0-9_-]{0,15}";
const VERSION: &str = "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}";
const SEGMENTS: &str = "[a-z0-9_-]{1,10}";

fn arg_word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("--root".to_string()),
        Just("--color".to_string()),
        Just("--root=/x".to_string()),
        Just("--color=always".to_string()),
        Just("--locked".to_string()),
        Just("--path".to_string()),
        Just("--path=./svc".to_string()),
        Just("--target=x86_64-unknown-linux-gnu".to_string()),
        "[a-z0-9./=-]{1,12}",
    ]
}

proptest! {
    #[test]
    fn test_legacy_members_round_trip(
        name in NAME,
        version in VERSION,
        dirs in prop::collection::vec(SEGMENTS, 1..4),
        pad in "[ ]{0,3}",
    ) {
        let url = format!("path+file:///{}", dirs.join("/"));
        let raw = format!("{pad}{name} {version} ({url}){pad}");
        let member = WorkspaceMember::parse(&raw).unwrap();
        prop_assert_eq!(member.name(), name.as_str());
        prop_assert_eq!(member.version(), version.as_str());
        prop_assert_eq!(member.location(), url.as_str());
    }

    #[test]
    fn test_fragment_members_with_name(
        name in NAME,
        version in VERSION,
        dirs in prop::collection::vec(SEGMENTS, 1..4),
    ) {
        let url = format!("path+file:///{}", dirs.join("/"));
        let raw = format!("{url}#{name}@{version}");
        let member = WorkspaceMember::parse(&raw).unwrap();
        prop_assert_eq!(member.name(), name.as_str());
        prop_assert_eq!(member.version(), version.as_str());
        prop_assert_eq!(member.location(), url.as_str());
    }

    #[test]
    fn test_fragment_members_without_name(
        version in VERSION,
        dirs in prop::collection::vec(SEGMENTS, 1..4),
        last in NAME,
    ) {
        let parent = format!("path+file:///{}", dirs.join("/"));
        let raw = format!("{parent}/{last}#{version}");
        let member = WorkspaceMember::parse(&raw).unwrap();
        prop_assert_eq!(member.name(), last.as_str());
        prop_assert_eq!(member.version(), version.as_str());
        prop_assert_eq!(member.location(), parent.as_str());
    }

    #[test]
    fn test_fragment_without_hash_is_error(dirs in prop::collection::vec(SEGMENTS, 1..4)) {
        let raw = format!("path+file:///{}", dirs.join("/"));
        prop_assert!(WorkspaceMember::parse(&raw).is_err());
    }

    #[test]
    fn test_legacy_wrong_field_count_is_error(
        words in prop::collection::vec("[a-z0-9().]{1,8}", 0..7),
    ) {
        prop_assume!(words.len() != 3);
        prop_assume!(words.first().is_none_or(|w| !w.starts_with("path+file://")));
        prop_assert!(WorkspaceMember::parse(&words.join(" ")).is_err());
    }

    #[test]
    fn test_filter_is_idempotent(
        config in prop::collection::vec(NAME, 0..4),
        candidates in prop::collection::vec(NAME, 0..8),
    ) {
        let filter = MemberFilter::parse(&config.join(", "));
        let once = filter.apply(candidates.clone());
        let twice = filter.apply(once.clone());
        prop_assert_eq!(&once, &twice);
        for kept in &once {
            prop_assert!(config.is_empty() || config.contains(kept));
        }
    }

    #[test]
    fn test_no_duplicate_root_or_color(words in prop::collection::vec(arg_word(), 0..10)) {
        let mut env = BuildEnv::default().with_arch_override("amd64");
        let raw = words.join(" ");
        let request = InstallArgsRequest {
            dest: Path::new("/dest"),
            default_member_path: ".",
            install_args: &raw,
            stack: "io.buildpacks.stacks.jammy.tiny",
            static_type: StaticType::Muslc,
        };
        let args = build_install_args(&request, &mut env).unwrap();

        let roots = args.iter().filter(|a| *a == "--root" || a.starts_with("--root=")).count();
        let colors = args.iter().filter(|a| *a == "--color" || a.starts_with("--color=")).count();
        prop_assert_eq!(roots, 1);
        prop_assert_eq!(colors, 1);
        prop_assert!(args.contains(&"--root=/dest".to_string()));
        prop_assert!(args.contains(&"--color=never".to_string()));
        prop_assert_eq!(args[0].as_str(), "install");
    }

    #[test]
    fn test_default_path_added_at_most_once(words in prop::collection::vec(arg_word(), 0..10)) {
        let args = filter_install_args(&words.join(" ")).unwrap();
        let had_path = args.iter().any(|a| a == "--path" || a.starts_with("--path="));
        let with_default = add_default_path(args.clone(), ".");
        if had_path {
            prop_assert_eq!(with_default, args);
        } else {
            prop_assert_eq!(with_default.len(), args.len() + 1);
            prop_assert_eq!(with_default.last().map(String::as_str), Some("--path=."));
        }
    }
}
