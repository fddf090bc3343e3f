//! End-to-end scenarios straight out of the scheduler's testable
//! properties: a small in-memory document set loaded through a real
//! [`System`], asserting on the final ordered key/value list.

use ezkv::media::PropertiesMedia;
use ezkv::resource::{Declaration, Resource};
use ezkv::{Environment, LoadFlag, System};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rstest_reuse::{self, *};
use std::path::PathBuf;

fn pairs(kvs: &ezkv::KeyValues) -> Vec<(String, String)> {
    kvs.to_vec()
        .into_iter()
        .map(|kv| (kv.key().to_string(), kv.expanded().to_string()))
        .collect()
}

#[test]
fn scenario_a_chaining_and_interpolation() {
    let system = System::builder()
        .mem_document(
            "root",
            "_load_child=mem:/child\nport.prefix=1\nmessage=Hello ${user.name}",
        )
        .mem_document("child", "user.name=Barf\ndb.port=${port.prefix}5672")
        .variable("user.home", "/home/kenny")
        .build();

    let result = system.load_uri("mem:/root", "root").unwrap();
    assert_eq!(
        pairs(&result),
        vec![
            ("port.prefix".to_string(), "1".to_string()),
            ("message".to_string(), "Hello Barf".to_string()),
            ("user.name".to_string(), "Barf".to_string()),
            ("db.port".to_string(), "15672".to_string()),
        ]
    );
}

#[test]
fn scenario_b_no_add_and_no_interpolate_flags() {
    struct SystemProvider;
    impl ezkv::Provider for SystemProvider {
        fn name(&self) -> &str {
            "sys"
        }
        fn provide(&self) -> ezkv::Result<Vec<(String, String)>> {
            Ok(vec![("user.name".to_string(), "Kenny".to_string())])
        }
    }

    let system = System::builder()
        .mem_document(
            "root",
            "_load_sys=provider:/sys\n_flags_sys=NO_ADD, NO_INTERPOLATE\n_load_app=mem:/app",
        )
        .mem_document("app", "greeting=Hi ${user.name}")
        .provider(SystemProvider)
        .build();

    let result = system.load_uri("mem:/root", "root").unwrap();
    assert_eq!(pairs(&result), vec![("greeting".to_string(), "Hi Kenny".to_string())]);
}

#[test]
fn scenario_c_profile_fan_out() {
    let system = System::builder()
        .mem_document("app-dev.props", "mode=dev")
        .mem_document("app-prod.props", "mode=prod")
        .build();

    let mut resource = Resource::new("profile.mem:/app-__PROFILE__.props", "app");
    resource.parameters.insert("profile".to_string(), "dev,prod".to_string());
    let result = system.load(vec![Declaration::Resource(resource)]).unwrap();

    assert_eq!(
        pairs(&result),
        vec![
            ("mode".to_string(), "dev".to_string()),
            ("mode".to_string(), "prod".to_string()),
        ]
    );
}

#[test]
fn scenario_e_no_replace() {
    let system = System::builder()
        .mem_document("a", "color=red\nshape=square")
        .mem_document("b", "color=blue\nsize=large")
        .build();

    let mut b = Resource::new("mem:/b", "b");
    b.flags.insert(LoadFlag::NoReplace);
    let result = system
        .load(vec![
            Declaration::Resource(Resource::new("mem:/a", "a")),
            Declaration::Resource(b),
        ])
        .unwrap();

    assert_eq!(
        pairs(&result),
        vec![
            ("color".to_string(), "red".to_string()),
            ("shape".to_string(), "square".to_string()),
            ("size".to_string(), "large".to_string()),
        ]
    );
}

#[test]
fn scenario_f_sensitive_redaction() {
    let system = System::builder().mem_document("secret", "token=abc123").build();

    let mut resource = Resource::new("mem:/secret", "secret");
    resource.flags.insert(LoadFlag::Sensitive);
    let result = system.load(vec![Declaration::Resource(resource)]).unwrap();

    assert_eq!(result.to_map().get("token").map(String::as_str), Some("abc123"));

    let formatted = result.redact().format(&PropertiesMedia::entry().formatter).unwrap();
    assert_eq!(formatted, "token=REDACTED\n");
}

#[test]
fn law_no_require_short_circuits_missing_resource_to_empty() {
    let system = System::builder().mem_document("present", "k=v").build();

    let mut missing = Resource::new("mem:/absent", "absent");
    missing.flags.insert(LoadFlag::NoRequire);
    let result = system
        .load(vec![
            Declaration::Resource(missing),
            Declaration::Resource(Resource::new("mem:/present", "present")),
        ])
        .unwrap();
    assert_eq!(pairs(&result), vec![("k".to_string(), "v".to_string())]);
}

#[test]
fn law_no_empty_errors_when_a_required_resource_yields_nothing() {
    let system = System::builder().mem_document("empty", "").build();

    let mut resource = Resource::new("mem:/empty", "empty");
    resource.flags.insert(LoadFlag::NoEmpty);
    let err = system.load(vec![Declaration::Resource(resource)]).unwrap_err();
    assert!(matches!(err, ezkv::Error::Empty { .. }));
}

/// Fixed environment-variable map standing in for the process's real
/// environment, so Scenario D's `env:` loading is deterministic.
struct FixedEnvironment {
    vars: IndexMap<String, String>,
}

impl Environment for FixedEnvironment {
    fn args(&self) -> Vec<String> {
        Vec::new()
    }

    fn system_properties(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    fn env_vars(&self) -> IndexMap<String, String> {
        self.vars.clone()
    }

    fn read_stdin(&self) -> ezkv::Result<String> {
        Ok(String::new())
    }

    fn cwd(&self) -> Option<PathBuf> {
        None
    }

    fn read_classpath(&self, _path: &str) -> ezkv::Result<Option<String>> {
        Ok(None)
    }

    fn list_classpath(&self, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Shared case template for the grep/sed filter chain, reused across the
/// literal scenario D cases below the same way the teacher's `all_shells`
/// template is reused across its shell-integration tests.
#[template]
#[rstest]
#[case(
    &[("MY_APP_PORT", "8080"), ("OTHER", "x")],
    "^MY_APP_",
    "s/^MY_APP_/myapp./",
    &[("myapp.PORT", "8080")]
)]
#[case(
    &[("MY_APP_HOST", "localhost"), ("MY_APP_PORT", "8080")],
    "^MY_APP_",
    "s/^MY_APP_/myapp./",
    &[("myapp.HOST", "localhost"), ("myapp.PORT", "8080")]
)]
#[case(&[("UNRELATED", "1")], "^MY_APP_", "s/^MY_APP_/myapp./", &[])]
fn env_grep_sed_cases(
    #[case] env_vars: &[(&str, &str)],
    #[case] grep_expr: &str,
    #[case] sed_expr: &str,
    #[case] expected: &[(&str, &str)],
) {
}

/// Scenario D: a `grep` narrows to a prefix, a `sed` rewrites it, over
/// several distinct env var sets and filter expressions.
#[apply(env_grep_sed_cases)]
fn scenario_d_env_grep_then_sed(
    #[case] env_vars: &[(&str, &str)],
    #[case] grep_expr: &str,
    #[case] sed_expr: &str,
    #[case] expected: &[(&str, &str)],
) {
    let environment = FixedEnvironment {
        vars: env_vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    };

    let mut resource = Resource::new("env:///", "env");
    resource.filters.push(ezkv::resource::FilterSpec {
        id: "grep_key".to_string(),
        expression: grep_expr.to_string(),
        label: "grep".to_string(),
    });
    resource.filters.push(ezkv::resource::FilterSpec {
        id: "sed_key".to_string(),
        expression: sed_expr.to_string(),
        label: "sed".to_string(),
    });

    let system = System::builder().environment(environment).build();
    let result = system.load(vec![Declaration::Resource(resource)]).unwrap();

    let expected: Vec<(String, String)> =
        expected.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let mut actual = pairs(&result);
    actual.sort();
    let mut expected_sorted = expected;
    expected_sorted.sort();
    assert_eq!(actual, expected_sorted);
}
