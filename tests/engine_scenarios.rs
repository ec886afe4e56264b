//! End-to-end scenarios over the project fixtures in testdata/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use webcfg_guard::cli::collect_targets;
use webcfg_guard::contract::{self, Contract};
use webcfg_guard::engine::RuleSet;
use webcfg_guard::rules::{
    self, AVOID_ELMAH_ENABLED_IN_PRODUCTION, AVOID_INSUFFICIENT_SESSION_EXPIRATION,
    ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES,
};
use webcfg_guard::{Analyzer, DetectionResult, FileOutcome, Runner, SourceFile, XmlParserFactory};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_with(rules: RuleSet, root: &Path, contract: &Contract) -> DetectionResult {
    let targets = collect_targets(root, contract).expect("should collect targets");
    let analyzer = Analyzer::with_parser(Arc::new(rules), &XmlParserFactory);
    Runner::new(&analyzer).run(&targets)
}

fn run_fixture(name: &str) -> DetectionResult {
    run_with(
        rules::builtin().clone(),
        &testdata_path().join(name),
        &Contract::default(),
    )
}

#[test]
fn test_two_non_conforming_cookieless_attributes() {
    let result = run_fixture("CookielessUseUri");

    assert_eq!(result.scanned, 1);
    assert_eq!(result.violations.len(), 2);
    assert_eq!(result.count_for(ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES), 2);

    let lines: Vec<usize> = result.violations.iter().map(|v| v.span.begin_line).collect();
    assert_eq!(lines, vec![4, 6]);
}

#[test]
fn test_session_state_without_cookieless_passes() {
    let result = run_fixture("SessionStateDefault");
    assert_eq!(result.scanned, 1);
    assert!(result.violations.is_empty());
}

#[test]
fn test_forms_without_cookieless_is_reported() {
    let result = run_fixture("FormsCookielessUnset");
    assert_eq!(result.violations.len(), 1);
    assert_eq!(
        result.violations[0].rule,
        ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES
    );
    assert_eq!(result.violations[0].span.begin_line, 5);
}

#[test]
fn test_cookieless_remediation_is_clean() {
    let result = run_fixture("CookielessRemediation");
    assert_eq!(result.scanned, 1);
    assert!(result.violations.is_empty());
}

#[test]
fn test_session_expiration_bound() {
    let result = run_fixture("SessionExpiration");

    // forms timeout="15" sits exactly on the bound.
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].rule, AVOID_INSUFFICIENT_SESSION_EXPIRATION);
    assert_eq!(result.violations[0].span.begin_line, 4);
}

#[test]
fn test_elmah_remote_access_without_admin_role() {
    let result = run_fixture("AllowRemoteAccessTrue");

    assert_eq!(result.violations.len(), 1);
    let violation = &result.violations[0];
    assert_eq!(violation.rule, AVOID_ELMAH_ENABLED_IN_PRODUCTION);
    // Reported on the security element, not on the allow element.
    assert_eq!(violation.span.begin_line, 9);
    assert_eq!(violation.span.begin_column, 6);
}

#[test]
fn test_elmah_remote_access_restricted_to_admin() {
    let result = run_fixture("AllowRemoteAccessRemediation");
    assert_eq!(result.scanned, 1);
    assert!(result.violations.is_empty());
}

#[test]
fn test_nested_web_config_is_not_analyzed() {
    let result = run_fixture("NestedViews");

    assert_eq!(result.scanned, 1);
    assert!(result.violations.is_empty());
    assert!(result.failed.is_empty());
}

#[test]
fn test_nested_web_config_is_ineligible() {
    let root = testdata_path().join("NestedViews");
    let analyzer = Analyzer::with_parser(Arc::new(rules::builtin().clone()), &XmlParserFactory);
    let file = SourceFile::new(
        root.join("Views").join("web.config"),
        root.join("NestedViews.csproj"),
    );
    let mut found = Vec::new();

    assert_eq!(
        analyzer.introducing_file(&file, &mut found),
        FileOutcome::Ineligible
    );
    assert!(found.is_empty());
}

#[test]
fn test_malformed_config_is_contained() {
    let result = run_fixture("Malformed");

    assert_eq!(result.scanned, 0);
    assert_eq!(result.failed.len(), 1);
    assert!(result.violations.is_empty());
}

#[test]
fn test_inline_suppressions() {
    let result = run_fixture("Suppressed");

    assert_eq!(result.violations.len(), 1);
    assert_eq!(
        result.violations[0].rule,
        ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES
    );
    assert_eq!(result.violations[0].span.begin_line, 8);

    assert_eq!(result.suppressed.len(), 3);
    assert!(result
        .suppressed
        .iter()
        .any(|s| s.suppression.reason == "Legacy handheld scanners"));
}

#[test]
fn test_repeated_runs_are_identical() {
    let first = run_fixture("CookielessUseUri");
    let second = run_fixture("CookielessUseUri");
    assert_eq!(first.violations, second.violations);
}

#[test]
fn test_whole_testdata_tree() {
    let result = run_with(
        rules::builtin().clone(),
        &testdata_path(),
        &Contract::default(),
    );

    // Every fixture root config except Malformed parses; Views/web.config is skipped.
    assert_eq!(result.scanned, 10);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.count_for(AVOID_ELMAH_ENABLED_IN_PRODUCTION), 1);
    assert_eq!(result.count_for(ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES), 4);
    assert_eq!(result.count_for(AVOID_INSUFFICIENT_SESSION_EXPIRATION), 1);
}

#[test]
fn test_contract_rules_and_exclusions() {
    let testdata = testdata_path();
    let contract = Contract::parse_file(testdata.join("contract.yaml")).expect("should parse contract");
    contract::validate(&contract).expect("contract should be valid");
    let rules = contract::build_rule_set(&contract).expect("should build rules");

    let result = run_with(rules, &testdata, &contract);

    // Malformed/** is excluded, so nothing fails.
    assert!(result.failed.is_empty());
    assert_eq!(result.count_for("AvoidDebugCompilation"), 1);
    assert_eq!(result.count_for("EnsureCustomErrorsEnabled"), 0);
    assert_eq!(result.count_for(ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES), 4);
}
