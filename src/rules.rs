//! Built-in web.config security rules.

use once_cell::sync::Lazy;

use crate::engine::{
    AnchorCondition, Check, CompoundRule, CountermandCondition, IntegerPolicy, Rule, RuleSet,
    StringPolicy, TagChecker,
};
use crate::tree::ElementTag;

pub const ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES: &str = "EnsureCookielessAreSetToUseCookies";
pub const AVOID_INSUFFICIENT_SESSION_EXPIRATION: &str =
    "AvoidInsufficientSessionExpirationInConfigFile";
pub const AVOID_ELMAH_ENABLED_IN_PRODUCTION: &str = "AvoidElmahEnabledInProduction";

/// Longest accepted session or forms-ticket lifetime, in minutes.
pub const MAX_SESSION_EXPIRATION_MINUTES: u64 = 15;

static BUILTIN: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(
        vec![cookieless_rule(), session_expiration_rule()],
        vec![elmah_rule()],
    )
});

/// The built-in rule set.
pub fn builtin() -> &'static RuleSet {
    &BUILTIN
}

fn use_cookies() -> Check {
    Check::string(StringPolicy::MandatoryValue("usecookies".to_string()))
}

fn cookieless_rule() -> Rule {
    Rule::new(
        ENSURE_COOKIELESS_ARE_SET_TO_USE_COOKIES,
        vec![
            // sessionState defaults to UseCookies, so an absent attribute is fine.
            TagChecker::new(ElementTag::SessionState, "cookieless", use_cookies()),
            TagChecker::new(ElementTag::Forms, "cookieless", use_cookies()),
            // forms defaults to UseDeviceProfile, so the attribute must be set.
            TagChecker::new(ElementTag::Forms, "cookieless", Check::Presence),
        ],
    )
    .with_description("cookieless must be set to UseCookies to keep session identifiers out of URLs")
}

fn session_expiration_rule() -> Rule {
    let max = || Check::Integer(IntegerPolicy::MaxValue(MAX_SESSION_EXPIRATION_MINUTES));
    Rule::new(
        AVOID_INSUFFICIENT_SESSION_EXPIRATION,
        vec![
            TagChecker::new(ElementTag::SessionState, "timeout", max()),
            TagChecker::new(ElementTag::Forms, "timeout", max()),
        ],
    )
    .with_description(format!(
        "timeout must be a number of minutes no greater than {}",
        MAX_SESSION_EXPIRATION_MINUTES
    ))
}

fn elmah_rule() -> CompoundRule {
    CompoundRule::new(
        AVOID_ELMAH_ENABLED_IN_PRODUCTION,
        AnchorCondition::new(ElementTag::Security, "allowRemoteAccess", &["true", "1"]),
        CountermandCondition::new(ElementTag::Allow, "roles", "admin"),
    )
    .with_description("ELMAH remote access is enabled without restricting it to the admin role")
}
