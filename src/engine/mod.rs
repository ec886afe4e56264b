//! Rule engine: typed attribute checks over the parsed configuration tree.

mod attribute;
mod checker;
mod correlation;
mod policy;
mod rule;
mod ruleset;
mod types;
mod walker;

pub use attribute::{find_attribute, strip_quotes, AttributeMatch};
pub use checker::TagChecker;
pub use correlation::{AnchorCondition, CompoundRule, CorrelatedFacts, CountermandCondition};
pub use policy::{Check, IntegerPolicy, Outcome, StringPolicy, ValueDomain};
pub use rule::{location, Rule};
pub use ruleset::RuleSet;
pub use types::{Violation, ViolationSink};
pub use walker::{WalkSummary, Walker};
