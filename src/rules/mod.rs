//! Rules: what windows to look for and where they were last seen.
//!
//! `RuleSet` is built once from the config store and is the only owner of the
//! saved geometry. `WindowMatcher` answers "which live window does this rule
//! describe" against a single window-list snapshot.

mod matcher;
mod rule;
mod rule_set;

pub use self::matcher::WindowMatcher;
pub use self::rule::Rule;
pub use self::rule_set::RuleSet;
