//! Ethics guard for Wayfinder
//!
//! A stateless, deterministic, fail-closed veto over content text and UX
//! behaviour descriptors. Five text categories are checked independently:
//!
//! - **Clinical language**: diagnosing, treating or curing conditions
//! - **Urgency**: pressure to act immediately
//! - **Emotional leverage**: guilt, shame and fear as motivators
//! - **Outcome guarantees**: promised results
//! - **Symbolic as literal**: numerology and similar framed as fact
//!
//! UX descriptors are checked for distress-triggered timing, forced actions,
//! countdown pressure and dark-pattern choices.
//!
//! # Key Components
//!
//! - [`EthicsGuard`]: The veto function
//! - [`RuleSet`]: Versioned, immutable, compiled rules
//! - [`CategoryProvider`]: Built-in rules per category
//!
//! # Example
//!
//! ```
//! use ethics::{EthicsGuard, EvaluationContext, RuleCategory};
//!
//! let guard = EthicsGuard::new();
//! let result = guard.evaluate(
//!     "This tool will cure your anxiety, guaranteed.",
//!     &EvaluationContext::default(),
//! );
//! assert!(!result.allowed);
//! assert!(result.has_category(RuleCategory::OutcomeGuarantee));
//! ```

pub mod categories;
pub mod guard;
pub mod rules;
pub mod types;
pub mod ux;

// Re-export main types
pub use categories::CategoryProvider;
pub use guard::EthicsGuard;
pub use rules::{RuleSet, RuleSetDefinition, RuleSetError};
pub use types::*;
pub use ux::{ChoiceKind, ChoiceOption, UxPatternDescriptor, UxTrigger};
