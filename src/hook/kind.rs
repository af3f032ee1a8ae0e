use strum::{Display, EnumIter, IntoStaticStr};

/// When an observer runs relative to the intercepted operation.
///
/// Attached observers of all three kinds live in one ordered list per call
/// site; dispatch filters by kind while preserving the `(order, seq)` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum HookKind {
    /// Runs before the core behavior. May inspect and mutate the arguments;
    /// cannot see a result because none exists yet.
    Before,
    /// Runs after the core behavior completed successfully. Observes the
    /// arguments and may adjust the result in place.
    After,
    /// Supersedes the core behavior entirely. Receives the next behavior in
    /// the composition chain and must call it explicitly if pass-through is
    /// desired. Multiple replacements nest: the latest-registered one wraps
    /// outermost. At resume-step granularity this kind tags whole-wrap
    /// observers, which replace the producer rather than one call.
    Replace,
}
