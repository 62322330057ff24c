use crate::composite::CompositeState;

/// Property each state of a certificate must satisfy.
pub trait PropertyChecker<S> {
    fn satisfies_property(&self, state: &S) -> bool;
}

impl<S, F> PropertyChecker<S> for F
where
    F: Fn(&S) -> bool,
{
    fn satisfies_property(&self, state: &S) -> bool {
        self(state)
    }
}

/// States that may represent a property violation (target states).
pub trait Targetable {
    fn is_target(&self) -> bool;
}

impl<S: Targetable> Targetable for CompositeState<S> {
    fn is_target(&self) -> bool {
        self.components().iter().any(Targetable::is_target)
    }
}

/// Accepts exactly the states that are not target states.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoTargetStateChecker;

impl<S: Targetable> PropertyChecker<S> for NoTargetStateChecker {
    fn satisfies_property(&self, state: &S) -> bool {
        !state.is_target()
    }
}

/// States carrying a program location label and integer bounds of variables.
pub trait IntervalState {
    fn label(&self) -> Option<&str>;

    /// Known `(low, high)` bounds of `variable`, if any.
    fn bounds(&self, variable: &str) -> Option<(i64, i64)>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IntervalBound {
    /// `value` is the smallest allowed value.
    Lower,
    /// `value` is the largest allowed value.
    Upper,
}

/// At states labelled `label`, requires `variable` to stay within `[min, max]`.
///
/// A variable without known bounds at such a state is a violation; states at
/// any other label are accepted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InIntervalChecker {
    variable: String,
    label: String,
    min: i64,
    max: i64,
}

impl InIntervalChecker {
    pub fn new(variable: impl Into<String>, label: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            variable: variable.into(),
            label: label.into(),
            min,
            max,
        }
    }

    pub fn with_bound(
        variable: impl Into<String>,
        label: impl Into<String>,
        bound: IntervalBound,
        value: i64,
    ) -> Self {
        match bound {
            IntervalBound::Lower => Self::new(variable, label, value, i64::MAX),
            IntervalBound::Upper => Self::new(variable, label, i64::MIN, value),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn range(&self) -> (i64, i64) {
        (self.min, self.max)
    }
}

impl<S: IntervalState> PropertyChecker<S> for InIntervalChecker {
    fn satisfies_property(&self, state: &S) -> bool {
        if state.label() != Some(self.label.as_str()) {
            return true;
        }
        match state.bounds(&self.variable) {
            Some((low, high)) => low >= self.min && high <= self.max,
            None => false,
        }
    }
}
