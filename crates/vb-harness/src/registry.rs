use crate::case::CaseRunner;
use crate::error::HarnessError;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Ordered, name-unique collection of idiom cases.
#[derive(Default)]
pub struct Catalog {
    cases: Vec<Arc<dyn CaseRunner>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("cases", &self.names())
            .finish()
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C>(&mut self, case: C) -> Result<(), HarnessError>
    where
        C: CaseRunner + 'static,
    {
        self.register_boxed(Box::new(case))
    }

    pub fn register_boxed(&mut self, case: Box<dyn CaseRunner>) -> Result<(), HarnessError> {
        if self.get(case.name()).is_some() {
            return Err(HarnessError::DuplicateCase(case.name().to_string()));
        }
        if case.candidate_labels().is_empty() {
            return Err(HarnessError::EmptyCandidates(case.name().to_string()));
        }
        self.cases.push(Arc::from(case));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn CaseRunner> {
        self.cases
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn CaseRunner> {
        self.cases.iter().map(|c| c.as_ref())
    }

    /// Cases named in `names`, kept in registration order. An empty filter
    /// selects everything. The handles outlive any lock on the catalog.
    pub fn select<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Arc<dyn CaseRunner>>, HarnessError> {
        for name in names {
            if self.get(name.as_ref()).is_none() {
                return Err(HarnessError::UnknownCase(name.as_ref().to_string()));
            }
        }
        Ok(self
            .cases
            .iter()
            .filter(|c| names.is_empty() || names.iter().any(|n| n.as_ref() == c.name()))
            .cloned()
            .collect())
    }
}

static REGISTRY: OnceLock<Mutex<Catalog>> = OnceLock::new();

fn lock_registry() -> MutexGuard<'static, Catalog> {
    let registry = REGISTRY.get_or_init(|| Mutex::new(Catalog::new()));
    // Registration pushes only after every check passes, so a poisoned
    // catalog is still consistent.
    registry
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Adds `case` to the process-wide catalog.
pub fn register<C>(case: C) -> Result<(), HarnessError>
where
    C: CaseRunner + 'static,
{
    lock_registry().register(case)
}

pub fn register_boxed(case: Box<dyn CaseRunner>) -> Result<(), HarnessError> {
    lock_registry().register_boxed(case)
}

/// Cases from the process-wide catalog, selected as in [`Catalog::select`].
/// The registry is unlocked again before this returns.
pub fn registered_cases<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<Arc<dyn CaseRunner>>, HarnessError> {
    lock_registry().select(names)
}

/// Runs `f` with the process-wide catalog locked. `f` must not call back into
/// the registry; use [`registered_cases`] to work on cases without the lock.
pub fn with_registry<T>(f: impl FnOnce(&Catalog) -> T) -> T {
    let guard = lock_registry();
    f(&guard)
}

#[cfg(test)]
mod tests {
    use super::{Catalog, register, registered_cases, with_registry};
    use crate::case::IdiomCase;
    use crate::digest::EqualityPolicy;
    use crate::error::HarnessError;
    use crate::output::Output;

    fn case(name: &str) -> IdiomCase<i64> {
        IdiomCase::new(
            name,
            "constant",
            EqualityPolicy::Exact,
            || Ok(7),
            |x| Ok(Output::Int(i128::from(x))),
        )
        .candidate("same", |x| Ok(Output::Int(i128::from(x))))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut catalog = Catalog::new();
        catalog.register(case("a")).expect("first");
        let err = catalog.register(case("a")).expect_err("duplicate");
        assert_eq!(err, HarnessError::DuplicateCase("a".to_string()));
        assert_eq!(err.reason_code(), "harness_duplicate_case");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn cases_without_candidates_are_rejected() {
        let mut catalog = Catalog::new();
        let lonely: IdiomCase<i64> = IdiomCase::new(
            "lonely",
            "",
            EqualityPolicy::Exact,
            || Ok(1),
            |x| Ok(Output::Int(i128::from(x))),
        );
        assert!(matches!(
            catalog.register(lonely),
            Err(HarnessError::EmptyCandidates(_))
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn select_preserves_registration_order() {
        let mut catalog = Catalog::new();
        for name in ["c", "a", "b"] {
            catalog.register(case(name)).expect("register");
        }
        let picked = catalog.select(&["b", "c"]).expect("known names");
        let names: Vec<&str> = picked.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["c", "b"]);
        assert_eq!(catalog.select::<&str>(&[]).expect("all").len(), 3);
        assert_eq!(
            catalog.select(&["nope"]).map(|v| v.len()),
            Err(HarnessError::UnknownCase("nope".to_string()))
        );
    }

    #[test]
    fn global_registry_rejects_duplicates() {
        register(case("registry_unit_case")).expect("first registration");
        assert!(matches!(
            register(case("registry_unit_case")),
            Err(HarnessError::DuplicateCase(_))
        ));
        assert!(with_registry(|c| c.get("registry_unit_case").is_some()));
    }

    #[test]
    fn registered_cases_do_not_hold_the_lock() {
        register(case("registry_held_case")).expect("register");
        let held = registered_cases(&["registry_held_case"]).expect("known name");
        register(case("registry_added_while_held")).expect("registry still writable");
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name(), "registry_held_case");
        assert!(matches!(
            registered_cases(&["registry_missing_case"]),
            Err(HarnessError::UnknownCase(_))
        ));
    }
}
