use crate::digest::EqualityPolicy;
use crate::error::HarnessError;
use crate::output::Output;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub type GeneratorFn<I> = Box<dyn Fn() -> Result<I, String> + Send + Sync>;
pub type ImplFn<I> = Box<dyn Fn(I) -> Result<Output, String> + Send + Sync>;

/// A single call ready to be timed: the input is already generated and owned
/// by the closure.
pub type PreparedCall<'a> = Box<dyn FnOnce() -> Result<Output, String> + 'a>;

pub const REFERENCE_LABEL: &str = "reference";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Reference,
    Candidate(usize),
}

/// Type-erased view of an [`IdiomCase`], so cases with different input types
/// can share one catalog.
pub trait CaseRunner: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn policy(&self) -> EqualityPolicy;
    fn candidate_labels(&self) -> Vec<&str>;

    /// Generates a fresh input and binds it to the implementation in `slot`.
    /// Generation happens here so it stays outside the timed region.
    fn prepare(&self, slot: Slot) -> Result<PreparedCall<'_>, HarnessError>;

    fn label(&self, slot: Slot) -> String {
        match slot {
            Slot::Reference => REFERENCE_LABEL.to_string(),
            Slot::Candidate(idx) => self
                .candidate_labels()
                .get(idx)
                .map_or_else(|| format!("candidate_{idx}"), |label| (*label).to_string()),
        }
    }
}

pub struct Implementation<I> {
    pub label: String,
    pub func: ImplFn<I>,
}

pub struct IdiomCase<I> {
    name: String,
    description: String,
    policy: EqualityPolicy,
    generator: GeneratorFn<I>,
    reference: ImplFn<I>,
    candidates: Vec<Implementation<I>>,
}

impl<I> std::fmt::Debug for IdiomCase<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdiomCase")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field(
                "candidates",
                &self.candidates.iter().map(|c| &c.label).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl<I: 'static> IdiomCase<I> {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        policy: EqualityPolicy,
        generator: impl Fn() -> Result<I, String> + Send + Sync + 'static,
        reference: impl Fn(I) -> Result<Output, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            policy,
            generator: Box::new(generator),
            reference: Box::new(reference),
            candidates: Vec::new(),
        }
    }

    #[must_use]
    pub fn candidate(
        mut self,
        label: impl Into<String>,
        func: impl Fn(I) -> Result<Output, String> + Send + Sync + 'static,
    ) -> Self {
        self.candidates.push(Implementation {
            label: label.into(),
            func: Box::new(func),
        });
        self
    }

    fn generate(&self) -> Result<I, HarnessError> {
        match catch_unwind(AssertUnwindSafe(|| (self.generator)())) {
            Ok(Ok(input)) => Ok(input),
            Ok(Err(detail)) => Err(HarnessError::Generator(detail)),
            Err(payload) => Err(HarnessError::Generator(format!(
                "panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

impl<I: 'static> CaseRunner for IdiomCase<I> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn policy(&self) -> EqualityPolicy {
        self.policy
    }

    fn candidate_labels(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.label.as_str()).collect()
    }

    fn prepare(&self, slot: Slot) -> Result<PreparedCall<'_>, HarnessError> {
        let func = match slot {
            Slot::Reference => &self.reference,
            Slot::Candidate(idx) => {
                &self
                    .candidates
                    .get(idx)
                    .ok_or_else(|| HarnessError::Execution {
                        label: format!("candidate_{idx}"),
                        detail: "no such candidate".to_string(),
                    })?
                    .func
            }
        };
        let input = self.generate()?;
        Ok(Box::new(move || func(input)))
    }
}

/// Runs a prepared call, turning a panic into an `Err` with its message.
pub(crate) fn call_guarded(call: PreparedCall<'_>) -> Result<Output, String> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseRunner, IdiomCase, Slot, call_guarded};
    use crate::digest::EqualityPolicy;
    use crate::error::HarnessError;
    use crate::output::Output;

    fn doubling_case() -> IdiomCase<Vec<i64>> {
        IdiomCase::new(
            "double",
            "double every element",
            EqualityPolicy::Exact,
            || Ok(vec![1, 2, 3]),
            |v: Vec<i64>| {
                let mut out = Vec::new();
                for x in v {
                    out.push(x * 2);
                }
                Ok(Output::Ints(out))
            },
        )
        .candidate("map_collect", |v: Vec<i64>| {
            Ok(Output::Ints(v.into_iter().map(|x| x * 2).collect()))
        })
    }

    #[test]
    fn labels_follow_registration_order() {
        let case = doubling_case().candidate("second", |_| Ok(Output::Ints(Vec::new())));
        assert_eq!(case.candidate_labels(), vec!["map_collect", "second"]);
        assert_eq!(case.label(Slot::Reference), "reference");
        assert_eq!(case.label(Slot::Candidate(1)), "second");
        assert_eq!(case.label(Slot::Candidate(7)), "candidate_7");
    }

    #[test]
    fn prepared_calls_produce_outputs() {
        let case = doubling_case();
        let out = call_guarded(case.prepare(Slot::Candidate(0)).expect("prepare"))
            .expect("call");
        assert_eq!(out, Output::Ints(vec![2, 4, 6]));
        assert!(case.prepare(Slot::Candidate(3)).is_err());
    }

    #[test]
    fn generator_failures_and_panics_are_captured() {
        let failing: IdiomCase<u8> = IdiomCase::new(
            "gen_err",
            "",
            EqualityPolicy::Exact,
            || Err("no data".to_string()),
            |_| Ok(Output::Int(0)),
        );
        assert!(matches!(
            failing.prepare(Slot::Reference),
            Err(HarnessError::Generator(detail)) if detail == "no data"
        ));

        let panicking: IdiomCase<u8> = IdiomCase::new(
            "gen_panic",
            "",
            EqualityPolicy::Exact,
            || panic!("generator exploded"),
            |_| Ok(Output::Int(0)),
        );
        assert!(matches!(
            panicking.prepare(Slot::Reference),
            Err(HarnessError::Generator(detail)) if detail.contains("generator exploded")
        ));
    }

    #[test]
    fn implementation_panics_become_errors() {
        let case: IdiomCase<u8> = IdiomCase::new(
            "impl_panic",
            "",
            EqualityPolicy::Exact,
            || Ok(1),
            |_| panic!("boom"),
        );
        let err = call_guarded(case.prepare(Slot::Reference).expect("prepare"))
            .expect_err("panic captured");
        assert!(err.contains("boom"));
    }
}
