//! Normalization of call arguments against a declared parameter signature.
//!
//! The same call can arrive with its arguments passed positionally, by
//! keyword, or through a keyword catch-all. Binding maps all of these onto
//! the declared parameters so the resulting input attributes do not depend on
//! how the caller spelled the call.

use crate::error::BindingError;
use crate::value::{ArgMap, ArgValue};

/// Conventional name of a receiver parameter.
pub const RECEIVER: &str = "self";
/// Capture name used when a signature declares no variadic keyword parameter.
pub const DEFAULT_CAPTURE: &str = "kwargs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default: Option<ArgValue>,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::PositionalOrKeyword)
    }

    pub fn positional_only(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::PositionalOnly)
    }

    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::KeywordOnly)
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::VarPositional)
    }

    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::VarKeyword)
    }

    pub fn with_default(mut self, default: impl Into<ArgValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn accepts_positional(&self) -> bool {
        matches!(
            self.kind,
            ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword
        )
    }

    fn accepts_keyword(&self) -> bool {
        matches!(
            self.kind,
            ParameterKind::PositionalOrKeyword | ParameterKind::KeywordOnly
        )
    }

    fn is_variadic(&self) -> bool {
        matches!(
            self.kind,
            ParameterKind::VarPositional | ParameterKind::VarKeyword
        )
    }
}

/// Declared parameters of an intercepted callable, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new(parameters: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Whether the first declared parameter is a `self`-style receiver.
    pub fn has_receiver(&self) -> bool {
        self.parameters
            .first()
            .is_some_and(|param| param.name == RECEIVER)
    }

    pub fn var_keyword(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|param| param.kind == ParameterKind::VarKeyword)
    }
}

/// Arguments of one invocation bound to their parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArguments {
    arguments: ArgMap,
    receiver: Option<String>,
    capture: String,
}

impl BoundArguments {
    /// Binds a concrete call to `signature`.
    ///
    /// A placeholder is bound to a leading receiver parameter so positional
    /// arguments line up with the parameters after it.
    pub fn bind(
        signature: &Signature,
        args: Vec<ArgValue>,
        kwargs: ArgMap,
    ) -> Result<Self, BindingError> {
        let receiver = signature
            .has_receiver()
            .then(|| RECEIVER.to_string());
        let mut positional = receiver
            .iter()
            .map(|_| ArgValue::None)
            .chain(args);
        let mut kwargs = kwargs;
        let mut bound = ArgMap::new();

        for param in signature.parameters() {
            match param.kind {
                ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword => {
                    let Some(value) = positional.next() else {
                        break;
                    };
                    if param.kind == ParameterKind::PositionalOrKeyword
                        && kwargs.contains_key(&param.name)
                    {
                        return Err(BindingError::MultipleValues(param.name.clone()));
                    }
                    bound.insert(param.name.clone(), value);
                }
                ParameterKind::VarPositional => {
                    let rest: Vec<ArgValue> = positional.by_ref().collect();
                    if !rest.is_empty() {
                        bound.insert(param.name.clone(), ArgValue::List(rest));
                    }
                    break;
                }
                ParameterKind::KeywordOnly | ParameterKind::VarKeyword => break,
            }
        }

        let extra = positional.count();
        if extra > 0 {
            let accepted = signature
                .parameters()
                .iter()
                .filter(|param| param.accepts_positional())
                .count();
            return Err(BindingError::TooManyPositional {
                accepted: accepted.saturating_sub(usize::from(receiver.is_some())),
                given: accepted + extra - usize::from(receiver.is_some()),
            });
        }

        let var_keyword = signature.var_keyword();
        for param in signature.parameters() {
            if bound.contains_key(&param.name) || param.is_variadic() {
                continue;
            }
            if param.accepts_keyword() {
                if let Some(value) = kwargs.remove(&param.name) {
                    bound.insert(param.name.clone(), value);
                    continue;
                }
            } else if kwargs.contains_key(&param.name) && var_keyword.is_none() {
                return Err(BindingError::PositionalOnlyAsKeyword(param.name.clone()));
            }
            if param.default.is_none() {
                return Err(BindingError::MissingArgument(param.name.clone()));
            }
        }

        if !kwargs.is_empty() {
            match var_keyword {
                Some(param) => {
                    bound.insert(param.name.clone(), ArgValue::Map(kwargs));
                }
                None => {
                    let name = kwargs.keys().next().unwrap_or_default().to_string();
                    return Err(BindingError::UnexpectedKeyword(name));
                }
            }
        }

        Ok(Self {
            arguments: order_by(signature, bound),
            receiver,
            capture: var_keyword
                .map(|param| param.name.clone())
                .unwrap_or_else(|| DEFAULT_CAPTURE.to_string()),
        })
    }

    /// Fills declared defaults for unsupplied parameters; variadic parameters
    /// default to an empty list or map.
    pub fn apply_defaults(&mut self, signature: &Signature) {
        let mut arguments = std::mem::take(&mut self.arguments);
        for param in signature.parameters() {
            if arguments.contains_key(&param.name) {
                continue;
            }
            let default = match (&param.default, param.kind) {
                (Some(default), _) => default.clone(),
                (None, ParameterKind::VarPositional) => ArgValue::List(Vec::new()),
                (None, ParameterKind::VarKeyword) => ArgValue::Map(ArgMap::new()),
                (None, _) => continue,
            };
            arguments.insert(param.name.clone(), default);
        }
        self.arguments = order_by(signature, arguments);
    }

    /// Bound arguments in declaration order, including any receiver placeholder.
    pub fn arguments(&self) -> &ArgMap {
        &self.arguments
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.arguments.get(name)
    }

    /// Bound arguments without the receiver placeholder.
    pub fn without_receiver(&self) -> ArgMap {
        self.arguments
            .iter()
            .filter(|(name, _)| Some(*name) != self.receiver.as_deref())
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }

    /// The canonical input mapping recorded on spans.
    ///
    /// The receiver and the keyword capture are dropped from the top level and
    /// the captured entries are merged in their place, later entries winning.
    pub fn input_arguments(&self) -> ArgMap {
        let mut input = ArgMap::new();
        for (name, value) in self.arguments.iter() {
            if Some(name) == self.receiver.as_deref() || name == self.capture {
                continue;
            }
            input.insert(name, value.clone());
        }
        match self.arguments.get(&self.capture) {
            Some(ArgValue::Map(captured)) => input.extend(captured.clone()),
            Some(ArgValue::None) | None => {}
            Some(other) => {
                input.insert(self.capture.clone(), other.clone());
            }
        }
        input
    }

    /// Entries gathered by the keyword catch-all, if it captured a mapping.
    pub fn captured_keywords(&self) -> Option<&ArgMap> {
        self.arguments.get(&self.capture).and_then(ArgValue::as_map)
    }
}

fn order_by(signature: &Signature, mut arguments: ArgMap) -> ArgMap {
    let mut ordered = ArgMap::new();
    for param in signature.parameters() {
        if let Some(value) = arguments.remove(&param.name) {
            ordered.insert(param.name.clone(), value);
        }
    }
    ordered.extend(arguments);
    ordered
}

/// One intercepted call: the method being called, its declared signature and
/// the arguments exactly as the caller passed them.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub method: &'a str,
    pub signature: &'a Signature,
    pub args: Vec<ArgValue>,
    pub kwargs: ArgMap,
}

impl<'a> Invocation<'a> {
    pub fn new(method: &'a str, signature: &'a Signature) -> Self {
        Self {
            method,
            signature,
            args: Vec::new(),
            kwargs: ArgMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.kwargs.insert(name, value);
        self
    }

    /// Binds the call and applies declared defaults.
    pub fn bind(&self) -> Result<BoundArguments, BindingError> {
        let mut bound =
            BoundArguments::bind(self.signature, self.args.clone(), self.kwargs.clone())?;
        bound.apply_defaults(self.signature);
        Ok(bound)
    }

    pub fn kwarg_value(&self, name: &str) -> Option<&ArgValue> {
        self.kwargs.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_params() -> Signature {
        Signature::new([Parameter::positional("a"), Parameter::positional("b")])
    }

    #[test]
    fn positional_and_keyword_calls_bind_identically() {
        let by_position =
            BoundArguments::bind(&two_params(), vec![1.into(), 2.into()], ArgMap::new())
                .expect("binds");
        let by_keyword =
            BoundArguments::bind(&two_params(), Vec::new(), ArgMap::from([("b", 2), ("a", 1)]))
                .expect("binds");

        assert_eq!(by_position.arguments(), by_keyword.arguments());
        assert_eq!(by_keyword.arguments().keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn receiver_gets_a_placeholder() {
        let signature = Signature::new([
            Parameter::positional("self"),
            Parameter::positional("task"),
        ]);
        let bound = BoundArguments::bind(&signature, vec!["2+2".into()], ArgMap::new())
            .expect("binds");

        assert_eq!(bound.get("task"), Some(&ArgValue::from("2+2")));
        assert_eq!(bound.get("self"), Some(&ArgValue::None));
        assert_eq!(
            bound.input_arguments(),
            ArgMap::from([("task", ArgValue::from("2+2"))])
        );
        assert!(!bound.without_receiver().contains_key("self"));
    }

    #[test]
    fn captured_keywords_merge_into_the_top_level() {
        let signature = Signature::new([
            Parameter::positional("a"),
            Parameter::var_keyword("kwargs"),
        ]);
        let via_capture =
            BoundArguments::bind(&signature, Vec::new(), ArgMap::from([("a", 1), ("b", 2)]))
                .expect("binds");
        let literal = Signature::new([Parameter::positional("a"), Parameter::positional("kwargs")]);
        let via_literal = BoundArguments::bind(
            &literal,
            Vec::new(),
            ArgMap::from([
                ("a", ArgValue::from(1)),
                ("kwargs", ArgValue::from(ArgMap::from([("b", 2)]))),
            ]),
        )
        .expect("binds");

        let expected = ArgMap::from([("a", 1), ("b", 2)]);
        assert_eq!(via_capture.input_arguments(), expected);
        assert_eq!(via_literal.input_arguments(), expected);
    }

    #[test]
    fn captured_entries_win_on_collision() {
        let signature = Signature::new([
            Parameter::positional("kwargs"),
            Parameter::positional("a"),
        ]);
        let bound = BoundArguments::bind(
            &signature,
            vec![ArgMap::from([("a", 9)]).into(), 1.into()],
            ArgMap::new(),
        )
        .expect("binds");

        assert_eq!(bound.input_arguments(), ArgMap::from([("a", 9)]));
    }

    #[test]
    fn defaults_fill_unsupplied_parameters() {
        let signature = Signature::new([
            Parameter::positional("messages"),
            Parameter::keyword_only("stop_sequences").with_default(ArgValue::None),
            Parameter::keyword_only("temperature").with_default(0.5),
            Parameter::var_positional("args"),
            Parameter::var_keyword("kwargs"),
        ]);
        let mut bound = BoundArguments::bind(&signature, vec!["hi".into()], ArgMap::new())
            .expect("binds");
        bound.apply_defaults(&signature);

        assert_eq!(
            bound.arguments().keys().collect::<Vec<_>>(),
            vec!["messages", "stop_sequences", "temperature", "args", "kwargs"]
        );
        assert_eq!(bound.get("temperature"), Some(&ArgValue::Float(0.5)));
        assert_eq!(bound.get("args"), Some(&ArgValue::List(Vec::new())));
        assert_eq!(bound.captured_keywords(), Some(&ArgMap::new()));
    }

    #[test]
    fn extra_positionals_go_to_var_positional() {
        let signature = Signature::new([
            Parameter::positional("a"),
            Parameter::var_positional("args"),
        ]);
        let bound = BoundArguments::bind(&signature, vec![1.into(), 2.into(), 3.into()], ArgMap::new())
            .expect("binds");

        assert_eq!(bound.get("args"), Some(&ArgValue::from(vec![2, 3])));
    }

    #[test]
    fn arity_mismatches_are_errors() {
        let err = BoundArguments::bind(&two_params(), vec![1.into(), 2.into(), 3.into()], ArgMap::new())
            .expect_err("too many");
        assert!(matches!(err, BindingError::TooManyPositional { accepted: 2, given: 3 }));

        let err = BoundArguments::bind(&two_params(), vec![1.into()], ArgMap::new())
            .expect_err("missing");
        assert!(matches!(err, BindingError::MissingArgument(ref name) if name == "b"));

        let err = BoundArguments::bind(&two_params(), vec![1.into()], ArgMap::from([("a", 1)]))
            .expect_err("duplicate");
        assert!(matches!(err, BindingError::MultipleValues(ref name) if name == "a"));

        let err = BoundArguments::bind(&two_params(), Vec::new(), ArgMap::from([("a", 1), ("b", 2), ("c", 3)]))
            .expect_err("unexpected");
        assert!(matches!(err, BindingError::UnexpectedKeyword(ref name) if name == "c"));
    }

    #[test]
    fn positional_only_parameters_reject_keywords() {
        let signature = Signature::new([Parameter::positional_only("x")]);
        let err = BoundArguments::bind(&signature, Vec::new(), ArgMap::from([("x", 1)]))
            .expect_err("positional only");
        assert!(matches!(err, BindingError::PositionalOnlyAsKeyword(ref name) if name == "x"));
    }

    #[test]
    fn invocation_binds_with_defaults() {
        let signature = Signature::new([
            Parameter::positional("self"),
            Parameter::positional("query"),
            Parameter::positional("limit").with_default(10),
        ]);
        let invocation = Invocation::new("forward", &signature).kwarg("query", "x");
        let bound = invocation.bind().expect("binds");

        assert_eq!(
            bound.input_arguments(),
            ArgMap::from([("query", ArgValue::from("x")), ("limit", 10.into())])
        );
    }
}
