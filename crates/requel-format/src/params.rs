//! Parameter identity tracking and placeholder emission.
//!
//! Each unique parameter identity gets a stable index on first encounter
//! during lowering, so placeholder numbering follows first textual
//! appearance in the emitted SQL. Two occurrences of the same identity
//! share one index and one entry in the result bag.

use std::collections::BTreeMap;
use std::collections::HashMap;

use requel_ast::ParamRef;

use crate::{ParameterStyle, ParameterSymbol};

/// One entry of the emitted parameter bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    /// The parameter identity as written in the source.
    pub param: ParamRef,
    /// The placeholder text emitted for it.
    pub placeholder: String,
}

/// The out-of-line parameter container returned by `format`.
///
/// An array (first-use order) under indexed and anonymous styles, a
/// name-keyed mapping under the named style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBag {
    Ordered(Vec<ParamBinding>),
    Named(BTreeMap<String, ParamBinding>),
}

impl ParamBag {
    /// Number of unique parameter identities.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Ordered(bindings) => bindings.len(),
            Self::Named(bindings) => bindings.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assigns placeholder indices during lowering.
pub(crate) struct ParamCollector {
    style: ParameterStyle,
    symbol: ParameterSymbol,
    order: Vec<ParamBinding>,
    by_identity: HashMap<String, usize>,
}

impl ParamCollector {
    pub(crate) fn new(style: ParameterStyle, symbol: ParameterSymbol) -> Self {
        Self {
            style,
            symbol,
            order: Vec::new(),
            by_identity: HashMap::new(),
        }
    }

    /// The placeholder text for this parameter, registering the identity
    /// on first encounter.
    pub(crate) fn placeholder(&mut self, param: &ParamRef) -> String {
        let key = param.identity_key();
        let index = match self.by_identity.get(&key) {
            Some(index) => *index,
            None => {
                let index = self.order.len();
                self.by_identity.insert(key, index);
                self.order.push(ParamBinding {
                    param: param.clone(),
                    placeholder: String::new(),
                });
                index
            }
        };

        let text = match self.style {
            ParameterStyle::Anonymous => self.symbol.wrap(""),
            ParameterStyle::Indexed => self.symbol.wrap(&(index + 1).to_string()),
            ParameterStyle::Named => self.symbol.wrap(&display_name(param)),
        };
        self.order[index].placeholder = text.clone();
        text
    }

    /// Finish collection and build the result bag for the active style.
    pub(crate) fn into_bag(self) -> ParamBag {
        match self.style {
            ParameterStyle::Named => ParamBag::Named(
                self.order
                    .into_iter()
                    .map(|binding| (display_name(&binding.param), binding))
                    .collect(),
            ),
            ParameterStyle::Anonymous | ParameterStyle::Indexed => {
                ParamBag::Ordered(self.order)
            }
        }
    }
}

/// The name a parameter goes by under the named style: its own name, or
/// its index/ordinal rendered as text for positional parameters.
fn display_name(param: &ParamRef) -> String {
    match param {
        ParamRef::Named(name) => name.clone(),
        ParamRef::Indexed(index) => index.to_string(),
        ParamRef::Anonymous(ordinal) => ordinal.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_placeholders_number_by_first_use() {
        let mut collector = ParamCollector::new(
            ParameterStyle::Indexed,
            ParameterSymbol::plain("$"),
        );
        let a = ParamRef::Named("a".to_owned());
        let b = ParamRef::Named("b".to_owned());
        assert_eq!(collector.placeholder(&a), "$1");
        assert_eq!(collector.placeholder(&b), "$2");
        // Repeat use keeps the original index.
        assert_eq!(collector.placeholder(&a), "$1");

        let ParamBag::Ordered(bindings) = collector.into_bag() else {
            panic!("expected ordered bag");
        };
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].param, a);
        assert_eq!(bindings[1].param, b);
    }

    #[test]
    fn anonymous_placeholders_dedupe_in_the_bag() {
        let mut collector = ParamCollector::new(
            ParameterStyle::Anonymous,
            ParameterSymbol::plain("?"),
        );
        let a = ParamRef::Named("a".to_owned());
        assert_eq!(collector.placeholder(&a), "?");
        assert_eq!(collector.placeholder(&a), "?");
        assert_eq!(collector.into_bag().len(), 1);
    }

    #[test]
    fn named_style_produces_a_map() {
        let mut collector = ParamCollector::new(
            ParameterStyle::Named,
            ParameterSymbol::plain("@"),
        );
        let user = ParamRef::Named("userId".to_owned());
        assert_eq!(collector.placeholder(&user), "@userId");

        let ParamBag::Named(bindings) = collector.into_bag() else {
            panic!("expected named bag");
        };
        assert!(bindings.contains_key("userId"));
    }

    #[test]
    fn wrapped_symbol() {
        let mut collector = ParamCollector::new(
            ParameterStyle::Named,
            ParameterSymbol::wrapped("${", "}"),
        );
        let user = ParamRef::Named("id".to_owned());
        assert_eq!(collector.placeholder(&user), "${id}");
    }

    #[test]
    fn distinct_anonymous_params_are_distinct_identities() {
        let mut collector = ParamCollector::new(
            ParameterStyle::Indexed,
            ParameterSymbol::plain("$"),
        );
        assert_eq!(collector.placeholder(&ParamRef::Anonymous(0)), "$1");
        assert_eq!(collector.placeholder(&ParamRef::Anonymous(1)), "$2");
    }
}
