//! Ordered selector fallback.
//!
//! A [`StrategyChain`] is an ordered list of CSS selectors, each paired with
//! an extractor that turns a matched node into a value or rejects it. The
//! chain is evaluated by [`extract_first_match`]: strategies run in declared
//! order and results are never merged across strategies.

use scraper::{ElementRef, Html, Selector};
use tracing::trace;

/// Compile a selector literal.
///
/// # Panics
///
/// On an invalid selector. Only call this with string literals.
pub fn css(selector: &'static str) -> Selector {
    match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(e) => panic!("invalid selector literal {selector:?}: {e}"),
    }
}

/// Text content of `element`: every text node trimmed, blanks dropped, joined
/// by single spaces.
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Root element of a parsed document, for use as a chain scope.
pub fn document_scope(document: &Html) -> ElementRef<'_> {
    document.root_element()
}

/// Ordered, labelled selectors without extractors.
pub struct SelectorList {
    entries: Vec<(&'static str, Selector)>,
}

/// Nodes produced by the first selector in a [`SelectorList`] that matched.
#[derive(Debug)]
pub struct NodeMatch<'a> {
    pub label: &'static str,
    pub nodes: Vec<ElementRef<'a>>,
}

impl SelectorList {
    pub fn new(selectors: &[&'static str]) -> Self {
        Self {
            entries: selectors.iter().map(|s| (*s, css(s))).collect(),
        }
    }

    /// Nodes of the first selector matching at least one node under `scope`.
    pub fn first_match<'a>(&self, scope: ElementRef<'a>) -> Option<NodeMatch<'a>> {
        self.entries.iter().find_map(|(label, selector)| {
            let nodes: Vec<ElementRef<'a>> = scope.select(selector).collect();
            trace!(label, matched = nodes.len(), "Selector evaluated");
            (!nodes.is_empty()).then_some(NodeMatch { label, nodes })
        })
    }
}

type Extractor<T> = Box<dyn Fn(ElementRef<'_>) -> Option<T> + Send + Sync>;

/// One step of a chain: a selector and the extractor applied to its matches.
pub struct Strategy<T> {
    label: &'static str,
    selector: Selector,
    extract: Extractor<T>,
}

impl<T> Strategy<T> {
    pub fn new<F>(selector: &'static str, extract: F) -> Self
    where
        F: Fn(ElementRef<'_>) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            label: selector,
            selector: css(selector),
            extract: Box::new(extract),
        }
    }
}

/// What happens when a strategy matches nodes but every value is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallthrough {
    /// The first strategy that matches any node wins, even with no values.
    #[default]
    StopAtFirstMatch,
    /// Keep going until a strategy produces at least one value.
    UntilQualifying,
}

/// Ordered strategies for one field.
pub struct StrategyChain<T> {
    strategies: Vec<Strategy<T>>,
    fallthrough: Fallthrough,
}

impl<T> StrategyChain<T> {
    pub fn new(strategies: Vec<Strategy<T>>) -> Self {
        Self {
            strategies,
            fallthrough: Fallthrough::default(),
        }
    }

    pub fn with_fallthrough(mut self, fallthrough: Fallthrough) -> Self {
        self.fallthrough = fallthrough;
        self
    }

    /// Same extractor for every selector.
    pub fn uniform<F>(selectors: &[&'static str], extract: F) -> Self
    where
        F: Fn(ElementRef<'_>) -> Option<T> + Clone + Send + Sync + 'static,
    {
        Self::new(
            selectors
                .iter()
                .map(|s| Strategy::new(s, extract.clone()))
                .collect(),
        )
    }
}

/// Values produced by the winning strategy, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult<T> {
    pub label: &'static str,
    pub values: Vec<T>,
}

impl<T> MatchResult<T> {
    pub fn first(self) -> Option<T> {
        self.values.into_iter().next()
    }
}

/// Evaluate `chain` under `scope`.
///
/// Returns `None` when no selector matched anything. Under
/// [`Fallthrough::UntilQualifying`], if selectors matched but none produced a
/// value, the first matching strategy is reported with no values.
pub fn extract_first_match<T>(scope: ElementRef<'_>, chain: &StrategyChain<T>) -> Option<MatchResult<T>> {
    let mut first_matched: Option<MatchResult<T>> = None;

    for strategy in &chain.strategies {
        let mut nodes = scope.select(&strategy.selector).peekable();
        if nodes.peek().is_none() {
            continue;
        }
        let values: Vec<T> = nodes.filter_map(|node| (strategy.extract)(node)).collect();
        trace!(label = strategy.label, kept = values.len(), "Strategy matched");

        let result = MatchResult {
            label: strategy.label,
            values,
        };
        match chain.fallthrough {
            Fallthrough::StopAtFirstMatch => return Some(result),
            Fallthrough::UntilQualifying if !result.values.is_empty() => return Some(result),
            Fallthrough::UntilQualifying => {
                first_matched.get_or_insert(result);
            }
        }
    }

    first_matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAGE: &str = r#"
        <html><body>
          <div class="b"><span>beta one</span></div>
          <div class="b"><span>x</span></div>
          <div class="c"><span>gamma</span></div>
        </body></html>
    "#;

    fn counted(label: &'static str, calls: &Arc<AtomicUsize>) -> Strategy<String> {
        let calls = Arc::clone(calls);
        Strategy::new(label, move |node| {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(text_of(node))
        })
    }

    #[test]
    fn test_first_matching_strategy_wins_and_later_ones_are_skipped() {
        let html = Html::parse_document(PAGE);
        let calls: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let chain = StrategyChain::new(vec![
            counted("div.a", &calls[0]),
            counted("div.b", &calls[1]),
            counted("div.c", &calls[2]),
        ]);

        let result = extract_first_match(document_scope(&html), &chain).unwrap();
        assert_eq!(result.label, "div.b");
        assert_eq!(result.values, vec!["beta one".to_string(), "x".to_string()]);
        assert_eq!(calls[0].load(Ordering::SeqCst), 0);
        assert_eq!(calls[1].load(Ordering::SeqCst), 2);
        assert_eq!(calls[2].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_only_middle_strategy_matches() {
        let html = Html::parse_document(PAGE);
        let chain = StrategyChain::uniform(&["div.a", "div.c", "div.d"], |n| Some(text_of(n)));
        let result = extract_first_match(document_scope(&html), &chain).unwrap();
        assert_eq!(result.label, "div.c");
        assert_eq!(result.first().as_deref(), Some("gamma"));
    }

    #[test]
    fn test_filtered_out_winner_does_not_fall_through_by_default() {
        let html = Html::parse_document(PAGE);
        let long_only = |n: ElementRef<'_>| Some(text_of(n)).filter(|t| t.len() > 5);
        let chain = StrategyChain::uniform(&["div.c", "div.b"], long_only);
        let result = extract_first_match(document_scope(&html), &chain).unwrap();
        assert_eq!(result.label, "div.c");
        assert!(result.values.is_empty());
    }

    #[test]
    fn test_until_qualifying_moves_past_rejected_matches() {
        let html = Html::parse_document(PAGE);
        let long_only = |n: ElementRef<'_>| Some(text_of(n)).filter(|t| t.len() > 5);
        let chain = StrategyChain::uniform(&["div.c", "div.b"], long_only)
            .with_fallthrough(Fallthrough::UntilQualifying);
        let result = extract_first_match(document_scope(&html), &chain).unwrap();
        assert_eq!(result.label, "div.b");
        assert_eq!(result.values, vec!["beta one".to_string()]);
    }

    #[test]
    fn test_until_qualifying_reports_first_match_when_nothing_qualifies() {
        let html = Html::parse_document(PAGE);
        let never = |_: ElementRef<'_>| None::<String>;
        let chain = StrategyChain::uniform(&["div.a", "div.c", "div.b"], never)
            .with_fallthrough(Fallthrough::UntilQualifying);
        let result = extract_first_match(document_scope(&html), &chain).unwrap();
        assert_eq!(result.label, "div.c");
        assert!(result.values.is_empty());
    }

    #[test]
    fn test_no_selector_matches_is_none() {
        let html = Html::parse_document(PAGE);
        let chain = StrategyChain::uniform(&["table", "ul li"], |n| Some(text_of(n)));
        assert!(extract_first_match(document_scope(&html), &chain).is_none());
    }

    #[test]
    fn test_selector_list_returns_nodes_of_first_match() {
        let html = Html::parse_document(PAGE);
        let list = SelectorList::new(&["section", "div.b", "div"]);
        let found = list.first_match(document_scope(&html)).unwrap();
        assert_eq!(found.label, "div.b");
        assert_eq!(found.nodes.len(), 2);
    }

    #[test]
    fn test_text_of_trims_and_joins_pieces() {
        let html = Html::parse_fragment("<p>  Why?<br>\n  Because. </p>");
        let p = html.select(&css("p")).next().unwrap();
        assert_eq!(text_of(p), "Why? Because.");
    }
}
