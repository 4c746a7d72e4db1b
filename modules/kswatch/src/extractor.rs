//! Recovers the sold-out reward tiers from a pledge page.
//!
//! The page carries no schema, only a recurring structure:
//!
//! ```html
//! <li class="pledge--all-gone ...">
//!   <input class="pledge__radio" id="reward-42" title="$75.00" type="radio">
//!   <h3 class="pledge__title">Limited <b>Edition</b> Poster</h3>
//! </li>
//! ```
//!
//! The markup is tokenized and tree-built by `scraper` (html5ever), which
//! auto-closes and recovers malformed tags and decodes entities. The tree is
//! then replayed as a forward stream of start/text/end events through a small
//! state machine. Title text is entity-decoded a second time, since some
//! pages double-escape it (`&amp;amp;`).

use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

use crate::types::RewardRecord;

/// Class names that mark the interesting elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Tier container that is sold out.
    pub candidate: String,
    /// Element holding the tier title/description.
    pub title: String,
    /// The tier's radio `<input>`.
    pub selector: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            candidate: "pledge--all-gone".to_string(),
            title: "pledge__title".to_string(),
            selector: "pledge__radio".to_string(),
        }
    }
}

/// Everything recovered from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PledgePage {
    /// Text of the first `<title>` element.
    pub title: Option<String>,
    /// Sold-out tiers in document order.
    pub rewards: Vec<RewardRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct RewardExtractor {
    markers: Markers,
}

impl RewardExtractor {
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    pub fn extract(&self, markup: &str) -> Vec<RewardRecord> {
        self.extract_page(markup).rewards
    }

    pub fn extract_page(&self, markup: &str) -> PledgePage {
        let document = Html::parse_document(markup);
        let mut machine = Machine::new(&self.markers);

        let root = document.root_element();
        machine.start(root.value());
        let mut stack = vec![(root, root.children())];

        while let Some((element, children)) = stack.last_mut() {
            match children.next() {
                Some(child) => match child.value() {
                    Node::Text(text) => machine.text(text),
                    Node::Element(_) => {
                        if let Some(el) = ElementRef::wrap(child) {
                            machine.start(el.value());
                            stack.push((el, el.children()));
                        }
                    }
                    _ => {}
                },
                None => {
                    let element = *element;
                    stack.pop();
                    machine.end(element.value());
                }
            }
        }

        machine.finish()
    }
}

/// Extract with the default markers.
pub fn extract(markup: &str) -> Vec<RewardRecord> {
    RewardExtractor::default().extract(markup)
}

/// Extract rewards and the page title with the default markers.
pub fn extract_page(markup: &str) -> PledgePage {
    RewardExtractor::default().extract_page(markup)
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// `depth` values record the nesting level of the element that entered the
/// state, so only the close of that same element leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InCandidate { depth: usize },
    InCandidateTitle { depth: usize, title_depth: usize },
}

#[derive(Debug, Default)]
struct Draft {
    price: String,
    identifier: String,
    description: String,
}

struct Machine<'m> {
    markers: &'m Markers,
    state: State,
    depth: usize,
    draft: Draft,
    rewards: Vec<RewardRecord>,
    title: Option<String>,
    in_page_title: bool,
}

impl<'m> Machine<'m> {
    fn new(markers: &'m Markers) -> Self {
        Self {
            markers,
            state: State::Outside,
            depth: 0,
            draft: Draft::default(),
            rewards: Vec::new(),
            title: None,
            in_page_title: false,
        }
    }

    fn start(&mut self, el: &Element) {
        self.depth += 1;

        if el.name() == "title" && self.title.is_none() {
            self.in_page_title = true;
        }

        // Elements without a class never change state.
        if el.attr("class").is_none() {
            return;
        }

        match self.state {
            State::Outside => {
                if has_class(el, &self.markers.candidate) {
                    self.state = State::InCandidate { depth: self.depth };
                    self.draft = Draft::default();
                }
            }
            State::InCandidate { depth } => {
                self.capture_selector(el);
                if has_class(el, &self.markers.title) {
                    self.state = State::InCandidateTitle {
                        depth,
                        title_depth: self.depth,
                    };
                }
            }
            State::InCandidateTitle { .. } => self.capture_selector(el),
        }
    }

    fn capture_selector(&mut self, el: &Element) {
        if el.name() != "input" || !has_class(el, &self.markers.selector) {
            return;
        }
        // Last capture wins if a block has more than one selector.
        self.draft.price = el.attr("title").map(ascii_only).unwrap_or_default();
        self.draft.identifier = el.attr("id").unwrap_or_default().to_string();
    }

    fn text(&mut self, text: &str) {
        if self.in_page_title {
            self.title.get_or_insert_with(String::new).push_str(text);
        }
        if let State::InCandidateTitle { .. } = self.state {
            let decoded = html_escape::decode_html_entities(text);
            self.draft.description.push_str(&ascii_only(&decoded));
        }
    }

    fn end(&mut self, el: &Element) {
        if el.name() == "title" {
            self.in_page_title = false;
        }

        match self.state {
            State::InCandidateTitle { depth, title_depth } if title_depth == self.depth => {
                self.state = State::InCandidate { depth };
            }
            State::InCandidate { depth } | State::InCandidateTitle { depth, .. }
                if depth == self.depth =>
            {
                self.emit();
                self.state = State::Outside;
            }
            _ => {}
        }

        self.depth = self.depth.saturating_sub(1);
    }

    fn emit(&mut self) {
        let draft = std::mem::take(&mut self.draft);
        self.rewards.push(RewardRecord {
            price: draft.price,
            identifier: draft.identifier,
            description: collapse_whitespace(&draft.description),
        });
    }

    fn finish(self) -> PledgePage {
        PledgePage {
            title: self
                .title
                .map(|t| collapse_whitespace(&t))
                .filter(|t| !t.is_empty()),
            rewards: self.rewards,
        }
    }
}

fn has_class(el: &Element, class: &str) -> bool {
    el.classes().any(|c| c == class)
}

/// Non-ASCII whitespace (e.g. `&nbsp;`) becomes a space; other non-ASCII is dropped.
fn ascii_only(s: &str) -> String {
    s.chars()
        .filter_map(|c| {
            if c.is_ascii() {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
