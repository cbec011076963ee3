//! Local command detection.
//!
//! Classifies raw user text before it reaches the language model. Matchers
//! are tried in a fixed order and the first hit wins; text nothing claims is
//! passed through as a prompt.
//!
//! | Input | Command |
//! |-------|---------|
//! | `/wp <query>`, `/so`, `/arxiv`, `/mdn`, `/web.dev` | [`Command::Search`] |
//! | `set a reminder [to] <text>` | [`Command::Reminder`] |
//! | `what time is it?` | [`Command::TimeQuery`] |
//! | anything else | [`Command::Ask`] |

/// A site reachable through a search shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSite {
    /// Shortcut name without the slash (`wp`).
    pub name: &'static str,
    /// URL prefix the encoded query is appended to.
    pub url_prefix: &'static str,
}

/// Search shortcuts in match order.
pub const SEARCH_SITES: &[SearchSite] = &[
    SearchSite {
        name: "wp",
        url_prefix: "https://en.wikipedia.org/w/index.php?search=",
    },
    SearchSite {
        name: "so",
        url_prefix: "https://stackoverflow.com/search?q=",
    },
    SearchSite {
        name: "arxiv",
        url_prefix: "https://arxiv.org/search/?query=",
    },
    SearchSite {
        name: "mdn",
        url_prefix: "https://developer.mozilla.org/en-US/search?q=",
    },
    SearchSite {
        name: "web.dev",
        url_prefix: "https://web.dev/search?q=",
    },
];

const REMINDER_PHRASE: &str = "set a reminder";
const TIME_QUERY: &str = "what time is it?";

/// A classified user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a site search.
    Search {
        site: SearchSite,
        /// Trimmed query as typed.
        query: String,
        /// Fully built search URL.
        url: String,
    },
    /// A search shortcut with nothing after it.
    MissingSearchQuery { site: SearchSite },
    /// Store a reminder.
    Reminder { text: String },
    /// The reminder phrase without any reminder text.
    EmptyReminder,
    /// Report the local time.
    TimeQuery,
    /// Forward to the language model.
    Ask(String),
}

type Matcher = fn(&str) -> Option<Command>;

const MATCHERS: &[Matcher] = &[match_search, match_reminder, match_time_query];

/// Classify user text.
pub fn parse(text: &str) -> Command {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(text))
        .unwrap_or_else(|| Command::Ask(text.to_owned()))
}

/// Strip `prefix` (ASCII case-insensitive) from the start of `text`.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn match_search(text: &str) -> Option<Command> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    SEARCH_SITES.iter().find_map(|site| {
        let tail = strip_prefix_ignore_case(rest, site.name)?;
        // `/wpx` is not `/wp`.
        if tail.chars().next().is_some_and(|c| !c.is_whitespace()) {
            return None;
        }
        let query = tail.trim();
        if query.is_empty() {
            return Some(Command::MissingSearchQuery { site: *site });
        }
        Some(Command::Search {
            site: *site,
            query: query.to_owned(),
            url: format!("{}{}", site.url_prefix, urlencoding::encode(query)),
        })
    })
}

fn match_reminder(text: &str) -> Option<Command> {
    let rest = strip_prefix_ignore_case(text.trim_start(), REMINDER_PHRASE)?;
    let rest = rest.trim_start();
    let rest = strip_prefix_ignore_case(rest, "to")
        .filter(|after| after.is_empty() || after.starts_with(char::is_whitespace))
        .unwrap_or(rest);
    let reminder = rest.trim();
    if reminder.is_empty() {
        Some(Command::EmptyReminder)
    } else {
        Some(Command::Reminder {
            text: reminder.to_owned(),
        })
    }
}

fn match_time_query(text: &str) -> Option<Command> {
    text.trim()
        .eq_ignore_ascii_case(TIME_QUERY)
        .then_some(Command::TimeQuery)
}
