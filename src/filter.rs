//! Card list row filtering.
//!
//! Text queries match case-insensitively as a substring by default;
//! `EQUALS:` requires the whole field to match and `REGEX:` treats the rest
//! of the query as a regular expression. Keyword queries are `+`-separated
//! groups that must all match, each a `,`-separated list of alternatives.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{DeckBuddyError, Result};
use crate::models::{Card, CardColor, CardCounts};

const REGEX_PREFIX: &str = "REGEX:";
const EQUALS_PREFIX: &str = "EQUALS:";

#[derive(Debug, Clone)]
pub enum TextQuery {
    Contains(String),
    Equals(String),
    Regex(Regex),
}

impl TextQuery {
    pub fn parse(query: &str) -> Result<Self> {
        if let Some(pattern) = query.strip_prefix(REGEX_PREFIX) {
            let regex = Regex::new(&pattern.to_lowercase()).map_err(|e| {
                DeckBuddyError::InvalidArgument(format!("invalid regex '{}': {}", pattern, e))
            })?;
            Ok(TextQuery::Regex(regex))
        } else if let Some(exact) = query.strip_prefix(EQUALS_PREFIX) {
            Ok(TextQuery::Equals(exact.to_lowercase()))
        } else {
            Ok(TextQuery::Contains(query.to_lowercase()))
        }
    }

    /// `field` must already be lower-cased.
    fn matches(&self, field: &str) -> bool {
        match self {
            TextQuery::Contains(q) => field.contains(q.as_str()),
            TextQuery::Equals(q) => field == q,
            TextQuery::Regex(re) => re.is_match(field),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CardPredicate {
    Name(TextQuery),
    Type(TextQuery),
    Text(TextQuery),
    /// All groups must match; a group matches if any of its keywords does.
    Keywords(Vec<Vec<String>>),
    Colors(BTreeSet<CardColor>),
}

impl CardPredicate {
    pub fn name(query: &str) -> Result<Self> {
        TextQuery::parse(query).map(CardPredicate::Name)
    }

    pub fn type_line(query: &str) -> Result<Self> {
        TextQuery::parse(query).map(CardPredicate::Type)
    }

    pub fn text(query: &str) -> Result<Self> {
        TextQuery::parse(query).map(CardPredicate::Text)
    }

    /// Keyword filter: `+` separates groups that must all match, `,`
    /// separates alternatives within a group. Keywords are trimmed and
    /// compared case-insensitively, so `"flying + first strike"` works.
    pub fn keywords(query: &str) -> Self {
        let groups = query
            .split('+')
            .map(|group| group.split(',').map(|k| k.trim().to_lowercase()).collect())
            .collect();
        CardPredicate::Keywords(groups)
    }

    pub fn colors<I: IntoIterator<Item = CardColor>>(colors: I) -> Self {
        CardPredicate::Colors(colors.into_iter().collect())
    }

    pub fn test(&self, card: &Card) -> bool {
        match self {
            CardPredicate::Name(q) => q.matches(&card.name.to_lowercase()),
            CardPredicate::Type(q) => q.matches(&card.type_line.to_lowercase()),
            CardPredicate::Text(q) => q.matches(&card.oracle_text),
            CardPredicate::Keywords(groups) => groups
                .iter()
                .all(|group| group.iter().any(|k| card.keywords.contains(k))),
            CardPredicate::Colors(colors) => {
                if colors.contains(&CardColor::Colorless) {
                    // Colorless alone means "colorless only"; mixed with
                    // colors it widens to "any of these".
                    if colors.len() == 1 {
                        card.color_identity.contains(&CardColor::Colorless)
                    } else {
                        colors.iter().any(|c| card.color_identity.contains(c))
                    }
                } else {
                    card.color_identity == *colors
                }
            }
        }
    }
}

/// Which groups of cards the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewToggles {
    pub deck: bool,
    pub collection: bool,
    pub unowned: bool,
    pub banned: bool,
    pub non_playable: bool,
}

impl Default for ViewToggles {
    fn default() -> Self {
        Self {
            deck: true,
            collection: true,
            unowned: false,
            banned: false,
            non_playable: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub views: ViewToggles,
    pub predicates: Vec<CardPredicate>,
}

impl CardFilter {
    pub fn matches(&self, card: &Card, counts: &CardCounts) -> bool {
        let views = &self.views;
        if !views.deck && counts.in_deck > 0 {
            return false;
        }
        if !views.unowned && counts.owned == 0 {
            return false;
        }
        if !views.collection && counts.owned > 0 && counts.in_deck == 0 {
            return false;
        }
        if !views.banned && counts.banned {
            return false;
        }
        if !views.non_playable && !card.is_playable {
            return false;
        }
        self.predicates.iter().all(|p| p.test(card))
    }
}
