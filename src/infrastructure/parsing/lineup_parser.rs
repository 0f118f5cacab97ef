//! Match detail page line-up parser
//!
//! Extracts the starting eleven and the used substitutes of both sides.
//! Team attribution comes from the `home` class marker; everything without
//! it belongs to the away side.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::attribute;
use super::config::{LineupSelectors, compile_selector};
use super::error::{ParsingError, ParsingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSide {
    Home,
    Away,
}

/// One linked player on the match page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub side: TeamSide,
    /// Site-relative link to the player's stats page
    pub href: String,
    pub is_substitute: bool,
}

pub struct LineupParser {
    starter: Selector,
    starter_link: Selector,
    substitute_group: Selector,
    substitute_slot: Selector,
    substitute_link: Selector,
    home_class: String,
}

impl LineupParser {
    pub fn with_config(selectors: &LineupSelectors) -> ParsingResult<Self> {
        Ok(Self {
            starter: compile_selector(&selectors.starter)?,
            starter_link: compile_selector(&selectors.starter_link)?,
            substitute_group: compile_selector(&selectors.substitute_group)?,
            substitute_slot: compile_selector(&selectors.substitute_slot)?,
            substitute_link: compile_selector(&selectors.substitute_link)?,
            home_class: selectors.home_class.clone(),
        })
    }

    /// Starters first (page order), then substitutes (page order).
    ///
    /// A page without a single linked starter is not a match page we can use.
    pub fn parse(&self, body: &str) -> ParsingResult<Vec<RosterEntry>> {
        let html = Html::parse_document(body);
        let mut roster = Vec::new();

        for lineup in html.select(&self.starter) {
            let side = self.side_of(&lineup);
            match lineup
                .select(&self.starter_link)
                .find_map(|link| attribute(&link, "href"))
            {
                Some(href) => roster.push(RosterEntry {
                    side,
                    href: href.to_string(),
                    is_substitute: false,
                }),
                None => warn!("Line-up entry without a player link"),
            }
        }

        for group in html.select(&self.substitute_group) {
            let side = self.side_of(&group);
            for slot in group.select(&self.substitute_slot) {
                // every slot wraps another `li`; only the outer one counts
                if self.is_nested_slot(&slot, &group) {
                    continue;
                }
                // unused substitutes have no stats page
                if let Some(href) = slot
                    .select(&self.substitute_link)
                    .find_map(|link| attribute(&link, "href"))
                {
                    roster.push(RosterEntry {
                        side,
                        href: href.to_string(),
                        is_substitute: true,
                    });
                }
            }
        }

        if !roster.iter().any(|entry| !entry.is_substitute) {
            return Err(ParsingError::required_field_missing(
                "lineup",
                Some("no linked starters on the match page"),
            ));
        }

        debug!("Extracted {} roster entries", roster.len());
        Ok(roster)
    }

    /// `scraper` matches descendant selectors against ancestors outside the
    /// scoped element, so a slot selector also hits the slot's inner items.
    fn is_nested_slot(&self, slot: &ElementRef, group: &ElementRef) -> bool {
        slot.ancestors()
            .take_while(|node| node.id() != group.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| self.substitute_slot.matches(&ancestor))
    }

    fn side_of(&self, element: &ElementRef) -> TeamSide {
        if element.value().classes().any(|class| class == self.home_class) {
            TeamSide::Home
        } else {
            TeamSide::Away
        }
    }
}
