use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// How a locator pattern is interpreted against the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// CSS selector, matched with `querySelectorAll`.
    Css,
    /// XPath expression, matched with `document.evaluate`.
    Xpath,
    /// Visible text of a clickable element (case-insensitive contains).
    Text,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css => write!(f, "css"),
            Self::Xpath => write!(f, "xpath"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// One way to find an element on the target page.
///
/// The markup of the target page is not under our control, so a locator is
/// never trusted on its own; callers declare an ordered fallback chain
/// ([`LocatorSet`]) and the first locator that yields a visible element wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    pub strategy: Strategy,
    pub pattern: String,
    /// Rendered-text constraint applied when the structural pattern matches
    /// more than it should (e.g. one class shared by both punch buttons).
    pub expect_text: Option<String>,
}

impl Locator {
    pub fn css(pattern: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Css,
            pattern: pattern.into(),
            expect_text: None,
        }
    }

    pub fn xpath(pattern: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Xpath,
            pattern: pattern.into(),
            expect_text: None,
        }
    }

    pub fn text(pattern: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Text,
            pattern: pattern.into(),
            expect_text: None,
        }
    }

    pub fn expect_text(mut self, text: impl Into<String>) -> Self {
        self.expect_text = Some(text.into());
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.strategy, self.pattern)
    }
}

const LOCATOR_FIELDS: &[&str] = &["css", "xpath", "text", "expect_text"];

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(LocatorVisitor)
    }
}

struct LocatorVisitor;

impl<'de> Visitor<'de> for LocatorVisitor {
    type Value = Locator;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a locator map with one strategy key (css, xpath or text)")
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut found: Option<(Strategy, String)> = None;
        let mut expect_text: Option<String> = None;

        while let Some(key) = map.next_key::<String>()? {
            let strategy = match key.as_str() {
                "css" => Some(Strategy::Css),
                "xpath" => Some(Strategy::Xpath),
                "text" => Some(Strategy::Text),
                "expect_text" => {
                    expect_text = map.next_value()?;
                    None
                }
                other => return Err(de::Error::unknown_field(other, LOCATOR_FIELDS)),
            };
            if let Some(strategy) = strategy {
                if found.is_some() {
                    return Err(de::Error::custom(
                        "locator declares more than one strategy",
                    ));
                }
                found = Some((strategy, map.next_value()?));
            }
        }

        let (strategy, pattern) = found.ok_or_else(|| {
            de::Error::custom("locator needs one of 'css', 'xpath' or 'text'")
        })?;

        Ok(Locator {
            strategy,
            pattern,
            expect_text,
        })
    }
}

/// Ordered fallback chain of locators for one logical UI target.
///
/// Tried strictly in declared order; no scoring, no backtracking after a
/// successful resolution.
#[derive(Debug, Clone)]
pub struct LocatorSet {
    /// Logical target name ("username", "punch-in", ...), used in failure
    /// reports when the whole chain is exhausted.
    pub target: String,
    pub locators: Vec<Locator>,
}

impl LocatorSet {
    pub fn new(target: impl Into<String>, locators: Vec<Locator>) -> Self {
        Self {
            target: target.into(),
            locators,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locator_forms() {
        let yaml = r##"
- css: 'input[type="email"]'
- xpath: "//button[contains(text(), 'Punch In')]"
- text: "Punch In"
"##;
        let locators: Vec<Locator> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(locators.len(), 3);
        assert_eq!(locators[0].strategy, Strategy::Css);
        assert_eq!(locators[0].pattern, r#"input[type="email"]"#);
        assert_eq!(locators[1].strategy, Strategy::Xpath);
        assert_eq!(locators[2].strategy, Strategy::Text);
        assert!(locators.iter().all(|l| l.expect_text.is_none()));
    }

    #[test]
    fn test_parse_locator_with_expect_text() {
        let yaml = r#"
- css: "button.mybtn"
  expect_text: "Punch In"
"#;
        let locators: Vec<Locator> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(locators[0].expect_text.as_deref(), Some("Punch In"));
    }

    #[test]
    fn test_locator_requires_a_strategy() {
        let result: Result<Locator, _> = serde_yaml::from_str("expect_text: x");
        assert!(result.is_err());
    }

    #[test]
    fn test_locator_rejects_two_strategies() {
        let result: Result<Locator, _> =
            serde_yaml::from_str("css: \"#a\"\nxpath: \"//a\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_locator_rejects_unknown_field() {
        let result: Result<Locator, _> = serde_yaml::from_str("selector: \"#a\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::css("#email").to_string(), "css '#email'");
    }
}
