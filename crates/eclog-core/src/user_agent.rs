use eclog_parser::schema;
use polars::prelude::*;

use crate::error::Result;
use crate::rules::{impl_label_text, CaseMode, CategoryLabel, Predicate, RuleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    InternetExplorer,
    Bot,
    Unknown,
}

impl CategoryLabel for Browser {
    const ALL: &'static [Self] = &[
        Browser::Chrome,
        Browser::Firefox,
        Browser::Safari,
        Browser::Edge,
        Browser::Opera,
        Browser::InternetExplorer,
        Browser::Bot,
        Browser::Unknown,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
            Browser::Opera => "Opera",
            Browser::InternetExplorer => "Internet Explorer",
            Browser::Bot => "Bot",
            Browser::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingSystem {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
    Unknown,
}

impl CategoryLabel for OperatingSystem {
    const ALL: &'static [Self] = &[
        OperatingSystem::Windows,
        OperatingSystem::MacOs,
        OperatingSystem::Linux,
        OperatingSystem::Android,
        OperatingSystem::Ios,
        OperatingSystem::Unknown,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "Windows",
            OperatingSystem::MacOs => "MacOS",
            OperatingSystem::Linux => "Linux",
            OperatingSystem::Android => "Android",
            OperatingSystem::Ios => "iOS",
            OperatingSystem::Unknown => "Unknown",
        }
    }
}

/// Unlike the other user-agent labels the fallback here is `Desktop`, not `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Bot,
    Desktop,
}

impl CategoryLabel for DeviceType {
    const ALL: &'static [Self] = &[
        DeviceType::Mobile,
        DeviceType::Tablet,
        DeviceType::Bot,
        DeviceType::Desktop,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "Mobile",
            DeviceType::Tablet => "Tablet",
            DeviceType::Bot => "Bot",
            DeviceType::Desktop => "Desktop",
        }
    }
}

impl_label_text!(Browser, OperatingSystem, DeviceType);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAgentClassification {
    pub browser: Browser,
    pub os: OperatingSystem,
    pub device_type: DeviceType,
}

#[derive(Debug, Clone)]
pub struct UserAgentClassifier {
    browser: RuleSet<Browser>,
    os: RuleSet<OperatingSystem>,
    device_type: RuleSet<DeviceType>,
}

impl Default for UserAgentClassifier {
    fn default() -> Self {
        let browser = RuleSet::new(Browser::Unknown, CaseMode::Insensitive)
            .rule(Browser::Chrome, Predicate::contains("chrome"))
            .rule(Browser::Firefox, Predicate::contains("firefox"))
            .rule(
                Browser::Safari,
                Predicate::contains("safari").and(Predicate::contains("chrome").negate()),
            )
            .rule(Browser::Edge, Predicate::contains_any(&["edge", "edg"]))
            .rule(Browser::Opera, Predicate::contains_any(&["opera", "opr"]))
            .rule(
                Browser::InternetExplorer,
                Predicate::contains_any(&["msie", "trident"]),
            )
            .rule(Browser::Bot, Predicate::contains_any(&["bot", "spider"]));

        let os = RuleSet::new(OperatingSystem::Unknown, CaseMode::Insensitive)
            .rule(OperatingSystem::Windows, Predicate::contains("windows"))
            .rule(
                OperatingSystem::MacOs,
                Predicate::contains_any(&["mac os", "macintosh"]),
            )
            .rule(OperatingSystem::Linux, Predicate::contains("linux"))
            .rule(OperatingSystem::Android, Predicate::contains("android"))
            .rule(
                OperatingSystem::Ios,
                Predicate::contains_any(&["ios", "iphone", "ipad"]),
            );

        let device_type = RuleSet::new(DeviceType::Desktop, CaseMode::Insensitive)
            .rule(DeviceType::Mobile, Predicate::contains("mobile"))
            .rule(DeviceType::Tablet, Predicate::contains("tablet"))
            .rule(DeviceType::Bot, Predicate::contains_any(&["bot", "spider"]));

        Self {
            browser,
            os,
            device_type,
        }
    }
}

impl UserAgentClassifier {
    pub fn browser_rules(&self) -> &RuleSet<Browser> {
        &self.browser
    }

    pub fn os_rules(&self) -> &RuleSet<OperatingSystem> {
        &self.os
    }

    pub fn device_type_rules(&self) -> &RuleSet<DeviceType> {
        &self.device_type
    }

    /// A missing user agent is classified as the empty string.
    pub fn classify(&self, user_agent: Option<&str>) -> UserAgentClassification {
        let lowered = user_agent.unwrap_or_default().to_lowercase();
        UserAgentClassification {
            browser: self.browser.classify_prepared(&lowered),
            os: self.os.classify_prepared(&lowered),
            device_type: self.device_type.classify_prepared(&lowered),
        }
    }

    /// Appends `Browser`, `OS` and `Device_Type` columns derived from `column`.
    pub fn apply(&self, df: &mut DataFrame, column: &str) -> Result<()> {
        let classified: Vec<UserAgentClassification> = df
            .column(column)?
            .str()?
            .into_iter()
            .map(|value| self.classify(value))
            .collect();

        let browser: Vec<&str> = classified.iter().map(|c| c.browser.as_str()).collect();
        let os: Vec<&str> = classified.iter().map(|c| c.os.as_str()).collect();
        let device: Vec<&str> = classified.iter().map(|c| c.device_type.as_str()).collect();

        df.with_column(Series::new(schema::BROWSER.into(), browser))?;
        df.with_column(Series::new(schema::OS.into(), os))?;
        df.with_column(Series::new(schema::DEVICE_TYPE.into(), device))?;
        Ok(())
    }
}
