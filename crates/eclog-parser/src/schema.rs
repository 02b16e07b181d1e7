//! Column names of the raw access-log export and of the enriched dataset.

pub const TIMESTAMP: &str = "TimeStamp";
pub const IP_ID: &str = "IpId";
pub const USER_AGENT: &str = "UserAgent";
pub const URI: &str = "Uri";
pub const REFERRER: &str = "Referrer";
pub const HTTP_METHOD: &str = "HttpMethod";
pub const USER_ID: &str = "UserId";

pub const COUNTRY_CODE: &str = "CountryCode";
pub const BROWSER: &str = "Browser";
pub const OS: &str = "OS";
pub const DEVICE_TYPE: &str = "Device_Type";
pub const URI_TYPE: &str = "URI_Type";
pub const REFERRER_TYPE: &str = "Referrer_Type";

/// Columns a raw export is expected to carry. Anything else is passed through untouched.
pub const RAW_COLUMNS: [&str; 7] = [
    TIMESTAMP,
    IP_ID,
    USER_AGENT,
    URI,
    REFERRER,
    HTTP_METHOD,
    USER_ID,
];

/// Columns appended by enrichment, in the order they are added.
pub const DERIVED_COLUMNS: [&str; 6] = [
    COUNTRY_CODE,
    BROWSER,
    OS,
    DEVICE_TYPE,
    URI_TYPE,
    REFERRER_TYPE,
];

/// Persisted format of the decoded `TimeStamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
