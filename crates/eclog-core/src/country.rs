use eclog_parser::schema;
use polars::prelude::*;

use crate::error::Result;

const COUNTRY_CODE_LEN: usize = 2;

/// Country code carried in the last two characters of an anonymized IP identifier.
///
/// Identifiers shorter than two characters, and missing identifiers, yield an empty string so
/// the column never holds a partial code or a null.
pub fn country_code(ip_id: Option<&str>) -> String {
    let Some(ip_id) = ip_id else {
        return String::new();
    };

    let char_count = ip_id.chars().count();
    if char_count < COUNTRY_CODE_LEN {
        return String::new();
    }

    ip_id
        .chars()
        .skip(char_count - COUNTRY_CODE_LEN)
        .map(|ch| ch.to_uppercase().next().unwrap_or(ch))
        .collect()
}

pub fn extract_country_codes(df: &mut DataFrame, ip_column: &str) -> Result<()> {
    let codes: Vec<String> = df
        .column(ip_column)?
        .str()?
        .into_iter()
        .map(country_code)
        .collect();

    df.with_column(Series::new(schema::COUNTRY_CODE.into(), codes))?;
    Ok(())
}
