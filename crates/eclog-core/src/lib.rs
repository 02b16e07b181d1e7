pub mod config;
pub mod country;
pub mod error;
pub mod explore;
pub mod outputs;
pub mod pipelines;
pub mod quality;
pub mod referrer;
pub mod rules;
pub mod timestamp_decoder;
pub mod uri;
pub mod user_agent;
