// Copyright © 2024 Pathway

use std::env;
use std::error;
use std::str::FromStr;

pub const N_PCS_VAR: &str = "MULTIMAP_N_PCS";
pub const N_NEIGHBORS_VAR: &str = "MULTIMAP_N_NEIGHBORS";
pub const N_COMPONENTS_VAR: &str = "MULTIMAP_N_COMPONENTS";
pub const RANDOM_STATE_VAR: &str = "MULTIMAP_RANDOM_STATE";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("couldn't parse the value of {0:?} environment variable as UTF-8 string")]
    NotUtf8(String),

    #[error("couldn't parse the value of {0:?} environment variable: {1}")]
    ParsingFailed(String, #[source] Box<dyn error::Error + Send + Sync>),
}

pub fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    if let Some(value) = env::var_os(name) {
        Ok(Some(
            value
                .into_string()
                .map_err(|_| Error::NotUtf8(name.to_string()))?
                .trim()
                .parse()
                .map_err(|err| Error::ParsingFailed(name.to_string(), Box::new(err)))?,
        ))
    } else {
        Ok(None)
    }
}

/// Overwrites `target` with the parsed value of `name`, if it is set.
pub fn override_from_env<T: FromStr>(name: &str, target: &mut T) -> Result<(), Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    if let Some(value) = parse_env_var(name)? {
        *target = value;
    }
    Ok(())
}
