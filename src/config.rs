use failure::Error;
use std::env;
use std::path::PathBuf;
use url::Url;

use crate::tracker::DEFAULT_MAX_AGE_HOURS;

const DEFAULT_IDENTITY_URL: &str =
    "https://aima-us.vulog.net/auth/realms/LEO-CAMTR/protocol/openid-connect/token";
const DEFAULT_API_URL: &str = "https://aima-us.vulog.net/apiv5/";
const DEFAULT_CLIENT_ID: &str = "LEO-CAMTR_anon";
const DEFAULT_CITY_ID: &str = "81580773-9478-4d76-86c1-3128d13538cf";

/// Upper bound for `MAX_AGE_HOURS`: one hundred years.
const MAX_AGE_HOURS_LIMIT: i64 = 24 * 365 * 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub identity_url: Url,
    pub api_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub api_key: String,
    pub city_id: String,
    pub user_agent: String,
    pub user_lat: String,
    pub user_lon: String,
    pub output_path: PathBuf,
    /// Zero disables cleanup of stale vehicles.
    pub max_age_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key).ok_or_else(|| format_err!("{} environment variable unset", key))
        };

        let identity_url = Url::parse(&or_default("FLEET_IDENTITY_URL", DEFAULT_IDENTITY_URL))?;
        let mut api_url = Url::parse(&or_default("FLEET_API_URL", DEFAULT_API_URL))?;
        // Url::join replaces the last segment unless the base ends in '/'.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        let max_age_hours = match lookup("MAX_AGE_HOURS") {
            Some(hours) => hours
                .parse()
                .map_err(|e| format_err!("Invalid MAX_AGE_HOURS '{}': {}", hours, e))?,
            None => DEFAULT_MAX_AGE_HOURS,
        };
        if max_age_hours < 0 || max_age_hours > MAX_AGE_HOURS_LIMIT {
            bail!(
                "MAX_AGE_HOURS must be between 0 and {}, got {}",
                MAX_AGE_HOURS_LIMIT,
                max_age_hours
            );
        }

        Ok(Config {
            identity_url,
            api_url,
            client_id: or_default("FLEET_CLIENT_ID", DEFAULT_CLIENT_ID),
            client_secret: required("FLEET_CLIENT_SECRET")?,
            api_key: required("FLEET_API_KEY")?,
            city_id: or_default("FLEET_CITY_ID", DEFAULT_CITY_ID),
            user_agent: or_default("FLEET_USER_AGENT", "MonApp/1.0"),
            user_lat: or_default("FLEET_USER_LAT", "45.507770"),
            user_lon: or_default("FLEET_USER_LON", "-73.562721"),
            output_path: PathBuf::from(or_default(
                "OUTPUT_PATH",
                "docs/vehiculeUsages.latest.json",
            )),
            max_age_hours,
        })
    }

    pub fn available_vehicles_url(&self) -> Result<Url, Error> {
        Ok(self
            .api_url
            .join(&format!("availableVehicles/{}", self.city_id))?)
    }
}
