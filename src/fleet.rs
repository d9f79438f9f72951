use crate::config::Config;
use failure::Error;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

impl TokenResponse {
    fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Requests an anonymous access token from the identity service and returns
/// it formatted for the authorization header.
pub async fn fetch_token(client: &Client, config: &Config) -> Result<String, Error> {
    let params = [
        ("scope", ""),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("grant_type", "client_credentials"),
    ];
    let token = client
        .post(config.identity_url.clone())
        .header("user-agent", config.user_agent.as_str())
        .form(&params)
        .send()
        .await?
        .error_for_status()?
        .json::<TokenResponse>()
        .await?;
    info!("Obtained new access token");
    Ok(token.authorization())
}

/// Fetches the raw list of currently available vehicles.
pub async fn fetch_available_vehicles(config: &Config) -> Result<Value, Error> {
    let client = Client::new();
    let authorization = fetch_token(&client, config).await?;
    let url = config.available_vehicles_url()?;
    debug!("Fetching {}", url);
    let body = client
        .get(url)
        .header("authorization", authorization)
        .header("user-agent", config.user_agent.as_str())
        .header("X-API-Key", config.api_key.as_str())
        .header("accept", "application/json")
        .header("user-lat", config.user_lat.as_str())
        .header("user-lon", config.user_lon.as_str())
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;
    info!("Fetched available vehicles");
    Ok(vehicle_list(body))
}

/// Unwraps `{"vehicles": [...]}` responses; anything else is returned as is
/// and left to the tracker to reject.
pub fn vehicle_list(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("vehicles").map_or(false, Value::is_array) => {
            map.remove("vehicles").unwrap_or(Value::Null)
        }
        other => other,
    }
}
