//! Deployment settings: escrow address, wallet and leaderboard credentials.
//!
//! Settings come either from a TOML document or from environment-style
//! variables. All required values that are absent are reported at once.

use serde::{Deserialize, Serialize};

use crate::*;

pub const MAX_BOARD_SIZE: Coord = 16;
pub const BOARD_SIZE_VAR: &str = "LEMON_MINER_BOARD_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub database_url: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default = "default_board_size")]
    pub board_size: Coord,
}

fn default_board_size() -> Coord {
    DEFAULT_BOARD_SIZE
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            board_size: default_board_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub contract_address: Address,
    pub wallet_connect_project_id: String,
    pub firebase: FirebaseConfig,
    pub game: GameSettings,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> core::result::Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(raw)?;
        raw.finish(Field::key)
    }

    /// Reads `REACT_APP_*` style variables; unrelated names are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> core::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawConfig::default();
        for (name, value) in vars {
            let name = name.as_ref();
            if name == BOARD_SIZE_VAR {
                let value = value.into();
                let size = value.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: BOARD_SIZE_VAR,
                    reason: format!("{value:?} is not a board size"),
                })?;
                raw.game.board_size = size;
            } else if let Some(field) = Field::ALL.into_iter().find(|field| field.var() == name) {
                *raw.slot(field) = Some(value.into());
            }
        }
        raw.finish(Field::var)
    }

    pub fn from_env() -> core::result::Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// The board has to fit every difficulty tier with at least one safe cell.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        let size = self.game.board_size;
        if size > MAX_BOARD_SIZE {
            return Err(ConfigError::Invalid {
                field: "game.board_size",
                reason: format!("{size} exceeds the maximum of {MAX_BOARD_SIZE}"),
            });
        }
        for tier in difficulty_tiers() {
            BoardConfig::new(size, tier.hazards)
                .validate()
                .map_err(|err| ConfigError::Invalid {
                    field: "game.board_size",
                    reason: format!("{size} cannot hold the {} CBTC tier: {err}", tier.stake),
                })?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Field {
    ContractAddress,
    WalletConnectProjectId,
    FirebaseApiKey,
    FirebaseAuthDomain,
    FirebaseProjectId,
    FirebaseDatabaseUrl,
    FirebaseStorageBucket,
    FirebaseMessagingSenderId,
    FirebaseAppId,
}

impl Field {
    const ALL: [Self; 9] = [
        Self::ContractAddress,
        Self::WalletConnectProjectId,
        Self::FirebaseApiKey,
        Self::FirebaseAuthDomain,
        Self::FirebaseProjectId,
        Self::FirebaseDatabaseUrl,
        Self::FirebaseStorageBucket,
        Self::FirebaseMessagingSenderId,
        Self::FirebaseAppId,
    ];

    const fn key(self) -> &'static str {
        use Field::*;
        match self {
            ContractAddress => "contract_address",
            WalletConnectProjectId => "wallet_connect_project_id",
            FirebaseApiKey => "firebase.api_key",
            FirebaseAuthDomain => "firebase.auth_domain",
            FirebaseProjectId => "firebase.project_id",
            FirebaseDatabaseUrl => "firebase.database_url",
            FirebaseStorageBucket => "firebase.storage_bucket",
            FirebaseMessagingSenderId => "firebase.messaging_sender_id",
            FirebaseAppId => "firebase.app_id",
        }
    }

    const fn var(self) -> &'static str {
        use Field::*;
        match self {
            ContractAddress => "REACT_APP_CONTRACT_ADDRESS",
            WalletConnectProjectId => "REACT_APP_WALLET_CONNECT_PROJECT_ID",
            FirebaseApiKey => "REACT_APP_FIREBASE_API_KEY",
            FirebaseAuthDomain => "REACT_APP_FIREBASE_AUTH_DOMAIN",
            FirebaseProjectId => "REACT_APP_FIREBASE_PROJECT_ID",
            FirebaseDatabaseUrl => "REACT_APP_FIREBASE_DATABASE_URL",
            FirebaseStorageBucket => "REACT_APP_FIREBASE_STORAGE_BUCKET",
            FirebaseMessagingSenderId => "REACT_APP_FIREBASE_MESSAGING_SENDER_ID",
            FirebaseAppId => "REACT_APP_FIREBASE_APP_ID",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFirebase {
    api_key: Option<String>,
    auth_domain: Option<String>,
    project_id: Option<String>,
    database_url: Option<String>,
    storage_bucket: Option<String>,
    messaging_sender_id: Option<String>,
    app_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    contract_address: Option<String>,
    wallet_connect_project_id: Option<String>,
    firebase: RawFirebase,
    game: GameSettings,
}

impl RawConfig {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        use Field::*;
        match field {
            ContractAddress => &mut self.contract_address,
            WalletConnectProjectId => &mut self.wallet_connect_project_id,
            FirebaseApiKey => &mut self.firebase.api_key,
            FirebaseAuthDomain => &mut self.firebase.auth_domain,
            FirebaseProjectId => &mut self.firebase.project_id,
            FirebaseDatabaseUrl => &mut self.firebase.database_url,
            FirebaseStorageBucket => &mut self.firebase.storage_bucket,
            FirebaseMessagingSenderId => &mut self.firebase.messaging_sender_id,
            FirebaseAppId => &mut self.firebase.app_id,
        }
    }

    fn finish(mut self, label: fn(Field) -> &'static str) -> core::result::Result<AppConfig, ConfigError> {
        let mut missing = Vec::new();
        let mut take = |field: Field| {
            match self.slot(field).take().filter(|value| !value.trim().is_empty()) {
                Some(value) => value.trim().to_string(),
                None => {
                    missing.push(label(field));
                    String::new()
                }
            }
        };
        let contract_address = take(Field::ContractAddress);
        let wallet_connect_project_id = take(Field::WalletConnectProjectId);
        let firebase = FirebaseConfig {
            api_key: take(Field::FirebaseApiKey),
            auth_domain: take(Field::FirebaseAuthDomain),
            project_id: take(Field::FirebaseProjectId),
            database_url: take(Field::FirebaseDatabaseUrl),
            storage_bucket: take(Field::FirebaseStorageBucket),
            messaging_sender_id: take(Field::FirebaseMessagingSenderId),
            app_id: take(Field::FirebaseAppId),
        };
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let contract_address =
            Address::parse(&contract_address).map_err(|err| ConfigError::Invalid {
                field: label(Field::ContractAddress),
                reason: err.to_string(),
            })?;
        let config = AppConfig {
            contract_address,
            wallet_connect_project_id,
            firebase,
            game: self.game,
        };
        config.validate()?;
        Ok(config)
    }
}
