//! Supported index tickers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Index tickers the service tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ticker {
    BtcUsd,
    EthUsd,
}

impl Ticker {
    /// Every supported ticker, in ingestion order
    pub const ALL: [Ticker; 2] = [Ticker::BtcUsd, Ticker::EthUsd];

    /// Wire and storage name, also the quote source index name
    pub fn as_str(&self) -> &'static str {
        match self {
            Ticker::BtcUsd => "btc_usd",
            Ticker::EthUsd => "eth_usd",
        }
    }

    /// Comma separated list of supported names
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(Ticker::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Ticker name outside the supported set
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported ticker '{0}'")]
pub struct UnknownTicker(pub String);

impl FromStr for Ticker {
    type Err = UnknownTicker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTicker(s.to_string()))
    }
}
