use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    /// Wallet provider name, e.g. "MetaMask"
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// Decimal string, mirroring form input
    pub eur_amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResponse {
    /// 1 = connect wallet, 2 = convert currency, 3 = complete transaction
    pub step: u8,
    /// Only present at step 3: "initial" | "processing" | "confirmed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eur_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_amount: Option<String>,
    /// Deposit address shown at the transfer step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_address: Option<String>,
}
