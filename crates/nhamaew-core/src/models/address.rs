use serde::{Deserialize, Serialize};

/// Shipping address on file. The backend answers `{}` when none is saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub recipient_full_name: String,
    pub recipient_phone_number: String,
    pub shipping_address: String,
    pub additional_address: String,
}

impl ShippingAddress {
    pub fn is_empty(&self) -> bool {
        self.recipient_full_name.trim().is_empty()
            && self.recipient_phone_number.trim().is_empty()
            && self.shipping_address.trim().is_empty()
    }

    /// Address lines as shown on the cart page.
    pub fn lines(&self) -> Vec<&str> {
        [
            self.recipient_full_name.as_str(),
            self.recipient_phone_number.as_str(),
            self.shipping_address.as_str(),
            self.additional_address.as_str(),
        ]
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShippingAddress {
    pub line_user_id: String,
    pub recipient_full_name: String,
    pub recipient_phone_number: String,
    pub shipping_address: String,
    pub additional_address: String,
}
