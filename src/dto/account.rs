use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{UserAddress, UserPaymentMethod};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    pub label: String,
    pub address: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub items: Vec<UserAddress>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentMethodRequest {
    /// One of "tmoney", "flooz", "card", "cash".
    pub method_type: String,
    pub account_number: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentMethodList {
    pub items: Vec<UserPaymentMethod>,
}
