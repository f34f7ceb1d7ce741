//! Delivery fee quoting. The market charges one flat rate per order,
//! regardless of distance or weight.

pub const DEFAULT_DELIVERY_FEE: i64 = 1500;

pub trait DeliveryFeePolicy: Send + Sync {
    /// Fee in FCFA for a single-shop order with the given subtotal.
    fn quote(&self, subtotal: i64) -> i64;
}

#[derive(Debug, Clone)]
pub struct FlatFee {
    pub amount: i64,
}

impl FlatFee {
    pub fn new(amount: i64) -> Self {
        Self { amount }
    }
}

impl Default for FlatFee {
    fn default() -> Self {
        Self {
            amount: DEFAULT_DELIVERY_FEE,
        }
    }
}

impl DeliveryFeePolicy for FlatFee {
    fn quote(&self, _subtotal: i64) -> i64 {
        self.amount
    }
}
