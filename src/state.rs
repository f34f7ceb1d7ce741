use std::sync::Arc;

use crate::db::{DbPool, OrmConn};
use crate::pricing::DeliveryFeePolicy;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub fees: Arc<dyn DeliveryFeePolicy>,
}
