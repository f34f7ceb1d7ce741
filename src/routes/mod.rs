use axum::Router;

use crate::state::AppState;

pub mod account;
pub mod auth;
pub mod cart;
pub mod doc;
pub mod driver;
pub mod favorites;
pub mod health;
pub mod merchant;
pub mod orders;
pub mod params;
pub mod products;
pub mod shops;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/me", account::router())
        .nest("/products", products::router())
        .nest("/categories", products::categories_router())
        .nest("/shops", shops::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/merchant", merchant::router())
        .nest("/driver", driver::router())
        .nest("/favorites", favorites::router())
}
