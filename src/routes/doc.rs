use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        account::{AddressList, CreateAddressRequest, CreatePaymentMethodRequest, PaymentMethodList, UpdateProfileRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        favorites::{AddFavoriteRequest, FavoriteProductList},
        orders::{
            AdvanceOrderRequest, AvailableDelivery, AvailableDeliveryList, CheckoutRequest,
            CheckoutResponse, ContactInfo, DeliveryAddressInfo, MerchantOrderDetail,
            MerchantStats, OrderList, OrderWithItems, StatusCount, StatusHistoryList,
        },
        products::{
            CategoryList, CreateProductRequest, ProductCard, ProductCardList, ProductList,
            UpdateProductRequest,
        },
        shops::{CreateShopRequest, ShopList, UpdateShopRequest},
    },
    models::{
        Category, CartItem, Favorite, Order, OrderItem, Product, Profile, Shop,
        StatusHistoryEntry, UserAddress, UserPaymentMethod,
    },
    response::{ApiResponse, Meta},
    routes::{account, auth, cart, driver, favorites, health, merchant, orders, params, products, shops},
    status::OrderStatus,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        account::get_profile,
        account::update_profile,
        account::list_addresses,
        account::add_address,
        account::remove_address,
        account::list_payment_methods,
        account::add_payment_method,
        account::remove_payment_method,
        products::list_products,
        products::get_product,
        products::list_categories,
        shops::list_shops,
        shops::get_shop,
        cart::cart_list,
        cart::add_to_cart,
        cart::set_quantity,
        cart::remove_from_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::order_history,
        orders::cancel_order,
        merchant::my_shop,
        merchant::create_shop,
        merchant::update_shop,
        merchant::list_my_products,
        merchant::create_product,
        merchant::update_product,
        merchant::delete_product,
        merchant::list_shop_orders,
        merchant::get_shop_order,
        merchant::advance_order,
        merchant::shop_stats,
        driver::list_available,
        driver::claim,
        driver::list_active,
        driver::advance_delivery,
        driver::list_deliveries,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite
    ),
    components(
        schemas(
            Profile,
            Shop,
            Category,
            Product,
            CartItem,
            Order,
            OrderItem,
            StatusHistoryEntry,
            UserAddress,
            UserPaymentMethod,
            Favorite,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CreateAddressRequest,
            AddressList,
            CreatePaymentMethodRequest,
            PaymentMethodList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CheckoutRequest,
            CheckoutResponse,
            OrderWithItems,
            OrderList,
            AdvanceOrderRequest,
            StatusHistoryList,
            ContactInfo,
            DeliveryAddressInfo,
            MerchantOrderDetail,
            MerchantStats,
            StatusCount,
            AvailableDelivery,
            AvailableDeliveryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductCard,
            ProductCardList,
            ProductList,
            CategoryList,
            CreateShopRequest,
            UpdateShopRequest,
            ShopList,
            AddFavoriteRequest,
            FavoriteProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Profile>,
            ApiResponse<ProductCardList>,
            ApiResponse<CartList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<MerchantOrderDetail>,
            ApiResponse<AvailableDeliveryList>,
            ApiResponse<MerchantStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Account", description = "Profile, addresses and payment methods"),
        (name = "Products", description = "Public catalog endpoints"),
        (name = "Shops", description = "Public shop endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Customer order endpoints"),
        (name = "Merchant", description = "Shop management and order processing"),
        (name = "Driver", description = "Delivery queue and progress"),
        (name = "Favorites", description = "Favorite endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
