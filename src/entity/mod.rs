pub mod cart_items;
pub mod carts;
pub mod order_items;
pub mod order_status_history;
pub mod orders;
pub mod products;
pub mod shops;
pub mod user_addresses;
pub mod user_payment_methods;

pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use order_items::Entity as OrderItems;
pub use order_status_history::Entity as OrderStatusHistory;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use shops::Entity as Shops;
pub use user_addresses::Entity as UserAddresses;
pub use user_payment_methods::Entity as UserPaymentMethods;
