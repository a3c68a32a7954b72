pub mod cart_items;
pub mod categories;
pub mod favorites;
pub mod order_items;
pub mod orders;
pub mod payment_details;
pub mod products;
pub mod profiles;
pub mod support_requests;

pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use favorites::Entity as Favorites;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payment_details::Entity as PaymentDetails;
pub use products::Entity as Products;
pub use profiles::Entity as Profiles;
pub use support_requests::Entity as SupportRequests;
