pub mod admin_service;
pub mod cart_service;
pub mod catalog_service;
pub mod checkout_service;
pub mod favorite_service;
pub mod order_service;
pub mod payment_service;
pub mod profile_service;
pub mod support_service;
