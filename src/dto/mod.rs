pub mod admin;
pub mod cart;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod profile;
pub mod support;
