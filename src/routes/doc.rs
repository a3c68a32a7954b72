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
        admin::{
            DashboardStats, FinanceDay, FinanceReport, InventoryAdjustRequest, LowStockQuery,
            ProductList as AdminProductList, UpdateOrderStatusRequest, UpdateRoleRequest, UserList,
        },
        cart::{AddToCartRequest, CartView, UpdateCartQuantityRequest},
        favorites::{AddFavoriteRequest, FavoriteProductList, FavoriteState},
        orders::{CheckoutRequest, CheckoutResult, OrderList, OrderWithItems, PaidOrder, PayOrderRequest},
        products::{
            CatalogProduct, CategoryList, CreateCategoryRequest, CreateProductRequest, ProductList,
            UpdateProductRequest,
        },
        profile::{RegisterProfileRequest, UpdateProfileRequest},
        support::{SubmitTicketRequest, TicketList},
    },
    models::{
        CartLine, Category, Order, OrderItem, PaymentDetail, Product, ProductSnapshot, Profile,
        SupportTicket,
    },
    receipt::{Receipt, ReceiptLine},
    response::Meta,
    routes::{admin, cart, favorites, health, orders, params, products, profile, support},
    status::{OrderStatus, PaymentMethod, Role, TicketStatus},
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
        products::list_products,
        products::get_product,
        products::list_categories,
        cart::load_cart,
        cart::add_to_cart,
        cart::set_quantity,
        cart::remove_from_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::pay_order,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        favorites::toggle_favorite,
        profile::register,
        profile::get_me,
        profile::update_me,
        support::list_my_tickets,
        support::submit_ticket,
        admin::dashboard,
        admin::finance,
        admin::list_users,
        admin::set_role,
        admin::delete_user,
        admin::list_all_orders,
        admin::list_incomplete_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_category,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_tickets,
        admin::close_ticket
    ),
    components(
        schemas(
            Profile,
            Category,
            Product,
            ProductSnapshot,
            CartLine,
            Order,
            OrderItem,
            PaymentDetail,
            SupportTicket,
            OrderStatus,
            Role,
            TicketStatus,
            PaymentMethod,
            Receipt,
            ReceiptLine,
            CatalogProduct,
            ProductList,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            CreateCategoryRequest,
            AddToCartRequest,
            UpdateCartQuantityRequest,
            CartView,
            CheckoutRequest,
            CheckoutResult,
            PayOrderRequest,
            PaidOrder,
            OrderWithItems,
            OrderList,
            AddFavoriteRequest,
            FavoriteProductList,
            FavoriteState,
            RegisterProfileRequest,
            UpdateProfileRequest,
            SubmitTicketRequest,
            TicketList,
            UpdateRoleRequest,
            UpdateOrderStatusRequest,
            InventoryAdjustRequest,
            LowStockQuery,
            AdminProductList,
            UserList,
            DashboardStats,
            FinanceDay,
            FinanceReport,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::TicketQuery,
            Meta
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout, order history and payment"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Profile", description = "Signup registration and own profile"),
        (name = "Support", description = "Support ticket endpoints"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
