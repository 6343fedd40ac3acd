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
        equipment::{CreateEquipmentRequest, EquipmentList, UpdateEquipmentRequest},
        orders::{CreateOrderRequest, OrderList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        rentals::{BookedDates, BookedRange, CreateRentalRequest, RentalList},
    },
    models::{
        Equipment, EquipmentRental, EquipmentStatus, Order, OrderStatus, PaymentStatus, Product,
        ProductStatus, RentalStatus, Role, User,
    },
    response::{ApiResponse, Meta},
    routes::{auth, equipment, health, orders, params, products, rentals},
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
        auth::login,
        auth::register,
        products::list_products,
        products::my_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        equipment::list_equipment,
        equipment::my_equipment,
        equipment::create_equipment,
        equipment::get_equipment,
        equipment::update_equipment,
        equipment::booked_dates,
        rentals::create_rental,
        rentals::my_rentals,
        rentals::my_equipment_rentals,
        rentals::get_rental,
        rentals::confirm_rental,
        rentals::cancel_rental,
        rentals::complete_rental,
        orders::create_order,
        orders::my_orders,
        orders::my_sales,
        orders::get_order,
        orders::confirm_order,
        orders::mark_shipped,
        orders::mark_delivered,
        orders::cancel_order
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            ProductStatus,
            Equipment,
            EquipmentStatus,
            EquipmentRental,
            RentalStatus,
            Order,
            OrderStatus,
            PaymentStatus,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateEquipmentRequest,
            UpdateEquipmentRequest,
            EquipmentList,
            CreateRentalRequest,
            RentalList,
            BookedRange,
            BookedDates,
            CreateOrderRequest,
            OrderList,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<Equipment>,
            ApiResponse<EquipmentRental>,
            ApiResponse<Order>,
            ApiResponse<RentalList>,
            ApiResponse<OrderList>,
            ApiResponse<BookedDates>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Produce catalog"),
        (name = "Equipment", description = "Equipment catalog and availability"),
        (name = "Rentals", description = "Equipment rental lifecycle"),
        (name = "Orders", description = "Produce order lifecycle"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
