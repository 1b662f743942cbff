//! Data models and request/response payloads

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

// Re-export for convenience
pub use cart::{AddToCartRequest, CartItemView, CartResponse, UpdateCartRequest};
pub use order::{
    CreateTransactionRequest, NewOrder, NewOrderItem, Order, OrderItem, OrderListResponse,
    OrderQuery, OrderStatus, OrderWithItems, PaymentNotification, TransactionData,
    TransactionItemRequest,
};
pub use product::{
    Category, NewProduct, Product, ProductInput, ProductListResponse, ProductQuery, ProductSort,
    UpdateProduct, total_pages,
};
pub use user::{
    AuthData, LoginRequest, NewUser, RegisterRequest, Role, UpdateProfileRequest, UpdateUser, User,
    UserResponse,
};
