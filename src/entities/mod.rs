pub mod cart;
pub mod cart_item;
pub mod coupon;

pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel, StockStatus};
pub use coupon::{Entity as Coupon, Model as CouponModel};
