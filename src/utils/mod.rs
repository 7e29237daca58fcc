pub mod order_code;
pub mod token;
