// utils/order_code.rs
use rand::Rng;

pub const ORDER_CODE_LEN: usize = 8;
const ORDER_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_order_code() -> String {
    let mut rng = rand::rng();
    (0..ORDER_CODE_LEN)
        .map(|_| ORDER_CODE_CHARSET[rng.random_range(0..ORDER_CODE_CHARSET.len())] as char)
        .collect()
}

pub fn is_valid_order_code(code: &str) -> bool {
    code.len() == ORDER_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
